//! Show-more pagination over any source returning (ordered slice, total).

use ::std::future::Future;

use crate::error::Result;

/// One page of a list surface plus the cursor for the next one.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    /// Start offset of the next page, present only when one exists.
    pub more: Option<u64>,
}

/// Fetch one page. Negative `start` clamps to zero; the "more" cursor is
/// produced only while `start + count < total`.
pub async fn paginate<T, F, Fut>(start: i64, count: u64, fetch: F) -> Result<Page<T>>
where
    F: FnOnce(u64, u64) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, u64)>>,
{
    let start = start.max(0) as u64;
    let (items, total) = fetch(start, count).await?;
    let next = start + count;
    let more = if next < total { Some(next) } else { None };
    Ok(Page { items, total, more })
}
