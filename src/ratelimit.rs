//! Flat fixed-window rate limiting over expiring store markers.

use crate::error::StoreError;
use crate::store::Store;

/// Check-and-arm limiter keyed by an arbitrary composite tag.
///
/// Returns true while a previous window is still open. On the free path a
/// marker lasting `window` seconds is installed before returning false;
/// there is no backoff curve and no renewal of a live marker.
pub async fn is_limited(
    store: &dyn Store,
    window: i64,
    tags: &[&str],
) -> Result<bool, StoreError> {
    let key = format!("limit:{}", tags.join("."));
    if store.exists(&key).await? {
        return Ok(true);
    }
    store.setex(&key, window, "1").await?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn first_hit_free_second_limited() {
        let store = MemoryStore::new();
        assert!(!is_limited(&store, 60, &["create_user", "10.0.0.1"])
            .await
            .unwrap());
        assert!(is_limited(&store, 60, &["create_user", "10.0.0.1"])
            .await
            .unwrap());
        // a different composite tag is an independent window
        assert!(!is_limited(&store, 60, &["create_user", "10.0.0.2"])
            .await
            .unwrap());
    }
}
