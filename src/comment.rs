//! Per-thread comment store and the recursive thread renderer.
//!
//! Comments live as JSON blobs inside one hash per thread, keyed by a
//! per-thread sequence number (field `nextid` holds the counter). The
//! renderer sorts each sibling group independently, preserving tree shape
//! while letting locally popular replies surface within their branch.

use ::std::collections::HashMap;

use ::log::*;

use crate::error::{Error, Result};
use crate::model::{Comment, Context, News, VoteDirection, TOP_LEVEL_PARENT};
use crate::store::Store;
use crate::Engine;

/// Body stored in place of a soft-deleted comment's content.
pub const DELETED_BODY: &str = "[comment deleted]";

/// Outcome of [`edit_comment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOp {
    Updated,
    Deleted,
}

fn thread_key(news_id: u64) -> String {
    format!("comment:{}", news_id)
}

fn parse_comment(thread_id: u64, id: u64, json: &str) -> Option<Comment> {
    let mut comment: Comment = ::serde_json::from_str(json).ok()?;
    comment.thread_id = thread_id;
    comment.id = id;
    Some(comment)
}

async fn save_comment(engine: &Engine, comment: &Comment) -> Result<()> {
    let json = ::serde_json::to_string(comment).expect("comment serializes");
    let field = comment.id.to_string();
    engine
        .store
        .hset(&thread_key(comment.thread_id), &[(field.as_str(), json)])
        .await?;
    Ok(())
}

/// Fetch a single comment, `None` if it never existed.
pub async fn fetch_comment(
    engine: &Engine,
    news_id: u64,
    comment_id: u64,
) -> Result<Option<Comment>> {
    let raw = engine
        .store
        .hget(&thread_key(news_id), &comment_id.to_string())
        .await?;
    Ok(raw.and_then(|json| parse_comment(news_id, comment_id, &json)))
}

/// Insert a comment into a thread.
///
/// The new comment takes the thread's next sequence number, starts with
/// the author in its up-voter set, bumps the thread's comment counter and
/// the parent author's unread-reply counter, and is indexed in the
/// author's comment ordering as `{news_id}-{comment_id}`.
pub async fn post_comment(
    engine: &Engine,
    ctx: &mut Context,
    news_id: u64,
    parent_id: i64,
    body: &str,
) -> Result<u64> {
    let user = ctx.require_user()?.clone();
    let body = body.trim();
    if body.is_empty() {
        return Err(Error::Validation("comment body is required".to_string()));
    }
    if body.chars().count() > engine.config.comment_max_length {
        return Err(Error::Validation("comment too long".to_string()));
    }

    let map = engine.store.hgetall(&format!("news:{}", news_id)).await?;
    if News::from_map(&map).is_none() {
        return Err(Error::NotFound("news"));
    }

    // A soft-deleted parent still accepts replies: its subtree stays live.
    let mut parent_author = None;
    if parent_id != TOP_LEVEL_PARENT {
        let parent = fetch_comment(engine, news_id, parent_id as u64)
            .await?
            .ok_or(Error::NotFound("comment"))?;
        parent_author = Some(parent.user_id);
    }

    let comment_id = engine
        .store
        .hincrby(&thread_key(news_id), "nextid", 1)
        .await? as u64;
    let comment = Comment {
        thread_id: news_id,
        id: comment_id,
        parent_id,
        user_id: user.id,
        ctime: ctx.now,
        body: body.to_string(),
        up: vec![user.id],
        down: vec![],
        del: false,
    };
    save_comment(engine, &comment).await?;

    engine
        .store
        .hincrby(&format!("news:{}", news_id), "comments", 1)
        .await?;
    engine
        .store
        .zadd(
            &format!("user.comments:{}", user.id),
            ctx.now as f64,
            &format!("{}-{}", news_id, comment_id),
        )
        .await?;
    if let Some(author_id) = parent_author {
        if engine
            .store
            .exists(&format!("user:{}", author_id))
            .await?
        {
            engine
                .store
                .hincrby(&format!("user:{}", author_id), "replies", 1)
                .await?;
        }
    }

    debug!(
        "user {} commented on news {} (comment {}, parent {})",
        user.id, news_id, comment_id, parent_id
    );
    Ok(comment_id)
}

/// Edit a comment's body. Author-only inside the edit window, admins
/// bypass both checks. An empty body soft-deletes instead of failing; a
/// non-empty edit of a deleted comment restores it.
pub async fn edit_comment(
    engine: &Engine,
    ctx: &Context,
    news_id: u64,
    comment_id: u64,
    body: &str,
) -> Result<CommentOp> {
    let user = ctx.require_user()?.clone();
    let mut comment = fetch_comment(engine, news_id, comment_id)
        .await?
        .ok_or(Error::NotFound("comment"))?;
    let admin = user.is_admin();
    if comment.user_id != user.id && !admin {
        return Err(Error::PermissionDenied);
    }
    if !admin && ctx.now - comment.ctime >= engine.config.comment_edit_time {
        return Err(Error::PermissionDenied);
    }

    let body = body.trim();
    if body.is_empty() {
        if comment.del {
            return Err(Error::NotFound("comment"));
        }
        comment.del = true;
        comment.body = DELETED_BODY.to_string();
        save_comment(engine, &comment).await?;
        engine
            .store
            .hincrby(&format!("news:{}", news_id), "comments", -1)
            .await?;
        debug!("comment {}-{} deleted", news_id, comment_id);
        return Ok(CommentOp::Deleted);
    }

    if body.chars().count() > engine.config.comment_max_length {
        return Err(Error::Validation("comment too long".to_string()));
    }
    let restoring = comment.del;
    comment.del = false;
    comment.body = body.to_string();
    save_comment(engine, &comment).await?;
    if restoring {
        engine
            .store
            .hincrby(&format!("news:{}", news_id), "comments", 1)
            .await?;
    }
    Ok(CommentOp::Updated)
}

/// Vote on a comment. The voter may appear in at most one of the two
/// voter sets, ever; no karma moves at comment granularity.
pub async fn vote_comment(
    engine: &Engine,
    ctx: &Context,
    news_id: u64,
    comment_id: u64,
    direction: VoteDirection,
) -> Result<()> {
    let user = ctx.require_user()?;
    let mut comment = fetch_comment(engine, news_id, comment_id)
        .await?
        .ok_or(Error::NotFound("comment"))?;
    if comment.up.contains(&user.id) || comment.down.contains(&user.id) {
        return Err(Error::DuplicateVote);
    }
    match direction {
        VoteDirection::Up => comment.up.push(user.id),
        VoteDirection::Down => comment.down.push(user.id),
    }
    save_comment(engine, &comment).await
}

/// All comments of a thread, in no particular order.
async fn thread_comments(engine: &Engine, news_id: u64) -> Result<Vec<Comment>> {
    let map = engine.store.hgetall(&thread_key(news_id)).await?;
    Ok(map
        .iter()
        .filter(|(field, _)| field.as_str() != "nextid")
        .filter_map(|(field, json)| {
            let id: u64 = field.parse().ok()?;
            parse_comment(news_id, id, json)
        })
        .collect())
}

/// Depth-first sequence of the non-deleted descendants of `root`
/// (`TOP_LEVEL_PARENT` for the whole thread), each with its depth.
///
/// Sibling groups are ordered independently: higher net score first, ties
/// broken by more recent creation, then by newer id so the order is
/// deterministic. Soft-deleted comments hold their comparator position but
/// are not emitted; the walk still descends through them, so their
/// descendants stay reachable in place.
pub async fn render_thread(
    engine: &Engine,
    news_id: u64,
    root: i64,
) -> Result<Vec<(Comment, usize)>> {
    let mut children: HashMap<i64, Vec<Comment>> = HashMap::new();
    for comment in thread_comments(engine, news_id).await? {
        children.entry(comment.parent_id).or_default().push(comment);
    }
    for group in children.values_mut() {
        group.sort_by(|a, b| {
            b.score()
                .cmp(&a.score())
                .then_with(|| b.ctime.cmp(&a.ctime))
                .then_with(|| b.id.cmp(&a.id))
        });
    }
    let mut out = Vec::new();
    walk(&children, root, 0, &mut out);
    Ok(out)
}

fn walk(
    children: &HashMap<i64, Vec<Comment>>,
    parent: i64,
    depth: usize,
    out: &mut Vec<(Comment, usize)>,
) {
    let Some(group) = children.get(&parent) else {
        return;
    };
    for comment in group {
        if !comment.del {
            out.push((comment.clone(), depth));
        }
        walk(children, comment.id as i64, depth + 1, out);
    }
}

/// Chronological page of one user's comments, most recent first.
pub async fn get_user_comments(
    engine: &Engine,
    user_id: u64,
    start: u64,
    count: u64,
) -> Result<(Vec<Comment>, u64)> {
    let key = format!("user.comments:{}", user_id);
    let total = engine.store.zcard(&key).await?;
    if count == 0 {
        return Ok((vec![], total));
    }
    let refs = engine
        .store
        .zrevrange(&key, start as i64, (start + count) as i64 - 1)
        .await?;
    let ids: Vec<(u64, u64)> = refs
        .iter()
        .filter_map(|r| {
            let (news_id, comment_id) = r.split_once('-')?;
            Some((news_id.parse().ok()?, comment_id.parse().ok()?))
        })
        .collect();
    let pairs: Vec<(String, String)> = ids
        .iter()
        .map(|(news_id, comment_id)| (thread_key(*news_id), comment_id.to_string()))
        .collect();
    let raws = engine.store.hget_multi(&pairs).await?;
    let comments = ids
        .iter()
        .zip(raws)
        .filter_map(|((news_id, comment_id), raw)| {
            parse_comment(*news_id, *comment_id, &raw?)
        })
        .collect();
    Ok((comments, total))
}

/// The unread-replies surface: the identity's latest comments, each with
/// its rendered subthread, and the unread counter reset as a side effect.
pub async fn get_replies(
    engine: &Engine,
    ctx: &mut Context,
) -> Result<Vec<(Comment, Vec<(Comment, usize)>)>> {
    let user = ctx.require_user()?.clone();
    let (roots, _) = get_user_comments(
        engine,
        user.id,
        0,
        engine.config.subthreads_in_replies_page,
    )
    .await?;
    engine
        .store
        .hset(&format!("user:{}", user.id), &[("replies", "0".to_string())])
        .await?;
    if let Some(user) = &mut ctx.user {
        user.replies = 0;
    }
    let mut result = Vec::with_capacity(roots.len());
    for root in roots {
        let subthread = render_thread(engine, root.thread_id, root.id as i64).await?;
        result.push((root, subthread));
    }
    Ok(result)
}
