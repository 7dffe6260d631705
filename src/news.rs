//! News item lifecycle: submission with repost/cooldown guards, bounded
//! edits, soft deletion, hydrated+enriched reads and the list surfaces.

use ::log::*;
use ::rand::Rng;

use crate::error::{Error, Result};
use crate::model::{Context, News, SiteStats, VoteDirection, TEXT_URL_PREFIX};
use crate::store::Store;
use crate::{ranking, vote, Engine};

/// Submit a news item: either an external `url` or an inline `text` body
/// (stored behind the `text://` marker), never both.
///
/// A URL already posted inside the repost window is not re-inserted: the
/// existing item's id is returned instead. On success the author's
/// implicit upvote seeds score, rank and the saved-items list, and a
/// submission-cooldown marker is installed.
pub async fn submit_news(
    engine: &Engine,
    ctx: &mut Context,
    title: &str,
    url: &str,
    text: &str,
) -> Result<u64> {
    let user = ctx.require_user()?.clone();
    let title = title.trim();
    let url = url.trim();
    if title.is_empty() {
        return Err(Error::Validation("title is required".to_string()));
    }
    let text_post = url.is_empty();
    if text_post && text.trim().is_empty() {
        return Err(Error::Validation(
            "either url or text is required".to_string(),
        ));
    }
    if !text_post && !acceptable_url(url) {
        return Err(Error::Validation(
            "only http:// and https:// urls are accepted".to_string(),
        ));
    }

    if !user.is_admin()
        && engine
            .store
            .exists(&format!("user:{}:submitted_recently", user.id))
            .await?
    {
        return Err(Error::RateLimited);
    }

    let stored_url = if text_post {
        format!(
            "{}{}",
            TEXT_URL_PREFIX,
            truncate_chars(text, engine.config.comment_max_length)
        )
    } else {
        url.to_string()
    };

    if !text_post {
        if let Some(existing) = engine.store.get(&format!("url:{}", stored_url)).await? {
            if let Ok(id) = existing.parse::<u64>() {
                info!("url already posted as news {}, returning it", id);
                return Ok(id);
            }
        }
    }

    let news_id = engine.store.incr("news.count").await? as u64;
    engine
        .store
        .hset(
            &format!("news:{}", news_id),
            &[
                ("id", news_id.to_string()),
                ("title", title.to_string()),
                ("url", stored_url.clone()),
                ("user_id", user.id.to_string()),
                ("ctime", ctx.now.to_string()),
                ("score", "0".to_string()),
                ("rank", "0".to_string()),
                ("up", "0".to_string()),
                ("down", "0".to_string()),
                ("comments", "0".to_string()),
            ],
        )
        .await?;

    // The submitter virtually upvotes their own story; this seeds the
    // score/rank fields and the news.top entry.
    vote::vote_news(engine, ctx, news_id, VoteDirection::Up).await?;

    engine
        .store
        .zadd(
            &format!("user.posted:{}", user.id),
            ctx.now as f64,
            &news_id.to_string(),
        )
        .await?;
    engine
        .store
        .zadd("news.cron", ctx.now as f64, &news_id.to_string())
        .await?;
    if !text_post {
        engine
            .store
            .setex(
                &format!("url:{}", stored_url),
                engine.config.prevent_repost_time,
                &news_id.to_string(),
            )
            .await?;
    }
    engine
        .store
        .setex(
            &format!("user:{}:submitted_recently", user.id),
            engine.config.news_submission_break,
            "1",
        )
        .await?;

    info!("user {} submitted news {}", user.id, news_id);
    Ok(news_id)
}

/// Edit a news item's title and url/text. Author-only inside the edit
/// window; admins bypass both checks. Changing the URL to one inside
/// another item's repost window fails; a successful URL change frees the
/// old repost guard and installs a new one.
pub async fn edit_news(
    engine: &Engine,
    ctx: &Context,
    news_id: u64,
    title: &str,
    url: &str,
    text: &str,
) -> Result<u64> {
    let user = ctx.require_user()?.clone();
    let map = engine.store.hgetall(&format!("news:{}", news_id)).await?;
    let news = News::from_map(&map).ok_or(Error::NotFound("news"))?;
    if news.del {
        return Err(Error::NotFound("news"));
    }
    let admin = user.is_admin();
    if news.user_id != user.id && !admin {
        return Err(Error::PermissionDenied);
    }
    if !admin && ctx.now - news.ctime >= engine.config.news_edit_time {
        return Err(Error::PermissionDenied);
    }

    let title = title.trim();
    let url = url.trim();
    if title.is_empty() {
        return Err(Error::Validation("title is required".to_string()));
    }
    let text_post = url.is_empty();
    if text_post && text.trim().is_empty() {
        return Err(Error::Validation(
            "either url or text is required".to_string(),
        ));
    }
    if !text_post && !acceptable_url(url) {
        return Err(Error::Validation(
            "only http:// and https:// urls are accepted".to_string(),
        ));
    }

    let stored_url = if text_post {
        format!(
            "{}{}",
            TEXT_URL_PREFIX,
            truncate_chars(text, engine.config.comment_max_length)
        )
    } else {
        url.to_string()
    };

    if !text_post && stored_url != news.url {
        if engine
            .store
            .get(&format!("url:{}", stored_url))
            .await?
            .is_some()
        {
            return Err(Error::AlreadyExists("url"));
        }
        // only the item's current url stays guarded
        engine.store.del(&format!("url:{}", news.url)).await?;
        engine
            .store
            .setex(
                &format!("url:{}", stored_url),
                engine.config.prevent_repost_time,
                &news_id.to_string(),
            )
            .await?;
    }

    engine
        .store
        .hset(
            &format!("news:{}", news_id),
            &[("title", title.to_string()), ("url", stored_url)],
        )
        .await?;
    Ok(news_id)
}

/// Soft-delete a news item: flag it and evict it from both global
/// orderings. Same permission and window rules as editing.
pub async fn del_news(engine: &Engine, ctx: &Context, news_id: u64) -> Result<()> {
    let user = ctx.require_user()?.clone();
    let map = engine.store.hgetall(&format!("news:{}", news_id)).await?;
    let news = News::from_map(&map).ok_or(Error::NotFound("news"))?;
    let admin = user.is_admin();
    if news.user_id != user.id && !admin {
        return Err(Error::PermissionDenied);
    }
    if !admin && ctx.now - news.ctime >= engine.config.news_edit_time {
        return Err(Error::PermissionDenied);
    }

    engine
        .store
        .hset(&format!("news:{}", news_id), &[("del", "1".to_string())])
        .await?;
    engine.store.zrem("news.top", &news_id.to_string()).await?;
    engine.store.zrem("news.cron", &news_id.to_string()).await?;
    info!("news {} deleted by user {}", news_id, user.id);
    Ok(())
}

/// Hydrate a batch of news ids and enrich each record: author username
/// and, for an authenticated context, the requester's own vote direction.
/// Each auxiliary kind costs one batched store round trip regardless of
/// page size. With `update_rank` the lazy rank repair runs per item.
pub async fn get_news_by_ids(
    engine: &Engine,
    ctx: &Context,
    ids: &[u64],
    update_rank: bool,
) -> Result<Vec<News>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let keys: Vec<String> = ids.iter().map(|id| format!("news:{}", id)).collect();
    let maps = engine.store.hgetall_multi(&keys).await?;
    let mut result: Vec<News> = maps.iter().filter_map(News::from_map).collect();

    if update_rank {
        for news in result.iter_mut() {
            ranking::update_rank_if_needed(engine, news, ctx.now).await?;
        }
    }

    let username_pairs: Vec<(String, String)> = result
        .iter()
        .map(|n| (format!("user:{}", n.user_id), "username".to_string()))
        .collect();
    let usernames = engine.store.hget_multi(&username_pairs).await?;
    for (news, username) in result.iter_mut().zip(usernames) {
        news.username = username;
    }

    if let Some(user_id) = ctx.user_id() {
        let member = user_id.to_string();
        let mut vote_pairs = Vec::with_capacity(result.len() * 2);
        for news in &result {
            vote_pairs.push((format!("news.up:{}", news.id), member.clone()));
            vote_pairs.push((format!("news.down:{}", news.id), member.clone()));
        }
        let votes = engine.store.zscore_multi(&vote_pairs).await?;
        for (i, news) in result.iter_mut().enumerate() {
            news.voted = if votes[i * 2].is_some() {
                Some(VoteDirection::Up)
            } else if votes[i * 2 + 1].is_some() {
                Some(VoteDirection::Down)
            } else {
                None
            };
        }
    }

    Ok(result)
}

pub async fn get_news_by_id(engine: &Engine, ctx: &Context, news_id: u64) -> Result<Option<News>> {
    Ok(get_news_by_ids(engine, ctx, &[news_id], false).await?.pop())
}

/// Front page: a slice of the rank ordering. The lazy repair can move an
/// item's rank while the slice is being hydrated, so the page is re-sorted
/// by the post-repair ranks before being returned.
pub async fn get_top_news(
    engine: &Engine,
    ctx: &Context,
    start: u64,
    count: u64,
) -> Result<(Vec<News>, u64)> {
    let total = engine.store.zcard("news.top").await?;
    let ids = zrevrange_ids(engine, "news.top", start, count).await?;
    let mut items = get_news_by_ids(engine, ctx, &ids, true).await?;
    items.sort_by(|a, b| b.rank.total_cmp(&a.rank));
    Ok((items, total))
}

/// Chronological feed over `news.cron`; repair still runs, but creation
/// order is not rank-dependent so no re-sort happens.
pub async fn get_latest_news(
    engine: &Engine,
    ctx: &Context,
    start: u64,
    count: u64,
) -> Result<(Vec<News>, u64)> {
    let total = engine.store.zcard("news.cron").await?;
    let ids = zrevrange_ids(engine, "news.cron", start, count).await?;
    let items = get_news_by_ids(engine, ctx, &ids, true).await?;
    Ok((items, total))
}

/// Items the user upvoted, most recent vote first.
pub async fn get_saved_news(
    engine: &Engine,
    ctx: &Context,
    user_id: u64,
    start: u64,
    count: u64,
) -> Result<(Vec<News>, u64)> {
    let key = format!("user.saved:{}", user_id);
    let total = engine.store.zcard(&key).await?;
    let ids = zrevrange_ids(engine, &key, start, count).await?;
    let items = get_news_by_ids(engine, ctx, &ids, false).await?;
    Ok((items, total))
}

/// Items submitted by the user, most recent first.
pub async fn get_posted_news(
    engine: &Engine,
    ctx: &Context,
    user_id: u64,
    start: u64,
    count: u64,
) -> Result<(Vec<News>, u64)> {
    let key = format!("user.posted:{}", user_id);
    let total = engine.store.zcard(&key).await?;
    let ids = zrevrange_ids(engine, &key, start, count).await?;
    let items = get_news_by_ids(engine, ctx, &ids, false).await?;
    Ok((items, total))
}

/// A uniformly random existing item, falling back to the newest id when
/// the probe hits a hole (deleted records keep their id forever).
pub async fn get_random_news(engine: &Engine, ctx: &Context) -> Result<Option<News>> {
    let count: u64 = engine
        .store
        .get("news.count")
        .await?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if count == 0 {
        return Ok(None);
    }
    let probe = ::rand::thread_rng().gen_range(1..=count);
    let news_id = if engine.store.exists(&format!("news:{}", probe)).await? {
        probe
    } else {
        count
    };
    get_news_by_id(engine, ctx, news_id).await
}

/// Seconds until the user may submit again, 0 when free to post.
pub async fn allowed_to_post_in_seconds(engine: &Engine, ctx: &Context) -> Result<i64> {
    let user = ctx.require_user()?;
    if user.is_admin() {
        return Ok(0);
    }
    let ttl = engine
        .store
        .ttl(&format!("user:{}:submitted_recently", user.id))
        .await?;
    Ok(ttl.max(0))
}

/// Registered-user and posted-news totals for the footer.
pub async fn site_stats(engine: &Engine) -> Result<SiteStats> {
    let users = engine
        .store
        .get("users.count")
        .await?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let news = engine.store.zcard("news.cron").await?;
    Ok(SiteStats { users, news })
}

async fn zrevrange_ids(engine: &Engine, key: &str, start: u64, count: u64) -> Result<Vec<u64>> {
    if count == 0 {
        return Ok(vec![]);
    }
    let raw = engine
        .store
        .zrevrange(key, start as i64, (start + count) as i64 - 1)
        .await?;
    Ok(raw.iter().filter_map(|id| id.parse().ok()).collect())
}

fn acceptable_url(url: &str) -> bool {
    match ::url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
        Err(_) => false,
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.trim().chars().take(max).collect()
}
