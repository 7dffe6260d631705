//! Vote ledger for news items: per-item dedup, counter maintenance,
//! score/rank recomputation and the karma economics of a vote.

use ::log::*;

use crate::error::{Error, Result};
use crate::model::{Context, News, VoteDirection};
use crate::store::Store;
use crate::{karma, ranking, Engine};

/// Cast a vote on a news item in the context of the authenticated user.
///
/// Returns the item's new rank. The duplicate check and the vote write are
/// two independent atomic calls, not a transaction: two concurrent casts by
/// the same voter can both pass the check, but the second zadd only
/// refreshes the vote timestamp, so the counters never double-increment.
pub async fn vote_news(
    engine: &Engine,
    ctx: &mut Context,
    news_id: u64,
    direction: VoteDirection,
) -> Result<f64> {
    let voter = ctx.require_user()?.clone();

    let news_key = format!("news:{}", news_id);
    let map = engine.store.hgetall(&news_key).await?;
    let news = News::from_map(&map).ok_or(Error::NotFound("news"))?;
    if news.del {
        return Err(Error::NotFound("news"));
    }

    let voter_member = voter.id.to_string();
    let existing = engine
        .store
        .zscore_multi(&[
            (format!("news.up:{}", news_id), voter_member.clone()),
            (format!("news.down:{}", news_id), voter_member.clone()),
        ])
        .await?;
    if existing.iter().any(|v| v.is_some()) {
        return Err(Error::DuplicateVote);
    }

    if voter.id != news.user_id {
        let min_karma = match direction {
            VoteDirection::Up => engine.config.upvote_min_karma,
            VoteDirection::Down => engine.config.downvote_min_karma,
        };
        if karma::get_user_karma(engine, ctx, voter.id).await? < min_karma {
            return Err(Error::InsufficientKarma);
        }
    }

    let vote_key = format!("news.{}:{}", direction.as_str(), news_id);
    if engine
        .store
        .zadd(&vote_key, ctx.now as f64, &voter_member)
        .await?
    {
        engine
            .store
            .hincrby(&news_key, direction.as_str(), 1)
            .await?;
    }
    if direction == VoteDirection::Up {
        engine
            .store
            .zadd(
                &format!("user.saved:{}", voter.id),
                ctx.now as f64,
                &news_id.to_string(),
            )
            .await?;
    }

    let score = ranking::news_score(engine, news_id).await?;
    let rank = ranking::compute_rank(&engine.config, score, ctx.now - news.ctime);
    engine
        .store
        .hset(
            &news_key,
            &[("score", score.to_string()), ("rank", rank.to_string())],
        )
        .await?;
    engine
        .store
        .zadd("news.top", rank, &news_id.to_string())
        .await?;

    if voter.id != news.user_id {
        match direction {
            VoteDirection::Up => {
                karma::increment_user_karma_by(
                    engine,
                    ctx,
                    voter.id,
                    -engine.config.upvote_karma_cost,
                )
                .await?;
                karma::increment_user_karma_by(
                    engine,
                    ctx,
                    news.user_id,
                    engine.config.upvote_karma_transfer,
                )
                .await?;
            }
            VoteDirection::Down => {
                karma::increment_user_karma_by(
                    engine,
                    ctx,
                    voter.id,
                    -engine.config.downvote_karma_cost,
                )
                .await?;
            }
        }
    }

    debug!(
        "user {} voted {} on news {}, new rank {}",
        voter.id,
        direction.as_str(),
        news_id,
        rank
    );
    Ok(rank)
}
