//! Karma ledger: the per-user reputation counter. Karma is earned by
//! authorship rewards and a passive visiting credit, and spent on votes.

use ::log::*;

use crate::error::Result;
use crate::model::Context;
use crate::store::Store;
use crate::Engine;

/// Visiting reward: add `karma_increment_amount` if the last increment is
/// at least `karma_increment_interval` seconds old. Called by the request
/// layer once per authenticated request; there is no scheduled job.
pub async fn increment_karma_if_needed(engine: &Engine, ctx: &mut Context) -> Result<()> {
    let Some(user) = &ctx.user else {
        return Ok(());
    };
    if ctx.now - user.karma_incr_time < engine.config.karma_increment_interval {
        return Ok(());
    }
    let user_id = user.id;
    engine
        .store
        .hset(
            &format!("user:{}", user_id),
            &[("karma_incr_time", ctx.now.to_string())],
        )
        .await?;
    if let Some(user) = &mut ctx.user {
        user.karma_incr_time = ctx.now;
    }
    debug!("passive karma increment for user {}", user_id);
    increment_user_karma_by(engine, ctx, user_id, engine.config.karma_increment_amount).await
}

/// Atomic karma transfer. When the target is the identity bound to the
/// request, the delta is mirrored into the context copy so later reads in
/// the same request see it without a re-fetch.
pub async fn increment_user_karma_by(
    engine: &Engine,
    ctx: &mut Context,
    user_id: u64,
    delta: i64,
) -> Result<()> {
    engine
        .store
        .hincrby(&format!("user:{}", user_id), "karma", delta)
        .await?;
    if let Some(user) = &mut ctx.user {
        if user.id == user_id {
            user.karma += delta;
        }
    }
    Ok(())
}

/// Current karma of a user, preferring the request-scoped copy.
pub async fn get_user_karma(engine: &Engine, ctx: &Context, user_id: u64) -> Result<i64> {
    if let Some(user) = &ctx.user {
        if user.id == user_id {
            return Ok(user.karma);
        }
    }
    let karma = engine
        .store
        .hget(&format!("user:{}", user_id), "karma")
        .await?;
    Ok(karma.and_then(|v| v.parse().ok()).unwrap_or(0))
}
