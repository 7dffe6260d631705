//! Score and rank computation, and the read-time repair that keeps the
//! stored rank and the `news.top` ordering honest without any cron job.

use ::log::*;

use crate::config::Config;
use crate::error::Result;
use crate::model::News;
use crate::store::Store;
use crate::Engine;

/// Largest tolerated drift between the stored rank and the recomputed one
/// before a read path rewrites both the record and the ordering.
pub const RANK_EPSILON: f64 = 0.000001;

/// Net votes plus a damped bonus once the total vote volume passes
/// `score_log_start`: heavy traffic is more interesting than a quiet tie.
pub fn compute_score(config: &Config, up: u64, down: u64) -> f64 {
    let mut score = up as f64 - down as f64;
    let votes = up + down;
    if votes > config.score_log_start {
        score += ((votes - config.score_log_start) as f64).ln() * config.score_log_booster;
    }
    score
}

/// Time-decayed priority: `score * 1e6 / (age + padding)^aging_factor`.
/// Items older than `top_age_limit` sink to `-age`, keeping a stable
/// relative order among themselves.
pub fn compute_rank(config: &Config, score: f64, age: i64) -> f64 {
    if age > config.top_age_limit {
        return -(age as f64);
    }
    (score * 1.0e6) / ((age + config.age_padding) as f64).powf(config.aging_factor)
}

/// Recompute an item's score from the voter sets, which are the source of
/// truth (the hash counters are denormalized for display).
pub async fn news_score(engine: &Engine, news_id: u64) -> Result<f64> {
    let up = engine.store.zcard(&format!("news.up:{}", news_id)).await?;
    let down = engine.store.zcard(&format!("news.down:{}", news_id)).await?;
    Ok(compute_score(&engine.config, up, down))
}

/// Lazy repair: ranks decay with time, but instead of a background sweep
/// every read of an item recomputes the real rank and rewrites the record
/// and `news.top` only when the drift is observable.
pub async fn update_rank_if_needed(engine: &Engine, news: &mut News, now: i64) -> Result<()> {
    let real_rank = compute_rank(&engine.config, news.score, now - news.ctime);
    if (real_rank - news.rank).abs() > RANK_EPSILON {
        debug!(
            "rank drift on news {}: stored {} real {}",
            news.id, news.rank, real_rank
        );
        engine
            .store
            .hset(
                &format!("news:{}", news.id),
                &[("rank", real_rank.to_string())],
            )
            .await?;
        engine
            .store
            .zadd("news.top", real_rank, &news.id.to_string())
            .await?;
        news.rank = real_rank;
    }
    Ok(())
}

/// Admin sweep rewriting score and rank for every item in the
/// chronological ordering. The lazy repair makes this unnecessary in
/// normal operation; it exists for tuning changes to the rank constants.
pub async fn recompute_all(engine: &Engine, ctx: &crate::model::Context) -> Result<u64> {
    if !ctx.is_admin() {
        return Err(crate::error::Error::PermissionDenied);
    }
    let ids = engine.store.zrange("news.cron", 0, -1).await?;
    let mut updated = 0u64;
    for id in &ids {
        let map = engine.store.hgetall(&format!("news:{}", id)).await?;
        let Some(news) = News::from_map(&map) else {
            continue;
        };
        let score = news_score(engine, news.id).await?;
        let rank = compute_rank(&engine.config, score, ctx.now - news.ctime);
        engine
            .store
            .hset(
                &format!("news:{}", news.id),
                &[("score", score.to_string()), ("rank", rank.to_string())],
            )
            .await?;
        engine
            .store
            .zadd("news.top", rank, &news.id.to_string())
            .await?;
        updated += 1;
    }
    info!("recomputed score and rank for {} news items", updated);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_net_votes_below_log_start() {
        let config = Config::default();
        assert_eq!(compute_score(&config, 5, 2), 3.0);
        // exactly at the threshold: still no bonus
        assert_eq!(compute_score(&config, 8, 2), 6.0);
    }

    #[test]
    fn score_gets_log_bonus_past_threshold() {
        let config = Config::default();
        let score = compute_score(&config, 50, 50);
        let expected = 0.0 + (100.0f64 - 10.0).ln() * 2.0;
        assert_eq!(score, expected);
        assert!(score > compute_score(&config, 5, 5));
    }

    #[test]
    fn rank_is_pure() {
        let config = Config::default();
        let a = compute_rank(&config, 12.5, 7200);
        let b = compute_rank(&config, 12.5, 7200);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn rank_matches_formula() {
        let config = Config::default();
        let score = 4.0;
        let age = 3600;
        let expected =
            score * 1.0e6 / ((age + config.age_padding) as f64).powf(config.aging_factor);
        assert_eq!(compute_rank(&config, score, age), expected);
    }

    #[test]
    fn aged_out_items_sink_by_age() {
        let config = Config::default();
        let age = config.top_age_limit + 10;
        assert_eq!(compute_rank(&config, 100.0, age), -(age as f64));
        // older items sink further, keeping relative order among themselves
        assert!(compute_rank(&config, 100.0, age + 1) < compute_rank(&config, 100.0, age));
    }

    #[test]
    fn fresher_items_rank_higher_at_equal_score() {
        let config = Config::default();
        assert!(compute_rank(&config, 10.0, 60) > compute_rank(&config, 10.0, 7200));
    }
}
