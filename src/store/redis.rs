use ::std::collections::HashMap;

use ::log::*;
use ::redis::aio::ConnectionManager;

use super::{Store, StoreResult};

/// Redis-backed store. A [`ConnectionManager`] multiplexes one reconnecting
/// connection; every batched read goes out as a single pipeline so a page
/// hydration costs a constant number of round trips.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> StoreResult<RedisStore> {
        let client = ::redis::Client::open(url).map_err(crate::error::StoreError::from)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(crate::error::StoreError::from)?;
        info!("connected to redis at {}", url);
        Ok(RedisStore { conn })
    }
}

#[async_trait::async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("GET").arg(key).query_async(&mut conn).await?)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?)
    }

    async fn setex(&self, key: &str, ttl_secs: i64, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async(&mut conn)
            .await?)
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("DEL").arg(key).query_async(&mut conn).await?)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("INCR").arg(key).query_async(&mut conn).await?)
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("TTL").arg(key).query_async(&mut conn).await?)
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut conn)
            .await?)
    }

    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?)
    }

    async fn hset(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let mut cmd = ::redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(*field).arg(value);
        }
        Ok(cmd.query_async(&mut conn).await?)
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("HINCRBY")
            .arg(key)
            .arg(field)
            .arg(delta)
            .query_async(&mut conn)
            .await?)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let added: i64 = ::redis::cmd("ZADD")
            .arg(key)
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(added == 1)
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = ::redis::cmd("ZREM")
            .arg(key)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(removed == 1)
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("ZSCORE")
            .arg(key)
            .arg(member)
            .query_async(&mut conn)
            .await?)
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("ZCARD").arg(key).query_async(&mut conn).await?)
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("ZRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await?)
    }

    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(::redis::cmd("ZREVRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await?)
    }

    async fn hgetall_multi(&self, keys: &[String]) -> StoreResult<Vec<HashMap<String, String>>> {
        if keys.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.conn.clone();
        let mut pipe = ::redis::pipe();
        for key in keys {
            pipe.cmd("HGETALL").arg(key);
        }
        Ok(pipe.query_async(&mut conn).await?)
    }

    async fn hget_multi(&self, pairs: &[(String, String)]) -> StoreResult<Vec<Option<String>>> {
        if pairs.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.conn.clone();
        let mut pipe = ::redis::pipe();
        for (key, field) in pairs {
            pipe.cmd("HGET").arg(key).arg(field);
        }
        Ok(pipe.query_async(&mut conn).await?)
    }

    async fn zscore_multi(&self, pairs: &[(String, String)]) -> StoreResult<Vec<Option<f64>>> {
        if pairs.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.conn.clone();
        let mut pipe = ::redis::pipe();
        for (key, member) in pairs {
            pipe.cmd("ZSCORE").arg(key).arg(member);
        }
        Ok(pipe.query_async(&mut conn).await?)
    }
}
