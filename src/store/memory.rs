use ::std::collections::HashMap;
use ::std::sync::Mutex;
use ::std::time::{Duration, Instant};

use super::{Store, StoreResult};

/// In-process store used by the test suite and the seed binary's default
/// mode. Implements the same per-key semantics as the Redis provider,
/// including lazy key expiry; multi-key batched reads degrade to a loop
/// under the single lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
    zsets: HashMap<String, HashMap<String, f64>>,
    expires: HashMap<String, Instant>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl Inner {
    /// Drop the key everywhere if its expiry has passed.
    fn purge_expired(&mut self, key: &str) {
        if let Some(deadline) = self.expires.get(key) {
            if Instant::now() >= *deadline {
                self.expires.remove(key);
                self.strings.remove(key);
                self.hashes.remove(key);
                self.zsets.remove(key);
            }
        }
    }

    fn remove(&mut self, key: &str) {
        self.expires.remove(key);
        self.strings.remove(key);
        self.hashes.remove(key);
        self.zsets.remove(key);
    }

    fn sorted_members(zset: &HashMap<String, f64>) -> Vec<(String, f64)> {
        let mut members: Vec<(String, f64)> =
            zset.iter().map(|(m, s)| (m.clone(), *s)).collect();
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        members
    }
}

fn lock(store: &MemoryStore) -> ::std::sync::MutexGuard<'_, Inner> {
    store.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Inclusive index range with negative-from-the-end semantics.
fn index_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start >= len || stop < 0 || start > stop {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut inner = lock(self);
        inner.purge_expired(key);
        Ok(inner.strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut inner = lock(self);
        inner.expires.remove(key);
        inner.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn setex(&self, key: &str, ttl_secs: i64, value: &str) -> StoreResult<()> {
        let mut inner = lock(self);
        inner.strings.insert(key.to_string(), value.to_string());
        inner.expires.insert(
            key.to_string(),
            Instant::now() + Duration::from_secs(ttl_secs.max(0) as u64),
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        lock(self).remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut inner = lock(self);
        inner.purge_expired(key);
        Ok(inner.strings.contains_key(key)
            || inner.hashes.contains_key(key)
            || inner.zsets.contains_key(key))
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut inner = lock(self);
        inner.purge_expired(key);
        let current: i64 = inner
            .strings
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let next = current + 1;
        inner.strings.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        let mut inner = lock(self);
        inner.purge_expired(key);
        let present = inner.strings.contains_key(key)
            || inner.hashes.contains_key(key)
            || inner.zsets.contains_key(key);
        if !present {
            return Ok(-2);
        }
        match inner.expires.get(key) {
            Some(deadline) => {
                Ok(deadline.saturating_duration_since(Instant::now()).as_secs() as i64)
            }
            None => Ok(-1),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut inner = lock(self);
        inner.purge_expired(key);
        Ok(inner.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut inner = lock(self);
        inner.purge_expired(key);
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hset(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
        let mut inner = lock(self);
        let hash = inner.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.to_string(), value.clone());
        }
        Ok(())
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let mut inner = lock(self);
        let hash = inner.hashes.entry(key.to_string()).or_default();
        let current: i64 = hash.get(field).and_then(|v| v.parse().ok()).unwrap_or(0);
        let next = current + delta;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<bool> {
        let mut inner = lock(self);
        let zset = inner.zsets.entry(key.to_string()).or_default();
        Ok(zset.insert(member.to_string(), score).is_none())
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut inner = lock(self);
        Ok(inner
            .zsets
            .get_mut(key)
            .map(|z| z.remove(member).is_some())
            .unwrap_or(false))
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let inner = lock(self);
        Ok(inner.zsets.get(key).and_then(|z| z.get(member)).copied())
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        let inner = lock(self);
        Ok(inner.zsets.get(key).map(|z| z.len() as u64).unwrap_or(0))
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let inner = lock(self);
        let Some(zset) = inner.zsets.get(key) else {
            return Ok(vec![]);
        };
        let ordered = Inner::sorted_members(zset);
        let Some((from, to)) = index_range(ordered.len(), start, stop) else {
            return Ok(vec![]);
        };
        Ok(ordered[from..=to].iter().map(|(m, _)| m.clone()).collect())
    }

    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let inner = lock(self);
        let Some(zset) = inner.zsets.get(key) else {
            return Ok(vec![]);
        };
        let mut ordered = Inner::sorted_members(zset);
        ordered.reverse();
        let Some((from, to)) = index_range(ordered.len(), start, stop) else {
            return Ok(vec![]);
        };
        Ok(ordered[from..=to].iter().map(|(m, _)| m.clone()).collect())
    }

    async fn hgetall_multi(&self, keys: &[String]) -> StoreResult<Vec<HashMap<String, String>>> {
        let mut inner = lock(self);
        let mut result = Vec::with_capacity(keys.len());
        for key in keys {
            inner.purge_expired(key);
            result.push(inner.hashes.get(key).cloned().unwrap_or_default());
        }
        Ok(result)
    }

    async fn hget_multi(&self, pairs: &[(String, String)]) -> StoreResult<Vec<Option<String>>> {
        let inner = lock(self);
        Ok(pairs
            .iter()
            .map(|(key, field)| inner.hashes.get(key).and_then(|h| h.get(field)).cloned())
            .collect())
    }

    async fn zscore_multi(&self, pairs: &[(String, String)]) -> StoreResult<Vec<Option<f64>>> {
        let inner = lock(self);
        Ok(pairs
            .iter()
            .map(|(key, member)| inner.zsets.get(key).and_then(|z| z.get(member)).copied())
            .collect())
    }
}
