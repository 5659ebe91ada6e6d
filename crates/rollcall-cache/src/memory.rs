//! In-process ephemeral store

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{CacheError, CacheResult};
use crate::store::EphemeralStore;

enum Value {
    Set(HashSet<String>),
    Text(String),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

/// In-memory store with the same semantics as the Redis backend.
///
/// All keys live behind one mutex; entries expire lazily on access.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned map only means a panic mid-insert; the data is still
        // usable for an ephemeral cache.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str) {
        if let Some(entry) = entries.get(key) {
            if let Some(expires_at) = entry.expires_at {
                if Instant::now() >= expires_at {
                    entries.remove(key);
                }
            }
        }
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn sadd(&self, key: &str, member: &str) -> CacheResult<()> {
        let mut entries = self.lock();
        Self::purge_expired(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Set(HashSet::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Set(set) => {
                set.insert(member.to_string());
                Ok(())
            }
            Value::Text(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn scard(&self, key: &str) -> CacheResult<usize> {
        let mut entries = self.lock();
        Self::purge_expired(&mut entries, key);
        match entries.get(key).map(|e| &e.value) {
            Some(Value::Set(set)) => Ok(set.len()),
            Some(Value::Text(_)) => Err(CacheError::WrongType(key.to_string())),
            None => Ok(0),
        }
    }

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut entries = self.lock();
        Self::purge_expired(&mut entries, key);
        match entries.get(key).map(|e| &e.value) {
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(Value::Text(_)) => Err(CacheError::WrongType(key.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn incr(&self, key: &str) -> CacheResult<i64> {
        let mut entries = self.lock();
        Self::purge_expired(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Text("0".to_string()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Text(text) => {
                let current: i64 = text.parse().unwrap_or(0);
                let next = current + 1;
                *text = next.to_string();
                Ok(next)
            }
            Value::Set(_) => Err(CacheError::WrongType(key.to_string())),
        }
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut entries = self.lock();
        Self::purge_expired(&mut entries, key);
        match entries.get(key).map(|e| &e.value) {
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(Value::Set(_)) => Err(CacheError::WrongType(key.to_string())),
            None => Ok(None),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sadd_deduplicates() {
        let store = MemoryStore::new();
        store.sadd("k", "a").await.unwrap();
        store.sadd("k", "a").await.unwrap();
        store.sadd("k", "b").await.unwrap();
        assert_eq!(store.scard("k").await.unwrap(), 2);

        let mut members = store.smembers("k").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_incr_counts_from_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("count").await.unwrap(), 1);
        assert_eq!(store.incr("count").await.unwrap(), 2);
        assert_eq!(store.get("count").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_missing_keys_read_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.scard("missing").await.unwrap(), 0);
        assert!(store.smembers("missing").await.unwrap().is_empty());
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_evicts_after_ttl() {
        let store = MemoryStore::new();
        store.sadd("k", "a").await.unwrap();
        store.expire("k", Duration::from_secs(5)).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(store.scard("k").await.unwrap(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.scard("k").await.unwrap(), 0);
        assert!(store.smembers("k").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_reapply_extends_ttl() {
        let store = MemoryStore::new();
        store.sadd("k", "a").await.unwrap();
        store.expire("k", Duration::from_secs(5)).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        store.expire("k", Duration::from_secs(5)).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(store.scard("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_wrong_type_rejected() {
        let store = MemoryStore::new();
        store.incr("count").await.unwrap();
        assert!(matches!(
            store.sadd("count", "a").await,
            Err(CacheError::WrongType(_))
        ));
        store.sadd("set", "a").await.unwrap();
        assert!(matches!(
            store.incr("set").await,
            Err(CacheError::WrongType(_))
        ));
    }
}
