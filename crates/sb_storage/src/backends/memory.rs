use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sb_core::{CacheKey, CacheRepository, Partition, Result};
use tokio::sync::RwLock;

use crate::{CacheEntry, InvalidationPolicy};

/// Volatile partition: entries disappear with the process.
#[derive(Debug, Clone)]
pub struct SessionCache {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    policy: InvalidationPolicy,
}

impl SessionCache {
    pub fn new(policy: InvalidationPolicy) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            policy,
        }
    }

    pub fn policy(&self) -> InvalidationPolicy {
        self.policy
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(InvalidationPolicy::Manual)
    }
}

#[async_trait]
impl CacheRepository for SessionCache {
    fn partition(&self) -> Partition {
        Partition::Session
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.is_fresh(self.policy, now) => {
                    return Ok(Some(entry.payload.clone()))
                }
                Some(_) => {}
            }
        }
        // Stale: drop it so the next read goes upstream.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| !e.is_fresh(self.policy, now)) {
            entries.remove(key);
            tracing::debug!("expired session entry {}", key);
        }
        Ok(None)
    }

    async fn put(&self, key: &CacheKey, payload: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.clone(), CacheEntry::new(payload));
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        let entries = self.entries.read().await;
        let mut keys: Vec<CacheKey> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
