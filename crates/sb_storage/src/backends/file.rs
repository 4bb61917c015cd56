use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sb_core::{CacheKey, CacheRepository, Error, Partition, Result};
use tokio::sync::RwLock;

use crate::{CacheEntry, InvalidationPolicy};

/// Partition that survives restarts. The whole partition is one JSON object
/// (`{"kind:id": {"payload": ..., "stored_at": ...}}`) rewritten on change.
#[derive(Debug, Clone)]
pub struct PersistentCache {
    path: PathBuf,
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    policy: InvalidationPolicy,
}

impl PersistentCache {
    pub async fn open(path: impl Into<PathBuf>, policy: InvalidationPolicy) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => HashMap::new(),
            Ok(raw) => Self::decode(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("opened persistent cache {} with {} entries", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
            policy,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(raw: &str) -> Result<HashMap<CacheKey, CacheEntry>> {
        let stored: BTreeMap<String, CacheEntry> = serde_json::from_str(raw)?;
        let mut entries = HashMap::with_capacity(stored.len());
        for (key, entry) in stored {
            match key.parse::<CacheKey>() {
                Ok(key) => {
                    entries.insert(key, entry);
                }
                Err(e) => tracing::warn!("skipping cache entry {}: {}", key, e),
            }
        }
        Ok(entries)
    }

    async fn persist(&self, entries: &HashMap<CacheKey, CacheEntry>) -> Result<()> {
        let stored: BTreeMap<String, &CacheEntry> =
            entries.iter().map(|(k, v)| (k.to_string(), v)).collect();
        let raw = serde_json::to_string_pretty(&stored)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl CacheRepository for PersistentCache {
    fn partition(&self) -> Partition {
        Partition::Persistent
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
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| !e.is_fresh(self.policy, now)) {
            let mut next = entries.clone();
            next.remove(key);
            self.persist(&next).await?;
            *entries = next;
            tracing::debug!("expired persistent entry {}", key);
        }
        Ok(None)
    }

    async fn put(&self, key: &CacheKey, payload: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        next.insert(key.clone(), CacheEntry::new(payload));
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            return Ok(false);
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next).await?;
        *entries = next;
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        self.persist(&HashMap::new()).await?;
        entries.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>> {
        let entries = self.entries.read().await;
        let mut keys: Vec<CacheKey> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::EntityKind;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("analysis.json");
        let key = CacheKey::new(EntityKind::Analysis, "12");
        let payload = r#"{"summary":"Bone loss in microgravity","keywords":["bone"]}"#;

        {
            let cache = PersistentCache::open(&path, InvalidationPolicy::Manual).await.unwrap();
            cache.put(&key, payload.to_string()).await.unwrap();
        }

        let reopened = PersistentCache::open(&path, InvalidationPolicy::Manual).await.unwrap();
        assert_eq!(reopened.get(&key).await.unwrap().as_deref(), Some(payload));
        assert_eq!(reopened.keys().await.unwrap(), vec![key]);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = PersistentCache::open(&path, InvalidationPolicy::Manual).await.unwrap();
        let first = CacheKey::new(EntityKind::Analysis, "1");
        let second = CacheKey::new(EntityKind::Analysis, "2");
        cache.put(&first, "a".to_string()).await.unwrap();
        cache.put(&second, "b".to_string()).await.unwrap();

        assert!(cache.invalidate(&first).await.unwrap());
        let reopened = PersistentCache::open(&path, InvalidationPolicy::Manual).await.unwrap();
        assert_eq!(reopened.keys().await.unwrap(), vec![second.clone()]);

        cache.clear().await.unwrap();
        let reopened = PersistentCache::open(&path, InvalidationPolicy::Manual).await.unwrap();
        assert!(reopened.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_entries_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = PersistentCache::open(&path, InvalidationPolicy::Manual).await.unwrap();
        let kept = CacheKey::new(EntityKind::Analysis, "1");
        cache.put(&kept, "a".to_string()).await.unwrap();

        // a directory where the temp file goes makes every write fail
        tokio::fs::create_dir(dir.path().join("cache.json.tmp")).await.unwrap();

        let lost = CacheKey::new(EntityKind::Analysis, "2");
        assert!(cache.put(&lost, "b".to_string()).await.is_err());
        assert_eq!(cache.get(&lost).await.unwrap(), None);
        assert!(cache.invalidate(&kept).await.is_err());
        assert!(cache.clear().await.is_err());
        assert_eq!(cache.get(&kept).await.unwrap().as_deref(), Some("a"));
        assert_eq!(cache.keys().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = PersistentCache::open(&path, InvalidationPolicy::Manual).await.unwrap_err();
        assert_eq!(err.kind(), sb_core::ErrorKind::ParseFailed);
    }

    #[tokio::test]
    async fn test_unknown_keys_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let raw = r#"{
            "analysis:4": {"payload": "kept", "stored_at": "2024-01-01T00:00:00Z"},
            "widget:9": {"payload": "dropped", "stored_at": "2024-01-01T00:00:00Z"}
        }"#;
        tokio::fs::write(&path, raw).await.unwrap();

        let cache = PersistentCache::open(&path, InvalidationPolicy::Manual).await.unwrap();
        let key = CacheKey::new(EntityKind::Analysis, "4");
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("kept"));
        assert_eq!(cache.keys().await.unwrap().len(), 1);
    }
}
