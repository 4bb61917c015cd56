use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sb_core::{CacheKey, CacheRepository, Error, Result};

pub mod backends;

pub use backends::*;

/// When a cached entry stops being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationPolicy {
    /// Entries live until they are invalidated or the partition is cleared.
    #[default]
    Manual,
    /// Entries older than the duration are dropped on read.
    Ttl(Duration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: String,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(payload: String) -> Self {
        Self {
            payload,
            stored_at: Utc::now(),
        }
    }

    pub fn is_fresh(&self, policy: InvalidationPolicy, now: DateTime<Utc>) -> bool {
        match policy {
            InvalidationPolicy::Manual => true,
            InvalidationPolicy::Ttl(ttl) => match chrono::Duration::from_std(ttl) {
                Ok(ttl) => now.signed_duration_since(self.stored_at) < ttl,
                // A TTL too large for chrono never expires.
                Err(_) => true,
            },
        }
    }
}

/// Default on-disk location of the persistent partition.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sbx")
}

/// Builds a cache partition by backend name: `memory` or `file`.
pub async fn create_cache(
    backend: &str,
    path: Option<&Path>,
    policy: InvalidationPolicy,
) -> Result<Arc<dyn CacheRepository>> {
    match backend {
        "memory" => Ok(Arc::new(SessionCache::new(policy))),
        "file" => {
            let path = path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| default_cache_dir().join("persistent.json"));
            Ok(Arc::new(PersistentCache::open(path, policy).await?))
        }
        other => Err(Error::Storage(format!("Unknown cache backend: {}", other))),
    }
}

/// Returns the cached payload for `key`, or runs `fetch` and stores its
/// result. Nothing is stored when `fetch` fails.
pub async fn get_or_fetch<F, Fut>(cache: &dyn CacheRepository, key: &CacheKey, fetch: F) -> Result<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    if let Some(payload) = cache.get(key).await? {
        tracing::debug!("cache hit for {}", key);
        return Ok(payload);
    }
    tracing::debug!("cache miss for {}", key);
    let payload = fetch().await?;
    cache.put(key, payload.clone()).await?;
    Ok(payload)
}

/// Typed variant of [`get_or_fetch`]: the payload is kept as JSON text so a
/// later read sees exactly what was stored.
pub async fn get_or_fetch_json<T, F, Fut>(cache: &dyn CacheRepository, key: &CacheKey, fetch: F) -> Result<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let payload = get_or_fetch(cache, key, move || async move {
        let value = fetch().await?;
        Ok(serde_json::to_string(&value)?)
    })
    .await?;
    Ok(serde_json::from_str(&payload)?)
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_cache, get_or_fetch, get_or_fetch_json, InvalidationPolicy};
}
