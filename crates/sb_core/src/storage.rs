use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The kind of entity a cached payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    ArticleList,
    ArticleContent,
    DatasetList,
    Dataset,
    Highlights,
    Research,
    Analysis,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::ArticleList => "article-list",
            EntityKind::ArticleContent => "article-content",
            EntityKind::DatasetList => "dataset-list",
            EntityKind::Dataset => "dataset",
            EntityKind::Highlights => "highlights",
            EntityKind::Research => "research",
            EntityKind::Analysis => "analysis",
        }
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "article-list" => Ok(EntityKind::ArticleList),
            "article-content" => Ok(EntityKind::ArticleContent),
            "dataset-list" => Ok(EntityKind::DatasetList),
            "dataset" => Ok(EntityKind::Dataset),
            "highlights" => Ok(EntityKind::Highlights),
            "research" => Ok(EntityKind::Research),
            "analysis" => Ok(EntityKind::Analysis),
            other => Err(Error::Parse(format!("unknown entity kind: {}", other))),
        }
    }
}

/// Cache key: entity kind plus entity id, rendered as `kind:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub entity: EntityKind,
    pub id: String,
}

impl CacheKey {
    pub fn new(entity: EntityKind, id: impl Into<String>) -> Self {
        Self {
            entity,
            id: id.into(),
        }
    }

    /// Key for collection-level payloads that have no id of their own.
    pub fn all(entity: EntityKind) -> Self {
        Self::new(entity, "all")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity.as_str(), self.id)
    }
}

impl FromStr for CacheKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (entity, id) = s
            .split_once(':')
            .ok_or_else(|| Error::Parse(format!("cache key without ':' separator: {}", s)))?;
        Ok(Self::new(entity.parse()?, id))
    }
}

/// Which lifetime a cache partition has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Lives as long as the process.
    Session,
    /// Survives restarts.
    Persistent,
}

#[async_trait]
pub trait CacheRepository: Send + Sync {
    fn partition(&self) -> Partition;

    /// Returns the stored payload if present and still fresh
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;

    /// Stores a payload verbatim, replacing any previous entry
    async fn put(&self, key: &CacheKey, payload: String) -> Result<()>;

    /// Removes one entry, returning whether it existed
    async fn invalidate(&self, key: &CacheKey) -> Result<bool>;

    /// Removes every entry of the partition
    async fn clear(&self) -> Result<()>;

    async fn keys(&self) -> Result<Vec<CacheKey>>;
}
