use std::io::Read;
use std::path::Path;

use sb_core::{Article, Error, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Link")]
    link: String,
    #[serde(rename = "Author", default)]
    author: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(rename = "Abstract", default)]
    abstract_text: String,
}

/// The publication list, loaded once from CSV. Article ids are row indexes.
#[derive(Debug, Clone, Default)]
pub struct ArticleCatalog {
    articles: Vec<Article>,
}

impl ArticleCatalog {
    /// Loads the catalog; a missing file gives an empty catalog.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::File::open(path) {
            Ok(file) => {
                let catalog = Self::from_reader(file)?;
                tracing::info!("loaded {} articles from {}", catalog.len(), path.display());
                Ok(catalog)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("article catalog {} not found, serving no articles", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(reader);
        let mut articles = Vec::new();
        for (id, row) in csv.deserialize::<CatalogRow>().enumerate() {
            let row = row.map_err(|e| Error::Parse(format!("catalog row {}: {}", id + 1, e)))?;
            articles.push(Article {
                id,
                title: row.title,
                author: row.author,
                year: row.year,
                kind: row.kind,
                abstract_text: row.abstract_text,
                link: row.link,
            });
        }
        Ok(Self { articles })
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn get(&self, id: usize) -> Result<&Article> {
        self.articles
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("Article {} not found", id)))
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}
