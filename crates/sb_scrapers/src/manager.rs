use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sb_core::{
    Article, ArticleContent, CacheKey, CacheRepository, EntityKind, Error, Highlight, ResearchRecord, Result,
};
use sb_storage::get_or_fetch_json;
use serde_json::Value;

use crate::scrapers::osdr::DEFAULT_OSDR_BASE;
use crate::scrapers::utils::USER_AGENT;
use crate::scrapers::{ArticleCatalog, OsdrClient, PageFetcher, Scraper, TaskBookScraper};

pub const DEFAULT_TASKBOOK_BASE: &str = "https://taskbook.nasaprs.com";
pub const DEFAULT_CATALOG_PATH: &str = "SB_publication_PMC.csv";

/// Where the upstream sources live.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub taskbook_base: String,
    pub osdr_base: String,
    pub catalog_path: PathBuf,
    pub timeout: Duration,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            taskbook_base: DEFAULT_TASKBOOK_BASE.to_string(),
            osdr_base: DEFAULT_OSDR_BASE.to_string(),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Owns the shared HTTP client, every scraper, the article catalog and the
/// article-content cache.
pub struct SourceManager {
    config: SourcesConfig,
    taskbook: Arc<TaskBookScraper>,
    pages: Arc<PageFetcher>,
    osdr: OsdrClient,
    catalog: ArticleCatalog,
    scrapers: Vec<Arc<dyn Scraper>>,
    content_cache: Arc<dyn CacheRepository>,
}

impl SourceManager {
    pub fn new(config: SourcesConfig, content_cache: Arc<dyn CacheRepository>) -> Result<Self> {
        let catalog = ArticleCatalog::load(&config.catalog_path)?;
        Self::with_catalog(config, catalog, content_cache)
    }

    pub fn with_catalog(
        config: SourcesConfig,
        catalog: ArticleCatalog,
        content_cache: Arc<dyn CacheRepository>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        let taskbook = Arc::new(TaskBookScraper::new(client.clone(), config.taskbook_base.clone()));
        let pages = Arc::new(PageFetcher::new(client.clone()));
        let osdr = OsdrClient::new(client, &config.osdr_base)?;
        // most specific first; the page fetcher accepts any http(s) URL
        let scrapers: Vec<Arc<dyn Scraper>> = vec![taskbook.clone(), pages.clone()];

        Ok(Self {
            config,
            taskbook,
            pages,
            osdr,
            catalog,
            scrapers,
            content_cache,
        })
    }

    pub fn config(&self) -> &SourcesConfig {
        &self.config
    }

    pub fn scrapers(&self) -> &[Arc<dyn Scraper>] {
        &self.scrapers
    }

    pub fn get_scraper_for_url(&self, url: &str) -> Result<Arc<dyn Scraper>> {
        self.scrapers
            .iter()
            .find(|s| s.can_handle(url))
            .cloned()
            .ok_or_else(|| Error::InvalidUrl(format!("No scraper found for URL: {}", url)))
    }

    pub async fn scrape_url(&self, url: &str) -> Result<Value> {
        let scraper = self.get_scraper_for_url(url)?;
        tracing::info!("scraping {} with {}", url, scraper.source());
        scraper.scrape_url(url).await
    }

    pub async fn highlights(&self) -> Result<Vec<Highlight>> {
        self.taskbook.fetch_highlights().await
    }

    pub async fn research(&self) -> Result<Vec<ResearchRecord>> {
        self.taskbook.fetch_research().await
    }

    pub fn taskbook(&self) -> &TaskBookScraper {
        &self.taskbook
    }

    pub fn osdr(&self) -> &OsdrClient {
        &self.osdr
    }

    pub fn articles(&self) -> &[Article] {
        self.catalog.articles()
    }

    pub fn article(&self, id: usize) -> Result<&Article> {
        self.catalog.get(id)
    }

    /// Extracted article body. Served from the content cache after the first
    /// successful fetch.
    pub async fn article_content(&self, id: usize) -> Result<ArticleContent> {
        let article = self.catalog.get(id)?;
        let key = CacheKey::new(EntityKind::ArticleContent, id.to_string());
        let pages = &self.pages;
        get_or_fetch_json(self.content_cache.as_ref(), &key, move || async move {
            tracing::info!("fetching article {}: {}", id, article.title);
            let page = pages.fetch(&article.link).await?;
            Ok(ArticleContent {
                id,
                title: article.title.clone(),
                link: article.link.clone(),
                content: page.content,
                tables: page.tables,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_storage::{InvalidationPolicy, SessionCache};

    fn manager(server_url: &str, catalog_csv: &str) -> SourceManager {
        let config = SourcesConfig {
            taskbook_base: server_url.to_string(),
            osdr_base: server_url.to_string(),
            ..SourcesConfig::default()
        };
        let catalog = ArticleCatalog::from_reader(catalog_csv.as_bytes()).unwrap();
        SourceManager::with_catalog(config, catalog, Arc::new(SessionCache::new(InvalidationPolicy::Manual)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_article_content_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/pmc/1/")
            .with_body("<article><p>Spaceflight altered gene expression in mouse liver tissue.</p></article>")
            .expect(1)
            .create_async()
            .await;
        let csv = format!("Title,Link\nLiver study,{}/pmc/1/\n", server.url());
        let manager = manager(&server.url(), &csv);

        let first = manager.article_content(0).await.unwrap();
        let second = manager.article_content(0).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.title, "Liver study");
        assert!(first.content.starts_with("<p>Spaceflight"));
        page.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_article_is_not_found() {
        let manager = manager("http://127.0.0.1:9", "Title,Link\n");
        let err = manager.article_content(3).await.unwrap_err();
        assert_eq!(err.kind(), sb_core::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_scraper_routing() {
        let manager = manager("https://taskbook.nasaprs.com", "Title,Link\n");
        let taskbook = manager
            .get_scraper_for_url("https://taskbook.nasaprs.com/tbp/highlights.cfm")
            .unwrap();
        assert_eq!(taskbook.source(), "NASA Task Book");
        let page = manager
            .get_scraper_for_url("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC1/")
            .unwrap();
        assert_eq!(page.source(), "Article page");
        assert!(manager.get_scraper_for_url("ftp://example.org").is_err());
    }
}
