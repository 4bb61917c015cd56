use async_trait::async_trait;
use sb_core::{Error, Result};
use serde_json::Value;

pub mod catalog;
pub mod osdr;
pub mod pmc;
pub mod taskbook;

pub use catalog::ArticleCatalog;
pub use osdr::OsdrClient;
pub use pmc::PageFetcher;
pub use taskbook::TaskBookScraper;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the name of the upstream source
    fn source(&self) -> &str;

    /// Returns true if this scraper can handle the given URL
    fn can_handle(&self, url: &str) -> bool;

    /// Fetches the given URL and normalizes it into JSON records
    async fn scrape_url(&self, url: &str) -> Result<Value>;

    /// Returns a list of CLI shorthand names for this scraper
    fn cli_names(&self) -> Vec<&str> {
        vec![]
    }
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use super::*;
    use scraper::{ElementRef, Html, Selector};
    use url::Url;

    /// Browser-like headers; some NASA hosts reject the default client.
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

    pub fn parse_url(url: &str) -> Result<Url> {
        Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))
    }

    pub fn selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector).map_err(|e| Error::Parse(format!("Invalid selector {}: {:?}", selector, e)))
    }

    /// Whitespace-collapsed text of an element.
    pub fn element_text(el: &ElementRef<'_>) -> String {
        el.text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[allow(dead_code)]
    pub fn extract_text(document: &Html, selector: &str) -> Result<String> {
        let parsed = self::selector(selector)?;
        document
            .select(&parsed)
            .next()
            .map(|el| element_text(&el))
            .ok_or_else(|| Error::Parse(format!("No element found for selector: {}", selector)))
    }

    pub fn extract_texts(document: &Html, selector: &str) -> Result<Vec<String>> {
        let parsed = self::selector(selector)?;
        Ok(document.select(&parsed).map(|el| element_text(&el)).collect())
    }

    pub fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    }

    /// GETs `url` and returns the body, mapping transport errors and
    /// non-2xx statuses to `Error::Upstream` tagged with `source`.
    pub async fn fetch_text(client: &reqwest::Client, source: &str, url: &str) -> Result<String> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::upstream(source, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(source, format!("{} returned {}", url, status)));
        }
        response.text().await.map_err(|e| Error::upstream(source, e))
    }
}

#[cfg(test)]
mod tests {
    use super::utils;
    use scraper::Html;

    #[test]
    fn test_parse_url() {
        assert!(utils::parse_url("https://taskbook.nasaprs.com").is_ok());
        assert!(utils::parse_url("invalid-url").is_err());
    }

    #[test]
    fn test_extract_text() {
        let html = r#"
            <div class="title">  Rodent   Research </div>
            <div class="content">Habitat</div>
        "#;
        let document = Html::parse_document(html);

        assert_eq!(utils::extract_text(&document, ".title").unwrap(), "Rodent Research");
        assert!(utils::extract_text(&document, ".invalid").is_err());
        assert!(utils::extract_text(&document, "[[").is_err());
    }

    #[test]
    fn test_extract_texts() {
        let html = r#"
            <div class="item">Item 1</div>
            <div class="item">Item 2</div>
        "#;
        let document = Html::parse_document(html);

        let texts = utils::extract_texts(&document, ".item").unwrap();
        assert_eq!(texts, vec!["Item 1", "Item 2"]);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(utils::escape_html("a < b & c"), "a &lt; b &amp; c");
    }

    #[tokio::test]
    async fn test_fetch_text_maps_status() {
        let mut server = mockito::Server::new_async().await;
        let ok = server.mock("GET", "/ok").with_body("fine").create_async().await;
        let down = server.mock("GET", "/down").with_status(503).create_async().await;
        let client = reqwest::Client::new();

        let body = utils::fetch_text(&client, "test", &format!("{}/ok", server.url())).await.unwrap();
        assert_eq!(body, "fine");

        let err = utils::fetch_text(&client, "test", &format!("{}/down", server.url()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), sb_core::ErrorKind::UpstreamFetchFailed);
        ok.assert_async().await;
        down.assert_async().await;
    }
}
