use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use scraper::{ElementRef, Html};
use sb_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::utils::{self, element_text, escape_html};
use super::Scraper;

/// Containers tried in order; the first one that yields paragraphs wins.
pub const CONTENT_SELECTORS: [&str; 8] = [
    "div.tsec",
    "div.sec",
    "div.article-content",
    "div.pmc-articlecontent",
    "div.article-body",
    "div.main-content",
    "article",
    "div.content",
];

const SKIPPED_ANCESTORS: [&str; 6] = ["script", "style", "nav", "header", "footer", "aside"];

/// Paragraphs this short are captions, bylines or navigation crumbs.
const MIN_PARAGRAPH_CHARS: usize = 30;

pub const NOT_EXTRACTED: &str =
    "<p>Article content could not be extracted. Please visit the original link.</p>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub content: String,
    pub tables: Vec<String>,
}

/// Fetches article pages (PMC and similar) and flattens their body text.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers
    }

    pub async fn fetch(&self, link: &str) -> Result<ExtractedPage> {
        utils::parse_url(link)?;
        let response = self
            .client
            .get(link)
            .headers(Self::headers())
            .send()
            .await
            .map_err(|e| Error::upstream("article", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream("article", format!("{} returned {}", link, status)));
        }
        let html = response.text().await.map_err(|e| Error::upstream("article", e))?;
        let page = extract_page(&html)?;
        tracing::debug!("extracted {} bytes from {}", page.content.len(), link);
        Ok(page)
    }
}

#[async_trait]
impl Scraper for PageFetcher {
    fn source(&self) -> &str {
        "Article page"
    }

    fn can_handle(&self, url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    async fn scrape_url(&self, url: &str) -> Result<Value> {
        Ok(serde_json::to_value(self.fetch(url).await?)?)
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["article", "pmc"]
    }
}

fn is_skipped(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| SKIPPED_ANCESTORS.contains(&a.value().name()))
}

fn paragraphs<'a>(scope: impl Iterator<Item = ElementRef<'a>>, out: &mut String) -> Result<()> {
    let p = utils::selector("p")?;
    for container in scope {
        for para in container.select(&p) {
            if is_skipped(&para) {
                continue;
            }
            let text = element_text(&para);
            if text.chars().count() > MIN_PARAGRAPH_CHARS {
                out.push_str("<p>");
                out.push_str(&escape_html(&text));
                out.push_str("</p>");
            }
        }
    }
    Ok(())
}

/// Body text as `<p>`-joined HTML plus the outer HTML of each table.
pub fn extract_page(html: &str) -> Result<ExtractedPage> {
    let document = Html::parse_document(html);
    let mut content = String::new();

    for selector in CONTENT_SELECTORS {
        let parsed = utils::selector(selector)?;
        let matches: Vec<ElementRef<'_>> = document.select(&parsed).filter(|el| !is_skipped(el)).collect();
        if matches.is_empty() {
            continue;
        }
        paragraphs(matches.into_iter(), &mut content)?;
        if !content.is_empty() {
            break;
        }
    }

    if content.is_empty() {
        paragraphs(std::iter::once(document.root_element()), &mut content)?;
    }
    if content.is_empty() {
        content = NOT_EXTRACTED.to_string();
    }

    let table = utils::selector("table")?;
    let tables = document
        .select(&table)
        .filter(|t| !is_skipped(t))
        .map(|t| t.html())
        .collect();

    Ok(ExtractedPage { content, tables })
}
