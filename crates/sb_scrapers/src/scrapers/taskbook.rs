use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use sb_core::{Error, Highlight, HighlightType, ResearchRecord, Result};
use serde_json::{json, Value};

use super::utils::{self, element_text};
use super::Scraper;
use crate::logging::Logger;

lazy_static! {
    static ref MONTH_YEAR: Regex = Regex::new(r"\((\w+\s+\d{4})\)").expect("valid regex");
    static ref ANY_YEAR: Regex = Regex::new(r"\d{4}").expect("valid regex");
}

pub const HIGHLIGHTS_PATH: &str = "/tbp/highlights.cfm";
pub const RESEARCH_PATH: &str = "/tbp/index.cfm?action=bib_search";

/// Scraper for the NASA Task Book highlights list and bibliography search.
#[derive(Debug, Clone)]
pub struct TaskBookScraper {
    client: reqwest::Client,
    base_url: String,
}

impl TaskBookScraper {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn highlights_url(&self) -> String {
        format!("{}{}", self.base_url, HIGHLIGHTS_PATH)
    }

    pub fn research_url(&self) -> String {
        format!("{}{}", self.base_url, RESEARCH_PATH)
    }

    fn logger(&self) -> Logger {
        Logger::new().with_prefix("[taskbook]".to_string())
    }

    pub async fn fetch_highlights(&self) -> Result<Vec<Highlight>> {
        let url = self.highlights_url();
        let html = utils::fetch_text(&self.client, "taskbook", &url).await?;
        let highlights = parse_highlights(&html, &url)?;
        self.logger().info(&format!("Scraped {} highlights", highlights.len()));
        Ok(highlights)
    }

    pub async fn fetch_research(&self) -> Result<Vec<ResearchRecord>> {
        let url = self.research_url();
        let html = utils::fetch_text(&self.client, "taskbook", &url).await?;
        let records = parse_research(&html)?;
        self.logger().info(&format!("Scraped {} research records", records.len()));
        Ok(records)
    }
}

#[async_trait]
impl Scraper for TaskBookScraper {
    fn source(&self) -> &str {
        "NASA Task Book"
    }

    fn can_handle(&self, url: &str) -> bool {
        url.starts_with(&self.base_url) && (url.contains("highlights.cfm") || url.contains("bib_search"))
    }

    async fn scrape_url(&self, url: &str) -> Result<Value> {
        let html = utils::fetch_text(&self.client, "taskbook", url).await?;
        if url.contains("highlights.cfm") {
            let highlights = parse_highlights(&html, url)?;
            self.logger().info(&format!("Scraped {} highlights", highlights.len()));
            Ok(json!({ "highlights": highlights }))
        } else if url.contains("bib_search") {
            let results = parse_research(&html)?;
            self.logger().info(&format!("Scraped {} research records", results.len()));
            Ok(json!({ "results": results }))
        } else {
            Err(Error::InvalidUrl(format!("Not a Task Book listing: {}", url)))
        }
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["taskbook", "highlights", "research"]
    }
}

/// First `(Month YYYY)` group of a title, else its first four-digit run.
pub fn extract_year(title: &str) -> String {
    if let Some(caps) = MONTH_YEAR.captures(title) {
        return caps[1].to_string();
    }
    ANY_YEAR
        .find(title)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn highlight_summary(year: &str, kind: HighlightType) -> String {
    let from = if year.is_empty() {
        String::new()
    } else {
        format!(" from {}", year)
    };
    let detail = match kind {
        HighlightType::Pdf => "PDF document available for download.",
        HighlightType::Link => "Click to view full details.",
    };
    format!(
        "NASA Space Biology and Physical Sciences research highlight{}. {}",
        from, detail
    )
}

/// Parses every `ul li` holding a titled anchor, in document order. Links
/// are resolved against `page_url`.
pub fn parse_highlights(html: &str, page_url: &str) -> Result<Vec<Highlight>> {
    let base = utils::parse_url(page_url)?;
    let document = Html::parse_document(html);
    let items = utils::selector("ul li")?;
    let anchor = utils::selector("a")?;

    let mut highlights = Vec::new();
    for item in document.select(&items) {
        let Some(a) = item.select(&anchor).next() else {
            continue;
        };
        let title = element_text(&a);
        let href = a.value().attr("href").map(str::trim).unwrap_or_default();
        if title.is_empty() || href.is_empty() {
            continue;
        }

        let link = match base.join(href) {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!("skipping highlight {:?} with bad link {}: {}", title, href, e);
                continue;
            }
        };
        let kind = if link.path().to_lowercase().ends_with(".pdf") {
            HighlightType::Pdf
        } else {
            HighlightType::Link
        };
        let year = extract_year(&title);

        highlights.push(Highlight {
            summary: highlight_summary(&year, kind),
            title,
            link: link.to_string(),
            year,
            kind,
        });
    }
    Ok(highlights)
}

/// Parses bibliography rows: title, author and year are cells 2 to 4.
pub fn parse_research(html: &str) -> Result<Vec<ResearchRecord>> {
    let document = Html::parse_document(html);
    let rows = utils::selector("table tbody tr")?;
    let cells = utils::selector("td")?;

    Ok(document
        .select(&rows)
        .filter_map(|row| {
            let texts: Vec<String> = row.select(&cells).map(|td| element_text(&td)).collect();
            let cell = |i: usize| texts.get(i).cloned().unwrap_or_default();
            let title = cell(1);
            (!title.is_empty()).then(|| ResearchRecord {
                title,
                author: cell(2),
                year: cell(3),
            })
        })
        .collect())
}
