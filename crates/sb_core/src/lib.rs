use scraper::Html;

pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use models::InferenceModel;
pub use storage::{CacheKey, CacheRepository, EntityKind, Partition};
pub use types::*;

/// Text content of an HTML fragment with entities decoded and whitespace
/// collapsed, the way article bodies are flattened before being sent to the
/// AI collaborator.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
