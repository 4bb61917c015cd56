use serde::{Deserialize, Serialize};

use sb_core::{Article, Highlight, ResearchRecord, TaskBookProject};

use crate::search::{FuzzyMatcher, Searchable};

/// Items shown per page in list views.
pub const PAGE_SIZE: usize = 25;

/// Sentinel that disables a categorical filter.
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Year,
    Type,
    Program,
    Center,
}

/// Records that expose categorical facets. A record without a facet returns
/// `None` and never passes a concrete selection on it.
pub trait Categorized {
    fn facet(&self, facet: Facet) -> Option<&str>;
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

impl Categorized for Article {
    fn facet(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::Year => non_empty(&self.year),
            Facet::Type => non_empty(&self.kind),
            _ => None,
        }
    }
}

impl Categorized for ResearchRecord {
    fn facet(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::Year => non_empty(&self.year),
            _ => None,
        }
    }
}

impl Categorized for TaskBookProject {
    fn facet(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::Year => non_empty(&self.year),
            Facet::Type => non_empty(&self.kind),
            Facet::Program => non_empty(&self.program),
            Facet::Center => non_empty(&self.center),
        }
    }
}

impl Categorized for Highlight {
    fn facet(&self, facet: Facet) -> Option<&str> {
        match facet {
            Facet::Year => non_empty(&self.year),
            Facet::Type => Some(match self.kind {
                sb_core::HighlightType::Pdf => "PDF",
                sb_core::HighlightType::Link => "Link",
            }),
            _ => None,
        }
    }
}

/// One categorical filter value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Selection {
    #[default]
    All,
    Exact(String),
}

impl Selection {
    /// `all`, an empty string or `None` disable the filter.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Selection::All,
            Some(v) if v.eq_ignore_ascii_case(ALL) => Selection::All,
            Some(v) => Selection::Exact(v.to_string()),
        }
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Exact(wanted) => value == Some(wanted.as_str()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

impl From<Option<String>> for Selection {
    fn from(value: Option<String>) -> Self {
        Selection::parse(value.as_deref())
    }
}

impl From<Selection> for Option<String> {
    fn from(value: Selection) -> Self {
        match value {
            Selection::All => None,
            Selection::Exact(v) => Some(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub year: Selection,
    #[serde(default, rename = "type")]
    pub kind: Selection,
    #[serde(default)]
    pub program: Selection,
    #[serde(default)]
    pub center: Selection,
}

impl Filters {
    fn selections(&self) -> [(Facet, &Selection); 4] {
        [
            (Facet::Year, &self.year),
            (Facet::Type, &self.kind),
            (Facet::Program, &self.program),
            (Facet::Center, &self.center),
        ]
    }

    pub fn matches<T: Categorized + ?Sized>(&self, record: &T) -> bool {
        self.selections()
            .iter()
            .all(|(facet, selection)| selection.matches(record.facet(*facet)))
    }

    pub fn is_empty(&self) -> bool {
        self.selections().iter().all(|(_, s)| s.is_all())
    }
}

/// Text query plus categorical filters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(default, rename = "q")]
    pub text: String,
    #[serde(flatten)]
    pub filters: Filters,
}

impl Query {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: Filters::default(),
        }
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }
}

/// Text match first (relevance order when the query is non-empty), then the
/// categorical filters as a conjunction.
pub fn apply<'a, T>(items: &'a [T], query: &Query, matcher: &FuzzyMatcher) -> Vec<&'a T>
where
    T: Searchable + Categorized,
{
    matcher
        .search(items, &query.text)
        .into_iter()
        .filter(|item| query.filters.matches(*item))
        .collect()
}

/// Distinct facet values in first-seen order, for populating filter choices.
pub fn facet_values<T: Categorized>(items: &[T], facet: Facet) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in items.iter().filter_map(|item| item.facet(facet)) {
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    values
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slices `items` into 1-based pages of [`PAGE_SIZE`]. Page numbers past the
/// end are clamped to the last page; page 0 is treated as page 1.
pub fn paginate<T: Clone>(items: &[T], page: usize) -> Page<T> {
    let total_items = items.len();
    let total_pages = total_items.div_ceil(PAGE_SIZE).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(total_items);
    Page {
        items: items[start..end].to_vec(),
        page,
        total_pages,
        total_items,
    }
}
