use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// A publication from the space-biology catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: usize,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub year: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    pub link: String,
}

/// Extracted body of an article, as served by `GET /articles/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleContent {
    pub id: usize,
    pub title: String,
    pub link: String,
    pub content: String,
    #[serde(default)]
    pub tables: Vec<String>,
}

/// Reference to a nested upstream resource (assay, file, sample).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "REST_URL", default, skip_serializing_if = "Option::is_none")]
    pub rest_url: Option<String>,
    #[serde(rename = "URL", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ResourceRef {
    /// The URL a client should follow, REST endpoints first.
    pub fn href(&self) -> Option<&str> {
        self.rest_url.as_deref().or(self.url.as_deref())
    }
}

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub accession: String,
    pub title: String,
    pub description: String,
    pub organism: String,
    pub material: String,
    pub factor: String,
    pub funding: String,
    pub publication: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assays: BTreeMap<String, ResourceRef>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, ResourceRef>,
}

impl Dataset {
    /// Builds a dataset from the body stored under its accession in an
    /// upstream detail response (`{"metadata": {...}, "assays": {...}}`).
    pub fn from_upstream(accession: &str, body: &Value) -> Result<Self> {
        let object = body
            .as_object()
            .ok_or_else(|| Error::Parse(format!("dataset {} is not an object", accession)))?;

        let metadata: BTreeMap<String, Value> = match object.get("metadata") {
            Some(Value::Object(map)) => map.clone().into_iter().collect(),
            Some(Value::Null) | None => BTreeMap::new(),
            Some(_) => {
                return Err(Error::Parse(format!(
                    "dataset {} has a non-object metadata field",
                    accession
                )))
            }
        };

        let field = |name: &str, default: &str| -> String {
            match metadata.get(name) {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Array(items)) if !items.is_empty() => items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect::<Vec<_>>()
                    .join(", "),
                Some(Value::Number(n)) => n.to_string(),
                _ => default.to_string(),
            }
        };

        Ok(Self {
            accession: accession.to_string(),
            title: field("study title", accession),
            description: field("study description", "No description available"),
            organism: field("organism", NOT_AVAILABLE),
            material: field("material type", NOT_AVAILABLE),
            factor: field("study factor name", NOT_AVAILABLE),
            funding: field("study funding agency", NOT_AVAILABLE),
            publication: field("study publication title", NOT_AVAILABLE),
            assays: resource_map(object.get("assays"))?,
            files: resource_map(object.get("files"))?,
            metadata,
        })
    }

    /// Record used in bulk listings when a detail body cannot be read.
    pub fn placeholder(accession: &str) -> Self {
        Self {
            accession: accession.to_string(),
            title: accession.to_string(),
            description: "Error loading details".to_string(),
            organism: NOT_AVAILABLE.to_string(),
            material: NOT_AVAILABLE.to_string(),
            factor: NOT_AVAILABLE.to_string(),
            funding: NOT_AVAILABLE.to_string(),
            publication: NOT_AVAILABLE.to_string(),
            metadata: BTreeMap::new(),
            assays: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    /// Drops the nested maps, leaving the listing summary.
    pub fn summary(mut self) -> Self {
        self.metadata.clear();
        self.assays.clear();
        self.files.clear();
        self
    }
}

/// Parses a `{name: {REST_URL: ...}}` map; absent or null means empty.
pub fn resource_map(value: Option<&Value>) -> Result<BTreeMap<String, ResourceRef>> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, v)| {
                let reference = match v {
                    Value::String(url) => ResourceRef {
                        url: Some(url.clone()),
                        ..ResourceRef::default()
                    },
                    other => serde_json::from_value(other.clone())?,
                };
                Ok((name.clone(), reference))
            })
            .collect(),
        Some(other) => Err(Error::Parse(format!("expected a resource map, got {}", other))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HighlightType {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "Link")]
    Link,
}

impl fmt::Display for HighlightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighlightType::Pdf => write!(f, "PDF"),
            HighlightType::Link => write!(f, "Link"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub title: String,
    pub summary: String,
    pub link: String,
    pub year: String,
    #[serde(rename = "type")]
    pub kind: HighlightType,
}

/// A row from the Task Book bibliography search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRecord {
    pub title: String,
    pub author: String,
    pub year: String,
}

/// A Task Book project entry with the facets the search form filters on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBookProject {
    pub id: u32,
    pub title: String,
    pub investigator: String,
    pub center: String,
    pub year: String,
    pub program: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub section: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Donut,
    /// Horizontal bars.
    #[default]
    Bar,
    /// Vertical bars.
    Column,
    Line,
    Area,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Pie,
        ChartKind::Donut,
        ChartKind::Bar,
        ChartKind::Column,
        ChartKind::Line,
        ChartKind::Area,
    ];
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Pie => "pie",
            ChartKind::Donut => "donut",
            ChartKind::Bar => "bar",
            ChartKind::Column => "column",
            ChartKind::Line => "line",
            ChartKind::Area => "area",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ChartKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pie" => Ok(ChartKind::Pie),
            "donut" | "doughnut" => Ok(ChartKind::Donut),
            "bar" | "hbar" | "horizontal" => Ok(ChartKind::Bar),
            "column" | "vbar" | "vertical" => Ok(ChartKind::Column),
            "line" => Ok(ChartKind::Line),
            "area" => Ok(ChartKind::Area),
            other => Err(Error::Parse(format!("unknown chart kind: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDatum {
    pub label: String,
    pub value: f64,
}

impl ChartDatum {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartSeries {
    #[serde(rename = "chartType", default)]
    pub chart_type: ChartKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub data: Vec<ChartDatum>,
}

impl ChartSeries {
    pub fn new(chart_type: ChartKind, title: impl Into<String>, data: Vec<ChartDatum>) -> Self {
        Self {
            chart_type,
            title: title.into(),
            unit: String::new(),
            data,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sum of the values, negatives counted as zero.
    pub fn total(&self) -> f64 {
        self.data.iter().map(|d| d.value.max(0.0)).sum()
    }

    pub fn max_value(&self) -> f64 {
        self.data.iter().map(|d| d.value).fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Append-only message log for one chat session.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Explicitly tagged payload for upstream responses keyed by an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyed<T> {
    pub key: String,
    pub value: T,
}

impl<T> Keyed<T> {
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Keyed<U> {
        Keyed {
            key: self.key,
            value: f(self.value),
        }
    }
}

impl Keyed<Value> {
    /// Picks the entry for `expected` out of an upstream `{key: body}` map.
    /// A map with a single entry under a different key is accepted, since
    /// upstream occasionally normalizes accession casing.
    pub fn from_upstream(expected: &str, response: Value) -> Result<Self> {
        let Value::Object(mut map) = response else {
            return Err(Error::Parse(format!("response for {} is not an object", expected)));
        };
        if let Some(value) = map.remove(expected) {
            return Ok(Keyed::new(expected, value));
        }
        if map.len() == 1 {
            if let Some((key, value)) = map.into_iter().next() {
                return Ok(Keyed::new(key, value));
            }
        }
        Err(Error::NotFound(format!("{} not present in upstream response", expected)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveSummary {
    pub summary: String,
    pub keywords: Vec<String>,
    #[serde(rename = "chartData", default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<ChartSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub article_content: String,
    #[serde(default)]
    pub article_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_summary_button: Option<bool>,
}
