use sb_core::{Article, Dataset, Highlight, ResearchRecord, TaskBookProject};

/// Scores at or below this value count as a match (0 is perfect).
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Records that expose a fixed set of text fields to fuzzy search.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for Article {
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.title, &self.author, &self.abstract_text]
    }
}

impl Searchable for Dataset {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            &self.title,
            &self.accession,
            &self.organism,
            &self.description,
            &self.material,
        ]
    }
}

impl Searchable for ResearchRecord {
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.title, &self.author]
    }
}

impl Searchable for TaskBookProject {
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.title, &self.investigator]
    }
}

impl Searchable for Highlight {
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.title, &self.summary]
    }
}

/// Approximate matcher: substring hits score 0, otherwise every query token
/// is compared against the field tokens with Jaro-Winkler and the field
/// scores the mean distance of its best token matches.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    threshold: f64,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Match score of `query` against one field, `None` above the threshold.
    pub fn score(&self, query: &str, text: &str) -> Option<f64> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Some(0.0);
        }
        let text = text.to_lowercase();
        if text.contains(&query) {
            return Some(0.0);
        }

        let query_tokens = tokens(&query);
        let text_tokens = tokens(&text);
        if query_tokens.is_empty() || text_tokens.is_empty() {
            return None;
        }

        let total: f64 = query_tokens
            .iter()
            .map(|q| {
                let best = text_tokens
                    .iter()
                    .map(|t| strsim::jaro_winkler(q, t))
                    .fold(0.0, f64::max);
                1.0 - best
            })
            .sum();
        let score = total / query_tokens.len() as f64;

        (score <= self.threshold).then_some(score)
    }

    /// Best score of `query` over all of a record's fields.
    pub fn score_record<T: Searchable + ?Sized>(&self, query: &str, record: &T) -> Option<f64> {
        record
            .search_fields()
            .into_iter()
            .filter_map(|field| self.score(query, field))
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.min(s))))
    }

    /// Matching records in relevance order; ties keep source order. An empty
    /// query returns every record in source order.
    pub fn search<'a, T: Searchable>(&self, items: &'a [T], query: &str) -> Vec<&'a T> {
        if query.trim().is_empty() {
            return items.iter().collect();
        }
        let mut scored: Vec<(&T, f64)> = items
            .iter()
            .filter_map(|item| self.score_record(query, item).map(|s| (item, s)))
            .collect();
        // sort_by is stable, so equal scores stay in source order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        tracing::debug!("fuzzy search {:?} matched {}/{}", query, scored.len(), items.len());
        scored.into_iter().map(|(item, _)| item).collect()
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
