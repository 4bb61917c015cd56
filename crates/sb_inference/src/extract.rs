//! Deterministic text processing for article analysis: cleaning, chart
//! data, keyword and metadata extraction. Used directly and as the
//! fallback whenever the model is unavailable.

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use sb_core::{html_to_text, truncate_chars, ChartDatum, ChartKind, ChartSeries};

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<[^>]+>").expect("valid regex");
    static ref PERCENTAGE: Regex = Regex::new(r"(\w+[\w\s]*?):\s*(\d+\.?\d*)\s*%").expect("valid regex");
    static ref MEASUREMENT: Regex =
        Regex::new(r"(\w+[\w\s]*?):\s*(\d+\.?\d*)\s*([a-zA-Z]+)").expect("valid regex");
    static ref SAMPLE_SIZE: Regex = Regex::new(r"[nN]\s*=\s*(\d+)").expect("valid regex");
    static ref GROUP: Regex =
        Regex::new(r"(?i)(\w+[\w\s]*?)\s*(?:group|mice|subjects)?\s*[:\(]\s*(\d+\.?\d*)").expect("valid regex");
    static ref TABLE_ROW: Regex =
        Regex::new(r"(\w+[\w\s]{0,30}?)\s+(\d+\.?\d*)\s*±\s*(\d+\.?\d*)").expect("valid regex");
    static ref NUMERIC_SENTENCE: Regex = Regex::new(r"([^.!?]*\d+\.?\d*[^.!?]*[.!?])").expect("valid regex");
    static ref NUMBER: Regex = Regex::new(r"\d+\.?\d+").expect("valid regex");
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").expect("valid regex");

    static ref BODY_START: Regex =
        Regex::new(r"Abstract|ABSTRACT|Introduction|INTRODUCTION|1\.\s+Introduction").expect("valid regex");
    static ref SECTION_OR_NUMBER: Regex = Regex::new(r"(?i)Abstract|Introduction|\d+\.").expect("valid regex");
    static ref NLM_CATALOG: Regex = Regex::new(r"(?i)View in NLM Catalog").expect("valid regex");
    static ref AUTHOR_INFO: Regex = Regex::new(r"(?i)Author information").expect("valid regex");
    static ref ARTICLE_NOTES: Regex = Regex::new(r"(?i)Article notes").expect("valid regex");
    static ref HISTORY: Regex =
        Regex::new(r"(?s)Received:?\s*\d{4}.*?Published:?\s*\d{4}").expect("valid regex");
    static ref COMPETING: Regex = Regex::new(r"Competing Interests:").expect("valid regex");
    static ref COMPETING_END: Regex = Regex::new(r"\d+\.|[A-Z][a-z]+\s+[a-z]").expect("valid regex");
    static ref EMAIL: Regex = Regex::new(r"\*\s*E-mail:").expect("valid regex");
    static ref EMAIL_END: Regex = Regex::new(r"\d+\.|[A-Z]").expect("valid regex");
    static ref STRAY_WORD: Regex =
        Regex::new(r"(?i)\b(?:bone|pubmed|spaceflight|google|scholar|ground|doi|pmc|ncbi)\b").expect("valid regex");

    static ref BOLD: Regex = Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex");
    static ref ITALIC: Regex = Regex::new(r"\*([^*]+)\*").expect("valid regex");

    static ref ABSTRACT_HEAD: Regex = Regex::new(r"(?i)Abstract[:\s]+").expect("valid regex");
    static ref ABSTRACT_END: Regex = Regex::new(r"(?i)Introduction|Keywords|1\.").expect("valid regex");

    static ref RECEIVED: Regex =
        Regex::new(r"(?i)Received:?\s*(\d{4}\s+[A-Za-z]+\s+\d{1,2})").expect("valid regex");
    static ref ACCEPTED: Regex =
        Regex::new(r"(?i)Accepted:?\s*(\d{4}\s+[A-Za-z]+\s+\d{1,2})").expect("valid regex");
    static ref PUBLISHED: Regex =
        Regex::new(r"(?i)(?:Published|Collection date):?\s*(\d{4})").expect("valid regex");
    static ref COMPETING_INTERESTS: Regex =
        Regex::new(r"(?i)Competing Interests:?\s*([^.]+)").expect("valid regex");
}

const STOP_WORDS: [&str; 29] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from", "as", "is",
    "was", "were", "been", "be", "this", "that", "these", "those", "are", "has", "have", "had",
];

pub const DEFAULT_KEYWORDS: [&str; 3] = ["space", "biology", "research"];
pub const DEFAULT_SUMMARY: &str = "This article presents research findings from NASA's Space Biology program.";
pub const SUMMARY_MAX_CHARS: usize = 2500;

/// Sentences shorter than this are headings or captions.
const LONG_SENTENCE_CHARS: usize = 80;

fn number(s: &str) -> f64 {
    s.parse().unwrap_or(0.0)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes every span that starts at `start` and runs up to (not including)
/// the next `stop` match. A start with no stop after it is left alone.
fn remove_spans(text: &str, start: &Regex, stop: &Regex) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(m) = start.find_at(text, pos) {
        let Some(end) = stop.find_at(text, m.end()) else {
            break;
        };
        out.push_str(&text[pos..m.start()]);
        pos = end.start();
    }
    out.push_str(&text[pos..]);
    out
}

/// Drops index terms left behind by the page chrome: a term is kept only
/// when another word follows it.
fn remove_stray_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for m in STRAY_WORD.find_iter(text) {
        let rest = &text[m.end()..];
        let after = rest.trim_start();
        let followed = after.len() < rest.len()
            && after.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_');
        if !followed {
            out.push_str(&text[pos..m.start()]);
            pos = m.end();
        }
    }
    out.push_str(&text[pos..]);
    out
}

/// Flattens article HTML into plain prose: tags stripped, whitespace
/// collapsed, everything before the first Abstract/Introduction heading
/// dropped along with catalog, author and history blocks.
pub fn clean_text(html: &str) -> String {
    let mut text = html_to_text(html);

    if let Some(start) = BODY_START.find(&text).map(|m| m.start()) {
        text = text[start..].to_string();
    }

    for marker in [&*NLM_CATALOG, &*AUTHOR_INFO, &*ARTICLE_NOTES] {
        text = remove_spans(&text, marker, &SECTION_OR_NUMBER);
    }
    text = HISTORY.replace_all(&text, "").into_owned();
    text = remove_spans(&text, &COMPETING, &COMPETING_END);
    text = remove_spans(&text, &EMAIL, &EMAIL_END);
    text = remove_stray_words(&text);

    collapse_whitespace(&text)
}

/// Strips markdown bold and italic markers from model output.
pub fn strip_emphasis(text: &str) -> String {
    let text = BOLD.replace_all(text, "$1");
    ITALIC.replace_all(&text, "$1").into_owned()
}

/// Summary used when the model fails: the abstract if one can be found,
/// otherwise the first ten long sentences.
pub fn fallback_summary(clean: &str) -> String {
    let from_abstract = ABSTRACT_HEAD.find(clean).and_then(|head| {
        ABSTRACT_END
            .find_at(clean, head.end())
            .map(|end| clean[head.end()..end.start()].trim().to_string())
    });

    let summary = match from_abstract {
        Some(abstract_text) if !abstract_text.is_empty() => abstract_text,
        _ => {
            let sentences: Vec<String> = clean
                .split('.')
                .map(str::trim)
                .filter(|s| s.chars().count() > LONG_SENTENCE_CHARS)
                .take(10)
                .map(|s| format!("{}.", s))
                .collect();
            if sentences.is_empty() {
                DEFAULT_SUMMARY.to_string()
            } else {
                sentences.join(" ")
            }
        }
    };

    if summary.chars().count() > SUMMARY_MAX_CHARS {
        format!("{}...", truncate_chars(&summary, SUMMARY_MAX_CHARS))
    } else {
        summary
    }
}

/// Picks the most chartable numbers in the text. Patterns are tried in
/// priority order and the first one with at least two hits decides the
/// chart; numbers from numeric sentences are the last resort.
pub fn extract_numerical_data(html: &str) -> ChartSeries {
    let text = TAG.replace_all(html, " ");

    let percentages: Vec<_> = PERCENTAGE.captures_iter(&text).collect();
    let groups: Vec<_> = GROUP.captures_iter(&text).collect();
    let measurements: Vec<_> = MEASUREMENT.captures_iter(&text).collect();
    let table: Vec<_> = TABLE_ROW.captures_iter(&text).collect();
    let samples: Vec<_> = SAMPLE_SIZE.captures_iter(&text).collect();

    let chosen = if percentages.len() >= 2 {
        let data = percentages
            .iter()
            .take(6)
            .map(|c| ChartDatum::new(c[1].trim(), number(&c[2])))
            .collect();
        Some(ChartSeries::new(ChartKind::Pie, "Distribution", data).with_unit("%"))
    } else if groups.len() >= 2 {
        let data: Vec<ChartDatum> = groups
            .iter()
            .map(|c| ChartDatum::new(c[1].trim(), number(&c[2])))
            .filter(|d| d.label.chars().count() > 2 && d.value > 0.0)
            .take(8)
            .collect();
        Some(ChartSeries::new(ChartKind::Bar, "Group Comparison", data))
    } else if measurements.len() >= 2 {
        let unit = measurements[0][3].to_string();
        let data = measurements
            .iter()
            .take(6)
            .map(|c| ChartDatum::new(c[1].trim(), number(&c[2])))
            .filter(|d| d.value > 0.0)
            .collect();
        Some(ChartSeries::new(ChartKind::Bar, "Measurements", data).with_unit(unit))
    } else if table.len() >= 2 {
        let data = table
            .iter()
            .take(6)
            .map(|c| ChartDatum::new(c[1].trim(), number(&c[2])))
            .collect();
        Some(ChartSeries::new(ChartKind::Bar, "Experimental Results", data))
    } else if samples.len() >= 2 {
        let data = samples
            .iter()
            .take(6)
            .enumerate()
            .map(|(i, c)| ChartDatum::new(format!("Group {}", i + 1), number(&c[1])))
            .collect();
        Some(ChartSeries::new(ChartKind::Bar, "Sample Sizes", data).with_unit("count"))
    } else {
        None
    };

    match chosen {
        Some(series) if !series.is_empty() => series,
        _ => key_values(&text),
    }
}

fn key_values(text: &str) -> ChartSeries {
    let sentences: Vec<&str> = NUMERIC_SENTENCE
        .find_iter(text)
        .take(10)
        .map(|m| m.as_str())
        .collect();
    let joined = sentences.join(" ");
    let numbers: Vec<f64> = NUMBER.find_iter(&joined).map(|m| number(m.as_str())).collect();

    if numbers.len() >= 2 {
        let data = numbers
            .iter()
            .take(6)
            .enumerate()
            .map(|(i, n)| ChartDatum::new(format!("Value {}", i + 1), *n))
            .collect();
        ChartSeries::new(ChartKind::Bar, "Key Values", data)
    } else {
        ChartSeries::new(ChartKind::Bar, "Data Visualization", Vec::new())
    }
}

/// Most frequent content words (longer than two characters, seen more than
/// twice), at most six of them.
pub fn extract_keywords_from_text(html: &str) -> Vec<String> {
    let text = TAG.replace_all(html, " ");
    let text = NON_WORD.replace_all(&text, " ");

    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in text
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .enumerate()
    {
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> =
        counts.into_iter().map(|(word, (count, first))| (word, count, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    let keywords: Vec<String> = ranked
        .into_iter()
        .take(10)
        .filter(|(_, count, _)| *count > 2)
        .map(|(word, _, _)| word)
        .take(6)
        .collect();

    if keywords.is_empty() {
        DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
    } else {
        keywords
    }
}

/// Publication history and competing-interest statement, where present.
pub fn extract_metadata(text: &str) -> BTreeMap<String, String> {
    let fields: [(&str, &Regex); 4] = [
        ("received", &*RECEIVED),
        ("accepted", &*ACCEPTED),
        ("published", &*PUBLISHED),
        ("competing_interests", &*COMPETING_INTERESTS),
    ];
    fields
        .into_iter()
        .filter_map(|(name, re)| {
            re.captures(text)
                .map(|c| (name.to_string(), c[1].trim().to_string()))
        })
        .collect()
}

/// Splits a comma-separated model reply into at most eight terms.
pub fn split_terms(reply: &str) -> Vec<String> {
    reply
        .trim()
        .split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .take(8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(series: &ChartSeries) -> Vec<f64> {
        series.data.iter().map(|d| d.value).collect()
    }

    fn labels(series: &ChartSeries) -> Vec<&str> {
        series.data.iter().map(|d| d.label.as_str()).collect()
    }

    #[test]
    fn test_percentages_make_a_pie() {
        let series = extract_numerical_data("<p>Flight: 45%, Ground: 55%</p>");
        assert_eq!(series.chart_type, ChartKind::Pie);
        assert_eq!(series.title, "Distribution");
        assert_eq!(series.unit, "%");
        assert_eq!(labels(&series), vec!["Flight", "Ground"]);
        assert_eq!(values(&series), vec![45.0, 55.0]);
    }

    #[test]
    fn test_group_comparison() {
        let series = extract_numerical_data("Flight group: 25; Control group: 30; ab: 4");
        assert_eq!(series.chart_type, ChartKind::Bar);
        assert_eq!(series.title, "Group Comparison");
        assert_eq!(labels(&series), vec!["Flight", "Control"]);
        assert_eq!(values(&series), vec![25.0, 30.0]);
    }

    #[test]
    fn test_table_rows() {
        let series = extract_numerical_data("Body mass 25.1 ± 1.2 and heart rate 60 ± 4");
        assert_eq!(series.title, "Experimental Results");
        assert_eq!(values(&series), vec![25.1, 60.0]);
        assert_eq!(labels(&series)[0], "Body mass");
    }

    #[test]
    fn test_sample_sizes() {
        let series = extract_numerical_data("We used n = 12 flight animals and n=10 controls");
        assert_eq!(series.title, "Sample Sizes");
        assert_eq!(series.unit, "count");
        assert_eq!(labels(&series), vec!["Group 1", "Group 2"]);
        assert_eq!(values(&series), vec![12.0, 10.0]);
    }

    #[test]
    fn test_key_values_and_nothing() {
        let series = extract_numerical_data("Mice lost 12.5 grams over 30 days.");
        assert_eq!(series.title, "Key Values");
        assert_eq!(values(&series), vec![12.5, 30.0]);

        let series = extract_numerical_data("No numbers here.");
        assert_eq!(series.title, "Data Visualization");
        assert!(series.is_empty());
    }

    #[test]
    fn test_keyword_frequency() {
        let text = "<p>microgravity microgravity microgravity bone bone bone</p> the the the the mice mice";
        assert_eq!(extract_keywords_from_text(text), vec!["microgravity", "bone"]);
        assert_eq!(extract_keywords_from_text("short text"), DEFAULT_KEYWORDS.to_vec());

        let text = "Mice had lower mass. Mice had less bone. Mice had stress.";
        assert_eq!(extract_keywords_from_text(text), vec!["mice"]);
    }

    #[test]
    fn test_clean_text_starts_at_body() {
        let html = "<p>View in NLM Catalog Author information 1. Some</p><h2>Abstract</h2><p>Spaceflight alters bone.</p>";
        assert_eq!(clean_text(html), "Abstract Spaceflight alters .");
    }

    #[test]
    fn test_clean_text_drops_metadata_blocks() {
        assert_eq!(
            clean_text("Author information Dept of Biology 2. Results were strong"),
            "2. Results were strong"
        );
        assert_eq!(clean_text("Received: 2020 Jan 5 Accepted 2020 Published: 2021 text"), "text");
        assert_eq!(clean_text("View in NLM Catalog with no terminator"), "View in NLM Catalog with no terminator");
    }

    #[test]
    fn test_strip_emphasis() {
        assert_eq!(strip_emphasis("**Bold** and *it*"), "Bold and it");
    }

    #[test]
    fn test_fallback_summary() {
        assert_eq!(fallback_summary("Abstract: Mice lost bone. Introduction more"), "Mice lost bone.");

        let long = "Rodents housed on the station for thirty days showed reduced trabecular bone volume";
        let text = format!("{}. Short. {}", long, long);
        assert_eq!(fallback_summary(&text), format!("{}. {}.", long, long));

        assert_eq!(fallback_summary("Too short."), DEFAULT_SUMMARY);

        let huge = format!("Abstract: {} Introduction", "x".repeat(3000));
        let summary = fallback_summary(&huge);
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS + 3);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_metadata() {
        let text = "Received: 2019 Mar 4. Accepted: 2019 Jun 1. Published: 2019. Competing Interests: The authors declare none. Body";
        let metadata = extract_metadata(text);
        assert_eq!(metadata["received"], "2019 Mar 4");
        assert_eq!(metadata["accepted"], "2019 Jun 1");
        assert_eq!(metadata["published"], "2019");
        assert_eq!(metadata["competing_interests"], "The authors declare none");
        assert!(extract_metadata("nothing").is_empty());
    }

    #[test]
    fn test_split_terms() {
        assert_eq!(split_terms(" microgravity, bone loss ,, ISS \n"), vec!["microgravity", "bone loss", "ISS"]);
        assert_eq!(split_terms("a,b,c,d,e,f,g,h,i,j").len(), 8);
    }
}
