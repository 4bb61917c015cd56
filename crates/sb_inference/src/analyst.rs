use std::sync::Arc;

use sb_core::{
    truncate_chars, ChartSeries, ChatReply, ChatRequest, ComprehensiveSummary, InferenceModel, SummaryRequest,
};

use crate::extract::{
    clean_text, extract_keywords_from_text, extract_metadata, extract_numerical_data, fallback_summary,
    split_terms, strip_emphasis,
};

const SUMMARY_INTENT: [&str; 9] = [
    "summar",
    "summery",
    "overview",
    "brief",
    "short form",
    "key point",
    "main finding",
    "tldr",
    "abstract",
];

pub const SUMMARY_BUTTON_ANSWER: &str = "I can provide you with a comprehensive AI-generated summary with visualizations and detailed analysis. Click the button below to view it.";
pub const CHAT_APOLOGY: &str = "I'm having trouble processing your question right now. Please try again.";
pub const SUMMARY_UNAVAILABLE: &str = "AI summarization temporarily unavailable.";
pub const FALLBACK_TERMS: [&str; 4] = ["space biology", "microgravity", "NASA research", "biological systems"];

/// Model summaries shorter than this are treated as failures.
const MIN_SUMMARY_CHARS: usize = 200;

/// Article analysis on top of an inference model. Every operation degrades
/// to a deterministic answer when the model fails.
#[derive(Debug, Clone)]
pub struct Analyst {
    model: Arc<dyn InferenceModel>,
}

pub fn is_summary_question(question: &str) -> bool {
    let question = question.trim().to_lowercase();
    SUMMARY_INTENT.iter().any(|k| question.contains(k))
}

impl Analyst {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    async fn ask(&self, prompt: &str) -> Option<String> {
        match self.model.generate(prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("{} failed: {}", self.model.name(), e);
                None
            }
        }
    }

    /// Summary, keywords, chart data and publication metadata for one article.
    pub async fn comprehensive_summary(&self, article: &SummaryRequest) -> ComprehensiveSummary {
        tracing::info!(
            "comprehensive summary for '{}' ({} chars)",
            truncate_chars(&article.title, 50),
            article.content.len()
        );
        let chart = extract_numerical_data(&article.content);
        let clean = clean_text(&article.content);

        let keyword_prompt = format!(
            "Extract 6 key scientific terms from this space biology article. Return only comma-separated terms: {}\n{}",
            article.title,
            truncate_chars(&clean, 2000)
        );
        let keywords = match self.ask(&keyword_prompt).await.map(|reply| split_terms(&reply)) {
            Some(terms) if !terms.is_empty() => terms,
            _ => extract_keywords_from_text(&article.content),
        };

        let summary_prompt = format!(
            "Summarize this NASA space biology research article in 5-6 detailed paragraphs for scientists:\n\n\
             Title: {}\n\nArticle:\n{}\n\n\
             Include:\n\
             1. Research objective and why it matters for space missions\n\
             2. Experimental methods and subjects used\n\
             3. Key findings with specific data and measurements\n\
             4. Biological mechanisms discovered\n\
             5. Implications for astronaut health\n\
             6. Conclusions and future research needs\n\n\
             Write clearly and professionally.",
            article.title,
            truncate_chars(&clean, 10000)
        );
        let summary = match self.ask(&summary_prompt).await.map(|reply| strip_emphasis(reply.trim())) {
            Some(summary) if summary.chars().count() >= MIN_SUMMARY_CHARS => summary,
            _ => {
                tracing::debug!("using extracted summary");
                fallback_summary(&clean)
            }
        };

        let metadata = extract_metadata(truncate_chars(&article.content, 5000));

        ComprehensiveSummary {
            summary,
            keywords,
            chart_data: Some(chart),
            metadata: Some(metadata),
        }
    }

    /// Answers questions about a single article. Requests for a summary are
    /// redirected to the comprehensive summary view.
    pub async fn chat(&self, request: &ChatRequest) -> ChatReply {
        if is_summary_question(&request.question) {
            tracing::debug!("summary question: {}", request.question);
            return ChatReply {
                answer: SUMMARY_BUTTON_ANSWER.to_string(),
                show_summary_button: Some(true),
            };
        }

        let prompt = format!(
            "You are an AI assistant that ONLY answers questions about the provided research article. \
             You must follow these strict rules:\n\n\
             1. ONLY provide information that is explicitly mentioned in the article below\n\
             2. If the question is about topics NOT covered in this article, respond: \"I can only answer \
             questions about this specific article. Please ask about the research, methods, findings, or \
             conclusions presented here.\"\n\
             3. Do NOT provide general knowledge, external information, or content from other sources\n\
             4. Do NOT answer questions unrelated to this article's content\n\
             5. Keep responses focused, accurate, and based solely on the article text\n\n\
             Article Title: {}\n\nArticle Content:\n{}\n\nUser Question: {}\n\n\
             Answer based ONLY on the article above:",
            request.article_title,
            truncate_chars(&request.article_content, 8000),
            request.question
        );

        let answer = self.ask(&prompt).await.unwrap_or_else(|| CHAT_APOLOGY.to_string());
        ChatReply {
            answer,
            show_summary_button: Some(false),
        }
    }

    pub async fn summarize(&self, text: &str) -> String {
        let prompt = format!(
            "Summarize this NASA space biology research article in 2-3 sentences:\n\n{}",
            truncate_chars(text, 3000)
        );
        self.ask(&prompt)
            .await
            .unwrap_or_else(|| SUMMARY_UNAVAILABLE.to_string())
    }

    pub async fn keywords(&self, text: &str) -> Vec<String> {
        let prompt = format!(
            "Extract 8 key scientific terms from this text, comma separated:\n\n{}",
            truncate_chars(text, 3000)
        );
        match self.ask(&prompt).await.map(|reply| split_terms(&reply)) {
            Some(terms) if !terms.is_empty() => terms,
            _ => FALLBACK_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Chartable numbers from the article body.
    pub fn extract_data(&self, article: &SummaryRequest) -> ChartSeries {
        extract_numerical_data(&article.content)
    }
}
