use sb_core::Result;

pub mod analyst;
pub mod extract;
pub mod models;

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Clone, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub base_url: Option<String>,
}

impl Config {
    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_GEMINI_BASE)
            .trim_end_matches('/')
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

pub mod prelude {
    pub use super::analyst::Analyst;
    pub use super::models::create_model;
    pub use super::Config;
    pub use sb_core::{ChatReply, ChatRequest, ComprehensiveSummary, Error, InferenceModel, Result};
}

pub use analyst::Analyst;
pub use models::create_model;

/// Builds an analyst over the named model.
pub fn analyst(model: &str, config: Config) -> Result<Analyst> {
    Ok(Analyst::new(create_model(model, config)?))
}
