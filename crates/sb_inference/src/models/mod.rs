use std::sync::Arc;

use sb_core::{Error, Result};

pub use sb_core::InferenceModel;

use crate::Config;

pub mod dummy;
pub mod gemini;

pub use dummy::DummyModel;
pub use gemini::GeminiModel;

pub const MODEL_NAMES: [&str; 2] = ["gemini", "dummy"];

pub fn create_model(name: &str, config: Config) -> Result<Arc<dyn InferenceModel>> {
    match name.to_lowercase().as_str() {
        "gemini" => Ok(Arc::new(GeminiModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Inference(format!(
            "unknown model '{}', expected one of: {}",
            other,
            MODEL_NAMES.join(", ")
        ))),
    }
}
