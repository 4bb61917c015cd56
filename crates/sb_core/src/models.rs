use async_trait::async_trait;
use crate::Result;

#[async_trait]
pub trait InferenceModel: Send + Sync + std::fmt::Debug {
    /// Short display name of the backing model
    fn name(&self) -> &str;

    /// Run a single prompt and return the generated text
    async fn generate(&self, prompt: &str) -> Result<String>;
}
