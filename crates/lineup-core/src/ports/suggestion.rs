use async_trait::async_trait;

/// Post-hoc schedule suggestion via a language model. Per-call timeouts are
/// the adapter's responsibility.
#[async_trait]
pub trait SuggestionModel: Send + Sync {
    /// Ask the model for schedule improvement suggestions
    async fn suggest(&self, prompt: &str, model: Option<&str>) -> anyhow::Result<String>;
}
