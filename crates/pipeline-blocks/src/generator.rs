//! Text generation seam
//!
//! Writing and research blocks produce their output by prompting a language
//! model. The model client is supplied by the host through `TextGenerator`,
//! so these handlers never talk to a provider directly.

use async_trait::async_trait;

/// Errors a text generator can report
///
/// All of them end up as failure envelopes on the node; none abort a run.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Credentials for the provider are not configured
    #[error("{0} not set")]
    MissingCredentials(String),

    /// The provider answered but produced no text
    #[error("No response")]
    EmptyResponse,

    /// The provider rejected the request or could not be reached
    #[error("{0}")]
    Provider(String),
}

impl GeneratorError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }
}

/// A chat-style language model
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a single system + user exchange
    ///
    /// `model` is one of the catalog's LLM option ids (for example
    /// `gpt-4o-mini`); mapping it to a provider model is up to the
    /// implementation.
    async fn generate(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, GeneratorError>;
}
