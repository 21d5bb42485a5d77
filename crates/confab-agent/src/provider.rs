use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single turn of conversation history supplied as grounding context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Common interface for all LLM backends.
///
/// The caller issues a single attempt per event; retry policy, if any,
/// belongs to the implementation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Complete a plain text message against the given context window.
    async fn complete_text(
        &self,
        text: &str,
        context: &[ChatTurn],
    ) -> Result<String, ProviderError>;

    /// Complete an image plus its accompanying text against the given
    /// context window. `image_base64` is the standard-alphabet encoding
    /// of the raw image bytes.
    async fn complete_image(
        &self,
        image_base64: &str,
        mime_type: &str,
        text: &str,
        context: &[ChatTurn],
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}
