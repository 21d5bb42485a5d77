pub mod openai;
pub mod provider;

pub use openai::OpenAiProvider;
pub use provider::{ChatTurn, LlmProvider, ProviderError, Role};
