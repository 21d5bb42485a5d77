use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfabError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfabError>;
