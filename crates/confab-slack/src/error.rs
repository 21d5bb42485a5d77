use thiserror::Error;

/// Errors from talking to the Slack Web API.
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered but flagged the call as failed (`"ok": false`).
    #[error("Slack API {method} failed: {reason}")]
    Api { method: &'static str, reason: String },

    #[error("file download failed with status {status}: {url}")]
    Download { status: u16, url: String },
}
