//! Bot self-identity, resolved once at startup.

use tracing::info;

use crate::client::SlackClient;
use crate::error::SlackError;

/// The bot's own Slack user id, fixed for the lifetime of the process.
///
/// Injected into everything that must recognize self-authored messages,
/// rather than living in a process-wide global.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    user_id: String,
}

impl BotIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Ask Slack who this bot token belongs to (`auth.test`).
    pub async fn resolve(client: &SlackClient) -> Result<Self, SlackError> {
        let user_id = client.auth_test().await?;
        info!(user_id = %user_id, "resolved bot identity");
        Ok(Self::new(user_id))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// True when `user` is this bot.
    pub fn is_self(&self, user: &str) -> bool {
        !self.user_id.is_empty() && self.user_id == user
    }
}
