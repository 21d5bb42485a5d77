//! Best-effort conversation context for grounding replies.

use tracing::warn;

use confab_agent::{ChatTurn, Role};

use crate::client::SlackApi;
use crate::filter;
use crate::identity::BotIdentity;

/// Fetch the channel's recent turns, oldest first.
///
/// History rows outside the plain-message allow-set and rows with no
/// author are dropped. Bot-authored rows become assistant turns, everything
/// else a user turn. A read failure degrades to an empty context; grounding
/// is never worth failing the reply over.
pub async fn recent_turns<S: SlackApi + ?Sized>(
    slack: &S,
    identity: &BotIdentity,
    channel: &str,
    limit: usize,
) -> Vec<ChatTurn> {
    let rows = match slack.fetch_history(channel, limit).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(channel, error = %e, "history fetch failed; replying without context");
            return Vec::new();
        }
    };

    rows.into_iter()
        .rev() // Slack returns newest first
        .filter(|row| filter::subtype_allowed(row.subtype.as_deref()))
        .filter_map(|row| {
            let user = row.user?;
            if user.is_empty() {
                return None;
            }
            let role = if identity.is_self(&user) {
                Role::Assistant
            } else {
                Role::User
            };
            Some(ChatTurn {
                role,
                content: row.text,
            })
        })
        .collect()
}
