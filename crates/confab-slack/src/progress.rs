//! The transient progress message shown while a reply is generated.

use tracing::warn;

use crate::client::SlackApi;

/// Address of the progress message posted for one event.
///
/// The responder owns the ticket for the lifetime of the event and clears
/// it exactly once before the terminal message goes out. Every operation
/// here is best-effort: a reply must never fail because its progress
/// message misbehaved.
#[derive(Debug, Clone)]
pub struct ProgressTicket {
    channel: String,
    ts: String,
}

impl ProgressTicket {
    /// Post the initial progress message, top-level in the channel.
    /// A failed post degrades to `None`.
    pub async fn post<S: SlackApi + ?Sized>(slack: &S, channel: &str, text: &str) -> Option<Self> {
        match slack.post_message(channel, text, None).await {
            Ok(posted) => Some(Self {
                channel: posted.channel,
                ts: posted.ts,
            }),
            Err(e) => {
                warn!(channel, error = %e, "progress post failed; continuing without one");
                None
            }
        }
    }

    /// Swap the progress text for the next status line.
    pub async fn advance<S: SlackApi + ?Sized>(&self, slack: &S, text: &str) {
        if let Err(e) = slack.update_message(&self.channel, &self.ts, text).await {
            warn!(channel = %self.channel, ts = %self.ts, error = %e, "progress update failed");
        }
    }

    /// Remove the progress message. Consumes the ticket; a racing delete or
    /// a Slack hiccup is logged, never raised.
    pub async fn clear<S: SlackApi + ?Sized>(self, slack: &S) {
        if let Err(e) = slack.delete_message(&self.channel, &self.ts).await {
            warn!(channel = %self.channel, ts = %self.ts, error = %e, "progress delete failed");
        }
    }
}
