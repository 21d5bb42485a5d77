//! Serde view of the Slack Events API payloads.

use serde::Deserialize;

/// Outer envelope of a `POST /events` body.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// One-time endpoint handshake, answered by echoing the challenge.
    UrlVerification { challenge: String },
    /// A workspace event wrapped in delivery metadata.
    EventCallback { event: MessageEvent },
    /// Envelope kinds we do not handle (app_rate_limited and friends).
    #[serde(other)]
    Other,
}

/// The inner `event` record, shaped for message events.
///
/// Every field is defaulted so that non-message event kinds still parse;
/// the filter drops them instead of the webhook failing on shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub files: Vec<SlackFile>,
}

/// A file attached to a message (`file_share` subtype).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackFile {
    #[serde(default)]
    pub mimetype: String,
    #[serde(default)]
    pub url_private: String,
    /// Declared size in bytes, from Slack's file object.
    #[serde(default)]
    pub size: u64,
}

impl MessageEvent {
    /// Direct-message channel ids start with `D`.
    pub fn is_dm(&self) -> bool {
        self.channel.starts_with('D')
    }

    /// Thread the reply should attach to: the originating thread if the
    /// message is in one, otherwise the message itself so the reply starts
    /// a thread. Replies in DMs are never threaded.
    pub fn reply_thread(&self) -> Option<&str> {
        if self.is_dm() {
            return None;
        }
        match self.thread_ts.as_deref() {
            Some(t) if !t.is_empty() => Some(t),
            _ if self.ts.is_empty() => None,
            _ => Some(&self.ts),
        }
    }
}
