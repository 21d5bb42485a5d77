//! Decides which inbound events deserve a reply.

use crate::event::MessageEvent;
use crate::identity::BotIdentity;

/// Message subtypes that still warrant a reply. Everything else (edits,
/// deletions, joins, bot chatter) is system noise.
pub const ALLOWED_SUBTYPES: &[&str] = &["file_share"];

/// True when a message subtype is a plain user message we respond to.
pub fn subtype_allowed(subtype: Option<&str>) -> bool {
    subtype.map_or(true, |s| ALLOWED_SUBTYPES.contains(&s))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Process,
    Ignore(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotAMessage,
    UnsupportedSubtype,
    MissingAuthor,
    OwnMessage,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IgnoreReason::NotAMessage => "not a message event",
            IgnoreReason::UnsupportedSubtype => "unsupported subtype",
            IgnoreReason::MissingAuthor => "no author",
            IgnoreReason::OwnMessage => "own message",
        };
        f.write_str(s)
    }
}

/// Apply the gate rules in order. Each rule alone is disqualifying; the
/// order only decides which reason gets reported.
///
/// The self-message rule is what breaks the feedback loop: every reply the
/// bot posts comes straight back through the webhook.
pub fn disposition(event: &MessageEvent, identity: &BotIdentity) -> Disposition {
    if event.kind != "message" {
        return Disposition::Ignore(IgnoreReason::NotAMessage);
    }
    if !subtype_allowed(event.subtype.as_deref()) {
        return Disposition::Ignore(IgnoreReason::UnsupportedSubtype);
    }
    let user = event.user.as_deref().unwrap_or("");
    if user.is_empty() {
        return Disposition::Ignore(IgnoreReason::MissingAuthor);
    }
    if identity.is_self(user) {
        return Disposition::Ignore(IgnoreReason::OwnMessage);
    }
    Disposition::Process
}
