pub mod attach;
pub mod client;
pub mod context;
pub mod error;
pub mod event;
pub mod filter;
pub mod handler;
pub mod identity;
pub mod mrkdwn;
pub mod progress;
pub mod signature;

pub use client::{SlackApi, SlackClient};
pub use error::SlackError;
pub use event::{EventEnvelope, MessageEvent};
pub use handler::{Responder, ResponderSettings};
pub use identity::BotIdentity;
