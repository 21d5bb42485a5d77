//! The response pipeline: drives one event from context fetch through the
//! terminal reply.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use confab_agent::{ChatTurn, LlmProvider, ProviderError};

use crate::attach::{self, ImageOutcome};
use crate::client::SlackApi;
use crate::context;
use crate::error::SlackError;
use crate::event::{MessageEvent, SlackFile};
use crate::identity::BotIdentity;
use crate::mrkdwn;
use crate::progress::ProgressTicket;

/// Reply when an attachment claims to be an image but cannot be fetched.
const DOWNLOAD_FAILED_REPLY: &str = "Could not download your image from Slack.";

/// Prefix for replies to attachments that are not images.
const NOT_AN_IMAGE_PREFIX: &str =
    "File was not recognized as an image. I'll just answer text:\n\n";

/// Posted when the model returns nothing; Slack rejects empty text.
const EMPTY_REPLY: &str = "No response.";

/// Tuning for the reply pipeline, injected so tests can rotate fast and
/// with deterministic counts.
#[derive(Debug, Clone)]
pub struct ResponderSettings {
    /// Status lines cycled through the progress message, in order. The
    /// first line is the initial text; rotation stops at the end of the
    /// list. Empty list means no progress message at all.
    pub status_lines: Vec<String>,
    pub rotation_interval: Duration,
    /// How many history messages to offer the model as context.
    pub context_limit: usize,
    pub max_image_bytes: u64,
}

/// Drives the full reply lifecycle for events that passed the filter.
///
/// Exactly one terminal message (reply or error) is posted per event, and
/// the progress message, when one was posted, is cleared first.
pub struct Responder<S> {
    slack: Arc<S>,
    provider: Arc<dyn LlmProvider>,
    identity: BotIdentity,
    settings: ResponderSettings,
}

impl<S: SlackApi + 'static> Responder<S> {
    pub fn new(
        slack: Arc<S>,
        provider: Arc<dyn LlmProvider>,
        identity: BotIdentity,
        settings: ResponderSettings,
    ) -> Self {
        Self {
            slack,
            provider,
            identity,
            settings,
        }
    }

    /// Handle one event end to end.
    ///
    /// Returns `Err` only when the terminal message itself cannot be
    /// posted; every failure before that is degraded or swallowed.
    pub async fn handle_event(&self, event: MessageEvent) -> Result<(), SlackError> {
        let turns = context::recent_turns(
            self.slack.as_ref(),
            &self.identity,
            &event.channel,
            self.settings.context_limit,
        )
        .await;

        let ticket = match self.settings.status_lines.first() {
            Some(first) => ProgressTicket::post(self.slack.as_ref(), &event.channel, first).await,
            None => None,
        };

        let generation = self.spawn_generation(&event, turns);
        let result = self.rotate_until_done(generation, ticket.as_ref()).await;

        if let Some(ticket) = ticket {
            ticket.clear(self.slack.as_ref()).await;
        }

        let thread = event.reply_thread();
        let reply = match result {
            Ok(text) => {
                let formatted = mrkdwn::markdown_to_mrkdwn(&text);
                if formatted.trim().is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    formatted
                }
            }
            Err(e) => {
                warn!(channel = %event.channel, error = %e, "generation failed");
                format!("Error: {}", last_line(&e.to_string()))
            }
        };
        self.slack.post_message(&event.channel, &reply, thread).await?;
        Ok(())
    }

    fn spawn_generation(
        &self,
        event: &MessageEvent,
        turns: Vec<ChatTurn>,
    ) -> JoinHandle<Result<String, ProviderError>> {
        let slack = Arc::clone(&self.slack);
        let provider = Arc::clone(&self.provider);
        let text = event.text.clone();
        let files = event.files.clone();
        let max_image_bytes = self.settings.max_image_bytes;
        tokio::spawn(async move {
            generate(
                slack.as_ref(),
                provider.as_ref(),
                &text,
                &files,
                &turns,
                max_image_bytes,
            )
            .await
        })
    }

    /// Await generation while cycling the progress text through the
    /// remaining status lines. Rotation stops when the list runs out; the
    /// join itself is never abandoned.
    async fn rotate_until_done(
        &self,
        mut generation: JoinHandle<Result<String, ProviderError>>,
        ticket: Option<&ProgressTicket>,
    ) -> Result<String, ProviderError> {
        if let Some(ticket) = ticket {
            for status in self.settings.status_lines.iter().skip(1) {
                tokio::select! {
                    joined = &mut generation => return flatten(joined),
                    _ = tokio::time::sleep(self.settings.rotation_interval) => {
                        debug!(%status, "rotating progress message");
                        ticket.advance(self.slack.as_ref(), status).await;
                    }
                }
            }
        }
        flatten(generation.await)
    }
}

/// Produce the reply text: text completion, vision completion, or one of
/// the fixed degradations for broken attachments.
async fn generate<S: SlackApi + ?Sized>(
    slack: &S,
    provider: &dyn LlmProvider,
    text: &str,
    files: &[SlackFile],
    turns: &[ChatTurn],
    max_image_bytes: u64,
) -> Result<String, ProviderError> {
    if files.is_empty() {
        return provider.complete_text(text, turns).await;
    }

    match attach::first_image(slack, files, max_image_bytes).await {
        ImageOutcome::Ready(image) => {
            provider
                .complete_image(&image.base64, &image.mime_type, text, turns)
                .await
        }
        ImageOutcome::Unavailable => Ok(DOWNLOAD_FAILED_REPLY.to_string()),
        ImageOutcome::NoImage => {
            let reply = provider.complete_text(text, turns).await?;
            Ok(format!("{NOT_AN_IMAGE_PREFIX}{reply}"))
        }
    }
}

/// Collapse a join result; a panicked generation task becomes an ordinary
/// generation error so the one-terminal-message rule still holds.
fn flatten(
    joined: Result<Result<String, ProviderError>, tokio::task::JoinError>,
) -> Result<String, ProviderError> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(ProviderError::Unavailable(format!(
            "generation task failed: {e}"
        ))),
    }
}

/// Last non-empty line of an error's display text. Channels get a short
/// diagnostic; the log line carries the rest.
fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("unknown error")
        .trim()
}
