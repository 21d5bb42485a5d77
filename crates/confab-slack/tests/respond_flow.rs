//! End-to-end responder scenarios against mock Slack and LLM backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use confab_agent::{ChatTurn, LlmProvider, ProviderError, Role};
use confab_slack::client::{HistoryMessage, PostedMessage, SlackApi};
use confab_slack::error::SlackError;
use confab_slack::event::{MessageEvent, SlackFile};
use confab_slack::handler::{Responder, ResponderSettings};
use confab_slack::identity::BotIdentity;

// ── mocks ──

#[derive(Default)]
struct MockSlack {
    history_rows: Vec<HistoryMessage>,
    download_body: Vec<u8>,
    fail_history: bool,
    fail_first_post: bool,
    fail_all_posts: bool,
    fail_update: bool,
    fail_delete: bool,
    fail_download: bool,
    order: Mutex<Vec<&'static str>>,
    posts: Mutex<Vec<(String, String, Option<String>)>>,
    updates: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    downloads: Mutex<Vec<String>>,
    post_seq: AtomicUsize,
}

impl MockSlack {
    fn order(&self) -> Vec<&'static str> {
        self.order.lock().unwrap().clone()
    }

    fn posts(&self) -> Vec<(String, String, Option<String>)> {
        self.posts.lock().unwrap().clone()
    }

    fn terminal_post(&self) -> (String, String, Option<String>) {
        self.posts().last().cloned().expect("no message was posted")
    }

    fn update_texts(&self) -> Vec<String> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl SlackApi for MockSlack {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, SlackError> {
        self.order.lock().unwrap().push("post");
        let seq = self.post_seq.fetch_add(1, Ordering::SeqCst);
        if self.fail_all_posts || (self.fail_first_post && seq == 0) {
            return Err(SlackError::Api {
                method: "chat.postMessage",
                reason: "is_archived".into(),
            });
        }
        self.posts.lock().unwrap().push((
            channel.to_string(),
            text.to_string(),
            thread_ts.map(String::from),
        ));
        Ok(PostedMessage {
            channel: channel.to_string(),
            ts: format!("1700000000.{seq:06}"),
        })
    }

    async fn update_message(
        &self,
        _channel: &str,
        _ts: &str,
        text: &str,
    ) -> Result<(), SlackError> {
        self.order.lock().unwrap().push("update");
        if self.fail_update {
            return Err(SlackError::Api {
                method: "chat.update",
                reason: "message_not_found".into(),
            });
        }
        self.updates.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn delete_message(&self, _channel: &str, ts: &str) -> Result<(), SlackError> {
        self.order.lock().unwrap().push("delete");
        if self.fail_delete {
            return Err(SlackError::Api {
                method: "chat.delete",
                reason: "message_not_found".into(),
            });
        }
        self.deletes.lock().unwrap().push(ts.to_string());
        Ok(())
    }

    async fn fetch_history(
        &self,
        _channel: &str,
        _limit: usize,
    ) -> Result<Vec<HistoryMessage>, SlackError> {
        self.order.lock().unwrap().push("history");
        if self.fail_history {
            return Err(SlackError::Api {
                method: "conversations.history",
                reason: "missing_scope".into(),
            });
        }
        Ok(self.history_rows.clone())
    }

    async fn download_file(&self, url: &str) -> Result<Vec<u8>, SlackError> {
        self.order.lock().unwrap().push("download");
        self.downloads.lock().unwrap().push(url.to_string());
        if self.fail_download {
            return Err(SlackError::Download {
                status: 404,
                url: url.to_string(),
            });
        }
        Ok(self.download_body.clone())
    }
}

struct MockProvider {
    reply: String,
    fail_message: Option<String>,
    delay: Duration,
    text_calls: AtomicUsize,
    image_calls: AtomicUsize,
    last_context: Mutex<Vec<ChatTurn>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            reply: "All good.".into(),
            fail_message: None,
            delay: Duration::ZERO,
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            last_context: Mutex::new(Vec::new()),
        }
    }
}

impl MockProvider {
    async fn answer(&self, context: &[ChatTurn]) -> Result<String, ProviderError> {
        *self.last_context.lock().unwrap() = context.to_vec();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.fail_message {
            Some(msg) => Err(ProviderError::Unavailable(msg.clone())),
            None => Ok(self.reply.clone()),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete_text(
        &self,
        _text: &str,
        context: &[ChatTurn],
    ) -> Result<String, ProviderError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(context).await
    }

    async fn complete_image(
        &self,
        _image_base64: &str,
        _mime_type: &str,
        _text: &str,
        context: &[ChatTurn],
    ) -> Result<String, ProviderError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(context).await
    }
}

// ── fixtures ──

fn settings() -> ResponderSettings {
    ResponderSettings {
        status_lines: vec![
            "Thinking...".into(),
            "Still thinking...".into(),
            "Almost there...".into(),
        ],
        rotation_interval: Duration::from_secs(1),
        context_limit: 6,
        max_image_bytes: 1024,
    }
}

fn responder(slack: Arc<MockSlack>, provider: Arc<MockProvider>) -> Responder<MockSlack> {
    Responder::new(slack, provider, BotIdentity::new("U0BOT"), settings())
}

fn channel_event(text: &str) -> MessageEvent {
    MessageEvent {
        kind: "message".into(),
        user: Some("U123".into()),
        channel: "C42".into(),
        ts: "1699999999.000100".into(),
        text: text.into(),
        ..Default::default()
    }
}

fn png_file(size: u64) -> SlackFile {
    SlackFile {
        mimetype: "image/png".into(),
        url_private: "https://files.slack.test/img.png".into(),
        size,
    }
}

// ── text replies ──

#[tokio::test]
async fn text_reply_threads_under_trigger_message() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider.clone());

    r.handle_event(channel_event("hello")).await.unwrap();

    assert_eq!(provider.text_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.image_calls.load(Ordering::SeqCst), 0);
    let (channel, text, thread) = slack.terminal_post();
    assert_eq!(channel, "C42");
    assert_eq!(text, "All good.");
    assert_eq!(thread.as_deref(), Some("1699999999.000100"));
    // the progress post itself is never threaded
    assert_eq!(slack.posts()[0].2, None);
}

#[tokio::test]
async fn reply_joins_existing_thread() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider);

    let mut event = channel_event("hello");
    event.thread_ts = Some("1699999990.000001".into());
    r.handle_event(event).await.unwrap();

    let (_, _, thread) = slack.terminal_post();
    assert_eq!(thread.as_deref(), Some("1699999990.000001"));
}

#[tokio::test]
async fn dm_reply_is_unthreaded() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider);

    let mut event = channel_event("hi there");
    event.channel = "D900".into();
    r.handle_event(event).await.unwrap();

    let (channel, _, thread) = slack.terminal_post();
    assert_eq!(channel, "D900");
    assert_eq!(thread, None);
}

#[tokio::test]
async fn reply_text_is_converted_to_mrkdwn() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider {
        reply: "**Hello** *world*".into(),
        ..Default::default()
    });
    let r = responder(slack.clone(), provider);

    r.handle_event(channel_event("hello")).await.unwrap();

    let (_, text, _) = slack.terminal_post();
    assert_eq!(text, "*Hello* _world_");
}

#[tokio::test]
async fn empty_generation_posts_fallback_text() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider {
        reply: String::new(),
        ..Default::default()
    });
    let r = responder(slack.clone(), provider);

    r.handle_event(channel_event("hello")).await.unwrap();

    let (_, text, _) = slack.terminal_post();
    assert_eq!(text, "No response.");
}

// ── image attachments ──

#[tokio::test]
async fn image_attachment_takes_vision_path_once() {
    let slack = Arc::new(MockSlack {
        download_body: b"fake png bytes".to_vec(),
        ..Default::default()
    });
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider.clone());

    let mut event = channel_event("what is this?");
    event.subtype = Some("file_share".into());
    event.files = vec![png_file(64)];
    r.handle_event(event).await.unwrap();

    assert_eq!(provider.image_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.text_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        *slack.downloads.lock().unwrap(),
        ["https://files.slack.test/img.png"]
    );
}

#[tokio::test]
async fn failed_download_posts_apology() {
    let slack = Arc::new(MockSlack {
        fail_download: true,
        ..Default::default()
    });
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider.clone());

    let mut event = channel_event("what is this?");
    event.files = vec![png_file(64)];
    r.handle_event(event).await.unwrap();

    assert_eq!(provider.image_calls.load(Ordering::SeqCst), 0);
    let (_, text, _) = slack.terminal_post();
    assert_eq!(text, "Could not download your image from Slack.");
}

#[tokio::test]
async fn oversized_image_is_never_downloaded() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider.clone());

    let mut event = channel_event("look");
    // settings() caps images at 1024 bytes
    event.files = vec![png_file(5000)];
    r.handle_event(event).await.unwrap();

    assert!(slack.downloads.lock().unwrap().is_empty());
    assert_eq!(provider.image_calls.load(Ordering::SeqCst), 0);
    let (_, text, _) = slack.terminal_post();
    assert_eq!(text, "Could not download your image from Slack.");
}

#[tokio::test]
async fn non_image_attachment_falls_back_to_text_with_notice() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider.clone());

    let mut event = channel_event("summarize this");
    event.files = vec![SlackFile {
        mimetype: "application/pdf".into(),
        url_private: "https://files.slack.test/doc.pdf".into(),
        size: 64,
    }];
    r.handle_event(event).await.unwrap();

    assert_eq!(provider.text_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.image_calls.load(Ordering::SeqCst), 0);
    let (_, text, _) = slack.terminal_post();
    assert!(text.starts_with("File was not recognized as an image."));
    assert!(text.ends_with("All good."));
}

// ── progress lifecycle ──

#[tokio::test]
async fn progress_is_cleared_before_terminal_post() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider);

    r.handle_event(channel_event("hello")).await.unwrap();

    let order = slack.order();
    let delete_at = order.iter().position(|&c| c == "delete").expect("no delete");
    let last_post_at = order.iter().rposition(|&c| c == "post").expect("no post");
    assert!(delete_at < last_post_at, "delete must precede terminal post: {order:?}");
    assert_eq!(slack.posts()[0].1, "Thinking...");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn rotation_stops_at_list_end_and_result_still_arrives() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider {
        delay: Duration::from_secs(10),
        ..Default::default()
    });
    let r = responder(slack.clone(), provider);

    r.handle_event(channel_event("slow one")).await.unwrap();

    // two remaining status lines → exactly two updates, then the loop ends
    // and the responder still waits out the full generation
    assert_eq!(
        slack.update_texts(),
        vec!["Still thinking...".to_string(), "Almost there...".to_string()]
    );
    let (_, text, _) = slack.terminal_post();
    assert_eq!(text, "All good.");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn fast_generation_skips_rotation() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider);

    r.handle_event(channel_event("quick")).await.unwrap();

    assert!(slack.update_texts().is_empty());
}

#[tokio::test]
async fn no_progress_message_when_status_lines_empty() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider::default());
    let r = Responder::new(
        slack.clone(),
        provider,
        BotIdentity::new("U0BOT"),
        ResponderSettings {
            status_lines: Vec::new(),
            ..settings()
        },
    );

    r.handle_event(channel_event("hello")).await.unwrap();

    assert_eq!(slack.posts().len(), 1, "only the terminal post expected");
    assert!(!slack.order().contains(&"delete"));
}

#[tokio::test]
async fn failed_progress_post_still_produces_reply() {
    let slack = Arc::new(MockSlack {
        fail_first_post: true,
        ..Default::default()
    });
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider);

    r.handle_event(channel_event("hello")).await.unwrap();

    let posts = slack.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].1, "All good.");
    assert!(!slack.order().contains(&"delete"));
}

#[tokio::test]
async fn failed_delete_does_not_block_terminal() {
    let slack = Arc::new(MockSlack {
        fail_delete: true,
        ..Default::default()
    });
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider);

    r.handle_event(channel_event("hello")).await.unwrap();

    let (_, text, _) = slack.terminal_post();
    assert_eq!(text, "All good.");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_update_does_not_block_terminal() {
    let slack = Arc::new(MockSlack {
        fail_update: true,
        ..Default::default()
    });
    let provider = Arc::new(MockProvider {
        delay: Duration::from_secs(10),
        ..Default::default()
    });
    let r = responder(slack.clone(), provider);

    r.handle_event(channel_event("hello")).await.unwrap();

    let (_, text, _) = slack.terminal_post();
    assert_eq!(text, "All good.");
}

// ── failures ──

#[tokio::test]
async fn generation_error_posts_short_diagnostic() {
    let slack = Arc::new(MockSlack::default());
    let provider = Arc::new(MockProvider {
        fail_message: Some("upstream exploded\nstatus 500 from model host".into()),
        ..Default::default()
    });
    let r = responder(slack.clone(), provider);

    r.handle_event(channel_event("hello")).await.unwrap();

    let (_, text, thread) = slack.terminal_post();
    assert_eq!(text, "Error: status 500 from model host");
    assert_eq!(thread.as_deref(), Some("1699999999.000100"));
    // progress still cleared on the failure path
    assert!(slack.order().contains(&"delete"));
}

#[tokio::test]
async fn terminal_post_failure_surfaces() {
    let slack = Arc::new(MockSlack {
        fail_all_posts: true,
        ..Default::default()
    });
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider);

    let err = r.handle_event(channel_event("hello")).await.unwrap_err();
    assert!(matches!(err, SlackError::Api { method: "chat.postMessage", .. }));
}

// ── context wiring ──

#[tokio::test]
async fn context_reaches_provider_oldest_first_with_roles() {
    let rows = vec![
        HistoryMessage {
            user: Some("U2".into()),
            text: "newest".into(),
            ..Default::default()
        },
        HistoryMessage {
            user: Some("U0BOT".into()),
            text: "my earlier reply".into(),
            ..Default::default()
        },
        HistoryMessage {
            user: Some("U1".into()),
            text: "oldest".into(),
            ..Default::default()
        },
    ];
    let slack = Arc::new(MockSlack {
        history_rows: rows,
        ..Default::default()
    });
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider.clone());

    r.handle_event(channel_event("hello")).await.unwrap();

    let seen = provider.last_context.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].content, "oldest");
    assert_eq!(seen[0].role, Role::User);
    assert_eq!(seen[1].role, Role::Assistant);
    assert_eq!(seen[2].content, "newest");
}

#[tokio::test]
async fn history_failure_still_produces_reply() {
    let slack = Arc::new(MockSlack {
        fail_history: true,
        ..Default::default()
    });
    let provider = Arc::new(MockProvider::default());
    let r = responder(slack.clone(), provider.clone());

    r.handle_event(channel_event("hello")).await.unwrap();

    assert!(provider.last_context.lock().unwrap().is_empty());
    let (_, text, _) = slack.terminal_post();
    assert_eq!(text, "All good.");
}
