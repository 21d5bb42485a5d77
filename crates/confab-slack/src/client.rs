//! Slack Web API client.
//!
//! `SlackApi` is the capability seam the responder and context fetcher are
//! written against; `SlackClient` is the production implementation over
//! reqwest. Slack reports API failures inside a 200 response as
//! `"ok": false`, so every call checks the envelope, not just the status.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::SlackError;

const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Address of a posted message, as returned by `chat.postMessage`.
#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

/// One raw row from `conversations.history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryMessage {
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Chat read/write and file download against one Slack workspace.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Post a message; `thread_ts` attaches it to an existing thread.
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, SlackError>;

    /// Replace the text of an existing message.
    async fn update_message(&self, channel: &str, ts: &str, text: &str)
        -> Result<(), SlackError>;

    /// Delete a message.
    async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), SlackError>;

    /// Fetch the latest `limit` messages of a channel, newest first.
    async fn fetch_history(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>, SlackError>;

    /// Download a file the bot token is entitled to read (`url_private`).
    async fn download_file(&self, url: &str) -> Result<Vec<u8>, SlackError>;
}

pub struct SlackClient {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl SlackClient {
    pub fn new(token: String, api_base: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        }
    }

    /// Resolve the user id behind this bot token (`auth.test`).
    pub async fn auth_test(&self) -> Result<String, SlackError> {
        let resp: AuthTestResponse = self.api_post("auth.test", json!({})).await?;
        check("auth.test", resp.ok, resp.error)?;
        resp.user_id.ok_or(SlackError::Api {
            method: "auth.test",
            reason: "response missing user_id".to_string(),
        })
    }

    async fn api_post<T: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        body: serde_json::Value,
    ) -> Result<T, SlackError> {
        let url = format!("{}/{}", self.api_base, method);
        debug!(method, "calling Slack API");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, SlackError> {
        let mut body = json!({
            "channel": channel,
            "text": text,
        });
        if let Some(thread) = thread_ts {
            body["thread_ts"] = json!(thread);
        }
        let resp: PostMessageResponse = self.api_post("chat.postMessage", body).await?;
        check("chat.postMessage", resp.ok, resp.error)?;
        let ts = resp.ts.ok_or(SlackError::Api {
            method: "chat.postMessage",
            reason: "response missing ts".to_string(),
        })?;
        Ok(PostedMessage {
            channel: resp.channel.unwrap_or_else(|| channel.to_string()),
            ts,
        })
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        text: &str,
    ) -> Result<(), SlackError> {
        let body = json!({"channel": channel, "ts": ts, "text": text});
        let resp: Envelope = self.api_post("chat.update", body).await?;
        check("chat.update", resp.ok, resp.error)
    }

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<(), SlackError> {
        let body = json!({"channel": channel, "ts": ts});
        let resp: Envelope = self.api_post("chat.delete", body).await?;
        check("chat.delete", resp.ok, resp.error)
    }

    async fn fetch_history(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>, SlackError> {
        let url = format!("{}/conversations.history", self.api_base);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("channel", channel), ("limit", &limit.to_string())])
            .send()
            .await?
            .error_for_status()?;
        let resp: HistoryResponse = resp.json().await?;
        check("conversations.history", resp.ok, resp.error)?;
        Ok(resp.messages)
    }

    async fn download_file(&self, url: &str) -> Result<Vec<u8>, SlackError> {
        debug!(url, "downloading file");
        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SlackError::Download {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

fn check(method: &'static str, ok: bool, error: Option<String>) -> Result<(), SlackError> {
    if ok {
        Ok(())
    } else {
        Err(SlackError::Api {
            method,
            reason: error.unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

// Slack API response envelopes (private — deserialization only).

#[derive(Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    channel: Option<String>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Deserialize)]
struct AuthTestResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}
