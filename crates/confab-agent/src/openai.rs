use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::provider::{ChatTurn, LlmProvider, ProviderError};

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const VISION_SYSTEM_PROMPT: &str = "You are a vision-capable assistant.";

const TEMPERATURE: f32 = 0.7;

/// Prompt used when an image arrives with no accompanying text.
const DESCRIBE_IMAGE_PROMPT: &str = "Please describe this image:";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    chat_path: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
            chat_path: "/v1/chat/completions".to_string(),
            model,
            max_tokens: 1024,
        }
    }

    /// Construct with an explicit chat completions path. Azure-style
    /// gateways put the deployment name and api-version in the path.
    pub fn with_path(api_key: String, model: String, base_url: String, chat_path: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            chat_path,
            model,
            max_tokens: 1024,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_messages(&self, system_prompt: &str, context: &[ChatTurn], user_turn: Value) -> Vec<Value> {
        let mut messages = vec![json!({
            "role": "system",
            "content": system_prompt,
        })];

        for turn in context {
            messages.push(json!({
                "role": turn.role,
                "content": turn.content,
            }));
        }

        messages.push(user_turn);
        messages
    }

    async fn send_chat(&self, messages: Vec<Value>) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": TEMPERATURE,
        });
        let url = format!("{}{}", self.base_url, self.chat_path);

        debug!(model = %self.model, "sending chat completion request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000) // convert seconds to ms
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "chat completion API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content = api_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_text(
        &self,
        text: &str,
        context: &[ChatTurn],
    ) -> Result<String, ProviderError> {
        let user_turn = json!({
            "role": "user",
            "content": text,
        });
        self.send_chat(self.build_messages(SYSTEM_PROMPT, context, user_turn))
            .await
    }

    async fn complete_image(
        &self,
        image_base64: &str,
        mime_type: &str,
        text: &str,
        context: &[ChatTurn],
    ) -> Result<String, ProviderError> {
        let user_turn = vision_turn(image_base64, mime_type, text);
        self.send_chat(self.build_messages(VISION_SYSTEM_PROMPT, context, user_turn))
            .await
    }
}

/// Build the two-part user turn for a vision request: the text prompt plus
/// the image as a base64 data URL.
fn vision_turn(image_base64: &str, mime_type: &str, text: &str) -> Value {
    let prompt = if text.trim().is_empty() {
        DESCRIBE_IMAGE_PROMPT
    } else {
        text
    };
    json!({
        "role": "user",
        "content": [
            {"type": "text", "text": prompt},
            {
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{mime_type};base64,{image_base64}"),
                },
            },
        ],
    })
}

// API response types (private — deserialization only)

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
