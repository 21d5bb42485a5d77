use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_CHAT_PATH: &str = "/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_CONTEXT_LIMIT: usize = 6;
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024; // Slack caps uploads well below this
pub const DEFAULT_MAX_CONCURRENT_EVENTS: usize = 16;

/// Top-level config (confab.toml + CONFAB_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfabConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    pub slack: SlackConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Slack workspace credentials and Web API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`) used for Web API calls and file downloads.
    pub bot_token: String,
    /// Signing secret used to verify inbound event requests.
    pub signing_secret: String,
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,
    /// Files larger than this are never downloaded.
    /// Override with env var: CONFAB_SLACK__MAX_IMAGE_BYTES
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
}

/// OpenAI-compatible LLM endpoint settings.
///
/// Azure-style deployments differ only in `base_url` and `chat_path`
/// (e.g. `/openai/deployments/<name>/chat/completions?api-version=...`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Reply-pipeline tuning: context window, progress rotation, concurrency cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponderConfig {
    /// How many recent channel messages to send as grounding context.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
    /// Seconds between progress-message text rotations.
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
    /// Status lines shown while a reply is being generated, in rotation order.
    /// The first entry is the initial progress message. An empty list disables
    /// the progress message entirely.
    #[serde(default = "default_status_lines")]
    pub status_lines: Vec<String>,
    /// Upper bound on events processed concurrently.
    #[serde(default = "default_max_concurrent_events")]
    pub max_concurrent_events: usize,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            context_limit: default_context_limit(),
            status_interval_secs: default_status_interval_secs(),
            status_lines: default_status_lines(),
            max_concurrent_events: default_max_concurrent_events(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_slack_api_base() -> String {
    DEFAULT_SLACK_API_BASE.to_string()
}
fn default_max_image_bytes() -> u64 {
    DEFAULT_MAX_IMAGE_BYTES
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_llm_base_url() -> String {
    DEFAULT_LLM_BASE_URL.to_string()
}
fn default_chat_path() -> String {
    DEFAULT_CHAT_PATH.to_string()
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_context_limit() -> usize {
    DEFAULT_CONTEXT_LIMIT
}
fn default_status_interval_secs() -> u64 {
    DEFAULT_STATUS_INTERVAL_SECS
}
fn default_max_concurrent_events() -> usize {
    DEFAULT_MAX_CONCURRENT_EVENTS
}

fn default_status_lines() -> Vec<String> {
    [
        "Hmmm, let me think... 👀",
        "Stirring data... 🍵",
        "Sorting bits... 🗂️",
        "Calibrating thoughts... 🧠",
        "Spinning circuits... 🔄",
        "Reticulating splines... ⚙️",
        "That is a hard one... 🤖",
        "Tuning AI... 🎛️",
        "Nearly there... ⏳",
        "Just a bit more......",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl ConfabConfig {
    /// Load config from a TOML file with CONFAB_* env var overrides.
    ///
    /// Env keys nest with a double underscore so values containing `_`
    /// stay addressable, e.g. CONFAB_SLACK__SIGNING_SECRET.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("confab.toml");

        let config: ConfabConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("CONFAB_").split("__"))
            .extract()
            .map_err(|e| crate::error::ConfabError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configs that would only fail later with confusing API errors.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.slack.bot_token.is_empty() {
            return Err(invalid("slack.bot_token is empty"));
        }
        if self.slack.signing_secret.is_empty() {
            return Err(invalid("slack.signing_secret is empty"));
        }
        if self.llm.api_key.is_empty() {
            return Err(invalid("llm.api_key is empty"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> crate::error::ConfabError {
    crate::error::ConfabError::Invalid(msg.to_string())
}
