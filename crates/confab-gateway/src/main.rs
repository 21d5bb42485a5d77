use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

mod app;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confab_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: CONFAB_CONFIG env > ./confab.toml
    let config_path = std::env::var("CONFAB_CONFIG").ok();
    let config = confab_core::ConfabConfig::load(config_path.as_deref())
        .context("loading configuration")?;

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let slack = confab_slack::SlackClient::new(
        config.slack.bot_token.clone(),
        Some(config.slack.api_base.clone()),
    );

    // One auth.test at startup pins the bot's own user id; the filter needs
    // it to break the reply feedback loop.
    let identity = confab_slack::BotIdentity::resolve(&slack)
        .await
        .context("resolving bot identity via auth.test")?;

    let provider: Arc<dyn confab_agent::LlmProvider> = Arc::new(
        confab_agent::OpenAiProvider::with_path(
            config.llm.api_key.clone(),
            config.llm.model.clone(),
            config.llm.base_url.clone(),
            config.llm.chat_path.clone(),
        )
        .max_tokens(config.llm.max_tokens),
    );
    info!(model = %config.llm.model, base_url = %config.llm.base_url, "LLM provider ready");

    let responder = confab_slack::Responder::new(
        Arc::new(slack),
        provider,
        identity.clone(),
        app::responder_settings(&config),
    );

    let state = Arc::new(app::AppState::new(config, identity, responder));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("confab gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
