use axum::{
    routing::{get, post},
    Router,
};
use confab_core::ConfabConfig;
use confab_slack::{BotIdentity, Responder, ResponderSettings, SlackClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: ConfabConfig,
    pub identity: BotIdentity,
    pub responder: Responder<SlackClient>,
    /// Caps concurrently processed events; spawned handlers queue here so a
    /// redelivery burst cannot pile up unbounded generation work.
    pub event_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(
        config: ConfabConfig,
        identity: BotIdentity,
        responder: Responder<SlackClient>,
    ) -> Self {
        let slots = config.responder.max_concurrent_events.max(1);
        Self {
            config,
            identity,
            responder,
            event_slots: Arc::new(Semaphore::new(slots)),
        }
    }
}

/// Map config onto the responder's runtime settings.
pub fn responder_settings(config: &ConfabConfig) -> ResponderSettings {
    ResponderSettings {
        status_lines: config.responder.status_lines.clone(),
        rotation_interval: Duration::from_secs(config.responder.status_interval_secs),
        context_limit: config.responder.context_limit,
        max_image_bytes: config.slack.max_image_bytes,
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/events", post(crate::http::events::events_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
