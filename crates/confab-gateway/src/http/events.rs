//! Slack Events API ingress — POST /events.
//!
//! Per-request order: parse the envelope, answer the one-time URL
//! verification handshake, verify the signature over the raw body bytes,
//! filter, then hand qualifying message events to the responder on a
//! background task. The 200 ack goes out before any generation work runs.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use confab_slack::event::{EventEnvelope, MessageEvent};
use confab_slack::filter::{self, Disposition};
use confab_slack::signature::{self, SignatureError};

use crate::app::AppState;

/// Slack redeliveries carry the attempt number in this header.
const RETRY_HEADER: &str = "x-slack-retry-num";

// ── Public handler ────────────────────────────────────────────────────────────

pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let envelope: EventEnvelope = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "invalid JSON in event body");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid JSON body"})),
        )
    })?;

    // The handshake arrives before Slack will deliver anything else and is
    // answered without verification, per the platform contract.
    let event = match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            info!("answering url_verification handshake");
            return Ok(challenge.into_response());
        }
        EventEnvelope::EventCallback { event } => Some(event),
        EventEnvelope::Other => None,
    };

    verify_signature(&state, &headers, &body).map_err(reject)?;

    if let Some(retry) = header_str(&headers, RETRY_HEADER) {
        info!(retry, "redelivered event");
    }

    let Some(event) = event else {
        debug!("unhandled envelope kind; acknowledged");
        return Ok("ok".into_response());
    };

    match filter::disposition(&event, &state.identity) {
        Disposition::Ignore(reason) => {
            debug!(%reason, channel = %event.channel, "event ignored");
        }
        Disposition::Process => {
            let receipt = uuid::Uuid::new_v4();
            info!(%receipt, channel = %event.channel, ts = %event.ts, "event accepted");
            spawn_responder(&state, event, receipt);
        }
    }

    Ok("ok".into_response())
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Run the responder on a background task so the ack never waits on LLM
/// latency. Concurrency is bounded by the state semaphore; a redelivery
/// burst queues here instead of piling up generation work.
fn spawn_responder(state: &Arc<AppState>, event: MessageEvent, receipt: uuid::Uuid) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        let _permit = match Arc::clone(&state.event_slots).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return, // semaphore closed, shutting down
        };
        if let Err(e) = state.responder.handle_event(event).await {
            tracing::error!(%receipt, error = %e, "terminal reply failed");
        }
    });
}

// ── Verification helpers ──────────────────────────────────────────────────────

fn verify_signature(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), SignatureError> {
    signature::verify(
        &state.config.slack.signing_secret,
        body,
        header_str(headers, signature::TIMESTAMP_HEADER),
        header_str(headers, signature::SIGNATURE_HEADER),
        chrono::Utc::now().timestamp(),
    )
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn reject(err: SignatureError) -> (StatusCode, Json<Value>) {
    warn!(reason = %err, "request verification failed");
    let status = match err {
        SignatureError::Mismatch => StatusCode::UNAUTHORIZED,
        SignatureError::MissingHeaders | SignatureError::StaleTimestamp => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(json!({"error": "verification failed", "reason": err.to_string()})),
    )
}
