use std::collections::BTreeMap;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::error::ServerError;
use super::state::AppState;
use crate::bot::Bot;
use crate::slack::{
    EventEnvelope, SIGNATURE_HEADER, SignatureError, SlackEvent, TIMESTAMP_HEADER,
    verify_signature,
};

/// Set by Slack on redelivered events.
pub const RETRY_NUM_HEADER: &str = "x-slack-retry-num";

pub const SERVICE_CONNECTED: &str = "connected";
pub const SERVICE_DISCONNECTED: &str = "disconnected";

#[derive(Debug, Serialize)]
pub struct UpResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: f64,
    pub services: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
struct ChallengeResponse {
    challenge: String,
}

pub async fn up_handler() -> Json<UpResponse> {
    Json(UpResponse {
        status: "server is up",
    })
}

#[instrument(skip(state))]
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let mut services = BTreeMap::new();
    services.insert("server", "up");

    let mut healthy = true;
    for probe in state.probes.iter() {
        let connected = tokio::time::timeout(state.probe_timeout, probe.is_healthy())
            .await
            .unwrap_or(false);

        if !connected {
            warn!(service = probe.name(), "Health probe failed");
            healthy &= !probe.required();
        }

        services.insert(
            probe.name(),
            if connected {
                SERVICE_CONNECTED
            } else {
                SERVICE_DISCONNECTED
            },
        );
    }

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" },
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime: state.started_at.elapsed().as_secs_f64(),
            services,
        }),
    )
        .into_response()
}

/// Events API endpoint. Acknowledges immediately; bot work runs detached.
#[instrument(skip(state, headers, body), fields(event_id = tracing::field::Empty))]
pub async fn slack_events_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ServerError> {
    if let Some(secret) = state.signing_secret.as_deref() {
        verify_request(secret, &headers, &body, chrono::Utc::now().timestamp())?;
    }

    let envelope: EventEnvelope = serde_json::from_slice(&body)
        .map_err(|e| ServerError::InvalidRequest(format!("invalid event payload: {}", e)))?;

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            info!("Answering URL verification challenge");
            Ok(Json(ChallengeResponse { challenge }).into_response())
        }
        EventEnvelope::EventCallback { event, event_id } => {
            if let Some(id) = event_id.as_deref() {
                tracing::Span::current().record("event_id", id);
            }

            if let Some(retry) = header_str(&headers, RETRY_NUM_HEADER) {
                debug!(retry = %retry, "Acknowledging redelivered event");
                return Ok(StatusCode::OK.into_response());
            }

            spawn_event(state.bot.clone(), event);
            Ok(StatusCode::OK.into_response())
        }
        EventEnvelope::Unsupported => {
            debug!("Ignoring unsupported envelope");
            Ok(StatusCode::OK.into_response())
        }
    }
}

pub(crate) fn verify_request(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
    now_unix: i64,
) -> Result<(), SignatureError> {
    let timestamp = header_str(headers, TIMESTAMP_HEADER)
        .ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
    let signature = header_str(headers, SIGNATURE_HEADER)
        .ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;

    verify_signature(secret, timestamp, signature, body, now_unix)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn spawn_event(bot: Bot, event: SlackEvent) {
    tokio::spawn(async move {
        match event {
            SlackEvent::Message(message) => {
                let outcome = bot.handle_message(&message).await;
                debug!(?outcome, "Message handled");
            }
            SlackEvent::AppMention(message) => {
                if let Err(e) = bot.handle_mention(&message).await {
                    warn!(error = %e, "Failed to answer mention");
                }
            }
            SlackEvent::Other => debug!("Ignoring unsupported event"),
        }
    });
}
