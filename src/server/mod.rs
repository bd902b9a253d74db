//! HTTP surface (Axum): Slack Events API intake plus liveness and health.

pub mod error;
pub mod handler;
pub mod health;
pub mod state;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::ServerError;
pub use handler::{HealthResponse, health_handler, slack_events_handler, up_handler};
pub use health::{HealthProbe, StoreProbe, TierProbe, TransportProbe};
pub use state::AppState;

pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/slack/events", post(slack_events_handler))
        .route("/api/up", get(up_handler))
        .route("/api/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
