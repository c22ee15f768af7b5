//! Out-of-band control channel for diagnostics.
//!
//! The channel itself is transport-agnostic: [`dispatch`] maps a JSON
//! command to an optional [`ControlResponse`]. Malformed or unknown commands
//! are logged and ignored — the channel stays open and no error is sent.
//! [`build_router`] wraps the channel in an axum router, together with
//! direct stats/logs/metrics routes; the gateway binary merges that router
//! into its own server.

pub mod messages;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use messages::{dispatch, ControlCommand, ControlResponse, DEFAULT_LOG_LIMIT};
pub use state::{ControlState, SharedState};

/// Build the axum router with all control routes and middleware.
pub fn build_router(state: SharedState, cors: bool) -> Router {
    let router = Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/control", post(routes::control))
        .route("/api/stats", get(routes::get_stats))
        .route("/api/logs", get(routes::get_logs))
        .route("/api/metrics", get(routes::get_metrics))
        .with_state(state);

    if cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Convenience constructor for the shared control state.
pub fn new_shared_state(
    classifier: Arc<offgate_classifier::Classifier>,
    stats: Arc<offgate_stats::StatsStore>,
    log: Arc<offgate_stats::LogRing>,
) -> SharedState {
    Arc::new(ControlState {
        classifier,
        stats,
        log,
    })
}
