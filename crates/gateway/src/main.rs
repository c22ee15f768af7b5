use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use offgate_cache::{CacheLifecycle, HttpFetcher, MemoryCacheRegistry};
use offgate_classifier::Classifier;
use offgate_common::{AppConfig, GatewayRequest};
use offgate_gateway::Gateway;
use offgate_stats::{LogRing, StatsStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    // Parse command-line args for config path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/offgate.yaml".to_string());

    let config = if std::path::Path::new(&config_path).exists() {
        info!(config_path = %config_path, "loading configuration");
        AppConfig::load(&config_path)?
    } else {
        warn!(config_path = %config_path, "config file not found, using defaults");
        AppConfig::default()
    };

    info!(version = %config.version, "starting offgate");

    // Shared state, injected by construction throughout.
    let stats = Arc::new(StatsStore::new());
    let log = Arc::new(LogRing::new(config.stats.max_log_entries));
    let classifier = Arc::new(Classifier::new(&config.classifier));
    let registry = Arc::new(MemoryCacheRegistry::new());
    let fetcher = Arc::new(HttpFetcher::new()?);

    // Install and activate bracket the operational period: precache the
    // static manifest, then evict stale store generations.
    let lifecycle = CacheLifecycle::new(&config, registry.clone(), fetcher.clone(), log.clone());
    lifecycle.install().await?;
    lifecycle.activate().await?;

    let gateway = Arc::new(Gateway::new(
        &config,
        classifier.clone(),
        stats.clone(),
        log.clone(),
        fetcher,
        registry,
    ));

    // Control channel plus the interception endpoint for embedding hosts
    // that talk to the gateway over loopback instead of linking it in.
    let control_state = offgate_control::new_shared_state(classifier, stats, log);
    let app = offgate_control::build_router(control_state, config.control.cors).merge(
        Router::new()
            .route("/gateway/fetch", post(intercept))
            .with_state(gateway),
    );

    let listener = tokio::net::TcpListener::bind(&config.control.listen).await?;
    info!(addr = %config.control.listen, "offgate listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// POST /gateway/fetch
///
/// Drive one request through the gateway and relay the resulting snapshot
/// as a raw HTTP response.
async fn intercept(State(gateway): State<Arc<Gateway>>, Json(request): Json<GatewayRequest>) -> Response {
    let snapshot = gateway.handle(&request).await;

    let mut builder = axum::http::Response::builder().status(snapshot.status);
    for (name, value) in &snapshot.headers {
        builder = builder.header(name, value);
    }
    match builder.body(axum::body::Body::from(snapshot.body.clone())) {
        Ok(response) => response.into_response(),
        Err(e) => {
            warn!(error = %e, "failed to relay gateway response");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
