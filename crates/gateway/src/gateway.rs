use std::sync::Arc;

use offgate_cache::{CacheRegistry, CacheStore, Fetcher, StrategyEngine};
use offgate_classifier::Classifier;
use offgate_common::{synthetic, AppConfig, Destination, GatewayRequest, OffgateResult, ResponseSnapshot};
use offgate_stats::{LogRing, StatsStore};

use crate::router::{route, RouteDecision, StorePurpose};

/// The interception entry point. Sits in front of the outbound stack inside
/// the client process: classify, maybe deny, otherwise serve through a
/// caching strategy, and fall back rather than fail.
pub struct Gateway {
    classifier: Arc<Classifier>,
    stats: Arc<StatsStore>,
    log: Arc<LogRing>,
    engine: StrategyEngine,
    registry: Arc<dyn CacheRegistry>,
    static_name: String,
    dynamic_name: String,
    root_document_key: String,
}

impl Gateway {
    pub fn new(
        config: &AppConfig,
        classifier: Arc<Classifier>,
        stats: Arc<StatsStore>,
        log: Arc<LogRing>,
        fetcher: Arc<dyn Fetcher>,
        registry: Arc<dyn CacheRegistry>,
    ) -> Self {
        let origin = config.cache.origin.trim_end_matches('/');
        Self {
            classifier,
            stats,
            log: log.clone(),
            engine: StrategyEngine::new(fetcher, log),
            registry,
            static_name: config.static_store_name(),
            dynamic_name: config.dynamic_store_name(),
            root_document_key: format!("GET {}/", origin),
        }
    }

    /// Handle one outbound request. Never returns an error: blocked requests
    /// get a deny response, strategy failures become synthetic responses, and
    /// anything unexpected lands in the fallback handler.
    pub async fn handle(&self, request: &GatewayRequest) -> ResponseSnapshot {
        let result = self.classifier.classify(&request.url, Some(&request.meta()));
        self.stats.record(
            result.match_type.as_str(),
            result.match_id.as_deref(),
            result.should_block,
        );

        if result.should_block {
            tracing::debug!(url = %request.url, reason = %result.reason, "blocking request");
            self.log.info(
                "blocked request",
                Some(serde_json::json!({
                    "url": request.url,
                    "matchType": result.match_type.as_str(),
                    "reason": result.reason,
                })),
            );
            return synthetic::deny(&result.reason);
        }

        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(url = %request.url, error = %e, "dispatch failed, using fallback");
                self.log.error(
                    "dispatch failed",
                    Some(serde_json::json!({ "url": request.url, "error": e.to_string() })),
                );
                self.fallback(request).await
            }
        }
    }

    async fn dispatch(&self, request: &GatewayRequest) -> OffgateResult<ResponseSnapshot> {
        match route(&request.path()) {
            RouteDecision::SyntheticNotFound => Ok(synthetic::api_not_found()),
            RouteDecision::Strategy { kind, purpose } => {
                let name = match purpose {
                    StorePurpose::Static => &self.static_name,
                    StorePurpose::Dynamic => &self.dynamic_name,
                };
                let store = self.registry.open(name).await?;
                Ok(self.engine.dispatch(kind, request, store).await)
            }
        }
    }

    /// Last resort after an unexpected dispatch error. Navigational documents
    /// get the precached root document when available; everything else a
    /// generic network-error response. Lookup failures degrade to the same
    /// generic response — this handler cannot fail.
    async fn fallback(&self, request: &GatewayRequest) -> ResponseSnapshot {
        if request.destination == Destination::Document {
            if let Ok(store) = self.registry.open(&self.static_name).await {
                if let Ok(Some(root)) = store.get(&self.root_document_key).await {
                    return root;
                }
            }
        }
        synthetic::timeout()
    }
}
