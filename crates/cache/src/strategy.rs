use std::sync::Arc;

use serde::{Deserialize, Serialize};

use offgate_common::{synthetic, GatewayRequest, ResponseSnapshot};
use offgate_stats::LogRing;

use crate::fetch::Fetcher;
use crate::store::CacheStore;

/// The three serving strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

/// Executes the caching strategies against a store and the injected fetcher.
///
/// Every path terminates in a response snapshot; transport and store
/// failures are converted to synthetic responses, never propagated.
pub struct StrategyEngine {
    fetcher: Arc<dyn Fetcher>,
    log: Arc<LogRing>,
}

impl StrategyEngine {
    pub fn new(fetcher: Arc<dyn Fetcher>, log: Arc<LogRing>) -> Self {
        Self { fetcher, log }
    }

    pub async fn dispatch(
        &self,
        kind: StrategyKind,
        request: &GatewayRequest,
        store: Arc<dyn CacheStore>,
    ) -> ResponseSnapshot {
        match kind {
            StrategyKind::CacheFirst => self.cache_first(request, store).await,
            StrategyKind::NetworkFirst => self.network_first(request, store).await,
            StrategyKind::StaleWhileRevalidate => self.stale_while_revalidate(request, store).await,
        }
    }

    /// Serve from cache when possible; the network is touched only on a
    /// miss. Only exact 200 responses are written back.
    pub async fn cache_first(
        &self,
        request: &GatewayRequest,
        store: Arc<dyn CacheStore>,
    ) -> ResponseSnapshot {
        let key = request.cache_key();

        match store.get(&key).await {
            Ok(Some(hit)) => return hit,
            Ok(None) => {}
            // A broken store read is a miss for this strategy.
            Err(e) => tracing::warn!(key = %key, error = %e, "cache-first store read failed"),
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    if let Err(e) = store.put(&key, response.clone()).await {
                        tracing::warn!(key = %key, error = %e, "cache-first store write failed");
                    }
                }
                response
            }
            Err(e) => {
                self.log.warn(
                    "cache-first fetch failed, serving timeout response",
                    Some(serde_json::json!({ "url": request.url, "error": e.to_string() })),
                );
                synthetic::timeout()
            }
        }
    }

    /// Try the network first, falling back to cache. A failing store lookup
    /// during fallback is reported as a 500-class response, distinct from
    /// the 408-class "no network, no cache" outcome.
    pub async fn network_first(
        &self,
        request: &GatewayRequest,
        store: Arc<dyn CacheStore>,
    ) -> ResponseSnapshot {
        let key = request.cache_key();

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    if let Err(e) = store.put(&key, response.clone()).await {
                        tracing::warn!(key = %key, error = %e, "network-first store write failed");
                    }
                }
                response
            }
            Err(fetch_err) => match store.get(&key).await {
                Ok(Some(hit)) => {
                    tracing::debug!(key = %key, "network-first falling back to cache");
                    hit
                }
                Ok(None) => {
                    self.log.warn(
                        "network-first: no network, no cache",
                        Some(serde_json::json!({ "url": request.url, "error": fetch_err.to_string() })),
                    );
                    synthetic::timeout()
                }
                Err(store_err) => {
                    self.log.error(
                        "network-first: fetch and cache store both failed",
                        Some(serde_json::json!({
                            "url": request.url,
                            "fetch_error": fetch_err.to_string(),
                            "store_error": store_err.to_string(),
                        })),
                    );
                    synthetic::store_failure()
                }
            },
        }
    }

    /// Return the cached entry immediately when present, refreshing it in a
    /// detached task. Background refreshes are best effort: failures are
    /// logged and swallowed, completion is never awaited.
    pub async fn stale_while_revalidate(
        &self,
        request: &GatewayRequest,
        store: Arc<dyn CacheStore>,
    ) -> ResponseSnapshot {
        let key = request.cache_key();

        let cached = match store.get(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "stale-while-revalidate store read failed");
                None
            }
        };

        if let Some(hit) = cached {
            self.spawn_refresh(request.clone(), store);
            return hit;
        }

        // Nothing to serve immediately; wait on the network.
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    if let Err(e) = store.put(&key, response.clone()).await {
                        tracing::warn!(key = %key, error = %e, "stale-while-revalidate store write failed");
                    }
                }
                response
            }
            Err(e) => {
                // A racing task may have populated the entry meanwhile.
                if let Ok(Some(hit)) = store.get(&key).await {
                    return hit;
                }
                self.log.warn(
                    "stale-while-revalidate fetch failed with empty cache",
                    Some(serde_json::json!({ "url": request.url, "error": e.to_string() })),
                );
                synthetic::timeout()
            }
        }
    }

    /// Fire-and-forget refresh. A write landing after the store was evicted
    /// goes into the detached store and is dropped with it.
    fn spawn_refresh(&self, request: GatewayRequest, store: Arc<dyn CacheStore>) {
        let fetcher = self.fetcher.clone();
        tokio::spawn(async move {
            let key = request.cache_key();
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    if let Err(e) = store.put(&key, response).await {
                        tracing::debug!(key = %key, error = %e, "background refresh write failed");
                    }
                }
                Ok(response) => {
                    tracing::debug!(key = %key, status = response.status, "background refresh not cacheable");
                }
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "background refresh failed");
                }
            }
        });
    }
}
