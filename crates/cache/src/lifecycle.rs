use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use offgate_common::{AppConfig, GatewayRequest, OffgateResult};
use offgate_stats::LogRing;

use crate::fetch::Fetcher;
use crate::store::{CacheRegistry, CacheStore};

/// Lifecycle states bracketing the gateway's operational period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
}

/// Owns the named, versioned cache stores across install/activate events.
///
/// Install pre-populates the static store from the precache manifest with
/// all-settled semantics: each entry is fetched independently and per-entry
/// failures are logged as warnings without aborting the batch. Activate
/// evicts every store whose name is not the current generation's static or
/// dynamic name.
pub struct CacheLifecycle {
    registry: Arc<dyn CacheRegistry>,
    fetcher: Arc<dyn Fetcher>,
    log: Arc<LogRing>,
    origin: String,
    precache_manifest: Vec<String>,
    static_name: String,
    dynamic_name: String,
    state: RwLock<LifecycleState>,
}

impl CacheLifecycle {
    pub fn new(
        config: &AppConfig,
        registry: Arc<dyn CacheRegistry>,
        fetcher: Arc<dyn Fetcher>,
        log: Arc<LogRing>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            log,
            origin: config.cache.origin.trim_end_matches('/').to_string(),
            precache_manifest: config.cache.precache_manifest.clone(),
            static_name: config.static_store_name(),
            dynamic_name: config.dynamic_store_name(),
            state: RwLock::new(LifecycleState::Uninstalled),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read().expect("lifecycle state lock poisoned")
    }

    fn set_state(&self, state: LifecycleState) {
        *self.state.write().expect("lifecycle state lock poisoned") = state;
    }

    pub fn static_store_name(&self) -> &str {
        &self.static_name
    }

    pub fn dynamic_store_name(&self) -> &str {
        &self.dynamic_name
    }

    /// Cache key under which a manifest path is precached, and under which
    /// the fallback handler finds the root document.
    pub fn precache_key(&self, path: &str) -> String {
        format!("GET {}{}", self.origin, path)
    }

    /// Pre-populate the static store from the manifest. Always succeeds even
    /// if every entry fails; returns only on registry errors.
    pub async fn install(&self) -> OffgateResult<()> {
        self.set_state(LifecycleState::Installing);
        tracing::info!(store = %self.static_name, entries = self.precache_manifest.len(), "installing");

        let store = self.registry.open(&self.static_name).await?;
        let mut stored = 0usize;

        for path in &self.precache_manifest {
            let url = format!("{}{}", self.origin, path);
            let request = GatewayRequest::get(url);

            match self.fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => {
                    match store.put(&request.cache_key(), response).await {
                        Ok(()) => stored += 1,
                        Err(e) => self.log.warn(
                            "precache write failed",
                            Some(serde_json::json!({ "path": path, "error": e.to_string() })),
                        ),
                    }
                }
                Ok(response) => {
                    self.log.warn(
                        "precache entry returned non-success status",
                        Some(serde_json::json!({ "path": path, "status": response.status })),
                    );
                }
                Err(e) => {
                    self.log.warn(
                        "precache entry fetch failed",
                        Some(serde_json::json!({ "path": path, "error": e.to_string() })),
                    );
                }
            }
        }

        tracing::info!(
            stored,
            total = self.precache_manifest.len(),
            "install complete"
        );
        self.set_state(LifecycleState::Installed);
        Ok(())
    }

    /// Evict every store of a stale generation, then provision the current
    /// static and dynamic stores. After this returns, no request is served
    /// by a stale-generation store.
    pub async fn activate(&self) -> OffgateResult<()> {
        self.set_state(LifecycleState::Activating);

        for name in self.registry.list().await? {
            if name != self.static_name && name != self.dynamic_name {
                if self.registry.delete(&name).await? {
                    tracing::info!(store = %name, "evicted stale cache store");
                    self.log.info(
                        "evicted stale cache store",
                        Some(serde_json::json!({ "store": name })),
                    );
                }
            }
        }

        self.registry.open(&self.static_name).await?;
        self.registry.open(&self.dynamic_name).await?;

        self.set_state(LifecycleState::Active);
        tracing::info!(
            static_store = %self.static_name,
            dynamic_store = %self.dynamic_name,
            "activated"
        );
        Ok(())
    }
}
