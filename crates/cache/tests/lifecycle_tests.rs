use std::sync::Arc;

use async_trait::async_trait;

use offgate_cache::{
    CacheLifecycle, CacheRegistry, CacheStore, Fetcher, LifecycleState, MemoryCacheRegistry,
};
use offgate_common::{AppConfig, GatewayRequest, OffgateError, OffgateResult, ResponseSnapshot};
use offgate_stats::{LogLevel, LogRing};

/// Fetcher serving 200s except for paths listed as missing.
struct ManifestFetcher {
    missing: Vec<String>,
}

#[async_trait]
impl Fetcher for ManifestFetcher {
    async fn fetch(&self, request: &GatewayRequest) -> OffgateResult<ResponseSnapshot> {
        if self.missing.iter().any(|m| request.url.ends_with(m)) {
            return Err(OffgateError::Fetch(format!("not found: {}", request.url)));
        }
        Ok(ResponseSnapshot::new(200, vec![], "asset"))
    }
}

fn config_v(version: &str, manifest: Vec<&str>) -> AppConfig {
    let mut config = AppConfig::default();
    config.version = version.to_string();
    config.cache.origin = "https://app.test".to_string();
    config.cache.precache_manifest = manifest.into_iter().map(String::from).collect();
    config
}

fn lifecycle(
    config: &AppConfig,
    registry: Arc<MemoryCacheRegistry>,
    missing: Vec<&str>,
) -> (CacheLifecycle, Arc<LogRing>) {
    let log = Arc::new(LogRing::new(100));
    let fetcher = Arc::new(ManifestFetcher {
        missing: missing.into_iter().map(String::from).collect(),
    });
    (
        CacheLifecycle::new(config, registry, fetcher, log.clone()),
        log,
    )
}

#[tokio::test]
async fn test_install_precaches_manifest() {
    let config = config_v("v1", vec!["/", "/index.html", "/assets/app.js"]);
    let registry = Arc::new(MemoryCacheRegistry::new());
    let (lifecycle, log) = lifecycle(&config, registry.clone(), vec![]);

    assert_eq!(lifecycle.state(), LifecycleState::Uninstalled);
    lifecycle.install().await.unwrap();
    assert_eq!(lifecycle.state(), LifecycleState::Installed);

    let store = registry.open("static-v1").await.unwrap();
    for path in ["/", "/index.html", "/assets/app.js"] {
        let key = lifecycle.precache_key(path);
        assert!(store.get(&key).await.unwrap().is_some(), "missing {}", path);
    }
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_install_tolerates_one_missing_entry() {
    let config = config_v(
        "v1",
        vec!["/", "/index.html", "/manifest.json", "/assets/app.js", "/assets/app.css"],
    );
    let registry = Arc::new(MemoryCacheRegistry::new());
    let (lifecycle, log) = lifecycle(&config, registry.clone(), vec!["/manifest.json"]);

    lifecycle.install().await.unwrap();

    let store = registry.open("static-v1").await.unwrap();
    assert!(store
        .get(&lifecycle.precache_key("/assets/app.css"))
        .await
        .unwrap()
        .is_some());
    assert!(store
        .get(&lifecycle.precache_key("/manifest.json"))
        .await
        .unwrap()
        .is_none());

    // Exactly one warning, for the missing file only.
    let warnings = log.recent(100);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, LogLevel::Warn);
    assert_eq!(warnings[0].data.as_ref().unwrap()["path"], "/manifest.json");
}

#[tokio::test]
async fn test_install_succeeds_when_every_entry_fails() {
    let config = config_v("v1", vec!["/a", "/b", "/c"]);
    let registry = Arc::new(MemoryCacheRegistry::new());
    let (lifecycle, log) = lifecycle(&config, registry, vec!["/a", "/b", "/c"]);

    assert!(lifecycle.install().await.is_ok());
    assert_eq!(lifecycle.state(), LifecycleState::Installed);
    assert_eq!(log.recent(100).len(), 3);
}

#[tokio::test]
async fn test_activation_evicts_exactly_stale_stores() {
    let registry = Arc::new(MemoryCacheRegistry::new());
    registry.open("static-v1").await.unwrap();
    registry.open("dynamic-v1").await.unwrap();
    registry.open("static-v2").await.unwrap();

    let config = config_v("v2", vec![]);
    let (lifecycle, _) = lifecycle(&config, registry.clone(), vec![]);

    lifecycle.activate().await.unwrap();
    assert_eq!(lifecycle.state(), LifecycleState::Active);

    let mut names = registry.list().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["dynamic-v2".to_string(), "static-v2".to_string()]);
}

#[tokio::test]
async fn test_activation_is_idempotent() {
    let registry = Arc::new(MemoryCacheRegistry::new());
    let config = config_v("v2", vec![]);
    let (lifecycle, _) = lifecycle(&config, registry.clone(), vec![]);

    lifecycle.activate().await.unwrap();
    lifecycle.activate().await.unwrap();

    let mut names = registry.list().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["dynamic-v2".to_string(), "static-v2".to_string()]);
}
