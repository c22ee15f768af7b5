use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use offgate_common::{OffgateResult, ResponseSnapshot};

/// A named key-value partition of cached response snapshots.
///
/// Keys are normalized request identities (`METHOD url`); values are
/// snapshots stamped with their storage time. Entries are immutable once
/// written and replaced wholesale on refresh.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> OffgateResult<Option<ResponseSnapshot>>;
    async fn put(&self, key: &str, snapshot: ResponseSnapshot) -> OffgateResult<()>;
}

/// Owner of the named stores. Exactly one store per purpose is current at a
/// time; the lifecycle manager evicts the rest on activation.
#[async_trait]
pub trait CacheRegistry: Send + Sync {
    /// Open (creating if absent) the store called `name`.
    async fn open(&self, name: &str) -> OffgateResult<Arc<dyn CacheStore>>;
    /// Names of all existing stores.
    async fn list(&self) -> OffgateResult<Vec<String>>;
    /// Delete the store called `name`; returns whether it existed. Handles
    /// already held by in-flight tasks keep working against the detached
    /// store, whose contents are dropped with the last handle.
    async fn delete(&self, name: &str) -> OffgateResult<bool>;
}

/// In-memory store backed by a concurrent map.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, ResponseSnapshot>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> OffgateResult<Option<ResponseSnapshot>> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    async fn put(&self, key: &str, snapshot: ResponseSnapshot) -> OffgateResult<()> {
        self.entries.insert(key.to_string(), snapshot.stamped());
        Ok(())
    }
}

/// In-memory registry of named stores.
#[derive(Default)]
pub struct MemoryCacheRegistry {
    stores: DashMap<String, Arc<MemoryCacheStore>>,
}

impl MemoryCacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheRegistry for MemoryCacheRegistry {
    async fn open(&self, name: &str) -> OffgateResult<Arc<dyn CacheStore>> {
        let store = self
            .stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCacheStore::new()))
            .clone();
        Ok(store)
    }

    async fn list(&self) -> OffgateResult<Vec<String>> {
        Ok(self.stores.iter().map(|e| e.key().clone()).collect())
    }

    async fn delete(&self, name: &str) -> OffgateResult<bool> {
        Ok(self.stores.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_stamps_and_get_returns_clone() {
        let store = MemoryCacheStore::new();
        store
            .put("GET https://a.test/x", ResponseSnapshot::new(200, vec![], "body"))
            .await
            .unwrap();

        let hit = store.get("GET https://a.test/x").await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert!(hit.stored_at.is_some());
        assert!(store.get("GET https://a.test/y").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_wholesale() {
        let store = MemoryCacheStore::new();
        store
            .put("k", ResponseSnapshot::new(200, vec![("a".into(), "1".into())], "old"))
            .await
            .unwrap();
        store
            .put("k", ResponseSnapshot::new(200, vec![], "new"))
            .await
            .unwrap();

        let hit = store.get("k").await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"new");
        assert!(hit.headers.is_empty());
    }

    #[tokio::test]
    async fn test_registry_open_is_idempotent() {
        let registry = MemoryCacheRegistry::new();
        let a = registry.open("static-v1").await.unwrap();
        a.put("k", ResponseSnapshot::new(200, vec![], "x")).await.unwrap();

        let b = registry.open("static-v1").await.unwrap();
        assert!(b.get("k").await.unwrap().is_some());
        assert_eq!(registry.list().await.unwrap(), vec!["static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_write_after_delete_is_orphaned() {
        let registry = MemoryCacheRegistry::new();
        let handle = registry.open("dynamic-v1").await.unwrap();
        assert!(registry.delete("dynamic-v1").await.unwrap());

        // The held handle still accepts writes, but the registry no longer
        // knows the store; a fresh open sees an empty one.
        handle
            .put("k", ResponseSnapshot::new(200, vec![], "late"))
            .await
            .unwrap();
        let fresh = registry.open("dynamic-v1").await.unwrap();
        assert!(fresh.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_store_is_false() {
        let registry = MemoryCacheRegistry::new();
        assert!(!registry.delete("nope").await.unwrap());
    }
}
