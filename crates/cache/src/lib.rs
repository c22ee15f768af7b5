//! Caching for the gateway: named versioned stores, the three serving
//! strategies, and the install/activate lifecycle.
//!
//! Stores are best-effort, not a source of truth. Writes are
//! last-writer-wins with no merge semantics; when two tasks race to refresh
//! the same key, either write may end up visible. Deleting a store detaches
//! it from the registry, so a late background write through a held handle is
//! an orphaned no-op rather than an error.

pub mod fetch;
pub mod lifecycle;
pub mod store;
pub mod strategy;

pub use fetch::{Fetcher, HttpFetcher};
pub use lifecycle::{CacheLifecycle, LifecycleState};
pub use store::{CacheRegistry, CacheStore, MemoryCacheRegistry, MemoryCacheStore};
pub use strategy::{StrategyEngine, StrategyKind};
