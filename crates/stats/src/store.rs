use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use serde::{Deserialize, Serialize};

/// How many blocked-id entries a snapshot reports at most.
const TOP_BLOCKED_LIMIT: usize = 10;

/// Point-in-time view of the gateway's classification counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub allowed_requests: u64,
    pub match_type_counts: BTreeMap<String, u64>,
    pub top_blocked_ids: BTreeMap<String, u64>,
    pub started_at: DateTime<Utc>,
    pub last_reset_at: Option<DateTime<Utc>>,
}

/// Classification counters and blocked-id tallies.
///
/// Accounting rule: every classification increments `total_requests` and
/// exactly one of `blocked_requests` / `allowed_requests`, so
/// `total == blocked + allowed` always holds between resets.
pub struct StatsStore {
    registry: Registry,
    total_requests: IntCounter,
    blocked_requests: IntCounter,
    allowed_requests: IntCounter,
    match_type_counts: DashMap<String, u64>,
    top_blocked_ids: DashMap<String, u64>,
    started_at: DateTime<Utc>,
    last_reset_at: RwLock<Option<DateTime<Utc>>>,
}

impl StatsStore {
    /// Create a new StatsStore with all counters registered against a fresh
    /// prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let total_requests = IntCounter::with_opts(Opts::new(
            "offgate_requests_total",
            "Total number of requests classified",
        ))
        .expect("failed to create requests_total counter");

        let blocked_requests = IntCounter::with_opts(Opts::new(
            "offgate_requests_blocked",
            "Total number of requests blocked by the classifier",
        ))
        .expect("failed to create requests_blocked counter");

        let allowed_requests = IntCounter::with_opts(Opts::new(
            "offgate_requests_allowed",
            "Total number of requests allowed through",
        ))
        .expect("failed to create requests_allowed counter");

        registry
            .register(Box::new(total_requests.clone()))
            .expect("failed to register requests_total");
        registry
            .register(Box::new(blocked_requests.clone()))
            .expect("failed to register requests_blocked");
        registry
            .register(Box::new(allowed_requests.clone()))
            .expect("failed to register requests_allowed");

        Self {
            registry,
            total_requests,
            blocked_requests,
            allowed_requests,
            match_type_counts: DashMap::new(),
            top_blocked_ids: DashMap::new(),
            started_at: Utc::now(),
            last_reset_at: RwLock::new(None),
        }
    }

    /// Record one classification outcome.
    ///
    /// `match_type` is the fired detection stage (`protocol`, `pattern`,
    /// `heuristic`, `whitelist`, `none`); `match_id` the offending source id
    /// when one was extracted.
    pub fn record(&self, match_type: &str, match_id: Option<&str>, blocked: bool) {
        self.total_requests.inc();
        if blocked {
            self.blocked_requests.inc();
        } else {
            self.allowed_requests.inc();
        }

        *self
            .match_type_counts
            .entry(match_type.to_string())
            .or_insert(0) += 1;

        if blocked {
            if let Some(id) = match_id {
                *self.top_blocked_ids.entry(id.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Point-in-time snapshot, safe to call concurrently with `record`.
    pub fn snapshot(&self) -> StatsSnapshot {
        let match_type_counts: BTreeMap<String, u64> = self
            .match_type_counts
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();

        let mut blocked: Vec<(String, u64)> = self
            .top_blocked_ids
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        blocked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        blocked.truncate(TOP_BLOCKED_LIMIT);

        StatsSnapshot {
            total_requests: self.total_requests.get(),
            blocked_requests: self.blocked_requests.get(),
            allowed_requests: self.allowed_requests.get(),
            match_type_counts,
            top_blocked_ids: blocked.into_iter().collect(),
            started_at: self.started_at,
            last_reset_at: *self.last_reset_at.read().expect("last_reset_at lock poisoned"),
        }
    }

    /// Zero all counters and maps. `started_at` is preserved.
    pub fn reset(&self) {
        self.total_requests.reset();
        self.blocked_requests.reset();
        self.allowed_requests.reset();
        self.match_type_counts.clear();
        self.top_blocked_ids.clear();
        *self.last_reset_at.write().expect("last_reset_at lock poisoned") = Some(Utc::now());
    }

    /// Prometheus text exposition of the scalar counters.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::warn!(error = %e, "failed to encode stats registry");
            return String::new();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}
