use std::sync::Arc;

use offgate_classifier::Classifier;
use offgate_stats::{LogRing, StatsStore};

/// Shared state type alias used across all route handlers.
pub type SharedState = Arc<ControlState>;

/// Everything the control channel can reach: the classifier for URL
/// diagnostics, the stats store, and the log ring. The main interception
/// path is deliberately not reachable from here.
pub struct ControlState {
    pub classifier: Arc<Classifier>,
    pub stats: Arc<StatsStore>,
    pub log: Arc<LogRing>,
}
