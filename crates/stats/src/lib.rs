//! Statistics aggregation for the gateway.
//!
//! Two pieces of process-wide state live here, both created once at startup
//! and injected by `Arc` (never reached through globals):
//!
//! - [`StatsStore`] -- classification counters backed by prometheus
//!   `IntCounter`s, plus per-match-type and per-blocked-id maps. Counter
//!   updates are single atomic increments, so interleaving request tasks
//!   cannot lose updates.
//!
//! - [`LogRing`] -- a fixed-capacity FIFO ring of diagnostic log entries,
//!   queryable over the control channel.

pub mod log_ring;
pub mod store;

pub use log_ring::{LogEntry, LogLevel, LogRing};
pub use store::{StatsSnapshot, StatsStore};
