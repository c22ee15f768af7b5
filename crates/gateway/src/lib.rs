//! The gateway itself: every outbound request runs through
//! classification, routing, and a caching strategy, and every failure path
//! terminates in a synthetic response. Nothing here ever returns an error to
//! the calling application.

pub mod gateway;
pub mod router;

pub use gateway::Gateway;
pub use router::{route, RouteDecision, StorePurpose};
