//! Aggregation service errors

use igraph_core::BridgeError;
use igraph_tracker::TrackerError;

/// Failures of the aggregation service operations
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// A remote call failed
    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// An issue came back without a field the projection needs
    #[error("malformed issue {key}: missing field '{field}'")]
    MalformedIssue { key: String, field: &'static str },
}

impl ResolverError {
    /// Convert into the bridge-visible failure of `operation`
    #[must_use]
    pub fn into_bridge(self, operation: &str) -> BridgeError {
        BridgeError::failed(operation, self)
    }
}
