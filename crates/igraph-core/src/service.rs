//! Bridge surface consumed by the graph view
//!
//! The four operations the UI may invoke. Implemented by the resolver's
//! bridge in production and mocked in view tests.

use crate::error::BridgeError;
use crate::types::{LinkRequest, RemoteResponse, SubtaskGraph};
use async_trait::async_trait;

/// Operations exposed to the UI
///
/// `fetch_subtasks` reads the active issue from whatever context the
/// implementation was bound to.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait GraphService: Send + Sync {
    /// Subtasks of the active issue plus their outward links
    async fn fetch_subtasks(&self) -> Result<SubtaskGraph, BridgeError>;

    /// Create a link; the raw tracker response is returned unchecked
    async fn add_link(&self, request: LinkRequest) -> Result<RemoteResponse, BridgeError>;

    /// Delete a persisted link by tracker id
    async fn remove_link_by_id(&self, id: String) -> Result<RemoteResponse, BridgeError>;

    /// Delete the first remote link matching the request, if any
    ///
    /// `Ok(None)` means nothing matched and no delete was sent.
    async fn remove_matching_link(
        &self,
        request: LinkRequest,
    ) -> Result<Option<RemoteResponse>, BridgeError>;
}
