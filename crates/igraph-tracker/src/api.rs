//! Remote REST API seam
//!
//! The aggregation service only ever talks to the tracker through this
//! trait. `HttpTracker` implements it over HTTP; tests use an in-memory fake.

use crate::error::TrackerError;
use crate::wire::{NewIssueLink, RawIssue};
use async_trait::async_trait;
use igraph_core::RemoteResponse;
use std::sync::Arc;

/// Issue tracker REST operations the panel needs
#[async_trait]
pub trait TrackerApi: Send + Sync {
    /// `GET /rest/api/3/issue/{key}?fields=...`
    ///
    /// Non-success statuses are errors.
    async fn get_issue(&self, key: &str, fields: &[&str]) -> Result<RawIssue, TrackerError>;

    /// `POST /rest/api/3/issueLink`
    ///
    /// The response is returned whatever its status.
    async fn create_issue_link(&self, link: &NewIssueLink) -> Result<RemoteResponse, TrackerError>;

    /// `DELETE /rest/api/3/issueLink/{id}`
    ///
    /// The response is returned whatever its status.
    async fn delete_issue_link(&self, id: &str) -> Result<RemoteResponse, TrackerError>;
}

#[async_trait]
impl<T: TrackerApi + ?Sized> TrackerApi for Arc<T> {
    async fn get_issue(&self, key: &str, fields: &[&str]) -> Result<RawIssue, TrackerError> {
        (**self).get_issue(key, fields).await
    }

    async fn create_issue_link(&self, link: &NewIssueLink) -> Result<RemoteResponse, TrackerError> {
        (**self).create_issue_link(link).await
    }

    async fn delete_issue_link(&self, id: &str) -> Result<RemoteResponse, TrackerError> {
        (**self).delete_issue_link(id).await
    }
}
