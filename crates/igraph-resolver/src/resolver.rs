//! Aggregation service
//!
//! Assembles the subtask graph from the tracker and forwards link
//! mutations. Subtask details are fetched one at a time, in the order the
//! parent lists them.

use crate::error::ResolverError;
use igraph_core::{sequence_async, Issue, IssueLink, LinkRequest, RemoteResponse, SubtaskGraph};
use igraph_tracker::wire::{DETAIL_FIELDS, LINK_FIELDS, SUBTASK_FIELDS};
use igraph_tracker::{NewIssueLink, RawIssue, TrackerApi};

/// The four operations behind the bridge
#[derive(Debug, Clone)]
pub struct Resolver<T> {
    tracker: T,
}

impl<T: TrackerApi> Resolver<T> {
    /// Create a resolver over a tracker client
    #[inline]
    #[must_use]
    pub fn new(tracker: T) -> Self {
        Self { tracker }
    }

    /// Underlying tracker client
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Subtasks of `parent_key` and the links pointing outward from them
    ///
    /// # Workflow
    /// 1. Read the parent's subtask stubs
    /// 2. Read each subtask's summary, status and links, one at a time
    /// 3. Project each subtask to the panel's `Issue`
    /// 4. Flatten outward links into one list
    ///
    /// # Errors
    /// Any failed read or malformed issue fails the whole operation.
    pub async fn fetch_subtasks(&self, parent_key: &str) -> Result<SubtaskGraph, ResolverError> {
        tracing::info!(parent = parent_key, "fetching subtasks");

        let parent = self.tracker.get_issue(parent_key, SUBTASK_FIELDS).await?;
        let stubs = parent.fields.subtasks;
        tracing::debug!(parent = parent_key, count = stubs.len(), "subtask stubs");

        let tracker = &self.tracker;
        let details = sequence_async(stubs, |stub, index| async move {
            tracing::debug!(key = %stub.key, index, "fetching subtask details");
            tracker.get_issue(&stub.key, DETAIL_FIELDS).await
        })
        .await?;

        let subtasks = details
            .iter()
            .map(project_issue)
            .collect::<Result<Vec<_>, _>>()?;
        let links: Vec<IssueLink> = details.iter().flat_map(outward_links).collect();

        tracing::info!(
            parent = parent_key,
            subtasks = subtasks.len(),
            links = links.len(),
            "subtask graph assembled"
        );
        Ok(SubtaskGraph { subtasks, links })
    }

    /// Create a link; no duplicate check, response returned as-is
    ///
    /// # Errors
    /// Only transport failures; error statuses are in the response.
    pub async fn add_link(&self, request: &LinkRequest) -> Result<RemoteResponse, ResolverError> {
        tracing::info!(
            inward = %request.inward_issue,
            outward = %request.outward_issue,
            link_type = %request.link_type,
            "adding link"
        );
        let response = self
            .tracker
            .create_issue_link(&NewIssueLink::from(request))
            .await?;
        tracing::debug!(status = response.status, "add link response");
        Ok(response)
    }

    /// Delete a link by tracker id; no existence check
    ///
    /// # Errors
    /// Only transport failures; a missing id shows up as the response status.
    pub async fn remove_link_by_id(&self, id: &str) -> Result<RemoteResponse, ResolverError> {
        tracing::info!(id, "removing link by id");
        let response = self.tracker.delete_issue_link(id).await?;
        tracing::debug!(id, status = response.status, "remove link response");
        Ok(response)
    }

    /// Delete the first link on the inward issue matching target and type
    ///
    /// Used for links whose id never made it back to the caller. Returns
    /// `Ok(None)` without sending a delete when nothing matches.
    ///
    /// # Errors
    /// Failure to read the inward issue, or a transport failure on delete.
    pub async fn remove_matching_link(
        &self,
        request: &LinkRequest,
    ) -> Result<Option<RemoteResponse>, ResolverError> {
        tracing::info!(
            inward = %request.inward_issue,
            outward = %request.outward_issue,
            link_type = %request.link_type,
            "removing matching link"
        );

        let issue = self
            .tracker
            .get_issue(&request.inward_issue, LINK_FIELDS)
            .await?;
        tracing::debug!(
            key = %issue.key,
            existing = issue.fields.issuelinks.len(),
            "existing links"
        );

        let matching = issue.fields.issuelinks.iter().find(|link| {
            link.outward_key() == Some(request.outward_issue.as_str())
                && link.link_type.name == request.link_type
        });

        match matching {
            Some(link) => {
                let response = self.tracker.delete_issue_link(&link.id).await?;
                tracing::debug!(id = %link.id, status = response.status, "matching link removed");
                Ok(Some(response))
            }
            None => {
                tracing::warn!(
                    inward = %request.inward_issue,
                    outward = %request.outward_issue,
                    link_type = %request.link_type,
                    "no matching link found"
                );
                Ok(None)
            }
        }
    }
}

/// `{key, summary, status name, status category key}` of a detail read
fn project_issue(raw: &RawIssue) -> Result<Issue, ResolverError> {
    let summary = raw
        .fields
        .summary
        .clone()
        .ok_or_else(|| malformed(raw, "summary"))?;
    let status = raw
        .fields
        .status
        .as_ref()
        .ok_or_else(|| malformed(raw, "status"))?;

    Ok(Issue::new(
        raw.key.clone(),
        summary,
        status.name.clone(),
        status.status_category.key.clone(),
    ))
}

/// Links stored on `raw` that point away from it
fn outward_links(raw: &RawIssue) -> impl Iterator<Item = IssueLink> + '_ {
    raw.fields.issuelinks.iter().filter_map(move |link| {
        let target = link.outward_key()?;
        if target == raw.key {
            return None;
        }
        Some(IssueLink::confirmed(
            link.id.clone(),
            LinkRequest::new(raw.key.clone(), target, link.link_type.name.clone()),
        ))
    })
}

fn malformed(raw: &RawIssue, field: &'static str) -> ResolverError {
    ResolverError::MalformedIssue {
        key: raw.key.clone(),
        field,
    }
}
