//! Data model shared by the aggregation service and the graph view
//!
//! Field names serialise in camelCase so the shapes match what the bridge
//! hands to the UI: `{ subtasks: [{key, summary, status, statusCategory}],
//! links: [{id, inwardIssue, outwardIssue, linkType}] }`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Link type the panel creates when the user drags a new connection
pub const DEFAULT_LINK_TYPE: &str = "Blocks";

/// Prefix of edge ids synthesised for links the tracker has not confirmed yet
pub const PENDING_EDGE_PREFIX: &str = "created";

/// Status category key, used for colour coding only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusCategory {
    /// To do
    New,
    /// In progress
    Indeterminate,
    /// Done
    Done,
    /// Category not set on the status
    Undefined,
    /// Any key the tracker adds later, kept verbatim
    Other(String),
}

impl StatusCategory {
    /// Key as the tracker spells it
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Indeterminate => "indeterminate",
            Self::Done => "done",
            Self::Undefined => "undefined",
            Self::Other(key) => key,
        }
    }
}

impl From<String> for StatusCategory {
    fn from(key: String) -> Self {
        match key.as_str() {
            "new" => Self::New,
            "indeterminate" => Self::Indeterminate,
            "done" => Self::Done,
            "undefined" => Self::Undefined,
            _ => Self::Other(key),
        }
    }
}

impl From<&str> for StatusCategory {
    fn from(key: &str) -> Self {
        Self::from(key.to_string())
    }
}

impl From<StatusCategory> for String {
    fn from(category: StatusCategory) -> Self {
        match category {
            StatusCategory::Other(key) => key,
            known => known.key().to_string(),
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A subtask as the panel shows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Unique issue key, e.g. `PROJ-12`
    pub key: String,
    /// One-line summary
    pub summary: String,
    /// Status display name
    pub status: String,
    /// Status category key
    pub status_category: StatusCategory,
}

impl Issue {
    /// Create an issue
    pub fn new(
        key: impl Into<String>,
        summary: impl Into<String>,
        status: impl Into<String>,
        status_category: impl Into<StatusCategory>,
    ) -> Self {
        Self {
            key: key.into(),
            summary: summary.into(),
            status: status.into(),
            status_category: status_category.into(),
        }
    }

    /// Path of the issue page relative to the tracker's base URL
    #[must_use]
    pub fn browse_path(&self) -> String {
        format!("/browse/{}", self.key)
    }
}

/// Payload naming both ends of a link and its type
///
/// Used for add-link, for remove-matching-link, and as the identity of a
/// pending link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    /// Source issue key
    pub inward_issue: String,
    /// Target issue key
    pub outward_issue: String,
    /// Link type name
    pub link_type: String,
}

impl LinkRequest {
    /// Create a request
    pub fn new(
        inward_issue: impl Into<String>,
        outward_issue: impl Into<String>,
        link_type: impl Into<String>,
    ) -> Self {
        Self {
            inward_issue: inward_issue.into(),
            outward_issue: outward_issue.into(),
            link_type: link_type.into(),
        }
    }

    /// Request for a link of the default "Blocks" type
    pub fn blocks(inward_issue: impl Into<String>, outward_issue: impl Into<String>) -> Self {
        Self::new(inward_issue, outward_issue, DEFAULT_LINK_TYPE)
    }
}

/// Directed link between two issues, inward -> outward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueLink {
    /// Tracker id; `None` while the link is pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Link type name
    pub link_type: String,
    /// Source issue key
    pub inward_issue: String,
    /// Target issue key
    pub outward_issue: String,
}

impl IssueLink {
    /// A link the tracker already knows about
    pub fn confirmed(id: impl Into<String>, request: LinkRequest) -> Self {
        Self {
            id: Some(id.into()),
            link_type: request.link_type,
            inward_issue: request.inward_issue,
            outward_issue: request.outward_issue,
        }
    }

    /// A link created locally and not yet confirmed
    #[must_use]
    pub fn pending(request: LinkRequest) -> Self {
        Self {
            id: None,
            link_type: request.link_type,
            inward_issue: request.inward_issue,
            outward_issue: request.outward_issue,
        }
    }

    /// Whether the link still lacks a tracker id
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.id.as_deref().map_or(true, str::is_empty)
    }

    /// Edge id: the tracker id, or `created-{inward}-{outward}` while pending
    #[must_use]
    pub fn edge_id(&self) -> String {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!(
                "{PENDING_EDGE_PREFIX}-{}-{}",
                self.inward_issue, self.outward_issue
            ),
        }
    }

    /// The request that identifies this link on the remote side
    #[must_use]
    pub fn request(&self) -> LinkRequest {
        LinkRequest::new(
            self.inward_issue.clone(),
            self.outward_issue.clone(),
            self.link_type.clone(),
        )
    }

    /// Same source and target
    #[inline]
    #[must_use]
    pub fn connects(&self, inward_issue: &str, outward_issue: &str) -> bool {
        self.inward_issue == inward_issue && self.outward_issue == outward_issue
    }

    /// Same source, target and type
    #[inline]
    #[must_use]
    pub fn matches(&self, request: &LinkRequest) -> bool {
        self.connects(&request.inward_issue, &request.outward_issue)
            && self.link_type == request.link_type
    }
}

/// Result of fetch-subtasks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskGraph {
    /// Subtasks of the parent issue, in the tracker's order
    pub subtasks: Vec<Issue>,
    /// Outward links of those subtasks
    pub links: Vec<IssueLink>,
}

impl SubtaskGraph {
    /// Look up a subtask by key
    #[must_use]
    pub fn subtask(&self, key: &str) -> Option<&Issue> {
        self.subtasks.iter().find(|issue| issue.key == key)
    }
}

/// Raw outcome of a mutating call against the tracker
///
/// Returned as-is by add-link and the remove operations; interpreting the
/// status is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteResponse {
    /// HTTP status code
    pub status: u16,
    /// `Location` header, set by the tracker when a link is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Response body, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl RemoteResponse {
    /// Response with only a status
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            location: None,
            body: None,
        }
    }

    /// Attach a `Location` header
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Attach a body
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// 2xx status
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Id of the created link, taken from the `.../issueLink/{id}` segment of `Location`
    #[must_use]
    pub fn created_link_id(&self) -> Option<String> {
        let location = self.location.as_deref()?;
        let path = location.split(['?', '#']).next().unwrap_or(location);
        let (_, tail) = path.rsplit_once("/issueLink/")?;
        let id = tail.trim_end_matches('/');
        (!id.is_empty() && !id.contains('/')).then(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn edge_id_of_pending_link_is_synthesised() {
        let link = IssueLink::pending(LinkRequest::blocks("A", "B"));
        assert!(link.is_pending());
        assert_eq!(link.edge_id(), "created-A-B");
    }

    #[test]
    fn edge_id_of_confirmed_link_is_tracker_id() {
        let link = IssueLink::confirmed("123", LinkRequest::blocks("A", "B"));
        assert!(!link.is_pending());
        assert_eq!(link.edge_id(), "123");
    }

    #[test]
    fn empty_id_counts_as_pending() {
        let mut link = IssueLink::pending(LinkRequest::blocks("A", "B"));
        link.id = Some(String::new());
        assert!(link.is_pending());
        assert_eq!(link.edge_id(), "created-A-B");
    }

    #[test]
    fn status_category_round_trips_unknown_keys() {
        let category: StatusCategory = serde_json::from_str("\"blocked\"").unwrap();
        assert_eq!(category, StatusCategory::Other("blocked".into()));
        assert_eq!(serde_json::to_string(&category).unwrap(), "\"blocked\"");
        assert_eq!(StatusCategory::from("done"), StatusCategory::Done);
    }

    #[test]
    fn subtask_graph_uses_bridge_field_names() {
        let graph = SubtaskGraph {
            subtasks: vec![Issue::new("A", "First", "To Do", "new")],
            links: vec![IssueLink::confirmed("7", LinkRequest::blocks("A", "B"))],
        };

        let value = serde_json::to_value(&graph).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "subtasks": [
                    {"key": "A", "summary": "First", "status": "To Do", "statusCategory": "new"}
                ],
                "links": [
                    {"id": "7", "linkType": "Blocks", "inwardIssue": "A", "outwardIssue": "B"}
                ]
            })
        );
    }

    #[test]
    fn link_without_id_deserialises_as_pending() {
        let link: IssueLink = serde_json::from_value(serde_json::json!({
            "linkType": "Blocks", "inwardIssue": "A", "outwardIssue": "B"
        }))
        .unwrap();
        assert!(link.is_pending());
    }

    #[test]
    fn created_link_id_comes_from_location() {
        let response = RemoteResponse::with_status(201)
            .with_location("https://tracker.example/rest/api/3/issueLink/10042");
        assert_eq!(response.created_link_id().as_deref(), Some("10042"));

        assert_eq!(RemoteResponse::with_status(201).created_link_id(), None);
        assert_eq!(
            RemoteResponse::with_status(201)
                .with_location("https://tracker.example/rest/api/3/issue/A-1")
                .created_link_id(),
            None
        );
    }

    #[test]
    fn matches_requires_type() {
        let link = IssueLink::confirmed("1", LinkRequest::blocks("A", "B"));
        assert!(link.matches(&LinkRequest::blocks("A", "B")));
        assert!(!link.matches(&LinkRequest::new("A", "B", "Relates")));
        assert!(link.connects("A", "B"));
    }
}
