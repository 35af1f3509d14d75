//! JSON shapes of the tracker's REST API
//!
//! Only the fields the panel asks for are modelled. Every field is optional
//! on the way in because the tracker omits fields that were not requested.

use serde::{Deserialize, Serialize};

/// `fields=subtasks` on the parent issue
pub const SUBTASK_FIELDS: &[&str] = &["subtasks"];
/// Details fetched for every subtask
pub const DETAIL_FIELDS: &[&str] = &["issuelinks", "summary", "status"];
/// Links only, used when matching a link to delete
pub const LINK_FIELDS: &[&str] = &["issuelinks"];

/// Minimal reference to an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStub {
    /// Issue key
    pub key: String,
}

impl IssueStub {
    /// Stub for a key
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// `GET /rest/api/3/issue/{key}` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    /// Issue key
    pub key: String,
    /// Requested fields
    #[serde(default)]
    pub fields: RawFields,
}

/// Field block of an issue response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFields {
    /// Subtask stubs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<IssueStub>,
    /// Summary line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Workflow status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RawStatus>,
    /// Links in both directions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issuelinks: Vec<RawIssueLink>,
}

/// Workflow status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatus {
    /// Display name
    pub name: String,
    /// Category used for colouring
    pub status_category: RawStatusCategory,
}

/// Status category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatusCategory {
    /// Category key: `new`, `indeterminate`, `done`, ...
    pub key: String,
    /// Numeric id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Colour name the tracker itself uses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_name: Option<String>,
}

/// One entry of `fields.issuelinks`
///
/// Exactly one of `inward_issue` / `outward_issue` is set: the other end of
/// the link relative to the issue the entry was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIssueLink {
    /// Tracker link id
    pub id: String,
    /// Link type
    #[serde(rename = "type")]
    pub link_type: RawLinkType,
    /// Set when the owning issue is the target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inward_issue: Option<IssueStub>,
    /// Set when the owning issue is the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outward_issue: Option<IssueStub>,
}

impl RawIssueLink {
    /// Key of the outward target, if this entry points outward
    #[must_use]
    pub fn outward_key(&self) -> Option<&str> {
        self.outward_issue.as_ref().map(|stub| stub.key.as_str())
    }
}

/// Link type reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLinkType {
    /// Type name, e.g. "Blocks"
    pub name: String,
}

/// `POST /rest/api/3/issueLink` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssueLink {
    /// Source issue
    pub inward_issue: IssueStub,
    /// Target issue
    pub outward_issue: IssueStub,
    /// Link type
    #[serde(rename = "type")]
    pub link_type: RawLinkType,
}

impl From<&igraph_core::LinkRequest> for NewIssueLink {
    fn from(request: &igraph_core::LinkRequest) -> Self {
        Self {
            inward_issue: IssueStub::new(request.inward_issue.clone()),
            outward_issue: IssueStub::new(request.outward_issue.clone()),
            link_type: RawLinkType {
                name: request.link_type.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use igraph_core::LinkRequest;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_detail_response() {
        let issue: RawIssue = serde_json::from_value(serde_json::json!({
            "id": "10010",
            "key": "PROJ-2",
            "fields": {
                "summary": "Wire the API",
                "status": {
                    "name": "In Progress",
                    "statusCategory": {"id": 4, "key": "indeterminate", "colorName": "yellow", "name": "In Progress"}
                },
                "issuelinks": [
                    {"id": "200", "type": {"name": "Blocks", "inward": "is blocked by"}, "outwardIssue": {"key": "PROJ-3"}},
                    {"id": "201", "type": {"name": "Blocks"}, "inwardIssue": {"key": "PROJ-1"}}
                ]
            }
        }))
        .unwrap();

        assert_eq!(issue.key, "PROJ-2");
        assert_eq!(issue.fields.summary.as_deref(), Some("Wire the API"));
        let status = issue.fields.status.unwrap();
        assert_eq!(status.status_category.key, "indeterminate");
        assert_eq!(issue.fields.issuelinks[0].outward_key(), Some("PROJ-3"));
        assert_eq!(issue.fields.issuelinks[1].outward_key(), None);
    }

    #[test]
    fn decodes_subtask_stubs_without_other_fields() {
        let issue: RawIssue = serde_json::from_str(
            r#"{"key":"PROJ-1","fields":{"subtasks":[{"id":"1","key":"PROJ-2"},{"key":"PROJ-3"}]}}"#,
        )
        .unwrap();

        let keys: Vec<_> = issue.fields.subtasks.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["PROJ-2", "PROJ-3"]);
        assert!(issue.fields.summary.is_none());
    }

    #[test]
    fn new_link_body_shape() {
        let body = NewIssueLink::from(&LinkRequest::blocks("A-1", "A-2"));
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({
                "inwardIssue": {"key": "A-1"},
                "outwardIssue": {"key": "A-2"},
                "type": {"name": "Blocks"}
            })
        );
    }
}
