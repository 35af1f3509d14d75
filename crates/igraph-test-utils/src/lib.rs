//! Testing utilities for the issue graph workspace
//!
//! `FakeTracker` is an in-memory `TrackerApi` that behaves like the remote
//! tracker for the handful of endpoints the panel uses, records every call,
//! and can inject latency or failures per issue key.

#![allow(missing_docs)]

use async_trait::async_trait;
use igraph_core::{LinkRequest, RemoteResponse};
use igraph_tracker::{
    IssueStub, NewIssueLink, RawFields, RawIssue, RawIssueLink, RawLinkType, RawStatus,
    RawStatusCategory, TrackerApi, TrackerError,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const FAKE_BASE_URL: &str = "https://tracker.test";

/// One call received by the fake, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    GetIssue { key: String, fields: Vec<String> },
    CreateLink(LinkRequest),
    DeleteLink(String),
}

#[derive(Debug, Clone)]
struct FakeIssue {
    summary: String,
    status: String,
    category: String,
    subtasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLink {
    pub id: String,
    pub request: LinkRequest,
}

#[derive(Debug, Default)]
struct FakeState {
    issues: BTreeMap<String, FakeIssue>,
    links: Vec<StoredLink>,
    next_link_id: u64,
    calls: Vec<TrackerCall>,
    latency: HashMap<String, Duration>,
    failing: HashSet<String>,
}

/// In-memory tracker
#[derive(Debug)]
pub struct FakeTracker {
    state: Mutex<FakeState>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for FakeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_link_id: 10_000,
                ..FakeState::default()
            }),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Add an issue; the status category is derived from the status name
    #[must_use]
    pub fn with_issue(self, key: &str, summary: &str, status: &str) -> Self {
        let category = match status {
            "Done" | "Closed" | "Resolved" => "done",
            "In Progress" | "In Review" => "indeterminate",
            _ => "new",
        };
        self.with_issue_in_category(key, summary, status, category)
    }

    #[must_use]
    pub fn with_issue_in_category(self, key: &str, summary: &str, status: &str, category: &str) -> Self {
        self.state.lock().issues.insert(
            key.to_string(),
            FakeIssue {
                summary: summary.to_string(),
                status: status.to_string(),
                category: category.to_string(),
                subtasks: Vec::new(),
            },
        );
        self
    }

    /// Make `subtasks` the subtasks of `parent`, creating missing issues
    #[must_use]
    pub fn with_subtasks(self, parent: &str, subtasks: &[&str]) -> Self {
        {
            let mut state = self.state.lock();
            for key in subtasks {
                state.issues.entry((*key).to_string()).or_insert_with(|| FakeIssue {
                    summary: format!("Subtask {key}"),
                    status: "To Do".into(),
                    category: "new".into(),
                    subtasks: Vec::new(),
                });
            }
            let parent = state.issues.entry(parent.to_string()).or_insert_with(|| FakeIssue {
                summary: format!("Parent {parent}"),
                status: "To Do".into(),
                category: "new".into(),
                subtasks: Vec::new(),
            });
            parent.subtasks = subtasks.iter().map(|k| (*k).to_string()).collect();
        }
        self
    }

    /// Store an existing link
    #[must_use]
    pub fn with_link(self, id: &str, link_type: &str, inward: &str, outward: &str) -> Self {
        self.state.lock().links.push(StoredLink {
            id: id.to_string(),
            request: LinkRequest::new(inward, outward, link_type),
        });
        self
    }

    /// Delay every read of `key`
    #[must_use]
    pub fn with_latency(self, key: &str, latency: Duration) -> Self {
        self.state.lock().latency.insert(key.to_string(), latency);
        self
    }

    /// Reads of `key` fail with a 500
    #[must_use]
    pub fn failing_on(self, key: &str) -> Self {
        self.state.lock().failing.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<TrackerCall> {
        self.state.lock().calls.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TrackerCall::DeleteLink(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn create_calls(&self) -> Vec<LinkRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TrackerCall::CreateLink(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Keys read with `get_issue`, in order
    pub fn read_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TrackerCall::GetIssue { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn links(&self) -> Vec<StoredLink> {
        self.state.lock().links.clone()
    }

    /// Highest number of reads that were ever in flight together
    pub fn peak_concurrent_reads(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn link_location(id: &str) -> String {
        format!("{FAKE_BASE_URL}/rest/api/3/issueLink/{id}")
    }

    fn build_issue(state: &FakeState, key: &str, issue: &FakeIssue, fields: &[&str]) -> RawIssue {
        let wants = |field: &str| fields.is_empty() || fields.contains(&field);
        let mut raw = RawFields::default();

        if wants("subtasks") {
            raw.subtasks = issue.subtasks.iter().map(IssueStub::new).collect();
        }
        if wants("summary") {
            raw.summary = Some(issue.summary.clone());
        }
        if wants("status") {
            raw.status = Some(RawStatus {
                name: issue.status.clone(),
                status_category: RawStatusCategory {
                    key: issue.category.clone(),
                    id: None,
                    name: None,
                    color_name: None,
                },
            });
        }
        if wants("issuelinks") {
            raw.issuelinks = state
                .links
                .iter()
                .filter_map(|link| {
                    let link_type = RawLinkType {
                        name: link.request.link_type.clone(),
                    };
                    if link.request.inward_issue == key {
                        Some(RawIssueLink {
                            id: link.id.clone(),
                            link_type,
                            inward_issue: None,
                            outward_issue: Some(IssueStub::new(link.request.outward_issue.clone())),
                        })
                    } else if link.request.outward_issue == key {
                        Some(RawIssueLink {
                            id: link.id.clone(),
                            link_type,
                            inward_issue: Some(IssueStub::new(link.request.inward_issue.clone())),
                            outward_issue: None,
                        })
                    } else {
                        None
                    }
                })
                .collect();
        }

        RawIssue {
            key: key.to_string(),
            fields: raw,
        }
    }

    fn not_found(method: &'static str, url: String, what: &str) -> TrackerError {
        TrackerError::Status {
            method,
            url,
            status: 404,
            body: serde_json::json!({ "errorMessages": [format!("{what} does not exist")] })
                .to_string(),
        }
    }
}

#[async_trait]
impl TrackerApi for FakeTracker {
    async fn get_issue(&self, key: &str, fields: &[&str]) -> Result<RawIssue, TrackerError> {
        let latency = {
            let mut state = self.state.lock();
            state.calls.push(TrackerCall::GetIssue {
                key: key.to_string(),
                fields: fields.iter().map(|f| (*f).to_string()).collect(),
            });
            state.latency.get(key).copied()
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let url = format!("{FAKE_BASE_URL}/rest/api/3/issue/{key}");
        let state = self.state.lock();
        if state.failing.contains(key) {
            return Err(TrackerError::Status {
                method: "GET",
                url,
                status: 500,
                body: "injected failure".into(),
            });
        }
        let issue = state
            .issues
            .get(key)
            .ok_or_else(|| Self::not_found("GET", url, &format!("Issue {key}")))?;
        Ok(Self::build_issue(&state, key, issue, fields))
    }

    async fn create_issue_link(&self, link: &NewIssueLink) -> Result<RemoteResponse, TrackerError> {
        let request = LinkRequest::new(
            link.inward_issue.key.clone(),
            link.outward_issue.key.clone(),
            link.link_type.name.clone(),
        );
        let mut state = self.state.lock();
        state.calls.push(TrackerCall::CreateLink(request.clone()));

        let missing = [&request.inward_issue, &request.outward_issue]
            .into_iter()
            .find(|key| !state.issues.contains_key(key.as_str()))
            .cloned();
        if let Some(key) = missing {
            return Ok(RemoteResponse::with_status(404).with_body(
                serde_json::json!({ "errorMessages": [format!("Issue {key} does not exist")] }),
            ));
        }

        let id = state.next_link_id.to_string();
        state.next_link_id += 1;
        state.links.push(StoredLink {
            id: id.clone(),
            request,
        });
        Ok(RemoteResponse::with_status(201).with_location(Self::link_location(&id)))
    }

    async fn delete_issue_link(&self, id: &str) -> Result<RemoteResponse, TrackerError> {
        let mut state = self.state.lock();
        state.calls.push(TrackerCall::DeleteLink(id.to_string()));

        match state.links.iter().position(|link| link.id == id) {
            Some(index) => {
                state.links.remove(index);
                Ok(RemoteResponse::with_status(204))
            }
            None => Ok(RemoteResponse::with_status(404).with_body(
                serde_json::json!({ "errorMessages": [format!("No issue link with id '{id}' exists.")] }),
            )),
        }
    }
}

/// Parent `P-1` with subtasks `A` and `B`, and one "Blocks" link A -> B (id 100)
pub fn blocking_pair() -> FakeTracker {
    FakeTracker::new()
        .with_issue("P-1", "Parent", "In Progress")
        .with_issue("A", "Design schema", "Done")
        .with_issue("B", "Implement API", "In Progress")
        .with_subtasks("P-1", &["A", "B"])
        .with_link("100", "Blocks", "A", "B")
}
