//! Named-operation bridge
//!
//! The UI reaches the aggregation service by operation name with a JSON
//! payload. A `Bridge` is bound to the invocation context of one panel, so
//! `fetchSubtasks` always reads the issue the panel is open on.

use crate::resolver::Resolver;
use async_trait::async_trait;
use igraph_core::{BridgeError, GraphService, LinkRequest, RemoteResponse, SubtaskGraph};
use igraph_tracker::TrackerApi;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Context the host supplies with every invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    /// Key of the issue the panel is open on
    pub issue_key: String,
}

impl InvocationContext {
    /// Context for an issue
    pub fn new(issue_key: impl Into<String>) -> Self {
        Self {
            issue_key: issue_key.into(),
        }
    }
}

/// Operations registered on the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `fetchSubtasks`, no payload
    FetchSubtasks,
    /// `addLink`, payload `{inwardIssue, outwardIssue, linkType}`
    AddLink,
    /// `removeLinkById`, payload `{id}`
    RemoveLinkById,
    /// `removeMatchingLink`, payload `{inwardIssue, outwardIssue, linkType}`
    RemoveMatchingLink,
}

impl Operation {
    /// Every registered operation
    pub const ALL: [Self; 4] = [
        Self::FetchSubtasks,
        Self::AddLink,
        Self::RemoveLinkById,
        Self::RemoveMatchingLink,
    ];

    /// Name the UI invokes the operation by
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FetchSubtasks => "fetchSubtasks",
            Self::AddLink => "addLink",
            Self::RemoveLinkById => "removeLinkById",
            Self::RemoveMatchingLink => "removeMatchingLink",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = BridgeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| BridgeError::UnknownOperation {
                name: name.to_string(),
            })
    }
}

/// `removeLinkById` payload
#[derive(Debug, Clone, Deserialize)]
struct RemoveById {
    id: String,
}

/// Aggregation service bound to one invocation context
#[derive(Debug, Clone)]
pub struct Bridge<T> {
    resolver: Resolver<T>,
    context: InvocationContext,
}

impl<T: TrackerApi> Bridge<T> {
    /// Bind a tracker client to a context
    pub fn new(tracker: T, context: InvocationContext) -> Self {
        Self::from_resolver(Resolver::new(tracker), context)
    }

    /// Bind an existing resolver to a context
    #[must_use]
    pub fn from_resolver(resolver: Resolver<T>, context: InvocationContext) -> Self {
        Self { resolver, context }
    }

    /// Context this bridge was bound to
    #[must_use]
    pub fn context(&self) -> &InvocationContext {
        &self.context
    }

    /// Underlying aggregation service
    #[must_use]
    pub fn resolver(&self) -> &Resolver<T> {
        &self.resolver
    }

    /// Dispatch an operation by name
    ///
    /// `fetchSubtasks` ignores its payload. `removeMatchingLink` answers
    /// `null` when nothing matched.
    ///
    /// # Errors
    /// `UnknownOperation` for unregistered names, `InvalidPayload` when the
    /// payload does not decode, `Failed` when the operation itself fails.
    pub async fn invoke(&self, name: &str, payload: Value) -> Result<Value, BridgeError> {
        let operation: Operation = name.parse()?;
        tracing::debug!(%operation, issue = %self.context.issue_key, "bridge invoke");

        match operation {
            Operation::FetchSubtasks => to_json(operation, &self.fetch_subtasks().await?),
            Operation::AddLink => {
                let request: LinkRequest = decode(operation, payload)?;
                to_json(operation, &self.add_link(request).await?)
            }
            Operation::RemoveLinkById => {
                let RemoveById { id } = decode(operation, payload)?;
                to_json(operation, &self.remove_link_by_id(id).await?)
            }
            Operation::RemoveMatchingLink => {
                let request: LinkRequest = decode(operation, payload)?;
                to_json(operation, &self.remove_matching_link(request).await?)
            }
        }
    }
}

fn decode<P: DeserializeOwned>(operation: Operation, payload: Value) -> Result<P, BridgeError> {
    serde_json::from_value(payload).map_err(|e| BridgeError::InvalidPayload {
        operation: operation.name().to_string(),
        message: e.to_string(),
    })
}

fn to_json<R: Serialize>(operation: Operation, result: &R) -> Result<Value, BridgeError> {
    serde_json::to_value(result).map_err(|e| BridgeError::failed(operation.name(), e))
}

#[async_trait]
impl<T: TrackerApi> GraphService for Bridge<T> {
    async fn fetch_subtasks(&self) -> Result<SubtaskGraph, BridgeError> {
        self.resolver
            .fetch_subtasks(&self.context.issue_key)
            .await
            .map_err(|e| {
                tracing::error!(issue = %self.context.issue_key, error = %e, "fetch subtasks failed");
                e.into_bridge(Operation::FetchSubtasks.name())
            })
    }

    async fn add_link(&self, request: LinkRequest) -> Result<RemoteResponse, BridgeError> {
        self.resolver
            .add_link(&request)
            .await
            .map_err(|e| e.into_bridge(Operation::AddLink.name()))
    }

    async fn remove_link_by_id(&self, id: String) -> Result<RemoteResponse, BridgeError> {
        self.resolver
            .remove_link_by_id(&id)
            .await
            .map_err(|e| e.into_bridge(Operation::RemoveLinkById.name()))
    }

    async fn remove_matching_link(
        &self,
        request: LinkRequest,
    ) -> Result<Option<RemoteResponse>, BridgeError> {
        self.resolver
            .remove_matching_link(&request)
            .await
            .map_err(|e| e.into_bridge(Operation::RemoveMatchingLink.name()))
    }
}
