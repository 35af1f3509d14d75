//! Async driver between a `GraphView` and a `GraphService`
//!
//! Gestures change the view synchronously and spawn their remote calls on
//! the tokio runtime without waiting for them. The session owns the spawned
//! tasks; their outcomes are applied by `drain` or `settle`. A task that
//! panics is logged and counted off like any other.

use crate::view::{Connection, Effect, GraphView};
use igraph_core::{BridgeError, GraphService, LinkRequest, RemoteResponse, SubtaskGraph};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};

/// Result of a spawned remote call
#[derive(Debug)]
pub enum Outcome {
    /// Background fetch finished
    Fetched(Result<SubtaskGraph, BridgeError>),
    /// Add-link finished
    Added {
        request: LinkRequest,
        result: Result<RemoteResponse, BridgeError>,
    },
    /// Remove-by-id finished
    RemovedById {
        id: String,
        result: Result<RemoteResponse, BridgeError>,
    },
    /// Remove-matching finished; `Ok(None)` when nothing matched
    RemovedMatching {
        request: LinkRequest,
        result: Result<Option<RemoteResponse>, BridgeError>,
    },
}

/// One panel: a view plus the service its gestures call
pub struct GraphSession<S> {
    service: Arc<S>,
    view: GraphView,
    tasks: JoinSet<Outcome>,
}

impl<S> std::fmt::Debug for GraphSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphSession")
            .field("view", &self.view)
            .field("in_flight", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl<S: GraphService + 'static> GraphSession<S> {
    /// Session over a service and a view
    pub fn new(service: Arc<S>, view: GraphView) -> Self {
        Self {
            service,
            view,
            tasks: JoinSet::new(),
        }
    }

    /// The view being driven
    #[must_use]
    pub fn view(&self) -> &GraphView {
        &self.view
    }

    /// Remote calls spawned and not yet applied
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Fetch and wait for the result
    ///
    /// # Errors
    /// Returns the fetch failure; the view is left in `Phase::Failed`.
    pub async fn refresh(&mut self) -> Result<(), BridgeError> {
        self.view.refresh();
        tracing::info!("refreshing subtask graph");
        match self.service.fetch_subtasks().await {
            Ok(graph) => {
                self.view.fetch_succeeded(graph);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "fetch failed");
                self.view.fetch_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Start a fetch without waiting; the result lands with the other outcomes
    pub fn refresh_in_background(&mut self) {
        let effect = self.view.refresh();
        self.dispatch(vec![effect]);
    }

    /// Drag from one issue to another
    pub fn connect(&mut self, connection: Connection) {
        let effects = self.view.connect(connection);
        self.dispatch(effects);
    }

    /// An edge end was picked up
    pub fn begin_edge_update(&mut self) {
        self.view.begin_edge_update();
    }

    /// An edge end was dropped on a handle
    pub fn update_edge(&mut self, edge_id: &str, connection: Connection) {
        let effects = self.view.update_edge(edge_id, connection);
        self.dispatch(effects);
    }

    /// The edge drag finished
    pub fn end_edge_update(&mut self, edge_id: &str) {
        let effects = self.view.end_edge_update(edge_id);
        self.dispatch(effects);
    }

    /// Remove an edge
    pub fn remove_edge(&mut self, edge_id: &str) {
        let effects = self.view.remove_edge(edge_id);
        self.dispatch(effects);
    }

    /// Apply outcomes of calls that already finished, without waiting
    pub fn drain(&mut self) -> usize {
        let mut finished = 0;
        while let Some(joined) = self.tasks.try_join_next() {
            self.finish(joined);
            finished += 1;
        }
        finished
    }

    /// Wait for every spawned call and apply its outcome
    pub async fn settle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            self.finish(joined);
        }
    }

    fn finish(&mut self, joined: Result<Outcome, JoinError>) {
        match joined {
            Ok(outcome) => self.apply(outcome),
            Err(e) => tracing::warn!(
                error = %e,
                panicked = e.is_panic(),
                "remote call task did not finish, local state kept until refresh"
            ),
        }
    }

    fn dispatch(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            let service = Arc::clone(&self.service);

            self.tasks.spawn(async move {
                match effect {
                    Effect::Fetch => Outcome::Fetched(service.fetch_subtasks().await),
                    Effect::AddLink(request) => {
                        let result = service.add_link(request.clone()).await;
                        Outcome::Added { request, result }
                    }
                    Effect::RemoveLinkById(id) => {
                        let result = service.remove_link_by_id(id.clone()).await;
                        Outcome::RemovedById { id, result }
                    }
                    Effect::RemoveMatchingLink(request) => {
                        let result = service.remove_matching_link(request.clone()).await;
                        Outcome::RemovedMatching { request, result }
                    }
                }
            });
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Fetched(Ok(graph)) => self.view.fetch_succeeded(graph),
            Outcome::Fetched(Err(e)) => {
                tracing::error!(error = %e, "background fetch failed");
                self.view.fetch_failed(e.to_string());
            }
            Outcome::Added { request, result } => match result {
                Ok(response) if response.is_success() => match response.created_link_id() {
                    Some(id) => {
                        tracing::debug!(%id, "link created");
                        self.view.link_confirmed(request, id);
                    }
                    None => tracing::debug!(
                        status = response.status,
                        "link created without a recoverable id"
                    ),
                },
                Ok(response) => tracing::warn!(
                    inward = %request.inward_issue,
                    outward = %request.outward_issue,
                    status = response.status,
                    "add link rejected, local link kept until refresh"
                ),
                Err(e) => tracing::warn!(
                    inward = %request.inward_issue,
                    outward = %request.outward_issue,
                    error = %e,
                    "add link failed, local link kept until refresh"
                ),
            },
            Outcome::RemovedById { id, result } => match result {
                Ok(response) if response.is_success() => {
                    tracing::debug!(%id, "link removed");
                }
                Ok(response) => {
                    tracing::warn!(%id, status = response.status, "remove link rejected");
                }
                Err(e) => tracing::warn!(%id, error = %e, "remove link failed"),
            },
            Outcome::RemovedMatching { request, result } => match result {
                Ok(Some(response)) if response.is_success() => {
                    self.view.link_removal_confirmed(request);
                }
                Ok(Some(response)) => {
                    tracing::warn!(status = response.status, "remove matching link rejected");
                }
                Ok(None) => tracing::debug!(
                    inward = %request.inward_issue,
                    outward = %request.outward_issue,
                    "no remote link to remove"
                ),
                Err(e) => tracing::warn!(error = %e, "remove matching link failed"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Phase;
    use igraph_core::{Issue, IssueLink, MockGraphService};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    fn graph() -> SubtaskGraph {
        SubtaskGraph {
            subtasks: vec![
                Issue::new("A", "First", "Done", "done"),
                Issue::new("B", "Second", "To Do", "new"),
            ],
            links: vec![IssueLink::confirmed("100", LinkRequest::blocks("A", "B"))],
        }
    }

    fn created(id: &str) -> RemoteResponse {
        RemoteResponse::with_status(201)
            .with_location(format!("https://tracker.test/rest/api/3/issueLink/{id}"))
    }

    async fn ready_session(mut mock: MockGraphService) -> GraphSession<MockGraphService> {
        mock.expect_fetch_subtasks().times(1).returning(|| Ok(graph()));
        let mut session = GraphSession::new(Arc::new(mock), GraphView::default());
        assert_ok!(session.refresh().await);
        session
    }

    #[tokio::test]
    async fn connect_adds_pending_link_before_any_response() {
        let mut mock = MockGraphService::new();
        mock.expect_add_link()
            .with(eq(LinkRequest::blocks("B", "A")))
            .times(1)
            .returning(|_| Ok(created("10001")));
        let mut session = ready_session(mock).await;

        session.connect(Connection::new("B", "A"));

        let pending = session.view().state().links().last().cloned().unwrap();
        assert_eq!(pending, IssueLink::pending(LinkRequest::blocks("B", "A")));
        assert_eq!(session.in_flight(), 1);

        session.settle().await;
        let confirmed = session.view().state().links().last().cloned().unwrap();
        assert_eq!(confirmed.id.as_deref(), Some("10001"));
        assert_eq!(session.in_flight(), 0);
    }

    #[tokio::test]
    async fn failed_add_leaves_pending_link_in_place() {
        let mut mock = MockGraphService::new();
        mock.expect_add_link()
            .times(1)
            .returning(|_| Err(BridgeError::failed("addLink", "connection reset")));
        let mut session = ready_session(mock).await;

        session.connect(Connection::new("B", "A"));
        session.settle().await;

        let links = session.view().state().links();
        assert_eq!(links.len(), 2);
        assert!(links[1].is_pending());
    }

    #[tokio::test]
    async fn panicking_call_is_counted_off_by_settle() {
        let mut mock = MockGraphService::new();
        mock.expect_add_link()
            .times(1)
            .returning(|_| panic!("tracker client crashed"));
        let mut session = ready_session(mock).await;

        session.connect(Connection::new("B", "A"));
        assert_eq!(session.in_flight(), 1);

        let settled = tokio::time::timeout(std::time::Duration::from_secs(2), session.settle()).await;

        assert_ok!(settled);
        assert_eq!(session.in_flight(), 0);
        assert!(session.view().state().links()[1].is_pending());
    }

    #[tokio::test]
    async fn rejected_add_is_not_confirmed() {
        let mut mock = MockGraphService::new();
        mock.expect_add_link()
            .times(1)
            .returning(|_| Ok(RemoteResponse::with_status(400)));
        let mut session = ready_session(mock).await;

        session.connect(Connection::new("B", "A"));
        session.settle().await;

        assert!(session.view().state().links()[1].is_pending());
    }

    #[tokio::test]
    async fn removing_persisted_edge_deletes_by_id() {
        let mut mock = MockGraphService::new();
        mock.expect_remove_link_by_id()
            .withf(|id| id == "100")
            .times(1)
            .returning(|_| Ok(RemoteResponse::with_status(204)));
        let mut session = ready_session(mock).await;

        session.remove_edge("100");
        assert!(session.view().state().links().is_empty());

        session.settle().await;
        assert!(session.view().snapshot().edges.is_empty());
    }

    #[tokio::test]
    async fn removing_pending_edge_deletes_by_match() {
        let mut mock = MockGraphService::new();
        mock.expect_add_link().times(1).returning(|_| Err(BridgeError::failed("addLink", "offline")));
        mock.expect_remove_matching_link()
            .withf(|request| request == &LinkRequest::blocks("B", "A"))
            .times(1)
            .returning(|_| Ok(None));
        let mut session = ready_session(mock).await;

        session.connect(Connection::new("B", "A"));
        session.remove_edge("created-B-A");
        session.settle().await;

        assert_eq!(session.view().state().links().len(), 1);
    }

    #[tokio::test]
    async fn retarget_adds_then_removes_old_link() {
        let mut mock = MockGraphService::new();
        mock.expect_add_link()
            .withf(|request| request == &LinkRequest::blocks("B", "A"))
            .times(1)
            .returning(|_| Ok(created("10002")));
        mock.expect_remove_link_by_id()
            .withf(|id| id == "100")
            .times(1)
            .returning(|_| Ok(RemoteResponse::with_status(204)));
        let mut session = ready_session(mock).await;

        session.begin_edge_update();
        session.update_edge("100", Connection::new("B", "A"));
        session.end_edge_update("100");
        assert_eq!(session.in_flight(), 2);
        session.settle().await;

        let ids: Vec<_> = session.view().snapshot().edges.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["10002".to_string()]);
    }

    #[tokio::test]
    async fn failed_refresh_marks_view_failed() {
        let mut mock = MockGraphService::new();
        mock.expect_fetch_subtasks()
            .times(1)
            .returning(|| Err(BridgeError::failed("fetchSubtasks", "403 Forbidden")));
        let mut session = GraphSession::new(Arc::new(mock), GraphView::default());

        let err = assert_err!(session.refresh().await);

        assert_eq!(err.operation(), "fetchSubtasks");
        assert!(matches!(session.view().phase(), Phase::Failed(msg) if msg.contains("403")));
    }

    #[tokio::test]
    async fn background_refresh_lands_through_outcomes() {
        let mut mock = MockGraphService::new();
        mock.expect_fetch_subtasks().times(1).returning(|| Ok(graph()));
        let mut session = GraphSession::new(Arc::new(mock), GraphView::default());

        session.refresh_in_background();
        assert_eq!(session.view().phase(), &Phase::Loading);
        // spawned task has not run yet on the current-thread runtime
        assert_eq!(session.drain(), 0);

        session.settle().await;
        assert_eq!(session.view().phase(), &Phase::Ready);
        assert_eq!(session.view().state().subtasks().len(), 2);
    }
}
