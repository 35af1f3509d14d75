//! Graph view controller
//!
//! `GraphView` owns the local state, the fetch phase and the cached layout.
//! Every user gesture changes local state first and hands back the remote
//! `Effect`s the caller should fire; nothing here waits on the network.

use crate::layout::{graph_layout, GraphLayout, LayeredLayout, LayoutOptions, Point, Positions};
use crate::state::{GraphState, Transition};
use igraph_core::{Issue, IssueLink, LinkRequest, PanelConfig, SubtaskGraph, DEFAULT_LINK_TYPE};
use serde::Serialize;

/// Where the panel is with its data
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Initial fetch or refetch in progress
    Loading,
    /// Data shown
    Ready,
    /// Last fetch failed
    Failed(String),
}

/// Remote call a gesture asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch subtasks and links
    Fetch,
    /// Create a link
    AddLink(LinkRequest),
    /// Delete a persisted link by tracker id
    RemoveLinkById(String),
    /// Delete the first remote link matching the request
    RemoveMatchingLink(LinkRequest),
}

/// Source and target picked by a drag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Issue the drag started on
    pub source: String,
    /// Issue the drag ended on
    pub target: String,
}

impl Connection {
    /// Connection from `source` to `target`
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Rendered node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    /// Issue key
    pub id: String,
    /// Centre from the layout
    pub position: Point,
    /// The issue itself
    pub data: Issue,
}

/// Rendered edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    /// Tracker id, or `created-{inward}-{outward}` while pending
    pub id: String,
    /// Inward issue key
    pub source: String,
    /// Outward issue key
    pub target: String,
    /// The link itself
    pub data: IssueLink,
}

/// Everything a renderer needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    /// Fetch phase
    pub phase: Phase,
    /// One node per subtask
    pub nodes: Vec<GraphNode>,
    /// Links between subtasks
    pub edges: Vec<GraphEdge>,
}

/// State, phase and layout of one panel
pub struct GraphView {
    state: GraphState,
    phase: Phase,
    link_type: String,
    preserve_updated_edge: bool,
    layout: Box<dyn GraphLayout>,
    options: LayoutOptions,
    positions: Positions,
}

impl std::fmt::Debug for GraphView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphView")
            .field("phase", &self.phase)
            .field("link_type", &self.link_type)
            .field("subtasks", &self.state.subtasks().len())
            .field("links", &self.state.links().len())
            .finish_non_exhaustive()
    }
}

impl Default for GraphView {
    fn default() -> Self {
        Self::new(LayoutOptions::default())
    }
}

impl GraphView {
    /// Empty view using the layered layout
    #[must_use]
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            state: GraphState::new(),
            phase: Phase::Idle,
            link_type: DEFAULT_LINK_TYPE.to_string(),
            preserve_updated_edge: false,
            layout: Box::new(LayeredLayout::new()),
            options,
            positions: Positions::new(),
        }
    }

    /// View configured from panel settings
    #[must_use]
    pub fn from_config(config: &PanelConfig) -> Self {
        Self::new(config.layout.into()).with_link_type(config.panel.link_type.clone())
    }

    /// Type given to links drawn in this view
    #[must_use]
    pub fn with_link_type(mut self, link_type: impl Into<String>) -> Self {
        self.link_type = link_type.into();
        self
    }

    /// Replace the layout algorithm
    #[must_use]
    pub fn with_layout(mut self, layout: impl GraphLayout + 'static) -> Self {
        self.layout = Box::new(layout);
        self.relayout();
        self
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Current local state
    #[must_use]
    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Link type of new links
    #[must_use]
    pub fn link_type(&self) -> &str {
        &self.link_type
    }

    /// Cached layout, root anchor included
    #[must_use]
    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    /// Start a (re)fetch
    pub fn refresh(&mut self) -> Effect {
        self.phase = Phase::Loading;
        Effect::Fetch
    }

    /// Apply fetched data, discarding local edits
    pub fn fetch_succeeded(&mut self, graph: SubtaskGraph) {
        tracing::debug!(
            subtasks = graph.subtasks.len(),
            links = graph.links.len(),
            "applying fetched graph"
        );
        self.apply(Transition::FetchSucceeded(graph));
        self.phase = Phase::Ready;
    }

    /// Record a failed fetch; the previous data stays in place
    pub fn fetch_failed(&mut self, message: impl Into<String>) {
        self.phase = Phase::Failed(message.into());
    }

    /// Drag from one issue to another
    ///
    /// Adds a pending link of the view's link type at once. Drags with an
    /// empty end or onto the same issue are ignored.
    pub fn connect(&mut self, connection: Connection) -> Vec<Effect> {
        if connection.source.is_empty()
            || connection.target.is_empty()
            || connection.source == connection.target
        {
            tracing::debug!(?connection, "ignoring connection");
            return Vec::new();
        }
        let request = LinkRequest::new(connection.source, connection.target, self.link_type.clone());
        self.add_pending(request)
    }

    /// An edge end was picked up
    pub fn begin_edge_update(&mut self) {
        self.preserve_updated_edge = false;
    }

    /// An edge end was dropped on a connectable handle
    ///
    /// Same endpoints as before: the edge is marked to survive the end of
    /// the drag and nothing else happens. New endpoints: a pending link is
    /// added; the old link stays until `end_edge_update` removes it.
    pub fn update_edge(&mut self, edge_id: &str, connection: Connection) -> Vec<Effect> {
        let unchanged = self
            .state
            .link_by_edge_id(edge_id)
            .map(|old| old.inward_issue == connection.source && old.outward_issue == connection.target);

        match unchanged {
            Some(true) => {
                self.preserve_updated_edge = true;
                return Vec::new();
            }
            Some(false) => {}
            None => tracing::debug!(edge_id, "update for unknown edge, linking anyway"),
        }
        self.connect(connection)
    }

    /// The edge drag finished
    ///
    /// Unless the edge was marked to survive, it is removed like `remove_edge`.
    pub fn end_edge_update(&mut self, edge_id: &str) -> Vec<Effect> {
        if self.preserve_updated_edge {
            return Vec::new();
        }
        self.remove_edge(edge_id)
    }

    /// Remove an edge locally and pick the remote removal
    ///
    /// Persisted links are deleted by id, pending ones by matching.
    pub fn remove_edge(&mut self, edge_id: &str) -> Vec<Effect> {
        let Some(link) = self.state.link_by_edge_id(edge_id).cloned() else {
            tracing::debug!(edge_id, "removal of unknown edge");
            return Vec::new();
        };

        self.apply(Transition::LinkRemovedOptimistically {
            inward: link.inward_issue.clone(),
            outward: link.outward_issue.clone(),
        });

        let effect = match link.id {
            Some(ref id) if !link.is_pending() => Effect::RemoveLinkById(id.clone()),
            _ => Effect::RemoveMatchingLink(link.request()),
        };
        vec![effect]
    }

    /// The tracker created a link with `id`
    pub fn link_confirmed(&mut self, request: LinkRequest, id: String) {
        self.apply(Transition::LinkConfirmed { request, id });
    }

    /// The tracker deleted a link
    pub fn link_removal_confirmed(&mut self, request: LinkRequest) {
        self.apply(Transition::LinkRemovalConfirmed(request));
    }

    /// Nodes and edges as they should be drawn
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .state
            .subtasks()
            .iter()
            .map(|issue| GraphNode {
                id: issue.key.clone(),
                position: self.positions.get(&issue.key).copied().unwrap_or_default(),
                data: issue.clone(),
            })
            .collect();

        let edges = self
            .state
            .rendered_links()
            .map(|link| GraphEdge {
                id: link.edge_id(),
                source: link.inward_issue.clone(),
                target: link.outward_issue.clone(),
                data: link.clone(),
            })
            .collect();

        GraphSnapshot {
            phase: self.phase.clone(),
            nodes,
            edges,
        }
    }

    fn add_pending(&mut self, request: LinkRequest) -> Vec<Effect> {
        tracing::debug!(
            inward = %request.inward_issue,
            outward = %request.outward_issue,
            "adding pending link"
        );
        self.apply(Transition::LinkAddedOptimistically(request.clone()));
        vec![Effect::AddLink(request)]
    }

    fn apply(&mut self, transition: Transition) {
        let state = std::mem::take(&mut self.state);
        self.state = state.apply(transition);
        self.relayout();
    }

    fn relayout(&mut self) {
        self.positions = graph_layout(
            self.layout.as_ref(),
            self.state.subtasks(),
            self.state.links(),
            &self.options,
        );
    }
}
