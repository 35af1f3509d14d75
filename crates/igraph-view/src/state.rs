//! Local issue and link lists
//!
//! `GraphState` only changes through `Transition`s applied by `apply`,
//! which consumes the old state and returns the new one.

use igraph_core::{Issue, IssueLink, LinkRequest, SubtaskGraph};
use serde::{Deserialize, Serialize};

/// Every way the local lists can change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A fetch finished; both lists are replaced and pending edits dropped
    FetchSucceeded(SubtaskGraph),
    /// A link was drawn; it is kept as pending until confirmed
    LinkAddedOptimistically(LinkRequest),
    /// An edge was removed; every local link with these endpoints goes
    LinkRemovedOptimistically { inward: String, outward: String },
    /// The tracker created the link; the first matching pending link takes its id
    LinkConfirmed { request: LinkRequest, id: String },
    /// The tracker deleted the link; drop any confirmed link still matching
    LinkRemovalConfirmed(LinkRequest),
}

/// Subtasks and links as the panel currently believes them to be
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphState {
    subtasks: Vec<Issue>,
    links: Vec<IssueLink>,
}

impl GraphState {
    /// Empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current subtasks, in the tracker's order
    #[must_use]
    pub fn subtasks(&self) -> &[Issue] {
        &self.subtasks
    }

    /// Current links, including pending ones and links leaving the subtask set
    #[must_use]
    pub fn links(&self) -> &[IssueLink] {
        &self.links
    }

    /// Whether `key` is one of the subtasks
    #[must_use]
    pub fn contains_issue(&self, key: &str) -> bool {
        self.subtasks.iter().any(|issue| issue.key == key)
    }

    /// Links with both ends inside the subtask set
    pub fn rendered_links(&self) -> impl Iterator<Item = &IssueLink> {
        self.links.iter().filter(|link| {
            self.contains_issue(&link.inward_issue) && self.contains_issue(&link.outward_issue)
        })
    }

    /// First link whose edge id is `edge_id`
    #[must_use]
    pub fn link_by_edge_id(&self, edge_id: &str) -> Option<&IssueLink> {
        self.links.iter().find(|link| link.edge_id() == edge_id)
    }

    /// Apply one transition
    #[must_use]
    pub fn apply(mut self, transition: Transition) -> Self {
        match transition {
            Transition::FetchSucceeded(graph) => {
                self.subtasks = graph.subtasks;
                self.links = graph.links;
            }
            Transition::LinkAddedOptimistically(request) => {
                self.links.push(IssueLink::pending(request));
            }
            Transition::LinkRemovedOptimistically { inward, outward } => {
                self.links.retain(|link| !link.connects(&inward, &outward));
            }
            Transition::LinkConfirmed { request, id } => {
                if let Some(link) = self
                    .links
                    .iter_mut()
                    .find(|link| link.is_pending() && link.matches(&request))
                {
                    link.id = Some(id);
                }
            }
            Transition::LinkRemovalConfirmed(request) => {
                self.links
                    .retain(|link| link.is_pending() || !link.matches(&request));
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fetched() -> GraphState {
        GraphState::new().apply(Transition::FetchSucceeded(SubtaskGraph {
            subtasks: vec![
                Issue::new("A", "First", "To Do", "new"),
                Issue::new("B", "Second", "Done", "done"),
            ],
            links: vec![IssueLink::confirmed("100", LinkRequest::blocks("A", "B"))],
        }))
    }

    #[test]
    fn fetch_replaces_both_lists() {
        let state = fetched()
            .apply(Transition::LinkAddedOptimistically(LinkRequest::blocks("B", "A")))
            .apply(Transition::FetchSucceeded(SubtaskGraph::default()));

        assert!(state.subtasks().is_empty());
        assert!(state.links().is_empty());
    }

    #[test]
    fn optimistic_add_appends_pending_link() {
        let state =
            fetched().apply(Transition::LinkAddedOptimistically(LinkRequest::blocks("B", "A")));

        let added = state.links().last().unwrap();
        assert!(added.is_pending());
        assert_eq!(added.edge_id(), "created-B-A");
    }

    #[test]
    fn optimistic_remove_drops_every_link_between_endpoints() {
        let state = fetched()
            .apply(Transition::LinkAddedOptimistically(LinkRequest::new("A", "B", "Relates")))
            .apply(Transition::LinkRemovedOptimistically {
                inward: "A".into(),
                outward: "B".into(),
            });

        assert!(state.links().is_empty());
    }

    #[test]
    fn optimistic_remove_is_directional() {
        let state = fetched().apply(Transition::LinkRemovedOptimistically {
            inward: "B".into(),
            outward: "A".into(),
        });
        assert_eq!(state.links().len(), 1);
    }

    #[test]
    fn confirmation_assigns_id_to_first_pending_match() {
        let request = LinkRequest::blocks("B", "A");
        let state = fetched()
            .apply(Transition::LinkAddedOptimistically(request.clone()))
            .apply(Transition::LinkAddedOptimistically(request.clone()))
            .apply(Transition::LinkConfirmed {
                request,
                id: "10001".into(),
            });

        let ids: Vec<_> = state.links().iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids, vec![Some("100".into()), Some("10001".into()), None]);
    }

    #[test]
    fn confirmation_after_removal_changes_nothing() {
        let request = LinkRequest::blocks("B", "A");
        let before = fetched();
        let after = before.clone().apply(Transition::LinkConfirmed {
            request,
            id: "10001".into(),
        });
        assert_eq!(before, after);
    }

    #[test]
    fn removal_confirmation_keeps_a_redrawn_pending_link() {
        let state = fetched()
            .apply(Transition::LinkRemovedOptimistically {
                inward: "A".into(),
                outward: "B".into(),
            })
            .apply(Transition::LinkAddedOptimistically(LinkRequest::blocks("A", "B")))
            .apply(Transition::LinkRemovalConfirmed(LinkRequest::blocks("A", "B")));

        assert_eq!(state.links().len(), 1);
        assert!(state.links()[0].is_pending());
    }

    #[test]
    fn links_outside_subtask_set_are_kept_but_not_rendered() {
        let state = fetched().apply(Transition::LinkAddedOptimistically(LinkRequest::blocks(
            "A", "OTHER-9",
        )));

        assert_eq!(state.links().len(), 2);
        assert_eq!(state.rendered_links().count(), 1);
    }

    #[test]
    fn edge_lookup_covers_pending_links() {
        let state =
            fetched().apply(Transition::LinkAddedOptimistically(LinkRequest::blocks("B", "A")));

        assert_eq!(state.link_by_edge_id("100").unwrap().outward_issue, "B");
        assert_eq!(state.link_by_edge_id("created-B-A").unwrap().outward_issue, "A");
        assert!(state.link_by_edge_id("999").is_none());
    }
}
