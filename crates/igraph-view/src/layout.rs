//! Automatic graph layout
//!
//! `GraphLayout` is the pluggable capability: nodes with sizes and directed
//! edges in, one centre point per node out. `LayeredLayout` is the default
//! layered (Sugiyama-style) implementation. `graph_layout` adapts issues and
//! links to the capability and adds the invisible root anchor.

use igraph_core::{Issue, IssueLink, LayoutSettings};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{depth_first_search, DfsEvent};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Id of the synthetic node every issue hangs off during layout
pub const ROOT_NODE_ID: &str = "root";

/// Label of root anchor edges
const ROOT_EDGE_LABEL: &str = "root";

/// Node centre
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal, growing right
    pub x: f64,
    /// Vertical, growing down
    pub y: f64,
}

impl Point {
    /// Point at `(x, y)`
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node handed to a layout
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    /// Node id
    pub id: String,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

/// Directed edge handed to a layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEdge {
    /// Source node id
    pub from: String,
    /// Target node id
    pub to: String,
    /// Link type, or `root` for anchor edges
    pub label: String,
}

/// Spacing and default node size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Width given to every issue node
    pub node_width: f64,
    /// Height given to every issue node
    pub node_height: f64,
    /// Horizontal gap between neighbouring nodes of one rank
    pub node_sep: f64,
    /// Vertical gap between ranks
    pub rank_sep: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self::from(LayoutSettings::default())
    }
}

impl From<LayoutSettings> for LayoutOptions {
    fn from(settings: LayoutSettings) -> Self {
        Self {
            node_width: settings.node_width,
            node_height: settings.node_height,
            node_sep: settings.node_sep,
            rank_sep: settings.rank_sep,
        }
    }
}

/// Node id to centre point
pub type Positions = BTreeMap<String, Point>;

/// A layout algorithm
pub trait GraphLayout: Send + Sync {
    /// Assign a centre point to every node
    ///
    /// Edges whose endpoints are not among `nodes` are ignored.
    fn layout(&self, nodes: &[LayoutNode], edges: &[LayoutEdge], options: &LayoutOptions) -> Positions;
}

/// Layered layout, top to bottom
///
/// 1. Break cycles by reversing DFS back edges
/// 2. Rank nodes by longest path from the sources
/// 3. Order each rank by barycentre sweeps to reduce crossings
/// 4. Place ranks top to bottom, each centred on `x = 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayeredLayout {
    sweeps: usize,
}

impl Default for LayeredLayout {
    fn default() -> Self {
        Self { sweeps: 4 }
    }
}

impl LayeredLayout {
    /// Layout with the default number of ordering sweeps
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of down+up barycentre sweeps
    #[inline]
    #[must_use]
    pub fn with_sweeps(mut self, sweeps: usize) -> Self {
        self.sweeps = sweeps;
        self
    }

    /// Acyclic graph over node indices: self loops dropped, back edges reversed
    fn acyclic_graph(nodes: &[LayoutNode], edges: &[LayoutEdge]) -> DiGraphMap<usize, ()> {
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect();

        let mut graph = DiGraphMap::new();
        for i in 0..nodes.len() {
            graph.add_node(i);
        }
        for edge in edges {
            if let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
                if from != to {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut back_edges = Vec::new();
        depth_first_search(&graph, 0..nodes.len(), |event| {
            if let DfsEvent::BackEdge(from, to) = event {
                back_edges.push((from, to));
            }
        });
        for (from, to) in back_edges {
            graph.remove_edge(from, to);
            graph.add_edge(to, from, ());
        }
        graph
    }

    /// Longest-path rank of every node
    fn ranks(graph: &DiGraphMap<usize, ()>, count: usize) -> Vec<usize> {
        let order = toposort(graph, None).unwrap_or_else(|cycle| {
            tracing::warn!(node = cycle.node_id(), "cycle left after back edge reversal");
            (0..count).collect()
        });

        let mut rank = vec![0; count];
        for node in order {
            for succ in graph.neighbors_directed(node, Direction::Outgoing) {
                rank[succ] = rank[succ].max(rank[node] + 1);
            }
        }
        rank
    }

    /// Order within each rank, refined by alternating barycentre sweeps
    fn order(&self, graph: &DiGraphMap<usize, ()>, rank: &[usize]) -> Vec<Vec<usize>> {
        let depth = rank.iter().max().map_or(0, |max| max + 1);
        let mut layers = vec![Vec::new(); depth];
        for (node, &r) in rank.iter().enumerate() {
            layers[r].push(node);
        }

        for _ in 0..self.sweeps {
            for r in 1..depth {
                let (above, rest) = layers.split_at_mut(r);
                reorder(&mut rest[0], &above[r - 1], graph, Direction::Incoming);
            }
            for r in (0..depth.saturating_sub(1)).rev() {
                let (upto, below) = layers.split_at_mut(r + 1);
                reorder(&mut upto[r], &below[0], graph, Direction::Outgoing);
            }
        }
        layers
    }
}

/// Stable sort of `layer` by the mean position of its neighbours in `fixed`
///
/// Nodes without neighbours there keep their current position as key.
fn reorder(layer: &mut [usize], fixed: &[usize], graph: &DiGraphMap<usize, ()>, direction: Direction) {
    let fixed_pos: HashMap<usize, usize> = fixed.iter().enumerate().map(|(i, &n)| (n, i)).collect();

    let mut keyed: Vec<(f64, usize)> = layer
        .iter()
        .enumerate()
        .map(|(current, &node)| {
            let positions: Vec<usize> = graph
                .neighbors_directed(node, direction)
                .filter_map(|n| fixed_pos.get(&n).copied())
                .collect();
            let key = if positions.is_empty() {
                current as f64
            } else {
                positions.iter().sum::<usize>() as f64 / positions.len() as f64
            };
            (key, node)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    for (slot, (_, node)) in layer.iter_mut().zip(keyed) {
        *slot = node;
    }
}

impl GraphLayout for LayeredLayout {
    fn layout(&self, nodes: &[LayoutNode], edges: &[LayoutEdge], options: &LayoutOptions) -> Positions {
        if nodes.is_empty() {
            return Positions::new();
        }

        let graph = Self::acyclic_graph(nodes, edges);
        let rank = Self::ranks(&graph, nodes.len());
        let layers = self.order(&graph, &rank);

        let mut positions = Positions::new();
        let mut top = 0.0;
        for layer in &layers {
            let height = layer
                .iter()
                .map(|&n| nodes[n].height)
                .fold(0.0, f64::max);
            let width: f64 = layer.iter().map(|&n| nodes[n].width).sum::<f64>()
                + options.node_sep * layer.len().saturating_sub(1) as f64;

            let mut left = -width / 2.0;
            for &n in layer {
                let node = &nodes[n];
                positions.insert(
                    node.id.clone(),
                    Point::new(left + node.width / 2.0, top + height / 2.0),
                );
                left += node.width + options.node_sep;
            }
            top += height + options.rank_sep;
        }
        positions
    }
}

/// Lay out issues and links with the root anchor added
///
/// The root is linked to every issue so disconnected subtasks still get a
/// rank. Links with an end outside `issues` are skipped. The returned
/// positions include the root.
pub fn graph_layout(
    layout: &dyn GraphLayout,
    issues: &[Issue],
    links: &[IssueLink],
    options: &LayoutOptions,
) -> Positions {
    let node = |id: &str| LayoutNode {
        id: id.to_string(),
        width: options.node_width,
        height: options.node_height,
    };

    let mut nodes = Vec::with_capacity(issues.len() + 1);
    nodes.push(node(ROOT_NODE_ID));
    nodes.extend(issues.iter().map(|issue| node(&issue.key)));

    let keys: HashSet<&str> = issues.iter().map(|issue| issue.key.as_str()).collect();
    let mut edges: Vec<LayoutEdge> = links
        .iter()
        .filter(|link| keys.contains(link.inward_issue.as_str()) && keys.contains(link.outward_issue.as_str()))
        .map(|link| LayoutEdge {
            from: link.inward_issue.clone(),
            to: link.outward_issue.clone(),
            label: link.link_type.clone(),
        })
        .collect();
    edges.extend(issues.iter().map(|issue| LayoutEdge {
        from: ROOT_NODE_ID.to_string(),
        to: issue.key.clone(),
        label: ROOT_EDGE_LABEL.to_string(),
    }));

    tracing::debug!(nodes = nodes.len(), edges = edges.len(), "computing layout");
    layout.layout(&nodes, &edges, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use igraph_core::LinkRequest;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn nodes(ids: &[&str]) -> Vec<LayoutNode> {
        ids.iter()
            .map(|id| LayoutNode {
                id: (*id).to_string(),
                width: 100.0,
                height: 50.0,
            })
            .collect()
    }

    fn edge(from: &str, to: &str) -> LayoutEdge {
        LayoutEdge {
            from: from.into(),
            to: to.into(),
            label: String::new(),
        }
    }

    #[test]
    fn chain_is_stacked_vertically() {
        let options = LayoutOptions::default();
        let positions = LayeredLayout::new().layout(
            &nodes(&["a", "b", "c"]),
            &[edge("a", "b"), edge("b", "c")],
            &options,
        );

        let ys: Vec<f64> = ["a", "b", "c"].iter().map(|id| positions[*id].y).collect();
        assert_eq!(ys, vec![25.0, 155.0, 285.0]);
        assert!(positions.values().all(|p| p.x == 0.0));
    }

    #[test]
    fn siblings_are_separated_by_node_sep() {
        let options = LayoutOptions {
            node_sep: 20.0,
            ..LayoutOptions::default()
        };
        let positions = LayeredLayout::new().layout(
            &nodes(&["r", "x", "y"]),
            &[edge("r", "x"), edge("r", "y")],
            &options,
        );

        assert_eq!(positions["x"].y, positions["y"].y);
        assert_eq!((positions["y"].x - positions["x"].x).abs(), 120.0);
    }

    #[test]
    fn cycles_still_get_positions() {
        let positions = LayeredLayout::new().layout(
            &nodes(&["a", "b"]),
            &[edge("a", "b"), edge("b", "a"), edge("a", "a")],
            &LayoutOptions::default(),
        );
        assert_eq!(positions.len(), 2);
        assert_ne!(positions["a"].y, positions["b"].y);
    }

    #[test]
    fn unknown_endpoints_are_ignored() {
        let positions = LayeredLayout::new().layout(
            &nodes(&["a"]),
            &[edge("a", "ghost")],
            &LayoutOptions::default(),
        );
        assert_eq!(positions.len(), 1);
    }

    #[test]
    fn adapter_anchors_issues_under_root() {
        let issues = vec![
            Issue::new("A", "a", "To Do", "new"),
            Issue::new("B", "b", "To Do", "new"),
        ];
        let links = vec![
            IssueLink::confirmed("1", LinkRequest::blocks("A", "B")),
            IssueLink::confirmed("2", LinkRequest::blocks("A", "OUT-1")),
        ];
        let options = LayoutOptions::default();

        let positions = graph_layout(&LayeredLayout::new(), &issues, &links, &options);

        assert_eq!(positions.len(), 3);
        assert!(positions[ROOT_NODE_ID].y < positions["A"].y);
        assert!(positions["A"].y < positions["B"].y);
        assert!(!positions.contains_key("OUT-1"));
    }

    #[test]
    fn default_options_match_panel_defaults() {
        let options = LayoutOptions::default();
        assert_eq!(options.node_width, 500.0);
        assert_eq!(options.node_height, 150.0);
        assert_eq!(options.node_sep, 200.0);
        assert_eq!(options.rank_sep, 80.0);
    }

    fn arb_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (1usize..12).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..24)))
    }

    fn build(n: usize, pairs: &[(usize, usize)]) -> (Vec<LayoutNode>, Vec<LayoutEdge>) {
        let nodes = (0..n)
            .map(|i| LayoutNode {
                id: format!("n{i}"),
                width: 40.0 + (i % 3) as f64 * 30.0,
                height: 20.0 + (i % 2) as f64 * 10.0,
            })
            .collect();
        let edges = pairs
            .iter()
            .map(|(a, b)| edge(&format!("n{a}"), &format!("n{b}")))
            .collect();
        (nodes, edges)
    }

    proptest! {
        #[test]
        fn every_node_is_placed((n, pairs) in arb_graph()) {
            let (nodes, edges) = build(n, &pairs);
            let positions = LayeredLayout::new().layout(&nodes, &edges, &LayoutOptions::default());
            prop_assert_eq!(positions.len(), n);
        }

        #[test]
        fn nodes_in_one_rank_do_not_overlap((n, pairs) in arb_graph()) {
            let (nodes, edges) = build(n, &pairs);
            let positions = LayeredLayout::new().layout(&nodes, &edges, &LayoutOptions::default());

            for a in &nodes {
                for b in &nodes {
                    if a.id == b.id {
                        continue;
                    }
                    let (pa, pb) = (positions[&a.id], positions[&b.id]);
                    if pa.y == pb.y {
                        prop_assert!((pa.x - pb.x).abs() >= (a.width + b.width) / 2.0);
                    }
                }
            }
        }

        #[test]
        fn acyclic_edges_point_downward((n, pairs) in arb_graph()) {
            // keep only forward pairs so the input is acyclic
            let forward: Vec<_> = pairs.into_iter().filter(|(a, b)| a < b).collect();
            let (nodes, edges) = build(n, &forward);
            let positions = LayeredLayout::new().layout(&nodes, &edges, &LayoutOptions::default());

            for edge in &edges {
                prop_assert!(positions[&edge.from].y < positions[&edge.to].y);
            }
        }
    }
}
