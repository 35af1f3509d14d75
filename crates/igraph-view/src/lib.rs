//! igraph View - interactive subtask graph
//!
//! - `state`: local issue and link lists, changed through pure transitions
//! - `view`: gestures (connect, re-target, remove) with optimistic updates
//! - `layout`: pluggable layout capability and the default layered layout
//! - `render`: DOT, JSON and text output of a snapshot
//! - `session`: async driver that fires a view's remote calls
//!
//! # Example
//!
//! ```rust
//! use igraph_core::{Issue, SubtaskGraph};
//! use igraph_view::{Connection, Effect, GraphView};
//!
//! let mut view = GraphView::default();
//! view.refresh();
//! view.fetch_succeeded(SubtaskGraph {
//!     subtasks: vec![
//!         Issue::new("A", "First", "To Do", "new"),
//!         Issue::new("B", "Second", "To Do", "new"),
//!     ],
//!     links: Vec::new(),
//! });
//!
//! let effects = view.connect(Connection::new("A", "B"));
//! assert!(matches!(effects.as_slice(), [Effect::AddLink(_)]));
//! assert_eq!(view.snapshot().edges[0].id, "created-A-B");
//! ```

#![warn(unreachable_pub)]

pub mod layout;
pub mod render;
pub mod session;
pub mod state;
pub mod view;

pub use layout::{graph_layout, GraphLayout, LayeredLayout, LayoutEdge, LayoutNode, LayoutOptions, Point, Positions, ROOT_NODE_ID};
pub use render::{render, status_colour, Format};
pub use session::{GraphSession, Outcome};
pub use state::{GraphState, Transition};
pub use view::{Connection, Effect, GraphEdge, GraphNode, GraphSnapshot, GraphView, Phase};
