//! igraph Core - shared model for the subtask link graph
//!
//! Provides the pieces every other crate in the workspace builds on:
//! - Issue / link data model and the fetch result shape
//! - The bridge surface (`GraphService`) the view calls into
//! - The ordered, one-at-a-time async sequencing helper
//! - Panel configuration (TOML + environment overrides)
//!
//! # Example
//!
//! ```rust
//! use igraph_core::{IssueLink, LinkRequest};
//!
//! let pending = IssueLink::pending(LinkRequest::blocks("A", "B"));
//! assert_eq!(pending.edge_id(), "created-A-B");
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod sequence;
pub mod service;
pub mod types;

pub use config::{LayoutSettings, PanelConfig, PanelSettings, TrackerSettings};
pub use error::{BridgeError, ConfigError};
pub use sequence::sequence_async;
pub use service::GraphService;
pub use types::{
    Issue, IssueLink, LinkRequest, RemoteResponse, StatusCategory, SubtaskGraph,
    DEFAULT_LINK_TYPE, PENDING_EDGE_PREFIX,
};

#[cfg(feature = "mock")]
pub use service::MockGraphService;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
