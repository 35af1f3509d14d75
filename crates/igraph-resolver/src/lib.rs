//! igraph Resolver - aggregation service for the subtask link graph
//!
//! - `Resolver`: fetch-subtasks, add-link, remove-link-by-id and
//!   remove-matching-link against a `TrackerApi`
//! - `Bridge`: the same operations dispatched by name with JSON payloads,
//!   bound to an invocation context; also implements `GraphService`
//!
//! # Example
//!
//! ```rust,ignore
//! use igraph_resolver::{Bridge, InvocationContext};
//! use igraph_tracker::HttpTracker;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = HttpTracker::new("https://example.atlassian.net")?;
//! let bridge = Bridge::new(tracker, InvocationContext::new("PROJ-1"));
//! let graph = bridge.invoke("fetchSubtasks", serde_json::Value::Null).await?;
//! println!("{graph}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod bridge;
pub mod error;
pub mod resolver;

pub use bridge::{Bridge, InvocationContext, Operation};
pub use error::ResolverError;
pub use resolver::Resolver;
