//! igraph Tracker - remote issue tracker client
//!
//! - `TrackerApi`: the REST seam the aggregation service is written against
//! - `HttpTracker`: reqwest implementation with pass-through credentials
//! - `wire`: JSON request/response shapes
//!
//! # Example
//!
//! ```rust,ignore
//! use igraph_tracker::{HttpTracker, TrackerApi, wire::DETAIL_FIELDS};
//!
//! # async fn example() -> Result<(), igraph_tracker::TrackerError> {
//! let tracker = HttpTracker::new("https://example.atlassian.net")?
//!     .with_basic_auth("me@example.com", "api-token");
//! let issue = tracker.get_issue("PROJ-2", DETAIL_FIELDS).await?;
//! println!("{} has {} links", issue.key, issue.fields.issuelinks.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod api;
pub mod error;
pub mod http;
pub mod wire;

pub use api::TrackerApi;
pub use error::TrackerError;
pub use http::HttpTracker;
pub use wire::{IssueStub, NewIssueLink, RawFields, RawIssue, RawIssueLink, RawLinkType, RawStatus, RawStatusCategory};
