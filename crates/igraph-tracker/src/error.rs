//! Tracker client errors

/// Failures talking to the remote tracker
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The request never produced a response
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The tracker answered a read with a non-success status
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected shape
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// No base URL was configured
    #[error("tracker base url is not configured")]
    MissingBaseUrl,

    /// The base URL cannot carry REST paths
    #[error("invalid base url '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    /// The HTTP client could not be built
    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),
}

impl TrackerError {
    /// Status code, when the tracker answered at all
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the tracker reported the resource as missing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
