//! Panel configuration
//!
//! Read from an optional TOML file, then overridden from the environment:
//!
//! ```toml
//! [tracker]
//! base_url = "https://example.atlassian.net"
//! email = "someone@example.com"
//! api_token = "..."
//!
//! [layout]
//! node_sep = 200.0
//! rank_sep = 80.0
//!
//! [panel]
//! link_type = "Blocks"
//! ```

use crate::error::ConfigError;
use crate::types::DEFAULT_LINK_TYPE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding `tracker.base_url`
pub const ENV_BASE_URL: &str = "IGRAPH_BASE_URL";
/// Environment variable overriding `tracker.email`
pub const ENV_EMAIL: &str = "IGRAPH_EMAIL";
/// Environment variable overriding `tracker.api_token`
pub const ENV_API_TOKEN: &str = "IGRAPH_API_TOKEN";
/// Environment variable overriding `tracker.bearer_token`
pub const ENV_BEARER_TOKEN: &str = "IGRAPH_BEARER_TOKEN";
/// Environment variable overriding `panel.link_type`
pub const ENV_LINK_TYPE: &str = "IGRAPH_LINK_TYPE";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Remote tracker connection
    pub tracker: TrackerSettings,
    /// Layout sizing and spacing
    pub layout: LayoutSettings,
    /// Panel behaviour
    pub panel: PanelSettings,
}

/// Remote tracker connection settings
///
/// Credentials are passed through to the HTTP client untouched.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Base URL, e.g. `https://example.atlassian.net`
    pub base_url: Option<String>,
    /// Account e-mail for basic auth
    pub email: Option<String>,
    /// API token for basic auth
    pub api_token: Option<String>,
    /// Bearer token, used instead of basic auth when set
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for TrackerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerSettings")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Layout sizing, in layout units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Width of every node
    pub node_width: f64,
    /// Height of every node
    pub node_height: f64,
    /// Horizontal gap between nodes in one rank
    pub node_sep: f64,
    /// Vertical gap between ranks
    pub rank_sep: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            node_width: 500.0,
            node_height: 150.0,
            node_sep: 200.0,
            rank_sep: 80.0,
        }
    }
}

/// Panel behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    /// Link type created by drag-to-connect
    pub link_type: String,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            link_type: DEFAULT_LINK_TYPE.to_string(),
        }
    }
}

impl PanelConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` if the text is not valid for the schema.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read configuration from a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` or `ConfigError::Parse`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Load from an optional file, then apply process environment overrides
    ///
    /// # Errors
    /// Propagates file errors and validation failures.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading panel config");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        let config = config.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(ENV_BASE_URL) {
            self.tracker.base_url = Some(value);
        }
        if let Some(value) = lookup(ENV_EMAIL) {
            self.tracker.email = Some(value);
        }
        if let Some(value) = lookup(ENV_API_TOKEN) {
            self.tracker.api_token = Some(value);
        }
        if let Some(value) = lookup(ENV_BEARER_TOKEN) {
            self.tracker.bearer_token = Some(value);
        }
        if let Some(value) = lookup(ENV_LINK_TYPE) {
            self.panel.link_type = value;
        }
        self
    }

    /// With tracker base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.tracker.base_url = Some(base_url.into());
        self
    }

    /// With basic-auth credentials
    #[inline]
    #[must_use]
    pub fn with_basic_auth(mut self, email: impl Into<String>, api_token: impl Into<String>) -> Self {
        self.tracker.email = Some(email.into());
        self.tracker.api_token = Some(api_token.into());
        self
    }

    /// With link type for new connections
    #[inline]
    #[must_use]
    pub fn with_link_type(mut self, link_type: impl Into<String>) -> Self {
        self.panel.link_type = link_type.into();
        self
    }

    /// With layout settings
    #[inline]
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutSettings) -> Self {
        self.layout = layout;
        self
    }

    /// Base URL, required by anything that talks to the tracker
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` when no base URL is configured.
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        self.tracker
            .base_url
            .as_deref()
            .ok_or(ConfigError::Missing("tracker.base_url"))
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for non-positive sizes, negative gaps
    /// or an empty link type.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        if !(layout.node_width > 0.0 && layout.node_height > 0.0) {
            return Err(ConfigError::Invalid {
                key: "layout.node_width/node_height",
                message: "node size must be positive".into(),
            });
        }
        if layout.node_sep < 0.0 || layout.rank_sep < 0.0 {
            return Err(ConfigError::Invalid {
                key: "layout.node_sep/rank_sep",
                message: "separation must not be negative".into(),
            });
        }
        if self.panel.link_type.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "panel.link_type",
                message: "link type must not be empty".into(),
            });
        }
        Ok(())
    }
}
