//! `TrackerApi` over HTTP
//!
//! Builds REST URLs under the configured base URL, attaches the acting
//! user's credentials, and maps responses onto wire types.

use crate::api::TrackerApi;
use crate::error::TrackerError;
use crate::wire::{NewIssueLink, RawIssue};
use async_trait::async_trait;
use igraph_core::{RemoteResponse, TrackerSettings};
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{Client, Method, RequestBuilder, Response, Url};

const API_PREFIX: &[&str] = &["rest", "api", "3"];

/// Credentials attached to every request
#[derive(Clone)]
enum Auth {
    Anonymous,
    Basic {
        email: String,
        token: String,
    },
    Bearer(String),
}

/// HTTP client for the tracker REST API
#[derive(Clone)]
pub struct HttpTracker {
    client: Client,
    base_url: Url,
    auth: Auth,
}

impl std::fmt::Debug for HttpTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match self.auth {
            Auth::Anonymous => "anonymous",
            Auth::Basic { .. } => "basic",
            Auth::Bearer(_) => "bearer",
        };
        f.debug_struct("HttpTracker")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &auth)
            .finish_non_exhaustive()
    }
}

impl HttpTracker {
    /// Client for a base URL, without credentials
    ///
    /// # Errors
    /// Returns `TrackerError::InvalidBaseUrl` if the URL does not parse or
    /// cannot carry a path.
    pub fn new(base_url: &str) -> Result<Self, TrackerError> {
        let client = Client::builder().build().map_err(TrackerError::Client)?;
        Self::with_client(client, base_url)
    }

    /// Use an existing `reqwest::Client`
    ///
    /// # Errors
    /// Returns `TrackerError::InvalidBaseUrl` for unusable URLs.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, TrackerError> {
        let parsed = Url::parse(base_url).map_err(|e| TrackerError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(TrackerError::InvalidBaseUrl {
                url: base_url.to_string(),
                message: "url cannot carry a path".into(),
            });
        }
        Ok(Self {
            client,
            base_url: parsed,
            auth: Auth::Anonymous,
        })
    }

    /// Build from configuration; bearer token wins over basic auth
    ///
    /// # Errors
    /// Returns `TrackerError::MissingBaseUrl` when no base URL is set.
    pub fn from_settings(settings: &TrackerSettings) -> Result<Self, TrackerError> {
        let base_url = settings
            .base_url
            .as_deref()
            .ok_or(TrackerError::MissingBaseUrl)?;
        let tracker = Self::new(base_url)?;

        Ok(match (&settings.bearer_token, &settings.email, &settings.api_token) {
            (Some(token), _, _) => tracker.with_bearer_token(token.clone()),
            (None, Some(email), Some(token)) => tracker.with_basic_auth(email.clone(), token.clone()),
            _ => {
                tracing::warn!("no tracker credentials configured, sending anonymous requests");
                tracker
            }
        })
    }

    /// Authenticate with e-mail and API token
    #[must_use]
    pub fn with_basic_auth(mut self, email: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth = Auth::Basic {
            email: email.into(),
            token: token.into(),
        };
        self
    }

    /// Authenticate with a bearer token
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    /// Base URL requests are built under
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/rest/api/3/{segments...}`
    fn api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(API_PREFIX.iter().copied())
                .extend(segments.iter().copied());
        }
        url
    }

    /// URL of an issue read with the given field list
    #[must_use]
    pub fn issue_url(&self, key: &str, fields: &[&str]) -> Url {
        let mut url = self.api_url(&["issue", key]);
        if !fields.is_empty() {
            url.set_query(Some(&format!("fields={}", fields.join(","))));
        }
        url
    }

    /// URL of the link collection, or of one link when `id` is given
    #[must_use]
    pub fn issue_link_url(&self, id: Option<&str>) -> Url {
        match id {
            Some(id) => self.api_url(&["issueLink", id]),
            None => self.api_url(&["issueLink"]),
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        match &self.auth {
            Auth::Anonymous => builder,
            Auth::Basic { email, token } => builder.basic_auth(email, Some(token)),
            Auth::Bearer(token) => builder.bearer_auth(token),
        }
    }

    async fn send(&self, method: Method, url: Url, body: Option<&NewIssueLink>) -> Result<Response, TrackerError> {
        tracing::debug!(%method, %url, "tracker request");
        let mut builder = self.request(method, url.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder.send().await.map_err(|source| TrackerError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

/// Turn any response into a `RemoteResponse`, keeping the status as-is
async fn into_remote_response(response: Response) -> Result<RemoteResponse, TrackerError> {
    let status = response.status().as_u16();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let url = response.url().to_string();
    let text = response
        .text()
        .await
        .map_err(|source| TrackerError::Transport { url, source })?;

    let body = if text.trim().is_empty() {
        None
    } else {
        Some(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    };

    Ok(RemoteResponse {
        status,
        location,
        body,
    })
}

#[async_trait]
impl TrackerApi for HttpTracker {
    async fn get_issue(&self, key: &str, fields: &[&str]) -> Result<RawIssue, TrackerError> {
        let url = self.issue_url(key, fields);
        let response = self.send(Method::GET, url.clone(), None).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Status {
                method: "GET",
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|source| TrackerError::Transport {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| TrackerError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn create_issue_link(&self, link: &NewIssueLink) -> Result<RemoteResponse, TrackerError> {
        let response = self
            .send(Method::POST, self.issue_link_url(None), Some(link))
            .await?;
        into_remote_response(response).await
    }

    async fn delete_issue_link(&self, id: &str) -> Result<RemoteResponse, TrackerError> {
        let response = self
            .send(Method::DELETE, self.issue_link_url(Some(id)), None)
            .await?;
        into_remote_response(response).await
    }
}
