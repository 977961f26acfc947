// # Reddit Adapter
//
// This crate provides the Reddit implementations of the feedpoll collaborator
// traits.
//
// ## Scope
//
// - `ListingFetcher`: one GET per page against the OAuth API
// - `ActionSubmitter`: one form POST per action
// - `Account`: typed account actions (reply, compose, submit, flair)
//
// The client never retries, caches or deduplicates. Monitors own all of that.
//
// ## Security Requirements
//
// - Access token NEVER appears in logs or `Debug` output
// - Client construction fails fast on an empty token or user agent
//
// ## API Reference
//
// - Listings: GET `/r/<sr>/new`, `/user/<name>`, `/message/<box>`
// - Actions: POST `/api/comment`, `/api/compose`, `/api/submit`, `/r/<sr>/api/flair`

pub mod account;
pub mod listing;

pub use account::Account;

use async_trait::async_trait;
use feedpoll_core::{ActionSubmitter, Error, Listing, ListingFetcher, PageRequest, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Reddit OAuth API base URL
pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

fn default_base_url() -> String {
    REDDIT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Connection settings for one set of credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base URL without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with every request (Reddit rejects generic ones)
    pub user_agent: String,

    /// OAuth bearer token
    /// ⚠️ NEVER log this value
    pub access_token: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Config against the public OAuth API with default timeout
    pub fn new(access_token: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: user_agent.into(),
            access_token: access_token.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(Error::config("Access token cannot be empty"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::config("User agent cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be > 0"));
        }
        Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("Invalid base URL '{}': {}", self.base_url, e)))?;
        Ok(())
    }
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("access_token", &"<REDACTED>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// HTTP client for one Reddit account
///
/// Construct one per credential set and share it (behind an `Arc`) between
/// the monitors and handlers that use those credentials.
pub struct RedditClient {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl RedditClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// `Error::Config` when the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token,
            client,
        })
    }

    /// Absolute URL for `path`, keeping any query string it already has
    fn url(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| Error::invalid_path(format!("{}: {}", path, e)))
    }
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for RedditClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"<REDACTED>")
            .finish()
    }
}

/// Map a non-success HTTP status to an error
///
/// 401/403 and 404 are fatal for the monitor; everything else is retried.
pub fn classify_status(status: u16, path: &str, body: &str) -> Error {
    let detail = body.chars().take(200).collect::<String>();
    match status {
        401 | 403 => Error::auth(format!(
            "{} returned {}: invalid access token or insufficient scope",
            path, status
        )),
        404 => Error::invalid_path(format!("{} does not exist", path)),
        429 => Error::rate_limited(format!("{} returned 429", path)),
        500..=599 => Error::http(format!("{} server error {}: {}", path, status, detail)),
        _ => Error::http(format!("{} returned {}: {}", path, status, detail)),
    }
}

/// Extract the errors Reddit reports inside a 200 action response
///
/// Action endpoints called with `api_type=json` answer
/// `{"json": {"errors": [["CODE", "message", "field"], ...]}}`.
fn action_errors(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let errors = value.get("json")?.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }

    let messages: Vec<String> = errors
        .iter()
        .map(|e| match e.as_array() {
            Some(parts) => parts
                .iter()
                .filter_map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(": "),
            None => e.to_string(),
        })
        .collect();
    Some(messages.join("; "))
}

#[async_trait]
impl ListingFetcher for RedditClient {
    async fn fetch(&self, path: &str, page: &PageRequest) -> Result<Listing> {
        let mut url = self.url(path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &page.limit.to_string());
            if let Some(after) = &page.after {
                query.append_pair("after", after);
            }
            query.append_pair("raw_json", "1");
        }

        tracing::debug!("GET {} (after={:?})", path, page.after);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| Error::network(format!("GET {} failed: {}", path, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Reading {} failed: {}", path, e)))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), path, &body));
        }

        listing::decode(&body)
    }
}

#[async_trait]
impl ActionSubmitter for RedditClient {
    async fn submit(&self, path: &str, form: &[(&str, &str)]) -> Result<()> {
        let url = self.url(path)?;

        let mut fields = Vec::with_capacity(form.len() + 1);
        fields.push(("api_type", "json"));
        fields.extend_from_slice(form);

        tracing::debug!("POST {}", path);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .form(&fields)
            .send()
            .await
            .map_err(|e| Error::network(format!("POST {} failed: {}", path, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Reading {} failed: {}", path, e)))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), path, &body));
        }

        if let Some(errors) = action_errors(&body) {
            tracing::warn!("POST {} rejected: {}", path, errors);
            return Err(Error::Other(format!("{} rejected: {}", path, errors)));
        }

        Ok(())
    }
}
