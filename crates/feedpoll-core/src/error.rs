//! Error types for the feedpoll system
//!
//! Fetch errors are classified as transient (retried on the next cycle) or
//! fatal (the monitor stops). See [`Error::is_transient`].

use crate::config::Direction;
use thiserror::Error;

/// Result type alias for feedpoll operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the feedpoll system
#[derive(Error, Debug)]
pub enum Error {
    /// Connection, timeout or other transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected HTTP status from the platform
    #[error("HTTP error: {0}")]
    Http(String),

    /// Platform asked us to slow down
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Response arrived but could not be decoded into a listing
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The target path does not exist or can never be listed
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not allowed in the monitor's current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A handler asked the monitor to stop with an error
    #[error("Handler error: {0}")]
    Handler(String),

    /// Terminal error of a monitor, tagged with enough context to restart it
    #[error("Monitor {monitor} ({path}, {direction}, frontier: {}) stopped: {source}",
        .frontier.as_deref().unwrap_or("<none>"))]
    Monitor {
        /// Monitor label
        monitor: String,
        /// Listing path the monitor was polling
        path: String,
        /// Cold-start policy of the monitor
        direction: Direction,
        /// Last dispatched item name at the time of failure, `None` on cold
        /// start or when the monitor's task panicked
        frontier: Option<String>,
        /// Underlying cause
        source: Box<Error>,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a handler error
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }

    /// Whether a fetch failing with this error should simply be retried on
    /// the next scheduled cycle.
    ///
    /// Everything else terminates the monitor that observed it.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_)
            | Error::Http(_)
            | Error::RateLimited(_)
            | Error::MalformedResponse(_)
            | Error::Json(_) => true,
            Error::Monitor { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Label of the monitor that produced this error, if tagged
    pub fn monitor_label(&self) -> Option<&str> {
        match self {
            Error::Monitor { monitor, .. } => Some(monitor),
            _ => None,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::network("timeout").is_transient());
        assert!(Error::rate_limited("slow down").is_transient());
        assert!(Error::malformed("truncated body").is_transient());
        assert!(!Error::auth("bad token").is_transient());
        assert!(!Error::invalid_path("/r/").is_transient());
        assert!(!Error::handler("boom").is_transient());
    }

    #[test]
    fn test_monitor_error_display_carries_context() {
        let err = Error::Monitor {
            monitor: "inbox".to_string(),
            path: "/message/messages".to_string(),
            direction: Direction::Forward,
            frontier: Some("t4_abc".to_string()),
            source: Box::new(Error::auth("token expired")),
        };

        let text = err.to_string();
        assert!(text.contains("inbox"));
        assert!(text.contains("/message/messages"));
        assert!(text.contains("forward"));
        assert!(text.contains("t4_abc"));
        assert!(text.contains("token expired"));
        assert_eq!(err.monitor_label(), Some("inbox"));
        assert!(!err.is_transient());
    }
}
