//! Configuration types for the feedpoll system
//!
//! This module defines all configuration structures used throughout the crate.

use crate::item::ItemKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Cold-start policy of a monitor
///
/// Direction only changes what happens on the first successful cycle; after
/// that every monitor dispatches items newer than its frontier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Skip existing history: the first batch only establishes a baseline
    #[default]
    Forward,
    /// Drain the first batch oldest-first, then continue live
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "forward" => Ok(Direction::Forward),
            "backward" => Ok(Direction::Backward),
            other => Err(crate::Error::config(format!(
                "Unknown direction '{}'. Valid: forward, backward",
                other
            ))),
        }
    }
}

/// Logical resource a monitor polls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    /// New posts in one or more subreddits, from the `new` listing
    Subreddits {
        /// Subreddit names without the `/r/` prefix
        names: Vec<String>,
    },

    /// New posts or comments by a user
    User {
        /// Username without the `/user/` prefix
        name: String,
    },

    /// Private messages to the account
    Messages,

    /// Replies to the account's comments
    CommentReplies,

    /// Replies to the account's posts
    PostReplies,

    /// Mentions of the account's username
    Mentions,

    /// Any other listing path
    Custom {
        /// Listing path, e.g. `/r/rust/comments`
        path: String,
        /// Item kinds the listing can contain
        kinds: Vec<ItemKind>,
    },
}

impl Target {
    /// Listing path for this target
    pub fn path(&self) -> String {
        match self {
            Target::Subreddits { names } => format!("/r/{}/new", names.join("+")),
            Target::User { name } => format!("/user/{}", name),
            Target::Messages => "/message/messages".to_string(),
            Target::CommentReplies => "/message/comments".to_string(),
            Target::PostReplies => "/message/selfreply".to_string(),
            Target::Mentions => "/message/mentions".to_string(),
            Target::Custom { path, .. } => path.clone(),
        }
    }

    /// Item kinds this target can yield
    pub fn kinds(&self) -> &[ItemKind] {
        match self {
            Target::Subreddits { .. } => &[ItemKind::Post],
            Target::User { .. } => &[ItemKind::Post, ItemKind::Comment],
            Target::Messages => &[ItemKind::Message],
            Target::CommentReplies | Target::PostReplies | Target::Mentions => {
                &[ItemKind::Comment]
            }
            Target::Custom { kinds, .. } => kinds,
        }
    }

    /// Validate the target
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            Target::Subreddits { names } => {
                if names.is_empty() {
                    return Err(crate::Error::config("Subreddit target needs at least one name"));
                }
                for name in names {
                    validate_segment("Subreddit", name)?;
                }
                Ok(())
            }
            Target::User { name } => validate_segment("User", name),
            Target::Custom { path, kinds } => {
                if !path.starts_with('/') {
                    return Err(crate::Error::config(format!(
                        "Custom target path must start with '/': {}",
                        path
                    )));
                }
                if kinds.is_empty() {
                    return Err(crate::Error::config(
                        "Custom target must declare at least one item kind",
                    ));
                }
                Ok(())
            }
            Target::Messages | Target::CommentReplies | Target::PostReplies | Target::Mentions => {
                Ok(())
            }
        }
    }

    /// Parse the compact form used by the daemon
    ///
    /// Accepted forms: `subreddit:rust+golang`, `user:name`, `messages`,
    /// `comment_replies`, `post_replies`, `mentions`.
    pub fn parse(spec: &str) -> Result<Self, crate::Error> {
        let spec = spec.trim();
        let (kind, arg) = match spec.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (spec, None),
        };

        let target = match (kind, arg) {
            ("subreddit", Some(names)) => Target::Subreddits {
                names: names
                    .split('+')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            ("user", Some(name)) => Target::User {
                name: name.trim().to_string(),
            },
            ("messages", None) => Target::Messages,
            ("comment_replies", None) => Target::CommentReplies,
            ("post_replies", None) => Target::PostReplies,
            ("mentions", None) => Target::Mentions,
            _ => {
                return Err(crate::Error::config(format!(
                    "Unknown monitor target '{}'. Valid: subreddit:<a+b>, user:<name>, \
                    messages, comment_replies, post_replies, mentions",
                    spec
                )));
            }
        };

        target.validate()?;
        Ok(target)
    }
}

fn validate_segment(what: &str, value: &str) -> Result<(), crate::Error> {
    if value.is_empty() {
        return Err(crate::Error::config(format!("{} name cannot be empty", what)));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(crate::Error::config(format!(
            "{} name contains invalid characters: '{}'",
            what, value
        )));
    }
    Ok(())
}

/// Configuration of a single monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Human-readable name used in logs, events and errors
    pub label: String,

    /// What to poll
    pub target: Target,

    /// Cold-start policy
    #[serde(default)]
    pub direction: Direction,

    /// Delay between the end of one cycle and the start of the next (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum listing pages walked per cycle while looking for the frontier
    ///
    /// When the frontier is not found within this many pages the cycle
    /// reports lost items and still advances.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl MonitorConfig {
    /// Create a configuration with defaults for everything but the target
    pub fn new(label: impl Into<String>, target: Target) -> Self {
        Self {
            label: label.into(),
            target,
            direction: Direction::default(),
            poll_interval_ms: default_poll_interval_ms(),
            max_pages: default_max_pages(),
            page_size: default_page_size(),
        }
    }

    /// Set the cold-start policy
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the page budget per cycle
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.label.trim().is_empty() {
            return Err(crate::Error::config("Monitor label cannot be empty"));
        }
        self.target.validate()?;
        if self.poll_interval_ms == 0 {
            return Err(crate::Error::config(format!(
                "Monitor {}: poll interval must be > 0",
                self.label
            )));
        }
        if self.max_pages == 0 {
            return Err(crate::Error::config(format!(
                "Monitor {}: max_pages must be >= 1",
                self.label
            )));
        }
        if !(1..=100).contains(&self.page_size) {
            return Err(crate::Error::config(format!(
                "Monitor {}: page_size must be between 1 and 100. Got: {}",
                self.label, self.page_size
            )));
        }
        Ok(())
    }
}

/// What a group does when one of its monitors fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Cancel every other monitor on the first terminal error
    #[default]
    StopAll,
    /// Keep the remaining monitors running
    ContinueOthers,
}

impl std::str::FromStr for FailurePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stop_all" | "stop-all" => Ok(FailurePolicy::StopAll),
            "continue_others" | "continue-others" => Ok(FailurePolicy::ContinueOthers),
            other => Err(crate::Error::config(format!(
                "Unknown failure policy '{}'. Valid: stop_all, continue_others",
                other
            ))),
        }
    }
}

/// Monitor group configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Reaction to a monitor's terminal error
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Capacity of the monitor event channel
    ///
    /// When full, new events are dropped (with a warning log) rather than
    /// stalling a monitor.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl GroupConfig {
    /// Set the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_max_pages() -> usize {
    3
}

fn default_page_size() -> u32 {
    100
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_paths() {
        let subs = Target::Subreddits {
            names: vec!["rust".to_string(), "golang".to_string()],
        };
        assert_eq!(subs.path(), "/r/rust+golang/new");
        assert_eq!(Target::User { name: "spez".to_string() }.path(), "/user/spez");
        assert_eq!(Target::Messages.path(), "/message/messages");
        assert_eq!(Target::CommentReplies.path(), "/message/comments");
        assert_eq!(Target::PostReplies.path(), "/message/selfreply");
        assert_eq!(Target::Mentions.path(), "/message/mentions");
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(
            Target::parse("subreddit:rust+golang").unwrap(),
            Target::Subreddits {
                names: vec!["rust".to_string(), "golang".to_string()]
            }
        );
        assert_eq!(Target::parse(" mentions ").unwrap(), Target::Mentions);
        assert!(Target::parse("subreddit:").is_err());
        assert!(Target::parse("user:bad/name").is_err());
        assert!(Target::parse("mentions:extra").is_err());
        assert!(Target::parse("frontpage").is_err());
    }

    #[test]
    fn test_monitor_config_defaults_from_json() {
        let config: MonitorConfig = serde_json::from_value(serde_json::json!({
            "label": "inbox",
            "target": { "type": "messages" }
        }))
        .unwrap();

        assert_eq!(config.direction, Direction::Forward);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.page_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_monitor_config_validation() {
        let base = MonitorConfig::new("subs", Target::Mentions);
        assert!(base.clone().with_max_pages(0).validate().is_err());
        assert!(base.clone().with_page_size(0).validate().is_err());
        assert!(base.clone().with_page_size(101).validate().is_err());
        assert!(
            base.clone()
                .with_poll_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(MonitorConfig::new(" ", Target::Mentions).validate().is_err());

        let custom = Target::Custom {
            path: "r/rust".to_string(),
            kinds: vec![ItemKind::Post],
        };
        assert!(MonitorConfig::new("custom", custom).validate().is_err());
    }

    #[test]
    fn test_policy_and_direction_parse() {
        assert_eq!("Backward".parse::<Direction>().unwrap(), Direction::Backward);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(
            "continue-others".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::ContinueOthers
        );
        assert_eq!("stop_all".parse::<FailurePolicy>().unwrap(), FailurePolicy::StopAll);
    }
}
