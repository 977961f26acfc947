//! Test doubles and common utilities for monitor contract tests
//!
//! This module provides scripted fetchers and recording handlers that let
//! tests feed exact batch sequences to a monitor and observe dispatch.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::DateTime;
use feedpoll_core::error::{Error, Result};
use feedpoll_core::{
    Comment, Direction, Handlers, Item, Listing, ListingFetcher, Message, Monitor,
    MonitorConfig, Outcome, PageRequest, Post, Target,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted fetch response
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this newest-first batch
    Batch(Vec<Item>),
    /// Fail with a network error
    Transient,
    /// Fail with an authentication error
    Fatal,
}

/// A fetcher that replays a script of responses
///
/// Once the script is exhausted, the last returned batch is repeated (a
/// quiet listing) or an empty batch if none was returned.
#[derive(Clone)]
pub struct ScriptedFetcher {
    steps: Arc<Mutex<VecDeque<Step>>>,
    last: Arc<Mutex<Vec<Item>>>,
    fetch_count: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            last: Arc::new(Mutex::new(Vec::new())),
            fetch_count: Arc::new(AtomicUsize::new(0)),
            paths: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script made only of batches
    pub fn batches(batches: Vec<Vec<Item>>) -> Self {
        Self::new(batches.into_iter().map(Step::Batch).collect())
    }

    /// Get the number of times fetch() was called
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Paths passed to fetch(), in call order
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingFetcher for ScriptedFetcher {
    async fn fetch(&self, path: &str, _page: &PageRequest) -> Result<Listing> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().unwrap().push(path.to_string());

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Batch(items)) => {
                *self.last.lock().unwrap() = items.clone();
                Ok(Listing::new(items, None))
            }
            Some(Step::Transient) => Err(Error::network("connection reset")),
            Some(Step::Fatal) => Err(Error::auth("invalid access token")),
            None => Ok(Listing::new(self.last.lock().unwrap().clone(), None)),
        }
    }
}

/// A fetcher that replays a script of multi-page cycles
///
/// Each head request (no cursor) starts the next cycle; cursors then walk
/// that cycle's pages in order. Once the script is exhausted the last cycle
/// is served again.
#[derive(Clone)]
pub struct PagedFetcher {
    cycles: Arc<Mutex<VecDeque<Vec<Vec<Item>>>>>,
    current: Arc<Mutex<Vec<Vec<Item>>>>,
    requests: Arc<Mutex<Vec<PageRequest>>>,
}

impl PagedFetcher {
    pub fn new(cycles: Vec<Vec<Vec<Item>>>) -> Self {
        Self {
            cycles: Arc::new(Mutex::new(cycles.into())),
            current: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests received, in call order
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of head requests (one per poll cycle)
    pub fn cycle_count(&self) -> usize {
        self.requests().iter().filter(|r| r.after.is_none()).count()
    }
}

#[async_trait]
impl ListingFetcher for PagedFetcher {
    async fn fetch(&self, _path: &str, page: &PageRequest) -> Result<Listing> {
        self.requests.lock().unwrap().push(page.clone());

        let index = match &page.after {
            None => {
                if let Some(next) = self.cycles.lock().unwrap().pop_front() {
                    *self.current.lock().unwrap() = next;
                }
                0
            }
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| Error::malformed(format!("unknown cursor {}", cursor)))?,
        };

        let pages = self.current.lock().unwrap().clone();
        let items = pages.get(index).cloned().unwrap_or_default();
        let after = (index + 1 < pages.len()).then(|| (index + 1).to_string());
        Ok(Listing::new(items, after))
    }
}

/// A fetcher whose requests never complete
#[derive(Clone, Default)]
pub struct HangingFetcher {
    fetch_count: Arc<AtomicUsize>,
}

impl HangingFetcher {
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingFetcher for HangingFetcher {
    async fn fetch(&self, _path: &str, _page: &PageRequest) -> Result<Listing> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Records dispatched item names in order
#[derive(Clone, Default)]
pub struct Recorder {
    names: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.names.lock().unwrap().clear();
    }

    /// Handlers that record every comment and continue
    pub fn comment_handlers(&self) -> Handlers {
        let names = self.names.clone();
        Handlers::new().on_comment(move |c| {
            names.lock().unwrap().push(c.name.clone());
            Outcome::Continue
        })
    }

    /// Handlers that record every post and continue
    pub fn post_handlers(&self) -> Handlers {
        let names = self.names.clone();
        Handlers::new().on_post(move |p| {
            names.lock().unwrap().push(p.name.clone());
            Outcome::Continue
        })
    }

    /// Comment handlers that return `outcome` on the `n`th dispatch (1-based)
    pub fn comment_handlers_stopping_at(&self, n: usize, outcome: Outcome) -> Handlers {
        let names = self.names.clone();
        Handlers::new().on_comment(move |c| {
            let mut names = names.lock().unwrap();
            names.push(c.name.clone());
            if names.len() == n {
                outcome.clone()
            } else {
                Outcome::Continue
            }
        })
    }
}

/// Comment named `name`, created `order` seconds after a fixed epoch
pub fn comment(name: &str, order: i64) -> Item {
    Item::Comment(Comment {
        name: name.to_string(),
        id: name.to_lowercase(),
        author: "commenter".to_string(),
        subreddit: "rust".to_string(),
        body: format!("comment {}", name),
        link_id: "t3_root".to_string(),
        parent_id: "t3_root".to_string(),
        created: DateTime::from_timestamp(1_700_000_000 + order, 0).unwrap(),
    })
}

/// Post named `name`
pub fn post(name: &str, order: i64) -> Item {
    Item::Post(Post {
        name: name.to_string(),
        id: name.to_lowercase(),
        author: "poster".to_string(),
        subreddit: "rust".to_string(),
        title: format!("post {}", name),
        selftext: String::new(),
        url: String::new(),
        permalink: String::new(),
        is_self: true,
        created: DateTime::from_timestamp(1_700_000_000 + order, 0).unwrap(),
    })
}

/// Message named `name`
pub fn message(name: &str, order: i64) -> Item {
    Item::Message(Message {
        name: name.to_string(),
        id: name.to_lowercase(),
        author: "sender".to_string(),
        subject: "subject".to_string(),
        body: format!("message {}", name),
        was_comment: false,
        created: DateTime::from_timestamp(1_700_000_000 + order, 0).unwrap(),
    })
}

/// Newest-first comment batch `C<hi> .. C<lo>`
pub fn comments(hi: i64, lo: i64) -> Vec<Item> {
    (lo..=hi).rev().map(|n| comment(&format!("C{}", n), n)).collect()
}

/// Names `C<lo> .. C<hi>` in chronological order
pub fn names(lo: i64, hi: i64) -> Vec<String> {
    (lo..=hi).map(|n| format!("C{}", n)).collect()
}

/// Config for a comment-reply monitor with a short poll interval
pub fn reply_config(label: &str, direction: Direction) -> MonitorConfig {
    MonitorConfig::new(label, Target::CommentReplies)
        .with_direction(direction)
        .with_poll_interval(Duration::from_millis(10))
}

/// Build a comment-reply monitor over `fetcher`
pub fn reply_monitor(
    fetcher: Arc<dyn ListingFetcher>,
    direction: Direction,
    handlers: Handlers,
) -> Monitor {
    Monitor::new(fetcher, reply_config("replies", direction), handlers)
        .expect("monitor construction succeeds")
}
