//! Monitor
//!
//! A monitor polls one listing path and dispatches each new item exactly
//! once, oldest first, to the handler registered for its kind.
//!
//! ## Poll Cycle
//!
//! ```text
//! ┌───────────────┐   newest-first   ┌─────────────┐
//! │ ListingFetcher│ ───── batch ───▶ │ StreamState │ diff against frontier
//! └───────────────┘                  └─────────────┘
//!                                           │ new items, oldest first
//!                                           ▼
//!                                    ┌─────────────┐
//!                                    │  Handlers   │ Continue / Stop / Fail
//!                                    └─────────────┘
//!                                           │
//!                                           ▼
//!                                  advance frontier, sleep
//! ```
//!
//! 1. Fetch the head of the listing, walking older pages (up to
//!    `max_pages`) until a known item is reached
//! 2. Forward cold start: record the batch, dispatch nothing
//! 3. Collect items above the first known item (normally the frontier),
//!    report lost items if there is none
//! 4. Dispatch oldest-first; a stopping handler halts the cycle
//! 5. Advance the frontier to the newest item observed
//! 6. Sleep for the poll interval (cancellable)
//!
//! ## Lifecycle
//!
//! `Idle` → `Running` → `Stopped`. A stopped monitor never runs again;
//! build a fresh one to restart (its frontier starts cold).

use crate::config::{Direction, MonitorConfig};
use crate::error::{Error, Result};
use crate::event::{EventSink, MonitorEvent, StopReason};
use crate::handler::{Handlers, Outcome};
use crate::item::Item;
use crate::stream::{Diff, StreamState};
use crate::traits::{ListingFetcher, PageRequest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle state of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    /// Constructed, never polled
    Idle,
    /// Executing poll cycles
    Running,
    /// Terminal
    Stopped,
}

/// Summary of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Items fetched across all pages
    pub fetched: usize,
    /// Items handed to a handler
    pub dispatched: usize,
    /// The cycle only established the forward baseline
    pub baseline: bool,
    /// No known item was found in the fetched pages
    pub lost: bool,
    /// Stopping outcome returned by a handler, if any
    pub stop: Option<Outcome>,
}

/// One independently scheduled polling stream
pub struct Monitor {
    config: MonitorConfig,
    path: String,
    fetcher: Arc<dyn ListingFetcher>,
    handlers: Handlers,
    state: StreamState,
    status: MonitorStatus,
    events: EventSink,
}

impl Monitor {
    /// Create a new monitor
    ///
    /// # Parameters
    ///
    /// - `fetcher`: Listing fetcher (shared by monitors using the same credentials)
    /// - `config`: Monitor configuration
    /// - `handlers`: Handlers for the item kinds of interest
    ///
    /// # Errors
    ///
    /// `Error::Config` when the configuration is invalid or when no handler
    /// is registered for any kind the target can yield.
    pub fn new(
        fetcher: Arc<dyn ListingFetcher>,
        config: MonitorConfig,
        handlers: Handlers,
    ) -> Result<Self> {
        config.validate()?;

        let path = config.target.path();
        let kinds = config.target.kinds();

        if !kinds.iter().any(|kind| handlers.handles(*kind)) {
            return Err(Error::config(format!(
                "Monitor {}: no handler registered for any item kind {} can yield ({:?})",
                config.label, path, kinds
            )));
        }

        for kind in handlers.kinds() {
            if !kinds.contains(&kind) {
                warn!(
                    "Monitor {}: {} handler registered but {} never yields {} items",
                    config.label, kind, path, kind
                );
            }
        }

        Ok(Self {
            state: StreamState::new(config.direction),
            config,
            path,
            fetcher,
            handlers,
            status: MonitorStatus::Idle,
            events: EventSink::default(),
        })
    }

    /// Report events to `tx`
    pub fn with_event_sender(mut self, tx: mpsc::Sender<MonitorEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    /// Monitor label
    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Listing path being polled
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Cold-start policy
    pub fn direction(&self) -> Direction {
        self.state.direction()
    }

    /// Name of the last delivered item
    pub fn frontier(&self) -> Option<&str> {
        self.state.frontier()
    }

    /// Lifecycle state
    pub fn status(&self) -> MonitorStatus {
        self.status
    }

    /// Configuration the monitor was built with
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run a single poll cycle
    ///
    /// Fetch errors are returned as-is. Transient ones leave the monitor
    /// usable; fatal ones and stopping handler outcomes move it to
    /// [`MonitorStatus::Stopped`].
    pub async fn poll(&mut self) -> Result<CycleReport> {
        self.ensure_runnable()?;
        self.status = MonitorStatus::Running;

        let fetched =
            fetch_batch(self.fetcher.as_ref(), &self.path, &self.config, &self.state).await;
        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) => {
                if !e.is_transient() {
                    self.status = MonitorStatus::Stopped;
                }
                return Err(e);
            }
        };

        Ok(self.apply(batch))
    }

    /// Run poll cycles until a handler stops the monitor, a fatal error
    /// occurs, or `cancel` fires
    ///
    /// Cancellation interrupts the inter-cycle sleep and abandons an
    /// in-flight fetch. A batch already in hand is dispatched to completion
    /// first.
    ///
    /// # Returns
    ///
    /// - `Ok(StopReason)`: Graceful stop
    /// - `Err(Error::Monitor)`: Fatal fetch error or handler failure, tagged
    ///   with this monitor's label, path, direction and frontier
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<StopReason> {
        self.ensure_runnable()?;
        self.status = MonitorStatus::Running;

        info!(
            "Monitor {} started (path={}, direction={}, interval={:?})",
            self.config.label,
            self.path,
            self.direction(),
            self.config.poll_interval()
        );
        self.events.emit(MonitorEvent::Started {
            monitor: self.config.label.clone(),
            path: self.path.clone(),
        });

        loop {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = fetch_batch(
                    self.fetcher.as_ref(),
                    &self.path,
                    &self.config,
                    &self.state,
                ) => Some(result),
            };

            let Some(fetched) = fetched else {
                return Ok(self.finish(StopReason::Cancelled));
            };

            match fetched {
                Ok(batch) => {
                    let report = self.apply(batch);
                    match report.stop {
                        Some(Outcome::Stop) => {
                            return Ok(self.finish(StopReason::HandlerRequested));
                        }
                        Some(Outcome::Fail(message)) => {
                            return Err(self.fail(Error::handler(message)));
                        }
                        Some(Outcome::Continue) | None => {}
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        "Monitor {}: transient fetch error, retrying next cycle: {}",
                        self.config.label, e
                    );
                    self.events.emit(MonitorEvent::FetchFailed {
                        monitor: self.config.label.clone(),
                        error: e.to_string(),
                        transient: true,
                    });
                }
                Err(e) => {
                    self.events.emit(MonitorEvent::FetchFailed {
                        monitor: self.config.label.clone(),
                        error: e.to_string(),
                        transient: false,
                    });
                    return Err(self.fail(e));
                }
            }

            let slept = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(self.config.poll_interval()) => true,
            };

            if !slept {
                return Ok(self.finish(StopReason::Cancelled));
            }
        }
    }

    fn ensure_runnable(&self) -> Result<()> {
        if self.status == MonitorStatus::Stopped {
            return Err(Error::invalid_state(format!(
                "Monitor {} is stopped; construct a new monitor to restart",
                self.config.label
            )));
        }
        Ok(())
    }

    /// Diff, dispatch and advance for one fetched batch
    fn apply(&mut self, batch: Vec<Item>) -> CycleReport {
        let mut report = CycleReport {
            fetched: batch.len(),
            ..CycleReport::default()
        };
        let newest = batch.first().map(|item| item.name().to_string());
        let previous = self.state.frontier().map(str::to_string);

        match self.state.diff(&batch) {
            Diff::Baseline => {
                for item in batch.iter().rev() {
                    self.state.remember(item.name());
                }
                if let Some(newest) = &newest {
                    self.state.advance(newest);
                }
                report.baseline = true;

                debug!(
                    "Monitor {}: baseline established at {:?} ({} item(s) skipped)",
                    self.config.label,
                    newest,
                    batch.len()
                );
                self.events.emit(MonitorEvent::BaselineEstablished {
                    monitor: self.config.label.clone(),
                    frontier: newest,
                });
            }
            Diff::New { items, lost } => {
                if lost {
                    report.lost = true;
                    warn!(
                        "Monitor {}: no known item (frontier {:?}) in {} fetched item(s); \
                        items since the last cycle may have been missed",
                        self.config.label,
                        previous,
                        batch.len()
                    );
                    if let (Some(previous), Some(newest)) = (&previous, &newest) {
                        self.events.emit(MonitorEvent::ItemsLost {
                            monitor: self.config.label.clone(),
                            previous_frontier: previous.clone(),
                            new_frontier: newest.clone(),
                        });
                    }
                }

                for item in items {
                    self.state.remember(item.name());
                    let Some(outcome) = self.handlers.dispatch(item) else {
                        debug!(
                            "Monitor {}: no {} handler, skipping {}",
                            self.config.label,
                            item.kind(),
                            item.name()
                        );
                        continue;
                    };

                    report.dispatched += 1;
                    self.events.emit(MonitorEvent::Dispatched {
                        monitor: self.config.label.clone(),
                        name: item.name().to_string(),
                        kind: item.kind(),
                    });

                    if outcome.is_stop() {
                        self.state.advance(item.name());
                        self.status = MonitorStatus::Stopped;
                        report.stop = Some(outcome);
                        return report;
                    }
                }

                if let Some(newest) = &newest {
                    self.state.advance(newest);
                }

                if report.dispatched > 0 {
                    debug!(
                        "Monitor {}: dispatched {} item(s), frontier now {:?}",
                        self.config.label,
                        report.dispatched,
                        self.state.frontier()
                    );
                }
            }
        }

        report
    }

    fn finish(&mut self, reason: StopReason) -> StopReason {
        self.status = MonitorStatus::Stopped;
        info!("Monitor {} stopped: {}", self.config.label, reason);
        self.events.emit(MonitorEvent::Stopped {
            monitor: self.config.label.clone(),
            reason: reason.to_string(),
        });
        reason
    }

    fn fail(&mut self, source: Error) -> Error {
        self.status = MonitorStatus::Stopped;
        error!("Monitor {} failed: {}", self.config.label, source);
        self.events.emit(MonitorEvent::Stopped {
            monitor: self.config.label.clone(),
            reason: source.to_string(),
        });

        Error::Monitor {
            monitor: self.config.label.clone(),
            path: self.path.clone(),
            direction: self.direction(),
            frontier: self.state.frontier().map(str::to_string),
            source: Box::new(source),
        }
    }
}

/// Fetch the newest-first batch, walking older pages while no known item
/// is in view
///
/// Borrows only the `Sync` parts of a monitor so the run loop stays `Send`
/// while handlers are not.
async fn fetch_batch(
    fetcher: &dyn ListingFetcher,
    path: &str,
    config: &MonitorConfig,
    state: &StreamState,
) -> Result<Vec<Item>> {
    let limit = config.page_size;
    let head = fetcher.fetch(path, &PageRequest::first(limit)).await?;

    let mut batch = head.items;
    let mut after = head.after;
    let mut pages = 1;

    // Cold cycles never paginate: forward only needs the head, backward
    // drains exactly the first page.
    while !state.reaches_known(&batch) && pages < config.max_pages {
        let Some(cursor) = after.take() else {
            break;
        };

        debug!(
            "Monitor {}: frontier not in first {} page(s), fetching after {}",
            config.label, pages, cursor
        );

        let page = fetcher.fetch(path, &PageRequest::after(limit, cursor)).await?;
        batch.extend(page.items);
        after = page.after;
        pages += 1;
    }

    Ok(batch)
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("label", &self.config.label)
            .field("path", &self.path)
            .field("direction", &self.state.direction())
            .field("frontier", &self.state.frontier())
            .field("status", &self.status)
            .field("handlers", &self.handlers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;
    use crate::item::Post;
    use crate::traits::Listing;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;

    fn post(n: i64) -> Item {
        Item::Post(Post {
            name: format!("t3_{}", n),
            id: n.to_string(),
            author: "author".to_string(),
            subreddit: "rust".to_string(),
            title: format!("post {}", n),
            selftext: String::new(),
            url: String::new(),
            permalink: String::new(),
            is_self: true,
            created: DateTime::from_timestamp(1_700_000_000 + n, 0).unwrap(),
        })
    }

    /// Serves fixed pages keyed by cursor: `None` is the head
    struct PagedFetcher {
        pages: Vec<(Option<String>, Listing)>,
        requests: Mutex<Vec<PageRequest>>,
    }

    #[async_trait]
    impl ListingFetcher for PagedFetcher {
        async fn fetch(&self, _path: &str, page: &PageRequest) -> Result<Listing> {
            self.requests.lock().unwrap().push(page.clone());
            Ok(self
                .pages
                .iter()
                .find(|(cursor, _)| *cursor == page.after)
                .map(|(_, listing)| listing.clone())
                .unwrap_or_default())
        }
    }

    fn subreddit_config() -> MonitorConfig {
        MonitorConfig::new(
            "rust",
            Target::Subreddits {
                names: vec!["rust".to_string()],
            },
        )
    }

    #[test]
    fn test_rejects_handlers_for_wrong_kinds() {
        let fetcher: Arc<dyn ListingFetcher> = Arc::new(PagedFetcher {
            pages: Vec::new(),
            requests: Mutex::new(Vec::new()),
        });
        let handlers = Handlers::new().on_message(|_| Outcome::Continue);

        let result = Monitor::new(fetcher, subreddit_config(), handlers);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_walks_older_pages_until_frontier() {
        let fetcher = Arc::new(PagedFetcher {
            pages: vec![
                (None, Listing::new(vec![post(6), post(5)], Some("t3_5".to_string()))),
                (
                    Some("t3_5".to_string()),
                    Listing::new(vec![post(4), post(3)], Some("t3_3".to_string())),
                ),
            ],
            requests: Mutex::new(Vec::new()),
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handlers = Handlers::new().on_post(move |p| {
            sink.lock().unwrap().push(p.name.clone());
            Outcome::Continue
        });

        let mut monitor = Monitor::new(fetcher.clone(), subreddit_config(), handlers).unwrap();
        monitor.state.advance("t3_3");

        let report = monitor.poll().await.unwrap();

        assert_eq!(report.fetched, 4);
        assert_eq!(report.dispatched, 3);
        assert!(!report.lost);
        assert_eq!(*seen.lock().unwrap(), vec!["t3_4", "t3_5", "t3_6"]);
        assert_eq!(monitor.frontier(), Some("t3_6"));
        assert_eq!(fetcher.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_page_budget_bounds_the_walk() {
        let fetcher = Arc::new(PagedFetcher {
            pages: vec![
                (None, Listing::new(vec![post(6), post(5)], Some("t3_5".to_string()))),
                (
                    Some("t3_5".to_string()),
                    Listing::new(vec![post(4), post(3)], Some("t3_3".to_string())),
                ),
            ],
            requests: Mutex::new(Vec::new()),
        });
        let handlers = Handlers::new().on_post(|_| Outcome::Continue);

        let mut monitor =
            Monitor::new(fetcher.clone(), subreddit_config().with_max_pages(1), handlers).unwrap();
        monitor.state.advance("t3_3");

        let report = monitor.poll().await.unwrap();

        assert!(report.lost);
        assert_eq!(report.dispatched, 2);
        assert_eq!(monitor.frontier(), Some("t3_6"));
        assert_eq!(fetcher.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cold_cycle_does_not_paginate() {
        let fetcher = Arc::new(PagedFetcher {
            pages: vec![(None, Listing::new(vec![post(2), post(1)], Some("t3_1".to_string())))],
            requests: Mutex::new(Vec::new()),
        });
        let handlers = Handlers::new().on_post(|_| Outcome::Continue);

        let config = subreddit_config().with_direction(Direction::Backward);
        let mut monitor = Monitor::new(fetcher.clone(), config, handlers).unwrap();

        let report = monitor.poll().await.unwrap();

        assert_eq!(report.dispatched, 2);
        assert_eq!(fetcher.requests.lock().unwrap().len(), 1);
        assert_eq!(monitor.status(), MonitorStatus::Running);
    }
}
