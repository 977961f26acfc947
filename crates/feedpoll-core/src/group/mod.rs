//! Monitor group
//!
//! Runs many monitors concurrently under one cancellation scope.
//!
//! ## Structure
//!
//! - One tokio task per monitor, owned by a [`JoinSet`]: dropping the
//!   group's `run()` future aborts every child
//! - Each monitor gets a child of the group's [`CancellationToken`], so
//!   cancelling the group cancels all of them
//! - `run()` waits on every monitor and surfaces the first terminal error;
//!   under [`FailurePolicy::StopAll`] that error also cancels the others
//!
//! Monitors share nothing but the event channel.

use crate::config::{Direction, FailurePolicy, GroupConfig};
use crate::error::{Error, Result};
use crate::event::{MonitorEvent, StopReason};
use crate::monitor::Monitor;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Final state of a monitor that stopped without an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    pub label: String,
    pub path: String,
    pub direction: Direction,
    /// Last delivered item name when the monitor stopped
    pub frontier: Option<String>,
    pub reason: StopReason,
}

/// Identity of a spawned monitor, kept to tag errors of a task that panicked
struct TaskOrigin {
    label: String,
    path: String,
    direction: Direction,
}

impl TaskOrigin {
    /// Tag a join failure with the monitor that was running in the task
    ///
    /// The monitor's frontier went down with the task, so it is `None`.
    fn tag(self, join_error: JoinError) -> Error {
        Error::Monitor {
            monitor: self.label,
            path: self.path,
            direction: self.direction,
            frontier: None,
            source: Box::new(Error::Other(format!("Monitor task failed: {}", join_error))),
        }
    }
}

impl MonitorReport {
    fn from_monitor(monitor: &Monitor, reason: StopReason) -> Self {
        Self {
            label: monitor.label().to_string(),
            path: monitor.path().to_string(),
            direction: monitor.direction(),
            frontier: monitor.frontier().map(str::to_string),
            reason,
        }
    }
}

/// A set of monitors run and supervised together
#[derive(Debug)]
pub struct MonitorGroup {
    monitors: Vec<Monitor>,
    failure_policy: FailurePolicy,
    cancel: CancellationToken,
}

impl MonitorGroup {
    /// Create a new monitor group
    ///
    /// # Returns
    ///
    /// A tuple of (group, event_receiver) where event_receiver yields the
    /// events of every monitor in the group. The channel closes once all
    /// monitors have stopped.
    ///
    /// # Errors
    ///
    /// `Error::Config` when two monitors share a label or the event channel
    /// capacity is zero.
    pub fn new(
        monitors: Vec<Monitor>,
        config: GroupConfig,
    ) -> Result<(Self, mpsc::Receiver<MonitorEvent>)> {
        if config.event_channel_capacity == 0 {
            return Err(Error::config("event_channel_capacity must be > 0"));
        }

        let mut labels = HashSet::new();
        for monitor in &monitors {
            if !labels.insert(monitor.label()) {
                return Err(Error::config(format!(
                    "Duplicate monitor label: {}",
                    monitor.label()
                )));
            }
        }

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let monitors = monitors
            .into_iter()
            .map(|monitor| monitor.with_event_sender(tx.clone()))
            .collect();

        let group = Self {
            monitors,
            failure_policy: config.failure_policy,
            cancel: CancellationToken::new(),
        };

        Ok((group, rx))
    }

    /// Token that cancels every monitor in the group
    ///
    /// Cancellation interrupts sleeps and in-flight fetches promptly.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of monitors in the group
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    /// Whether the group has no monitors
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Run every monitor until all have stopped
    ///
    /// # Returns
    ///
    /// - `Ok(reports)`: Every monitor stopped gracefully (handler request or
    ///   cancellation)
    /// - `Err(Error::Monitor)`: The first terminal error, tagged with the
    ///   monitor that produced it. Later errors are logged.
    pub async fn run(self) -> Result<Vec<MonitorReport>> {
        let Self {
            monitors,
            failure_policy,
            cancel,
        } = self;

        info!(
            "Starting monitor group ({} monitor(s), policy={:?})",
            monitors.len(),
            failure_policy
        );

        let mut tasks = JoinSet::new();
        let mut origins: HashMap<task::Id, TaskOrigin> = HashMap::new();
        for mut monitor in monitors {
            let token = cancel.child_token();
            let origin = TaskOrigin {
                label: monitor.label().to_string(),
                path: monitor.path().to_string(),
                direction: monitor.direction(),
            };
            let handle = tasks.spawn(async move {
                let reason = monitor.run(token).await?;
                Ok::<_, Error>(MonitorReport::from_monitor(&monitor, reason))
            });
            origins.insert(handle.id(), origin);
        }

        let mut reports = Vec::new();
        let mut first_error: Option<Error> = None;

        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(join_error) => match origins.remove(&join_error.id()) {
                    Some(origin) => Err(origin.tag(join_error)),
                    None => Err(Error::Other(format!("Monitor task failed: {}", join_error))),
                },
            };

            match result {
                Ok(report) => reports.push(report),
                Err(e) if first_error.is_none() => {
                    if failure_policy == FailurePolicy::StopAll {
                        error!("Monitor failure, stopping all monitors: {}", e);
                        cancel.cancel();
                    } else {
                        error!("Monitor failure, others keep running: {}", e);
                    }
                    first_error = Some(e);
                }
                Err(e) => {
                    warn!("Additional monitor failure: {}", e);
                }
            }
        }

        info!("Monitor group finished");

        match first_error {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }
}
