// # feedpolld - Feed Polling Daemon
//
// Thin integration layer: all polling, dedup and dispatch logic lives in
// feedpoll-core. Configuration is via environment variables only.
//
// The feedpolld daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building one Reddit client and one monitor per target
// 4. Running the monitor group until a signal or a terminal error
//
// ## Configuration
//
// ### Credentials
// - `FEEDPOLL_ACCESS_TOKEN`: OAuth bearer token (required)
// - `FEEDPOLL_USER_AGENT`: User agent sent to Reddit
// - `FEEDPOLL_API_BASE`: API base URL (default https://oauth.reddit.com)
//
// ### Monitors
// - `FEEDPOLL_MONITORS`: Comma-separated targets (required), e.g.
//   `subreddit:rust+golang,user:spez,messages,comment_replies,post_replies,mentions`
//   (`subreddit:rust+golang` polls `/r/rust+golang/new`)
// - `FEEDPOLL_DIRECTION`: forward (skip history) or backward (drain first page)
// - `FEEDPOLL_POLL_INTERVAL_SECS`: Delay between cycles (1-3600)
// - `FEEDPOLL_MAX_PAGES`: Pages walked per cycle looking for the frontier (1-10)
// - `FEEDPOLL_FAILURE_POLICY`: stop_all or continue_others
//
// ### Logging
// - `FEEDPOLL_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export FEEDPOLL_ACCESS_TOKEN=...
// export FEEDPOLL_USER_AGENT="linux:mybot:0.1 (by /u/me)"
// export FEEDPOLL_MONITORS=subreddit:rust,comment_replies
// export FEEDPOLL_DIRECTION=forward
//
// feedpolld
// ```

use anyhow::Result;
use feedpoll_core::{
    Direction, FailurePolicy, GroupConfig, Handlers, ItemKind, Monitor, MonitorConfig,
    MonitorEvent, MonitorGroup, Outcome, Target,
};
use feedpoll_reddit::{ClientConfig, REDDIT_API_BASE, RedditClient};
use std::collections::BTreeMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long monitors get to stop after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (a monitor failed)
#[derive(Debug, Clone, Copy)]
enum FeedpollExitCode {
    /// Clean shutdown (signal or every monitor stopped by its handler)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<FeedpollExitCode> for ExitCode {
    fn from(code: FeedpollExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    access_token: String,
    user_agent: String,
    api_base: String,
    monitors: Vec<String>,
    direction: String,
    poll_interval_secs: u64,
    max_pages: usize,
    failure_policy: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            access_token: lookup("FEEDPOLL_ACCESS_TOKEN").unwrap_or_default(),
            user_agent: lookup("FEEDPOLL_USER_AGENT")
                .unwrap_or_else(|| format!("feedpolld/{}", env!("CARGO_PKG_VERSION"))),
            api_base: lookup("FEEDPOLL_API_BASE").unwrap_or_else(|| REDDIT_API_BASE.to_string()),
            monitors: lookup("FEEDPOLL_MONITORS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            direction: lookup("FEEDPOLL_DIRECTION").unwrap_or_else(|| "forward".to_string()),
            poll_interval_secs: parse_number(&lookup, "FEEDPOLL_POLL_INTERVAL_SECS", 30)?,
            max_pages: parse_number(&lookup, "FEEDPOLL_MAX_PAGES", 3)?,
            failure_policy: lookup("FEEDPOLL_FAILURE_POLICY")
                .unwrap_or_else(|| "stop_all".to_string()),
            log_level: lookup("FEEDPOLL_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            anyhow::bail!(
                "FEEDPOLL_ACCESS_TOKEN is required. \
                Set it via: export FEEDPOLL_ACCESS_TOKEN=your_token"
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.access_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower == "token"
        {
            anyhow::bail!(
                "FEEDPOLL_ACCESS_TOKEN appears to be a placeholder. \
                Use an actual OAuth token for the bot account."
            );
        }

        if self.monitors.is_empty() {
            anyhow::bail!(
                "FEEDPOLL_MONITORS must contain at least one target. \
                Set it via: export FEEDPOLL_MONITORS=subreddit:rust,comment_replies"
            );
        }

        let mut seen = std::collections::HashSet::new();
        for spec in &self.monitors {
            Target::parse(spec)?;
            if !seen.insert(spec.as_str()) {
                anyhow::bail!("FEEDPOLL_MONITORS lists '{}' more than once", spec);
            }
        }

        self.direction()?;
        self.failure_policy()?;

        if !self.api_base.starts_with("https://") && !self.api_base.starts_with("http://") {
            anyhow::bail!(
                "FEEDPOLL_API_BASE must use HTTP or HTTPS scheme. Got: {}",
                self.api_base
            );
        }

        if !(1..=3600).contains(&self.poll_interval_secs) {
            anyhow::bail!(
                "FEEDPOLL_POLL_INTERVAL_SECS must be between 1 and 3600 seconds. Got: {}",
                self.poll_interval_secs
            );
        }

        if !(1..=10).contains(&self.max_pages) {
            anyhow::bail!(
                "FEEDPOLL_MAX_PAGES must be between 1 and 10. Got: {}",
                self.max_pages
            );
        }

        self.log_level()?;

        Ok(())
    }

    fn direction(&self) -> Result<Direction> {
        Ok(self.direction.parse()?)
    }

    fn failure_policy(&self) -> Result<FailurePolicy> {
        Ok(self.failure_policy.parse()?)
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "FEEDPOLL_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.access_token.clone(), self.user_agent.clone())
            .with_base_url(self.api_base.clone())
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a number. Got: '{}'", key, raw)),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return FeedpollExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return FeedpollExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FeedpollExitCode::ConfigError.into();
    }

    info!("Starting feedpolld daemon");
    info!("Configuration loaded: {} monitor(s)", config.monitors.len());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FeedpollExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let group = match build_group(&config) {
            Ok(group) => group,
            Err(e) => {
                error!("Startup error: {}", e);
                return FeedpollExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(group).await {
            error!("Daemon error: {}", e);
            FeedpollExitCode::RuntimeError
        } else {
            FeedpollExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Build the Reddit client and one monitor per configured target
fn build_group(config: &Config) -> Result<(MonitorGroup, mpsc::Receiver<MonitorEvent>)> {
    let client = Arc::new(RedditClient::new(config.client_config())?);
    let direction = config.direction()?;

    let mut monitors = Vec::with_capacity(config.monitors.len());
    for spec in &config.monitors {
        let target = Target::parse(spec)?;
        let handlers = logging_handlers(spec, target.kinds());
        let monitor_config = MonitorConfig::new(spec.clone(), target)
            .with_direction(direction)
            .with_poll_interval(Duration::from_secs(config.poll_interval_secs))
            .with_max_pages(config.max_pages);

        info!("Monitoring {} ({})", monitor_config.target.path(), direction);
        monitors.push(Monitor::new(client.clone(), monitor_config, handlers)?);
    }

    let group_config = GroupConfig::default().with_failure_policy(config.failure_policy()?);
    Ok(MonitorGroup::new(monitors, group_config)?)
}

/// Handlers that log every delivered item
fn logging_handlers(label: &str, kinds: &[ItemKind]) -> Handlers {
    let mut handlers = Handlers::new();
    for kind in kinds {
        let label = label.to_string();
        handlers = match kind {
            ItemKind::Post => handlers.on_post(move |post| {
                info!(
                    "[{}] post {} in r/{} by u/{}: {}",
                    label, post.name, post.subreddit, post.author, post.title
                );
                Outcome::Continue
            }),
            ItemKind::Comment => handlers.on_comment(move |comment| {
                info!(
                    "[{}] comment {} in r/{} by u/{} on {}",
                    label, comment.name, comment.subreddit, comment.author, comment.parent_id
                );
                Outcome::Continue
            }),
            ItemKind::Message => handlers.on_message(move |message| {
                info!(
                    "[{}] message {} from u/{}: {}",
                    label, message.name, message.author, message.subject
                );
                Outcome::Continue
            }),
        };
    }
    handlers
}

/// Run the group until every monitor stops or a signal arrives
async fn run_daemon(
    (group, events): (MonitorGroup, mpsc::Receiver<MonitorEvent>),
) -> Result<()> {
    let cancel = group.cancellation_token();
    let summary = tokio::spawn(summarize_events(events));
    let mut run = tokio::spawn(group.run());

    let finished = tokio::select! {
        joined = &mut run => Some(joined),
        signal = wait_for_shutdown() => {
            match signal {
                Ok(signal) => info!("Received shutdown signal: {}", signal),
                Err(e) => error!("Signal handling failed, shutting down: {}", e),
            }
            None
        }
    };

    let joined = match finished {
        Some(joined) => joined,
        None => {
            info!("Stopping monitors");
            cancel.cancel();
            tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut run)
                .await
                .map_err(|_| anyhow::anyhow!("Monitors did not stop within {:?}", SHUTDOWN_TIMEOUT))?
        }
    };

    let reports = joined.map_err(|e| anyhow::anyhow!("Monitor group task failed: {}", e))??;

    if let Ok(dispatched) = summary.await {
        for (label, count) in dispatched {
            info!("Monitor {} dispatched {} item(s)", label, count);
        }
    }

    for report in reports {
        info!(
            "Monitor {} stopped ({}), last item: {}",
            report.label,
            report.reason,
            report.frontier.as_deref().unwrap_or("<none>")
        );
    }

    info!("Shutting down daemon");
    Ok(())
}

/// Count dispatched items per monitor and surface lost-item events
async fn summarize_events(events: mpsc::Receiver<MonitorEvent>) -> BTreeMap<String, usize> {
    let mut events = ReceiverStream::new(events);
    let mut dispatched = BTreeMap::new();

    while let Some(event) = events.next().await {
        match event {
            MonitorEvent::Dispatched { monitor, .. } => {
                *dispatched.entry(monitor).or_insert(0) += 1;
            }
            MonitorEvent::ItemsLost {
                monitor,
                previous_frontier,
                new_frontier,
            } => {
                warn!(
                    "Monitor {} skipped ahead from {} to {}; consider a shorter \
                    FEEDPOLL_POLL_INTERVAL_SECS or a larger FEEDPOLL_MAX_PAGES",
                    monitor, previous_frontier, new_frontier
                );
            }
            _ => {}
        }
    }

    dispatched
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
