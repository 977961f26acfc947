// # feedpoll-core
//
// Core library for turning newest-first listing endpoints into a stream of
// new items, each dispatched exactly once per monitor.
//
// ## Architecture Overview
//
// - **ListingFetcher**: Trait for fetching one newest-first page of a listing
// - **ActionSubmitter**: Trait for submitting actions from inside handlers
// - **Item**: Closed set of item kinds (post, comment, message)
// - **StreamState**: Per-monitor frontier, recently seen names and cold-start policy
// - **Monitor**: Runs poll cycles for one target until stopped or cancelled
// - **MonitorGroup**: Supervises many monitors under one cancellation scope
//
// ## Design Principles
//
// 1. **No shared state**: Each monitor owns its stream state exclusively
// 2. **Ordered delivery**: Items are dispatched oldest-first within a monitor
// 3. **Explicit dependencies**: Fetchers are constructed and passed in, never global
// 4. **Library-First**: The daemon is a thin layer over this crate
// 5. **Process-lifetime state**: Frontiers are never persisted

pub mod config;
pub mod error;
pub mod event;
pub mod group;
pub mod handler;
pub mod item;
pub mod monitor;
pub mod stream;
pub mod traits;

// Re-export core types for convenience
pub use config::{Direction, FailurePolicy, GroupConfig, MonitorConfig, Target};
pub use error::{Error, Result};
pub use event::{MonitorEvent, StopReason};
pub use group::{MonitorGroup, MonitorReport};
pub use handler::{Handlers, Outcome};
pub use item::{Comment, Item, ItemKind, Message, Post};
pub use monitor::{CycleReport, Monitor, MonitorStatus};
pub use stream::StreamState;
pub use traits::{ActionSubmitter, Listing, ListingFetcher, PageRequest};
pub use tokio_util::sync::CancellationToken;
