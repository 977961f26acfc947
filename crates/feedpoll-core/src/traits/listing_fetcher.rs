// # Listing Fetcher Trait
//
// Defines the interface the monitor uses to read a listing.
//
// ## Implementations
//
// - Reddit over HTTPS: `feedpoll-reddit` crate
// - Tests: scripted fetchers in `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use feedpoll_core::{ListingFetcher, PageRequest};
//
// let page = fetcher.fetch("/r/rust/new", &PageRequest::first(100)).await?;
// for item in &page.items {
//     println!("{}", item.name());
// }
// if let Some(after) = page.after {
//     let older = fetcher.fetch("/r/rust/new", &PageRequest::after(100, after)).await?;
// }
// ```

use crate::item::Item;
use async_trait::async_trait;

/// Which page of a listing to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum items in the page
    pub limit: u32,
    /// Cursor returned by the previous page; `None` fetches the head
    pub after: Option<String>,
}

impl PageRequest {
    /// Request the head of the listing
    pub fn first(limit: u32) -> Self {
        Self { limit, after: None }
    }

    /// Request the page older than `cursor`
    pub fn after(limit: u32, cursor: impl Into<String>) -> Self {
        Self {
            limit,
            after: Some(cursor.into()),
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    /// Items, newest first
    pub items: Vec<Item>,
    /// Cursor to the next, older page, if any
    pub after: Option<String>,
}

impl Listing {
    /// Create a listing page
    pub fn new(items: Vec<Item>, after: Option<String>) -> Self {
        Self { items, after }
    }
}

/// Trait for listing fetcher implementations
///
/// # Errors
///
/// Implementations must classify failures so the monitor can react:
/// network problems, rate limiting and undecodable bodies map to transient
/// errors ([`crate::Error::is_transient`]); authentication failures and
/// permanently invalid paths map to [`crate::Error::Authentication`] and
/// [`crate::Error::InvalidPath`].
///
/// # Forbidden Capabilities
/// - ❌ Retrying internally (the monitor retries on its next cycle)
/// - ❌ Deduplicating items (owned by the monitor's stream state)
/// - ❌ Process-wide client state (construct one per credential set)
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    /// Fetch one page of `path`
    async fn fetch(&self, path: &str, page: &PageRequest) -> Result<Listing, crate::Error>;
}
