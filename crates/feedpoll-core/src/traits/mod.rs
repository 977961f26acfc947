//! Collaborator traits
//!
//! The core never talks HTTP itself. It consumes these capabilities:
//!
//! - [`ListingFetcher`]: Fetch one newest-first page of a listing
//! - [`ActionSubmitter`]: Submit an account action (used from handlers)

pub mod action_submitter;
pub mod listing_fetcher;

pub use action_submitter::ActionSubmitter;
pub use listing_fetcher::{Listing, ListingFetcher, PageRequest};
