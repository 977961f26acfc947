// # Stream State
//
// Per-monitor dedup boundary.
//
// ## Purpose
//
// Listings only ever return their current head, newest first. The anchor
// is the name of the last item already delivered (the frontier):
// everything above it in a fresh batch is new. The frontier item can vanish
// from the listing (deleted, removed by a moderator), so the state also
// remembers a bounded window of recently seen names and stops at the first
// of those instead.
//
// ## Lifecycle
//
// - Created empty when a monitor is constructed (cold start)
// - Advanced at most once per successful poll cycle
// - Never shared between monitors
// - Dropped with the monitor (process-lifetime only)

use crate::config::Direction;
use crate::item::Item;
use std::collections::{HashSet, VecDeque};

/// Names remembered besides the frontier
///
/// Covers ten full pages, more than a single cycle can fetch with the
/// daemon's page limits.
pub const RECENT_NAMES: usize = 1000;

/// Result of comparing a fetched batch against the frontier
#[derive(Debug, Clone, PartialEq)]
pub enum Diff<'a> {
    /// Forward cold start: the batch only establishes the baseline
    Baseline,

    /// Items to dispatch
    New {
        /// New items, oldest first
        items: Vec<&'a Item>,
        /// The batch was exhausted without reaching any known item, so items
        /// between the previous cycle and this batch could not be enumerated
        lost: bool,
    },
}

/// Dedup boundary of one monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    frontier: Option<String>,
    direction: Direction,
    recent: VecDeque<String>,
    known: HashSet<String>,
}

impl StreamState {
    /// Create a cold stream state
    pub fn new(direction: Direction) -> Self {
        Self {
            frontier: None,
            direction,
            recent: VecDeque::new(),
            known: HashSet::new(),
        }
    }

    /// Name of the most recently dispatched item, `None` on cold start
    pub fn frontier(&self) -> Option<&str> {
        self.frontier.as_deref()
    }

    /// Cold-start policy
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether nothing has been recorded yet
    pub fn is_cold(&self) -> bool {
        self.frontier.is_none()
    }

    /// Whether `name` was delivered or skipped by an earlier cycle
    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Whether `batch` reaches back to the frontier or another known item
    ///
    /// A cold state has nothing to reach, so this is `true` for it.
    pub fn reaches_known(&self, batch: &[Item]) -> bool {
        self.is_cold() || batch.iter().any(|item| self.is_known(item.name()))
    }

    /// Compare a newest-first batch against the known items
    pub fn diff<'a>(&self, batch: &'a [Item]) -> Diff<'a> {
        if self.is_cold() {
            return match self.direction {
                Direction::Forward => Diff::Baseline,
                Direction::Backward => Diff::New {
                    items: batch.iter().rev().collect(),
                    lost: false,
                },
            };
        }

        let mut items: Vec<&Item> = batch
            .iter()
            .take_while(|item| !self.is_known(item.name()))
            .collect();
        let lost = !batch.is_empty() && items.len() == batch.len();
        items.reverse();

        Diff::New { items, lost }
    }

    /// Remember `name` without moving the frontier
    pub fn remember(&mut self, name: &str) {
        if self.known.contains(name) {
            return;
        }
        if self.recent.len() == RECENT_NAMES {
            if let Some(evicted) = self.recent.pop_front() {
                self.known.remove(&evicted);
            }
        }
        self.recent.push_back(name.to_string());
        self.known.insert(name.to_string());
    }

    /// Record `name` as the newest delivered item
    pub fn advance(&mut self, name: &str) {
        self.remember(name);
        if self.frontier.as_deref() != Some(name) {
            self.frontier = Some(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Post;
    use chrono::DateTime;

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

    /// Newest-first batch from the given ids
    fn batch(ids: &[i64]) -> Vec<Item> {
        ids.iter().map(|n| post(*n)).collect()
    }

    fn names(diff: &Diff<'_>) -> Vec<String> {
        match diff {
            Diff::Baseline => Vec::new(),
            Diff::New { items, .. } => items.iter().map(|i| i.name().to_string()).collect(),
        }
    }

    #[test]
    fn test_forward_cold_start_is_baseline() {
        let state = StreamState::new(Direction::Forward);
        assert!(state.is_cold());
        assert_eq!(state.diff(&batch(&[3, 2, 1])), Diff::Baseline);
        assert_eq!(state.diff(&[]), Diff::Baseline);
    }

    #[test]
    fn test_backward_cold_start_takes_whole_batch_oldest_first() {
        let state = StreamState::new(Direction::Backward);
        let batch = batch(&[2, 1]);
        let diff = state.diff(&batch);

        assert_eq!(names(&diff), vec!["t3_1", "t3_2"]);
        assert!(matches!(diff, Diff::New { lost: false, .. }));
    }

    #[test]
    fn test_items_above_frontier_are_new() {
        let mut state = StreamState::new(Direction::Forward);
        state.advance("t3_3");

        let batch = batch(&[5, 4, 3, 2]);
        let diff = state.diff(&batch);

        assert_eq!(names(&diff), vec!["t3_4", "t3_5"]);
        assert!(matches!(diff, Diff::New { lost: false, .. }));
        assert!(state.reaches_known(&batch));
    }

    #[test]
    fn test_frontier_at_head_yields_nothing() {
        let mut state = StreamState::new(Direction::Backward);
        state.advance("t3_5");

        let batch = batch(&[5, 4]);
        let diff = state.diff(&batch);
        assert_eq!(diff, Diff::New { items: Vec::new(), lost: false });
    }

    #[test]
    fn test_missing_frontier_reports_lost() {
        let mut state = StreamState::new(Direction::Forward);
        state.advance("t3_1");

        let batch = batch(&[9, 8, 7]);
        let diff = state.diff(&batch);

        assert_eq!(names(&diff), vec!["t3_7", "t3_8", "t3_9"]);
        assert!(matches!(diff, Diff::New { lost: true, .. }));
        assert!(!state.reaches_known(&batch));
    }

    #[test]
    fn test_empty_batch_is_not_lost() {
        let mut state = StreamState::new(Direction::Forward);
        state.advance("t3_1");

        assert_eq!(state.diff(&[]), Diff::New { items: Vec::new(), lost: false });
    }

    #[test]
    fn test_vanished_frontier_stops_at_earlier_known_item() {
        let mut state = StreamState::new(Direction::Backward);
        state.advance("t3_1");
        state.advance("t3_2");

        // t3_2 was deleted; t3_1 still anchors the batch
        let batch = batch(&[3, 1]);
        let diff = state.diff(&batch);

        assert_eq!(names(&diff), vec!["t3_3"]);
        assert!(matches!(diff, Diff::New { lost: false, .. }));
        assert!(state.reaches_known(&batch));
    }

    #[test]
    fn test_remember_keeps_frontier() {
        let mut state = StreamState::new(Direction::Forward);
        state.advance("t3_5");
        state.remember("t3_4");

        assert_eq!(state.frontier(), Some("t3_5"));
        assert!(state.is_known("t3_4"));
        assert!(state.is_known("t3_5"));
        assert!(!state.is_known("t3_6"));
    }

    #[test]
    fn test_recent_names_are_bounded() {
        let mut state = StreamState::new(Direction::Forward);
        for n in 0..(RECENT_NAMES as i64 + 5) {
            state.advance(&format!("t3_{}", n));
        }

        assert_eq!(state.recent.len(), RECENT_NAMES);
        assert_eq!(state.known.len(), RECENT_NAMES);
        assert!(!state.is_known("t3_0"));
        assert!(!state.is_known("t3_4"));
        assert!(state.is_known("t3_5"));
        assert_eq!(state.frontier(), Some(format!("t3_{}", RECENT_NAMES + 4).as_str()));
    }
}
