//! Minimal embedding example for feedpoll-core
//!
//! Runs a monitor group against an in-memory stand-in for Reddit. The
//! application owns the group lifecycle: it builds the monitors, watches
//! their events and cancels them when it is done.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedpoll_core::{
    ActionSubmitter, Comment, Direction, GroupConfig, Handlers, Item, Listing, ListingFetcher,
    Monitor, MonitorConfig, MonitorGroup, Outcome, PageRequest, Post, Result, Target,
};
use feedpoll_reddit::Account;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// In-memory listings plus a log of submitted actions
#[derive(Clone, Default)]
struct InMemoryReddit {
    listings: Arc<Mutex<HashMap<String, Vec<Item>>>>,
    actions: Arc<Mutex<Vec<String>>>,
    clock: Arc<AtomicI64>,
}

impl InMemoryReddit {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        DateTime::from_timestamp(1_700_000_000 + tick, 0).unwrap_or_default()
    }

    /// Put `item` at the head of the listing at `path`
    fn publish(&self, path: &str, item: Item) {
        self.listings
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .insert(0, item);
    }

    fn post(&self, subreddit: &str, n: usize) {
        let post = Post {
            name: format!("t3_p{}", n),
            id: format!("p{}", n),
            author: "newcomer".to_string(),
            subreddit: subreddit.to_string(),
            title: format!("Question #{}", n),
            selftext: "How do lifetimes work?".to_string(),
            url: String::new(),
            permalink: format!("/r/{}/comments/p{}/", subreddit, n),
            is_self: true,
            created: self.now(),
        };
        self.publish(&format!("/r/{}/new", subreddit), post.into());
    }

    fn reply(&self, n: usize) {
        let comment = Comment {
            name: format!("t1_c{}", n),
            id: format!("c{}", n),
            author: "helper".to_string(),
            subreddit: "rust".to_string(),
            body: format!("Reply #{}", n),
            link_id: String::new(),
            parent_id: "t1_bot".to_string(),
            created: self.now(),
        };
        self.publish("/message/comments", comment.into());
    }

    fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingFetcher for InMemoryReddit {
    async fn fetch(&self, path: &str, page: &PageRequest) -> Result<Listing> {
        let items = self
            .listings
            .lock()
            .unwrap()
            .get(path)
            .map(|items| items.iter().take(page.limit as usize).cloned().collect())
            .unwrap_or_default();
        Ok(Listing::new(items, None))
    }
}

#[async_trait]
impl ActionSubmitter for InMemoryReddit {
    async fn submit(&self, path: &str, form: &[(&str, &str)]) -> Result<()> {
        let fields: Vec<String> = form.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        self.actions
            .lock()
            .unwrap()
            .push(format!("POST {} {}", path, fields.join("&")));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    println!("=== Embedded feedpoll-core Example ===\n");

    let reddit = InMemoryReddit::default();

    // History that exists before the monitors start
    for n in 1..=3 {
        reddit.post("rust", n);
    }
    for n in 1..=2 {
        reddit.reply(n);
    }

    // Handlers are synchronous; actions are handed to a task that owns the account
    let account = Account::new(reddit.clone());
    let (greet_tx, mut greet_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let greeter = tokio::spawn(async move {
        while let Some(name) = greet_rx.recv().await {
            if let Err(e) = account.reply(&name, "Welcome! Have you read the book?").await {
                eprintln!("[Greeter] reply to {} failed: {}", name, e);
            }
        }
    });

    println!("1. Creating monitors...");
    let posts = Monitor::new(
        Arc::new(reddit.clone()),
        MonitorConfig::new("new-posts", Target::Subreddits {
            names: vec!["rust".to_string()],
        })
        .with_poll_interval(Duration::from_millis(20)),
        Handlers::new().on_post(move |post| {
            println!("[new-posts] {} {:?}", post.name, post.title);
            let _ = greet_tx.send(post.name.clone());
            Outcome::Continue
        }),
    )?;

    let mut seen = 0;
    let replies = Monitor::new(
        Arc::new(reddit.clone()),
        MonitorConfig::new("inbox-replies", Target::CommentReplies)
            .with_direction(Direction::Backward)
            .with_poll_interval(Duration::from_millis(20)),
        Handlers::new().on_comment(move |comment| {
            seen += 1;
            println!("[inbox-replies] {} {:?}", comment.name, comment.body);
            if seen == 4 { Outcome::Stop } else { Outcome::Continue }
        }),
    )?;

    let (group, events) = MonitorGroup::new(vec![posts, replies], GroupConfig::default())?;
    let cancel = group.cancellation_token();

    let event_listener = tokio::spawn(async move {
        let mut events = ReceiverStream::new(events);
        let mut count = 0;
        while let Some(event) = events.next().await {
            count += 1;
            println!("[Event] {:?}", event);
        }
        count
    });

    println!("2. Starting monitor group in background...");
    let group_handle = tokio::spawn(group.run());

    // New activity arrives while the monitors run
    for n in 4..=6 {
        tokio::time::sleep(Duration::from_millis(60)).await;
        reddit.post("rust", n);
        reddit.reply(n - 1);
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    println!("\n3. Cancelling the group...");
    cancel.cancel();

    let reports = match group_handle.await {
        Ok(result) => result?,
        Err(e) => {
            eprintln!("Monitor group task failed: {}", e);
            return Ok(());
        }
    };
    let event_count = event_listener.await.unwrap_or_default();
    let _ = greeter.await;

    println!("\n4. Monitors stopped:");
    for report in &reports {
        println!(
            "   {} ({}): {}, last item {:?}",
            report.label, report.path, report.reason, report.frontier
        );
    }

    println!("\n5. Actions submitted:");
    for action in reddit.actions() {
        println!("   {}", action);
    }

    println!("\n=== Embedding Successful ({} events) ===", event_count);
    println!("Key Points:");
    println!("- Forward monitors skip history, backward monitors drain it");
    println!("- A handler can stop its own monitor without affecting others");
    println!("- Fetchers and submitters are plain trait objects, no global client");

    Ok(())
}
