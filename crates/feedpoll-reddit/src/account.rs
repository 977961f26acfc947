//! Account actions
//!
//! Typed wrappers over [`ActionSubmitter`] for the things a bot does from
//! inside its handlers: reply, message, post and flair.

use feedpoll_core::{ActionSubmitter, Error, Result};

/// Actions available to an authenticated account
///
/// Generic over the submitter so handlers can be tested without a network.
#[derive(Debug, Clone)]
pub struct Account<S> {
    submitter: S,
}

impl<S: ActionSubmitter> Account<S> {
    /// Create a new account over `submitter`
    pub fn new(submitter: S) -> Self {
        Self { submitter }
    }

    /// Reply to a post, comment or message by its fullname
    ///
    /// Replying to a post makes a top-level comment, to a comment a nested
    /// reply, to a message a private reply.
    pub async fn reply(&self, parent_name: &str, text: &str) -> Result<()> {
        require("parent name", parent_name)?;
        self.submitter
            .submit("/api/comment", &[("thing_id", parent_name), ("text", text)])
            .await
    }

    /// Send a private message
    pub async fn send_message(&self, user: &str, subject: &str, text: &str) -> Result<()> {
        require("recipient", user)?;
        self.submitter
            .submit(
                "/api/compose",
                &[("to", user), ("subject", subject), ("text", text)],
            )
            .await
    }

    /// Make a text post
    pub async fn post_self(&self, subreddit: &str, title: &str, text: &str) -> Result<()> {
        require("subreddit", subreddit)?;
        self.submitter
            .submit(
                "/api/submit",
                &[
                    ("sr", subreddit),
                    ("kind", "self"),
                    ("title", title),
                    ("text", text),
                ],
            )
            .await
    }

    /// Make a link post
    pub async fn post_link(&self, subreddit: &str, title: &str, url: &str) -> Result<()> {
        require("subreddit", subreddit)?;
        self.submitter
            .submit(
                "/api/submit",
                &[
                    ("sr", subreddit),
                    ("kind", "link"),
                    ("title", title),
                    ("url", url),
                ],
            )
            .await
    }

    /// Make a link post with flair text
    pub async fn post_link_flair(
        &self,
        subreddit: &str,
        title: &str,
        url: &str,
        flair_text: &str,
    ) -> Result<()> {
        require("subreddit", subreddit)?;
        self.submitter
            .submit(
                "/api/submit",
                &[
                    ("sr", subreddit),
                    ("kind", "link"),
                    ("title", title),
                    ("url", url),
                    ("flair_text", flair_text),
                ],
            )
            .await
    }

    /// Set the flair of an existing post
    pub async fn flair_post(&self, subreddit: &str, link: &str, text: &str) -> Result<()> {
        require("subreddit", subreddit)?;
        require("link", link)?;
        self.submitter
            .submit(
                &format!("/r/{}/api/flair", subreddit),
                &[("link", link), ("text", text)],
            )
            .await
    }

    /// Run a search over the last hour of a subreddit, newest first
    pub async fn search(&self, subreddit: &str, query: &str) -> Result<()> {
        require("subreddit", subreddit)?;
        self.submitter
            .submit(
                &format!("/r/{}/search", subreddit),
                &[("q", query), ("t", "hour"), ("sort", "new")],
            )
            .await
    }

    /// The underlying submitter
    pub fn submitter(&self) -> &S {
        &self.submitter
    }
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::config(format!("{} cannot be empty", what)));
    }
    Ok(())
}
