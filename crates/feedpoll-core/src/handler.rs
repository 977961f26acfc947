//! Typed handlers
//!
//! A monitor holds at most one handler per [`ItemKind`]. Handlers run
//! synchronously on the monitor's task: a handler that blocks stalls only
//! its own monitor.

use crate::item::{Comment, Item, ItemKind, Message, Post};
use std::fmt;

/// What the monitor should do after a handler returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Keep dispatching
    Continue,
    /// Stop the monitor gracefully
    Stop,
    /// Stop the monitor and report this error
    Fail(String),
}

impl Outcome {
    /// Create a failing outcome from any displayable error
    pub fn fail(err: impl fmt::Display) -> Self {
        Outcome::Fail(err.to_string())
    }

    /// Whether dispatch must halt after this outcome
    pub fn is_stop(&self) -> bool {
        !matches!(self, Outcome::Continue)
    }
}

type HandlerFn<T> = Box<dyn FnMut(&T) -> Outcome + Send>;

/// Mapping from item kind to handler
#[derive(Default)]
pub struct Handlers {
    post: Option<HandlerFn<Post>>,
    comment: Option<HandlerFn<Comment>>,
    message: Option<HandlerFn<Message>>,
}

impl Handlers {
    /// Create an empty handler set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the post handler, replacing any previous one
    pub fn on_post(mut self, handler: impl FnMut(&Post) -> Outcome + Send + 'static) -> Self {
        self.post = Some(Box::new(handler));
        self
    }

    /// Register the comment handler, replacing any previous one
    pub fn on_comment(
        mut self,
        handler: impl FnMut(&Comment) -> Outcome + Send + 'static,
    ) -> Self {
        self.comment = Some(Box::new(handler));
        self
    }

    /// Register the message handler, replacing any previous one
    pub fn on_message(
        mut self,
        handler: impl FnMut(&Message) -> Outcome + Send + 'static,
    ) -> Self {
        self.message = Some(Box::new(handler));
        self
    }

    /// Whether a handler is registered for `kind`
    pub fn handles(&self, kind: ItemKind) -> bool {
        match kind {
            ItemKind::Post => self.post.is_some(),
            ItemKind::Comment => self.comment.is_some(),
            ItemKind::Message => self.message.is_some(),
        }
    }

    /// Kinds with a registered handler
    pub fn kinds(&self) -> Vec<ItemKind> {
        [ItemKind::Post, ItemKind::Comment, ItemKind::Message]
            .into_iter()
            .filter(|kind| self.handles(*kind))
            .collect()
    }

    /// Route an item to its handler
    ///
    /// Returns `None` when no handler is registered for the item's kind.
    pub fn dispatch(&mut self, item: &Item) -> Option<Outcome> {
        match item {
            Item::Post(post) => self.post.as_mut().map(|handle| handle(post)),
            Item::Comment(comment) => self.comment.as_mut().map(|handle| handle(comment)),
            Item::Message(message) => self.message.as_mut().map(|handle| handle(message)),
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("kinds", &self.kinds())
            .finish()
    }
}
