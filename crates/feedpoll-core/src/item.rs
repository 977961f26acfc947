//! Item model
//!
//! Listings return a mix of posts, comments and private messages. Adapters
//! normalize them into [`Item`], a closed set whose variant decides which
//! handler receives it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispatch key for handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Comment,
    Message,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Post => f.write_str("post"),
            ItemKind::Comment => f.write_str("comment"),
            ItemKind::Message => f.write_str("message"),
        }
    }
}

/// A link or self post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Fullname, e.g. `t3_abc123`
    pub name: String,
    pub id: String,
    pub author: String,
    pub subreddit: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub is_self: bool,
    pub created: DateTime<Utc>,
}

/// A comment, including inbox replies and mentions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Fullname, e.g. `t1_def456`
    pub name: String,
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    pub body: String,
    /// Fullname of the post the comment belongs to
    #[serde(default)]
    pub link_id: String,
    /// Fullname of the post or comment being replied to
    #[serde(default)]
    pub parent_id: String,
    pub created: DateTime<Utc>,
}

/// A private message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Fullname, e.g. `t4_ghi789`
    pub name: String,
    pub id: String,
    pub author: String,
    pub subject: String,
    pub body: String,
    /// Set when the message is an inbox notification about a comment
    #[serde(default)]
    pub was_comment: bool,
    pub created: DateTime<Utc>,
}

/// Normalized listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Item {
    Post(Post),
    Comment(Comment),
    Message(Message),
}

impl Item {
    /// Platform-unique name, used as the dedup key
    pub fn name(&self) -> &str {
        match self {
            Item::Post(post) => &post.name,
            Item::Comment(comment) => &comment.name,
            Item::Message(message) => &message.name,
        }
    }

    /// Which handler receives this item
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Post(_) => ItemKind::Post,
            Item::Comment(_) => ItemKind::Comment,
            Item::Message(_) => ItemKind::Message,
        }
    }

    /// Creation time, only meaningful for ordering within one batch
    pub fn created(&self) -> DateTime<Utc> {
        match self {
            Item::Post(post) => post.created,
            Item::Comment(comment) => comment.created,
            Item::Message(message) => message.created,
        }
    }
}

impl From<Post> for Item {
    fn from(post: Post) -> Self {
        Item::Post(post)
    }
}

impl From<Comment> for Item {
    fn from(comment: Comment) -> Self {
        Item::Comment(comment)
    }
}

impl From<Message> for Item {
    fn from(message: Message) -> Self {
        Item::Message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_accessors() {
        let created = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let item = Item::from(Comment {
            name: "t1_abc".to_string(),
            id: "abc".to_string(),
            author: "someone".to_string(),
            subreddit: "rust".to_string(),
            body: "hello".to_string(),
            link_id: "t3_xyz".to_string(),
            parent_id: "t3_xyz".to_string(),
            created,
        });

        assert_eq!(item.name(), "t1_abc");
        assert_eq!(item.kind(), ItemKind::Comment);
        assert_eq!(item.created(), created);
        assert_eq!(item.kind().to_string(), "comment");
    }
}
