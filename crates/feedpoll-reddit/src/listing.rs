//! Listing decoding
//!
//! Reddit wraps every listing as
//! `{"kind":"Listing","data":{"after":..,"children":[{"kind":"t3","data":{..}}]}}`.
//! Children of kind `t3` become posts, `t1` comments and `t4` messages.
//! Anything else (`more`, awards, ...) is skipped.

use chrono::{DateTime, Utc};
use feedpoll_core::{Comment, Error, Item, Listing, Message, Post, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Envelope {
    kind: String,
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct RawPost {
    name: String,
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    is_self: bool,
    created_utc: f64,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    name: String,
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    body: String,
    // Absent on inbox replies
    #[serde(default)]
    link_id: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    created_utc: f64,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    name: String,
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    was_comment: bool,
    created_utc: f64,
}

/// Decode a listing response body
///
/// # Errors
///
/// `Error::MalformedResponse` when the body is not a listing or a known
/// child cannot be decoded.
pub fn decode(body: &str) -> Result<Listing> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| Error::malformed(format!("Invalid listing JSON: {}", e)))?;

    if envelope.kind != "Listing" {
        return Err(Error::malformed(format!(
            "Expected a Listing, got '{}'",
            envelope.kind
        )));
    }

    let mut items = Vec::with_capacity(envelope.data.children.len());
    for thing in envelope.data.children {
        if let Some(item) = decode_thing(thing)? {
            items.push(item);
        }
    }

    Ok(Listing::new(items, envelope.data.after.filter(|a| !a.is_empty())))
}

fn decode_thing(thing: Thing) -> Result<Option<Item>> {
    let item = match thing.kind.as_str() {
        "t3" => {
            let raw: RawPost = from_value(&thing.kind, thing.data)?;
            Item::Post(Post {
                created: timestamp(&raw.name, raw.created_utc)?,
                name: raw.name,
                id: raw.id,
                author: raw.author.unwrap_or_default(),
                subreddit: raw.subreddit.unwrap_or_default(),
                title: raw.title,
                selftext: raw.selftext,
                url: raw.url,
                permalink: raw.permalink,
                is_self: raw.is_self,
            })
        }
        "t1" => {
            let raw: RawComment = from_value(&thing.kind, thing.data)?;
            Item::Comment(Comment {
                created: timestamp(&raw.name, raw.created_utc)?,
                name: raw.name,
                id: raw.id,
                author: raw.author.unwrap_or_default(),
                subreddit: raw.subreddit.unwrap_or_default(),
                body: raw.body,
                link_id: raw.link_id.unwrap_or_default(),
                parent_id: raw.parent_id.unwrap_or_default(),
            })
        }
        "t4" => {
            let raw: RawMessage = from_value(&thing.kind, thing.data)?;
            Item::Message(Message {
                created: timestamp(&raw.name, raw.created_utc)?,
                name: raw.name,
                id: raw.id,
                author: raw.author.unwrap_or_default(),
                subject: raw.subject,
                body: raw.body,
                was_comment: raw.was_comment,
            })
        }
        other => {
            debug!("Skipping listing child of kind {}", other);
            return Ok(None);
        }
    };

    Ok(Some(item))
}

fn from_value<T: DeserializeOwned>(kind: &str, data: Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| Error::malformed(format!("Invalid {} child: {}", kind, e)))
}

fn timestamp(name: &str, created_utc: f64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(created_utc as i64, 0)
        .ok_or_else(|| Error::malformed(format!("{} has invalid created_utc {}", name, created_utc)))
}
