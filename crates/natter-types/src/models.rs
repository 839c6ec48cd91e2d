use serde::{Deserialize, Serialize};

/// A Convore group, keyed by id. `unread` is the server's aggregate over the
/// group's topics; the client mutates it in place when topics are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub slug: String,
    #[serde(default)]
    pub unread: u32,
    /// Server timestamp of the latest message, seconds since the epoch.
    /// Opaque to the core — only the renderer interprets it.
    #[serde(rename = "date_latest_message")]
    pub latest_message_at: Option<f64>,
}

/// A topic inside a group. The wire representation carries no group id (it is
/// implied by the fetch URL), so `group_id` is annotated by the client after
/// parsing and skipped by serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: u64,
    #[serde(skip)]
    pub group_id: u64,
    pub name: String,
    #[serde(default)]
    pub unread: u32,
    #[serde(rename = "date_latest_message")]
    pub latest_message_at: Option<f64>,
}

/// One entry of a topic's message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicMessage {
    pub id: Option<u64>,
    pub user: Option<MessageUser>,
    #[serde(rename = "message")]
    pub body: String,
    #[serde(rename = "date_created")]
    pub created_at: Option<f64>,
}

/// The author embedded in message payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageUser {
    pub username: String,
}

/// Reference to a topic inside a live event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRef {
    pub id: u64,
}

/// Kind of a live event. The live endpoint also reports logins, topic
/// creation and the like; everything that is not a chat message collapses
/// into `Other` and is ignored by the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Message,
    #[default]
    #[serde(other)]
    Other,
}

/// One event from the live endpoint. Transient — dispatched to listeners and
/// never stored. `id` doubles as the long-poll cursor token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveMessage {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub kind: EventKind,
    #[serde(rename = "group")]
    pub group_id: Option<u64>,
    pub topic: Option<TopicRef>,
    pub user: Option<MessageUser>,
    #[serde(rename = "message")]
    pub body: Option<String>,
    #[serde(rename = "date_created")]
    pub created_at: Option<f64>,
    /// Server-side arrival timestamp.
    #[serde(rename = "_ts")]
    pub arrived_at: Option<f64>,
}
