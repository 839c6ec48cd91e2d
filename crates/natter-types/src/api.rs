//! Response envelopes for the list endpoints.
//!
//! The item arrays are kept as raw values: the client parses each entry
//! individually so one malformed record is dropped instead of failing the
//! whole response.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct GroupsEnvelope {
    #[serde(default)]
    pub groups: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct TopicsEnvelope {
    #[serde(default)]
    pub topics: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesEnvelope {
    #[serde(default)]
    pub messages: Vec<Value>,
}

/// Batch returned by the long-poll live endpoint. Same shape as
/// `MessagesEnvelope` but kept separate — the items are events, not
/// history entries.
#[derive(Debug, Deserialize)]
pub struct LiveEnvelope {
    #[serde(default)]
    pub messages: Vec<Value>,
}
