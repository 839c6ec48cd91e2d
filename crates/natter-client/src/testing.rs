//! Scripted transport for tests.
//!
//! Responses are queued up front, either globally (FIFO) or keyed by path
//! for flows whose call order is not deterministic (e.g. walking a HashMap
//! of groups). Every call is recorded with its virtual timestamp so tests
//! can assert call counts, query strings, and backoff spacing.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::NetworkError;
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub at: tokio::time::Instant,
}

#[derive(Default)]
pub(crate) struct MockTransport {
    queue: Mutex<VecDeque<Result<Value, NetworkError>>>,
    routes: Mutex<HashMap<String, VecDeque<Result<Value, NetworkError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
    park: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response, regardless of path.
    pub fn push_ok(&self, body: Value) {
        self.queue.lock().unwrap().push_back(Ok(body));
    }

    pub fn push_err(&self, err: NetworkError) {
        self.queue.lock().unwrap().push_back(Err(err));
    }

    /// Queue a response for one specific path.
    pub fn route(&self, path: &str, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(Ok(body));
    }

    /// When the script runs out, hang forever instead of erroring. Used by
    /// run-loop tests that abort the task when done.
    pub fn park_when_exhausted(&self) {
        self.park.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(
        &self,
        method: &'static str,
        path: &str,
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) {
        let own = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            query: own(query),
            form: own(form),
            at: tokio::time::Instant::now(),
        });
    }

    fn next_response(&self, path: &str) -> Option<Result<Value, NetworkError>> {
        if let Some(queue) = self.routes.lock().unwrap().get_mut(path) {
            if let Some(response) = queue.pop_front() {
                return Some(response);
            }
        }
        self.queue.lock().unwrap().pop_front()
    }

    async fn respond(&self, path: &str) -> Result<Value, NetworkError> {
        match self.next_response(path) {
            Some(response) => response,
            None if self.park.load(Ordering::SeqCst) => std::future::pending().await,
            None => Err(NetworkError::Connect(format!(
                "mock transport exhausted at {path}"
            ))),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, NetworkError> {
        self.record("GET", path, query, &[]);
        self.respond(path).await
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, NetworkError> {
        self.record("POST", path, &[], form);
        self.respond(path).await
    }
}

/// A live batch of plain chat messages with the given cursor tokens.
pub(crate) fn live_batch(ids: &[&str]) -> Value {
    let messages: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "_id": id,
                "kind": "message",
                "group": 1,
                "topic": {"id": 7},
                "user": {"username": "ana"},
                "message": "hello",
                "date_created": 1301952001.0,
            })
        })
        .collect();
    json!({ "messages": messages })
}
