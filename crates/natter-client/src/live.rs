use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, error, info, warn};

use natter_types::api::LiveEnvelope;
use natter_types::models::LiveMessage;

use crate::error::NetworkError;
use crate::transport::Transport;

const LIVE_PATH: &str = "/api/live.json";

/// Receives each live event, in server order. A listener returning `Err` is
/// reported and skipped; it never stops delivery to later listeners and
/// never kills the poll loop.
#[async_trait]
pub trait UpdateListener: Send + Sync {
    async fn on_update(&self, message: &LiveMessage) -> anyhow::Result<()>;
}

/// Shared listener registry. The session appends to it while the feed task
/// reads a snapshot per batch.
pub type Listeners = Arc<Mutex<Vec<Arc<dyn UpdateListener>>>>;

/// The long-poll engine. Owns the cursor: an opaque token naming the last
/// event consumed, advanced only after a successful non-empty batch and
/// never rewound, so a failed poll retries the exact same position without
/// skipping or duplicating events.
pub struct LiveFeed {
    transport: Arc<dyn Transport>,
    listeners: Listeners,
    retry_delay: Duration,
    cursor: Option<String>,
}

impl LiveFeed {
    pub fn new(transport: Arc<dyn Transport>, retry_delay: Duration) -> Self {
        Self::with_listeners(transport, retry_delay, Arc::new(Mutex::new(Vec::new())))
    }

    pub fn with_listeners(
        transport: Arc<dyn Transport>,
        retry_delay: Duration,
        listeners: Listeners,
    ) -> Self {
        Self {
            transport,
            listeners,
            retry_delay,
            cursor: None,
        }
    }

    pub async fn add_listener(&self, listener: Arc<dyn UpdateListener>) {
        self.listeners.lock().await.push(listener);
    }

    /// `None` means "from the beginning".
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// One poll step: request the next batch at the current cursor, advance
    /// the cursor to the batch tail, then fan the events out to every
    /// listener in registration order. Returns the number of events
    /// delivered. On `Err` the cursor is untouched.
    pub async fn poll_once(&mut self) -> Result<usize, NetworkError> {
        let body = match &self.cursor {
            Some(cursor) => {
                self.transport
                    .get_json(LIVE_PATH, &[("cursor", cursor)])
                    .await?
            }
            None => self.transport.get_json(LIVE_PATH, &[]).await?,
        };
        let envelope: LiveEnvelope = serde_json::from_value(body)
            .map_err(|err| NetworkError::BadBody(err.to_string()))?;

        if let Some(tail) = envelope.messages.last() {
            match tail.get("_id").and_then(Value::as_str) {
                Some(id) => self.cursor = Some(id.to_string()),
                // never fall back to the beginning sentinel
                None => warn!("live batch tail carries no _id, cursor not advanced"),
            }
        }

        let listeners = self.listeners.lock().await.clone();
        let mut delivered = 0;
        for raw in envelope.messages {
            let message: LiveMessage = match serde_json::from_value(raw) {
                Ok(message) => message,
                Err(err) => {
                    warn!("dropping unparseable live event: {err}");
                    continue;
                }
            };
            for listener in &listeners {
                if let Err(err) = listener.on_update(&message).await {
                    error!("live-update listener failed: {err:#}");
                }
            }
            delivered += 1;
        }
        Ok(delivered)
    }

    /// The background task body. Waits for the console's ready signal first
    /// (a dropped sender unblocks too), then polls forever: success loops
    /// straight into the next poll, failure logs and sleeps the fixed retry
    /// delay with the cursor unchanged. Terminates only by abort.
    pub async fn run(mut self, ready: oneshot::Receiver<()>) {
        let _ = ready.await;
        info!("live feed polling {LIVE_PATH}");
        loop {
            match self.poll_once().await {
                Ok(0) => {}
                Ok(count) => debug!("delivered {count} live events"),
                Err(err) => {
                    warn!("{err}, retrying in {} seconds", self.retry_delay.as_secs());
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}
