use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use natter_types::api::{GroupsEnvelope, MessagesEnvelope, TopicsEnvelope};
use natter_types::models::{EventKind, Group, LiveMessage, Topic, TopicMessage};

use crate::config::{ClientConfig, Credentials};
use crate::error::NetworkError;
use crate::live::{LiveFeed, Listeners, UpdateListener};
use crate::transport::{HttpTransport, Transport};

/// The group/topic cache. Lazily filled, replaced wholesale on force, and
/// patched in place by live updates and mark-read operations. Lives behind
/// the session's single mutex — nothing outside this module touches it.
#[derive(Default)]
struct CacheState {
    groups: HashMap<u64, Group>,
    topics: HashMap<u64, Topic>,
}

/// Facade over the whole client: cache, command transport, and the
/// background live feed. Every operation that reads or writes the cache
/// holds the cache mutex for its full duration, transport round-trips
/// included, so foreground commands and the internal live listener always
/// see consistent snapshots.
pub struct Session {
    username: Option<String>,
    transport: Arc<dyn Transport>,
    cache: Arc<Mutex<CacheState>>,
    listeners: Listeners,
    ready: Mutex<Option<oneshot::Sender<()>>>,
    feed: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Build both transports, spawn the live feed, and register the
    /// cache-maintenance listener. The feed holds its first request until
    /// `notify_ready` fires.
    pub fn start(
        config: &ClientConfig,
        credentials: Option<&Credentials>,
    ) -> Result<Self, NetworkError> {
        let command: Arc<dyn Transport> =
            Arc::new(HttpTransport::for_commands(config, credentials)?);
        let live: Arc<dyn Transport> = Arc::new(HttpTransport::for_live(config, credentials)?);
        Ok(Self::assemble(
            command,
            live,
            config.retry_delay,
            credentials.map(|c| c.login.clone()),
        ))
    }

    pub(crate) fn assemble(
        command: Arc<dyn Transport>,
        live: Arc<dyn Transport>,
        retry_delay: Duration,
        username: Option<String>,
    ) -> Self {
        let cache = Arc::new(Mutex::new(CacheState::default()));
        // registered first so the cache is consistent before any
        // user-facing listener renders the event
        let maintenance: Arc<dyn UpdateListener> = Arc::new(CacheListener {
            transport: command.clone(),
            cache: cache.clone(),
        });
        let listeners: Listeners = Arc::new(Mutex::new(vec![maintenance]));

        let feed = LiveFeed::with_listeners(live, retry_delay, listeners.clone());
        let (ready_tx, ready_rx) = oneshot::channel();
        let handle = tokio::spawn(feed.run(ready_rx));

        Self {
            username,
            transport: command,
            cache,
            listeners,
            ready: Mutex::new(Some(ready_tx)),
            feed: Mutex::new(Some(handle)),
        }
    }

    /// The authenticated identity, `None` when anonymous.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Unblock the live feed's first poll. Called by the console once its
    /// banner is out, so asynchronous output cannot appear mid-startup.
    pub async fn notify_ready(&self) {
        if let Some(ready) = self.ready.lock().await.take() {
            let _ = ready.send(());
        }
    }

    /// Register a listener for live events. It runs after the internal
    /// cache listener, in registration order.
    pub async fn on_live_update(&self, listener: Arc<dyn UpdateListener>) {
        self.listeners.lock().await.push(listener);
    }

    /// Cached groups, fetched on first access. `force` replaces the map
    /// wholesale, so groups deleted server-side disappear.
    pub async fn get_groups(&self, force: bool) -> Result<HashMap<u64, Group>, NetworkError> {
        let mut cache = self.cache.lock().await;
        if force || cache.groups.is_empty() {
            cache.groups = fetch_groups(self.transport.as_ref()).await?;
        }
        Ok(cache.groups.clone())
    }

    /// Cached topics across all groups, keyed by topic id. First access
    /// walks every group's topic list (O(groups) round-trips), after which
    /// the merged map is served from the cache until forced.
    pub async fn get_topics(&self, force: bool) -> Result<HashMap<u64, Topic>, NetworkError> {
        let mut cache = self.cache.lock().await;
        fill_topics(self.transport.as_ref(), &mut cache, force).await?;
        Ok(cache.topics.clone())
    }

    /// One group's topic list, merged into the cache. Safe to call
    /// redundantly — the live path leans on that for lazy discovery.
    pub async fn get_group_topics(
        &self,
        group_id: u64,
    ) -> Result<HashMap<u64, Topic>, NetworkError> {
        let mut cache = self.cache.lock().await;
        let topics = fetch_group_topics(self.transport.as_ref(), group_id).await?;
        cache
            .topics
            .extend(topics.iter().map(|(id, topic)| (*id, topic.clone())));
        Ok(topics)
    }

    /// A topic's message history, oldest first as the server sends it.
    /// Viewing a topic marks it read locally: its unread count drops to
    /// zero and the owning group's aggregate shrinks by the same amount.
    pub async fn get_topic_messages(
        &self,
        topic_id: u64,
    ) -> Result<Vec<TopicMessage>, NetworkError> {
        let mut cache = self.cache.lock().await;
        let body = self
            .transport
            .get_json(&format!("/api/topics/{topic_id}/messages.json"), &[])
            .await?;
        let envelope: MessagesEnvelope = decode(body)?;

        let mut messages = Vec::with_capacity(envelope.messages.len());
        for raw in envelope.messages {
            match serde_json::from_value::<TopicMessage>(raw) {
                Ok(message) => messages.push(message),
                Err(err) => warn!("dropping unparseable history entry: {err}"),
            }
        }

        // a cold cache would silently skip the local mark-read (the server
        // never clears unread on view), so lazily fill first
        if !cache.topics.contains_key(&topic_id) {
            fill_topics(self.transport.as_ref(), &mut cache, false).await?;
        }
        if let Some(topic) = cache.topics.get_mut(&topic_id) {
            let viewed = std::mem::take(&mut topic.unread);
            let group_id = topic.group_id;
            if let Some(group) = cache.groups.get_mut(&group_id) {
                group.unread = group.unread.saturating_sub(viewed);
            }
        }
        Ok(messages)
    }

    /// Post one message to a topic. No retry; the caller reports failure.
    pub async fn send_message(&self, topic_id: u64, body: &str) -> Result<(), NetworkError> {
        self.transport
            .post_form(
                &format!("/api/topics/{topic_id}/messages/create.json"),
                &[("message", body)],
            )
            .await?;
        Ok(())
    }

    /// Mark everything read server-side, then zero every local unread count
    /// optimistically — no re-fetch.
    pub async fn mark_all_read(&self) -> Result<(), NetworkError> {
        let mut cache = self.cache.lock().await;
        self.transport
            .post_form("/api/account/mark_read.json", &[])
            .await?;
        for topic in cache.topics.values_mut() {
            topic.unread = 0;
        }
        for group in cache.groups.values_mut() {
            group.unread = 0;
        }
        Ok(())
    }

    /// Mark one group read, zeroing it and its topics locally.
    pub async fn mark_group_read(&self, group_id: u64) -> Result<(), NetworkError> {
        let mut cache = self.cache.lock().await;
        self.transport
            .post_form(&format!("/api/groups/{group_id}/mark_read.json"), &[])
            .await?;
        for topic in cache
            .topics
            .values_mut()
            .filter(|topic| topic.group_id == group_id)
        {
            topic.unread = 0;
        }
        if let Some(group) = cache.groups.get_mut(&group_id) {
            group.unread = 0;
        }
        Ok(())
    }

    /// Tear down the live feed. The in-flight poll is abandoned, not
    /// awaited. Idempotent.
    pub async fn close(&self) {
        self.ready.lock().await.take();
        if let Some(feed) = self.feed.lock().await.take() {
            feed.abort();
        }
    }
}

/// Internal listener keeping the cache consistent with server-side topic
/// and group creation: a chat message may arrive for a topic the client has
/// never enumerated, in which case the owning group's topic list is fetched
/// on the spot (and the group map force-refreshed if even the group is
/// new). Runs under the same cache mutex as the foreground operations.
struct CacheListener {
    transport: Arc<dyn Transport>,
    cache: Arc<Mutex<CacheState>>,
}

#[async_trait]
impl UpdateListener for CacheListener {
    async fn on_update(&self, message: &LiveMessage) -> anyhow::Result<()> {
        if message.kind != EventKind::Message {
            return Ok(());
        }
        let Some(topic_ref) = &message.topic else {
            return Ok(());
        };

        // the server stamps live events with an arrival time; prefer it for
        // recency ordering, like the wire's own group listings do
        let stamp = message.arrived_at.or(message.created_at);
        let mut cache = self.cache.lock().await;

        if let Some(topic) = cache.topics.get_mut(&topic_ref.id) {
            topic.latest_message_at = stamp.or(topic.latest_message_at);
            let group_id = topic.group_id;
            if let Some(group) = cache.groups.get_mut(&group_id) {
                group.latest_message_at = stamp.or(group.latest_message_at);
            }
            return Ok(());
        }

        // unknown topic: learn it from its owning group's topic list
        let Some(group_id) = message.group_id else {
            anyhow::bail!("live message for unknown topic {} has no group", topic_ref.id);
        };
        if !cache.groups.contains_key(&group_id) {
            cache.groups = fetch_groups(self.transport.as_ref()).await?;
        }
        if !cache.groups.contains_key(&group_id) {
            warn!("live message references group {group_id} the server will not list");
            return Ok(());
        }
        let topics = fetch_group_topics(self.transport.as_ref(), group_id).await?;
        cache.topics.extend(topics);
        if let Some(group) = cache.groups.get_mut(&group_id) {
            group.latest_message_at = stamp.or(group.latest_message_at);
        }
        Ok(())
    }
}

/// Lazy fill of the topic map: a no-op when it is already populated unless
/// forced, otherwise the group list is fetched (if needed) and every
/// group's topics are merged into one map. Runs under the caller's lock.
async fn fill_topics(
    transport: &dyn Transport,
    cache: &mut CacheState,
    force: bool,
) -> Result<(), NetworkError> {
    if !force && !cache.topics.is_empty() {
        return Ok(());
    }
    if force || cache.groups.is_empty() {
        cache.groups = fetch_groups(transport).await?;
    }
    let group_ids: Vec<u64> = cache.groups.keys().copied().collect();
    let mut topics = HashMap::new();
    for group_id in group_ids {
        topics.extend(fetch_group_topics(transport, group_id).await?);
    }
    cache.topics = topics;
    Ok(())
}

/// Fetch and key the group list. Entries that fail to parse are dropped
/// with a warning rather than failing the whole call.
async fn fetch_groups(transport: &dyn Transport) -> Result<HashMap<u64, Group>, NetworkError> {
    let body = transport.get_json("/api/groups.json", &[]).await?;
    let envelope: GroupsEnvelope = decode(body)?;
    let mut groups = HashMap::with_capacity(envelope.groups.len());
    for raw in envelope.groups {
        match serde_json::from_value::<Group>(raw) {
            Ok(group) => {
                groups.insert(group.id, group);
            }
            Err(err) => warn!("dropping unparseable group entry: {err}"),
        }
    }
    Ok(groups)
}

/// Fetch one group's topics, annotating each with the owning group id (the
/// wire leaves it implicit in the URL).
async fn fetch_group_topics(
    transport: &dyn Transport,
    group_id: u64,
) -> Result<HashMap<u64, Topic>, NetworkError> {
    let body = transport
        .get_json(&format!("/api/groups/{group_id}/topics.json"), &[])
        .await?;
    let envelope: TopicsEnvelope = decode(body)?;
    let mut topics = HashMap::with_capacity(envelope.topics.len());
    for raw in envelope.topics {
        match serde_json::from_value::<Topic>(raw) {
            Ok(mut topic) => {
                topic.group_id = group_id;
                topics.insert(topic.id, topic);
            }
            Err(err) => warn!("dropping unparseable topic entry: {err}"),
        }
    }
    Ok(topics)
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, NetworkError> {
    serde_json::from_value(body).map_err(|err| NetworkError::BadBody(err.to_string()))
}
