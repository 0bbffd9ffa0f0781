//! Topic-based pub/sub engine (§4.F): subscription indices, per-client
//! bounded outbound queues with drop-oldest backpressure, and publish
//! fan-out with per-subscription filter evaluation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::sync::{Notify, RwLock};

pub type ClientId = String;
pub type Filter = HashMap<String, Value>;

#[derive(Debug, Clone)]
pub struct Event {
    pub topic: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// The payload as sent over the wire (§6): the publisher's payload with
    /// `timestamp` merged in if not already present. Most publishers already
    /// stamp their own `timestamp` key; this guarantees the field for the
    /// ones that don't without making every call site responsible for it.
    pub fn payload_with_timestamp(&self) -> Value {
        let mut payload = self.payload.clone();
        if let Value::Object(map) = &mut payload {
            map.entry("timestamp").or_insert_with(|| Value::String(self.timestamp.to_rfc3339()));
        }
        payload
    }
}

/// A bounded FIFO that drops the oldest entry on overflow rather than
/// blocking the publisher. `tokio::sync::mpsc` has no drop-oldest mode, so
/// this is a small purpose-built primitive rather than a channel wrapper --
/// the publisher must never suspend on a slow client (§4.F publisher
/// contract).
struct DropOldestQueue {
    inner: StdMutex<VecDeque<Event>>,
    capacity: usize,
    notify: Notify,
    closed: AtomicBool,
}

impl DropOldestQueue {
    fn new(capacity: usize) -> Self {
        Self {
            inner: StdMutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns `true` if an existing entry was dropped to make room.
    fn push(&self, event: Event) -> bool {
        let mut dropped = false;
        {
            let mut queue = self.inner.lock().expect("event queue mutex poisoned");
            if queue.len() >= self.capacity {
                queue.pop_front();
                dropped = true;
            }
            queue.push_back(event);
        }
        self.notify.notify_one();
        dropped
    }

    async fn recv(&self) -> Option<Event> {
        loop {
            {
                let mut queue = self.inner.lock().expect("event queue mutex poisoned");
                if let Some(event) = queue.pop_front() {
                    return Some(event);
                }
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

/// Handle returned to a connection's write pump to drain its queue.
pub struct ClientEventReceiver {
    queue: std::sync::Arc<DropOldestQueue>,
}

impl ClientEventReceiver {
    pub async fn recv(&self) -> Option<Event> {
        self.queue.recv().await
    }
}

#[derive(Default)]
struct SubscriptionState {
    /// topic -> subscribed client ids
    topic_subscribers: HashMap<String, HashSet<ClientId>>,
    /// client id -> (topic -> optional filter)
    client_topics: HashMap<ClientId, HashMap<String, Option<Filter>>>,
}

pub struct EventManager {
    state: RwLock<SubscriptionState>,
    queues: RwLock<HashMap<ClientId, std::sync::Arc<DropOldestQueue>>>,
    queue_capacity: usize,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SubscriptionStats {
    pub topics: HashMap<String, u64>,
    pub total_subscriptions: u64,
}

impl EventManager {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            state: RwLock::new(SubscriptionState::default()),
            queues: RwLock::new(HashMap::new()),
            queue_capacity,
        }
    }

    /// Register a client's outbound queue. Must be called once, at connect
    /// time, before any subscribe calls for that client.
    pub async fn register_client(&self, client_id: &ClientId) -> ClientEventReceiver {
        let queue = std::sync::Arc::new(DropOldestQueue::new(self.queue_capacity));
        self.queues.write().await.insert(client_id.clone(), queue.clone());
        ClientEventReceiver { queue }
    }

    /// `topics` empty subscribes to nothing; each topic string is accepted
    /// even if outside the closed enum set (forward compatibility, §4.F).
    pub async fn subscribe(&self, client_id: &ClientId, topics: &[String], filter: Option<Filter>) {
        let mut state = self.state.write().await;
        for topic in topics {
            state
                .topic_subscribers
                .entry(topic.clone())
                .or_default()
                .insert(client_id.clone());
            state
                .client_topics
                .entry(client_id.clone())
                .or_default()
                .insert(topic.clone(), filter.clone());
        }
    }

    /// `topics` empty removes every subscription for the client.
    pub async fn unsubscribe(&self, client_id: &ClientId, topics: &[String]) -> Vec<String> {
        let mut state = self.state.write().await;
        let to_remove: Vec<String> = if topics.is_empty() {
            state
                .client_topics
                .get(client_id)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default()
        } else {
            topics.to_vec()
        };

        for topic in &to_remove {
            if let Some(subs) = state.topic_subscribers.get_mut(topic) {
                subs.remove(client_id);
            }
            if let Some(client_map) = state.client_topics.get_mut(client_id) {
                client_map.remove(topic);
            }
        }
        to_remove
    }

    /// Drops every subscription and queue owned by `client_id`; called on
    /// disconnect so the registry invariant "a subscription exists iff its
    /// client record exists" holds before the next publish cycle.
    pub async fn remove_client(&self, client_id: &ClientId) {
        let mut state = self.state.write().await;
        if let Some(topics) = state.client_topics.remove(client_id) {
            for topic in topics.keys() {
                if let Some(subs) = state.topic_subscribers.get_mut(topic) {
                    subs.remove(client_id);
                }
            }
        }
        drop(state);
        if let Some(queue) = self.queues.write().await.remove(client_id) {
            queue.close();
        }
    }

    /// Enqueue-or-drop to every matching subscriber. Never blocks on a slow
    /// client's queue; returns the number of clients that had an event
    /// dropped to make room, for metrics.
    pub async fn publish(&self, topic: &str, payload: Value) -> (u64, u64) {
        let event = Event {
            topic: topic.to_owned(),
            payload: payload.clone(),
            timestamp: Utc::now(),
        };

        let subscribers: Vec<(ClientId, Option<Filter>)> = {
            let state = self.state.read().await;
            let Some(client_ids) = state.topic_subscribers.get(topic) else {
                return (0, 0);
            };
            client_ids
                .iter()
                .map(|id| {
                    let filter = state
                        .client_topics
                        .get(id)
                        .and_then(|m| m.get(topic))
                        .cloned()
                        .flatten();
                    (id.clone(), filter)
                })
                .collect()
        };

        let queues = self.queues.read().await;
        let mut delivered = 0u64;
        let mut dropped = 0u64;
        for (client_id, filter) in subscribers {
            if !matches_filter(&filter, &payload) {
                continue;
            }
            if let Some(queue) = queues.get(&client_id) {
                if queue.push(event.clone()) {
                    dropped += 1;
                }
                delivered += 1;
            }
        }
        (delivered, dropped)
    }

    pub async fn subscription_stats(&self) -> SubscriptionStats {
        let state = self.state.read().await;
        let topics: HashMap<String, u64> = state
            .topic_subscribers
            .iter()
            .map(|(topic, subs)| (topic.clone(), subs.len() as u64))
            .collect();
        let total_subscriptions = topics.values().sum();
        SubscriptionStats {
            topics,
            total_subscriptions,
        }
    }

    pub async fn client_subscriptions(&self, client_id: &ClientId) -> Vec<String> {
        self.state
            .read()
            .await
            .client_topics
            .get(client_id)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// A subscription with no filter always matches. A filter matches iff every
/// key is present in the payload with an equal value -- no wildcards, a
/// missing key is never a match (§4.F).
fn matches_filter(filter: &Option<Filter>, payload: &Value) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let Some(object) = payload.as_object() else {
        return filter.is_empty();
    };
    filter
        .iter()
        .all(|(key, expected)| object.get(key).is_some_and(|actual| actual == expected))
}
