use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{now_millis, CelebrationEvent, Error, NewEvent, Result, HISTORY_LIMIT};

/// A "child added" notification from the shared collection. `value` is the
/// raw stored record and may be absent or malformed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreNotification {
    pub key: String,
    pub value: Option<serde_json::Value>,
}

impl StoreNotification {
    pub fn for_event(event: &CelebrationEvent) -> Result<Self> {
        Ok(Self {
            key: event.id.clone(),
            value: Some(serde_json::to_value(event)?),
        })
    }
}

pub type Subscription = mpsc::UnboundedReceiver<StoreNotification>;

/// Remote append-only event collection.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Commit a new event. The store assigns `id` and `timestamp`; both are
    /// strictly increasing in commit order.
    async fn append(&self, event: NewEvent) -> Result<CelebrationEvent>;

    /// Child-added stream: every existing record in commit order, then every
    /// new append.
    async fn subscribe(&self) -> Result<Subscription>;

    /// Records with `timestamp >= since`, newest first, at most `limit`
    /// (never more than 100).
    async fn recent(&self, since: u64, limit: usize) -> Result<Vec<CelebrationEvent>>;

    /// Null out the photo field of one record, leaving everything else intact.
    async fn clear_photo(&self, id: &str) -> Result<()>;
}

/// Monotonic `(id, timestamp)` assignment shared by store implementations.
#[derive(Debug, Default)]
pub struct CommitClock {
    last_timestamp: u64,
}

impl CommitClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a record committed elsewhere.
    pub fn observe(&mut self, timestamp: u64) {
        self.last_timestamp = self.last_timestamp.max(timestamp);
    }

    pub fn next(&mut self) -> (String, u64) {
        let timestamp = now_millis().max(self.last_timestamp.saturating_add(1));
        self.last_timestamp = timestamp;
        let id = format!("{:013}-{}", timestamp, &uuid::Uuid::new_v4().simple().to_string()[..8]);
        (id, timestamp)
    }
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, serde_json::Value>,
    clock: CommitClock,
    subscribers: Vec<mpsc::UnboundedSender<StoreNotification>>,
    offline: bool,
}

impl Inner {
    fn broadcast(&mut self, notification: StoreNotification) {
        self.subscribers
            .retain(|tx| tx.send(notification.clone()).is_ok());
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes fail with `RemoteWriteFailed` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    /// Insert a raw record under `key` as if another client wrote it.
    /// A `None` value is delivered to subscribers as a tombstone.
    pub fn push_raw(&self, key: &str, value: Option<serde_json::Value>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(value) = &value {
            inner.records.insert(key.to_string(), value.clone());
        }
        inner.broadcast(StoreNotification {
            key: key.to_string(),
            value,
        });
    }

    pub fn get(&self, id: &str) -> Option<CelebrationEvent> {
        let inner = self.inner.lock().unwrap();
        let value = inner.records.get(id)?;
        CelebrationEvent::from_record(id, Some(value)).ok()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: NewEvent) -> Result<CelebrationEvent> {
        let mut inner = self.inner.lock().unwrap();
        if inner.offline {
            return Err(Error::RemoteWriteFailed("store unreachable".to_string()));
        }
        let (id, timestamp) = inner.clock.next();
        let event = event.commit(id, timestamp);
        let notification = StoreNotification::for_event(&event)?;
        if let Some(value) = &notification.value {
            inner.records.insert(event.id.clone(), value.clone());
        }
        inner.broadcast(notification);
        Ok(event)
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        for (key, value) in &inner.records {
            let _ = tx.send(StoreNotification {
                key: key.clone(),
                value: Some(value.clone()),
            });
        }
        inner.subscribers.push(tx);
        Ok(rx)
    }

    async fn recent(&self, since: u64, limit: usize) -> Result<Vec<CelebrationEvent>> {
        let inner = self.inner.lock().unwrap();
        let mut events: Vec<CelebrationEvent> = inner
            .records
            .iter()
            .filter_map(|(key, value)| CelebrationEvent::from_record(key, Some(value)).ok())
            .filter(|event| event.timestamp >= since)
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(limit.min(HISTORY_LIMIT));
        Ok(events)
    }

    async fn clear_photo(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.offline {
            return Err(Error::RemoteWriteFailed("store unreachable".to_string()));
        }
        let record = inner
            .records
            .get_mut(id)
            .ok_or_else(|| Error::RemoteWriteFailed(format!("no record {id}")))?;
        if let Some(fields) = record.as_object_mut() {
            fields.insert("photoPayload".to_string(), serde_json::Value::Null);
        }
        Ok(())
    }
}
