//! File-backed shared event store.
//!
//! One JSON file per record under `<store_dir>/pang_events/<id>.json`, so any
//! number of `pang` processes pointed at the same directory (a synced or
//! network folder) see each other's celebrations. Files are written to a
//! temp path and renamed into place. Subscribers get the existing records in
//! id order and then every new file, watched with `notify`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use uuid::Uuid;

use pang::{
    CelebrationEvent, CommitClock, Error, EventStore, NewEvent, Result, StoreNotification,
    Subscription, EVENTS_COLLECTION, HISTORY_LIMIT,
};

pub struct FileEventStore {
    dir: PathBuf,
    clock: Mutex<CommitClock>,
    // Paths appended by this process, fed straight to live subscriptions.
    local: Arc<Mutex<Vec<mpsc::UnboundedSender<PathBuf>>>>,
}

impl FileEventStore {
    pub fn open(store_dir: &Path) -> Result<Self> {
        let dir = store_dir.join(EVENTS_COLLECTION);
        fs::create_dir_all(&dir)?;
        let store = Self {
            dir,
            clock: Mutex::new(CommitClock::new()),
            local: Arc::new(Mutex::new(Vec::new())),
        };
        let latest = store.latest_timestamp()?;
        store.clock.lock().unwrap().observe(latest);
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn write_record(&self, id: &str, value: &serde_json::Value) -> std::io::Result<()> {
        let path = self.record_path(id);
        // Each writer gets its own temp file so concurrent rewrites of one
        // record never rename each other's half-written data.
        let temp_path = self
            .dir
            .join(format!("{}.{}.tmp", id, Uuid::new_v4().simple()));
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &path).inspect_err(|_| {
            let _ = fs::remove_file(&temp_path);
        })
    }

    /// Record keys in commit order.
    fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(key) = record_key(&path) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn latest_timestamp(&self) -> Result<u64> {
        Ok(self
            .keys()?
            .iter()
            .filter_map(|key| key.split('-').next()?.parse::<u64>().ok())
            .max()
            .unwrap_or(0))
    }

    pub fn get(&self, id: &str) -> Option<CelebrationEvent> {
        let notification = read_notification(&self.record_path(id))?;
        CelebrationEvent::from_record(&notification.key, notification.value.as_ref()).ok()
    }
}

fn record_key(path: &Path) -> Option<String> {
    if path.extension()? != "json" {
        return None;
    }
    Some(path.file_stem()?.to_str()?.to_string())
}

/// Read one record file. A file holding `null` reads as a tombstone.
fn read_notification(path: &Path) -> Option<StoreNotification> {
    let key = record_key(path)?;
    let content = fs::read_to_string(path).ok()?;
    let value = match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(serde_json::Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "unreadable record");
            Some(serde_json::Value::String(content))
        }
    };
    Some(StoreNotification { key, value })
}

#[async_trait]
impl EventStore for FileEventStore {
    async fn append(&self, event: NewEvent) -> Result<CelebrationEvent> {
        let latest = self.latest_timestamp()?;
        let (id, timestamp) = {
            let mut clock = self.clock.lock().unwrap();
            clock.observe(latest);
            clock.next()
        };
        let event = event.commit(id, timestamp);
        let value = serde_json::to_value(&event)?;
        self.write_record(&event.id, &value)
            .map_err(|e| Error::RemoteWriteFailed(e.to_string()))?;

        let path = self.record_path(&event.id);
        self.local
            .lock()
            .unwrap()
            .retain(|tx| tx.send(path.clone()).is_ok());
        Ok(event)
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let (path_tx, mut path_rx) = mpsc::unbounded_channel::<PathBuf>();

        // Watch before listing so nothing lands between the two unseen.
        let watch_tx = path_tx.clone();
        let on_event = move |res: std::result::Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    for path in event.paths {
                        let _ = watch_tx.send(path);
                    }
                }
            }
        };
        let mut watcher =
            notify::recommended_watcher(on_event).map_err(|e| Error::Storage(e.to_string()))?;
        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Storage(e.to_string()))?;

        self.local.lock().unwrap().push(path_tx);

        let backlog: Vec<PathBuf> = self
            .keys()?
            .iter()
            .map(|key| self.record_path(key))
            .collect();

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let _watcher = watcher;
            let mut seen = HashSet::new();
            let mut deliver = |path: &Path| -> bool {
                let Some(key) = record_key(path) else {
                    return true;
                };
                if seen.contains(&key) {
                    return true;
                }
                match read_notification(path) {
                    Some(notification) => {
                        // A file caught mid-write reads as empty or partial
                        // JSON; only a complete record closes the key.
                        if notification.value.as_ref().is_some_and(|v| v.is_object()) {
                            seen.insert(key);
                        }
                        tx.send(notification).is_ok()
                    }
                    None => true,
                }
            };

            for path in &backlog {
                if !deliver(path) {
                    return;
                }
            }
            while let Some(path) = path_rx.recv().await {
                if !deliver(&path) {
                    return;
                }
            }
        });
        Ok(rx)
    }

    async fn recent(&self, since: u64, limit: usize) -> Result<Vec<CelebrationEvent>> {
        let mut events: Vec<CelebrationEvent> = self
            .keys()?
            .iter()
            .filter_map(|key| read_notification(&self.record_path(key)))
            .filter_map(|n| CelebrationEvent::from_record(&n.key, n.value.as_ref()).ok())
            .filter(|event| event.timestamp >= since)
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(limit.min(HISTORY_LIMIT));
        Ok(events)
    }

    async fn clear_photo(&self, id: &str) -> Result<()> {
        let path = self.record_path(id);
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::RemoteWriteFailed(format!("{id}: {e}")))?;
        let mut value: serde_json::Value = serde_json::from_str(&content)?;
        match value.as_object_mut() {
            Some(fields) => {
                fields.insert("photoPayload".to_string(), serde_json::Value::Null);
            }
            None => return Err(Error::MalformedEvent(format!("{id}: not an object"))),
        }
        self.write_record(id, &value)
            .map_err(|e| Error::RemoteWriteFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pang::PhotoPayload;
    use std::io::Write;
    use std::sync::Barrier;
    use std::time::Duration;
    use tempfile::TempDir;

    fn draft(text: &str) -> NewEvent {
        NewEvent {
            text: text.to_string(),
            sender: "Mina(mkim)".to_string(),
            is_anonymous: false,
            emoji_sequence: vec!["🎉".to_string(), "🎉".to_string()],
            combo_count: 2,
            photo_payload: None,
        }
    }

    #[tokio::test]
    async fn test_append_writes_one_file_per_record() {
        let temp = TempDir::new().unwrap();
        let store = FileEventStore::open(temp.path()).unwrap();

        let a = store.append(draft("a")).await.unwrap();
        let b = store.append(draft("b")).await.unwrap();
        assert!(b.timestamp > a.timestamp);
        assert!(b.id > a.id);
        assert!(temp
            .path()
            .join(EVENTS_COLLECTION)
            .join(format!("{}.json", a.id))
            .exists());
        assert_eq!(store.get(&b.id).unwrap(), b);
    }

    #[tokio::test]
    async fn test_reopened_store_keeps_ids_increasing() {
        let temp = TempDir::new().unwrap();
        let first = FileEventStore::open(temp.path())
            .unwrap()
            .append(draft("a"))
            .await
            .unwrap();
        let second = FileEventStore::open(temp.path())
            .unwrap()
            .append(draft("b"))
            .await
            .unwrap();
        assert!(second.timestamp > first.timestamp);
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_recent_skips_malformed_and_caps() {
        let temp = TempDir::new().unwrap();
        let store = FileEventStore::open(temp.path()).unwrap();
        store.append(draft("old")).await.unwrap();
        let newest = store.append(draft("new")).await.unwrap();
        fs::write(store.dir().join("garbage.json"), "{ not json").unwrap();
        fs::write(store.dir().join("tombstone.json"), "null").unwrap();

        let recent = store.recent(0, 500).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, newest.id);

        let since_newest = store.recent(newest.timestamp, 10).await.unwrap();
        assert_eq!(since_newest.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_photo_keeps_other_fields() {
        let temp = TempDir::new().unwrap();
        let store = FileEventStore::open(temp.path()).unwrap();
        let mut new = draft("pic");
        new.photo_payload = Some(PhotoPayload::new(vec![1, 2, 3]));
        let event = store.append(new).await.unwrap();

        store.clear_photo(&event.id).await.unwrap();
        let after = store.get(&event.id).unwrap();
        assert!(after.photo_payload.is_none());
        assert_eq!(after.text, event.text);
        assert_eq!(after.timestamp, event.timestamp);
        assert_eq!(after.emoji_sequence, event.emoji_sequence);

        assert!(matches!(
            store.clear_photo("missing").await,
            Err(Error::RemoteWriteFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_replays_then_streams_without_duplicates() {
        let temp = TempDir::new().unwrap();
        let store = FileEventStore::open(temp.path()).unwrap();
        let old = store.append(draft("old")).await.unwrap();

        let mut sub = store.subscribe().await.unwrap();
        let new = store.append(draft("new")).await.unwrap();
        store.clear_photo(&new.id).await.unwrap();

        let first = sub.recv().await.unwrap();
        assert_eq!(first.key, old.id);
        let second = sub.recv().await.unwrap();
        assert_eq!(second.key, new.id);

        let extra = tokio::time::timeout(Duration::from_millis(300), sub.recv()).await;
        assert!(extra.is_err(), "rewrites must not be re-announced");
    }

    #[tokio::test]
    async fn test_record_written_in_place_is_delivered_once_complete() {
        let temp = TempDir::new().unwrap();
        let store = FileEventStore::open(temp.path()).unwrap();
        let mut sub = store.subscribe().await.unwrap();

        // A sync tool that creates the file first and fills it later.
        let path = store.dir().join("9999999999999-inplace.json");
        let mut file = fs::File::create(&path).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let record = serde_json::json!({
            "text": "hi",
            "sender": "Mina(mkim)",
            "isAnonymous": false,
            "timestamp": 9_999_999_999_999u64,
            "emojiSequence": ["🎉"],
            "comboCount": 1,
        });
        file.write_all(record.to_string().as_bytes()).unwrap();
        file.sync_all().unwrap();
        drop(file);

        let complete = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notification = sub.recv().await.unwrap();
                if notification.value.as_ref().is_some_and(|v| v.is_object()) {
                    return notification;
                }
            }
        })
        .await
        .expect("complete record never delivered");
        assert_eq!(complete.key, "9999999999999-inplace");
        let event = CelebrationEvent::from_record(&complete.key, complete.value.as_ref()).unwrap();
        assert_eq!(event.text, "hi");
    }

    #[test]
    fn test_concurrent_photo_scrubs_all_succeed() {
        let temp = TempDir::new().unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let seed = FileEventStore::open(temp.path()).unwrap();
        let mut ids = Vec::new();
        for i in 0..20 {
            let mut new = draft(&format!("pic{i}"));
            new.photo_payload = Some(PhotoPayload::new(vec![7; 64]));
            ids.push(runtime.block_on(seed.append(new)).unwrap().id);
        }

        let listeners = 6;
        let barrier = Arc::new(Barrier::new(listeners));
        let handles: Vec<_> = (0..listeners)
            .map(|_| {
                let root = temp.path().to_path_buf();
                let ids = ids.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .build()
                        .unwrap();
                    let store = FileEventStore::open(&root).unwrap();
                    barrier.wait();
                    ids.iter()
                        .filter(|id| runtime.block_on(store.clear_photo(id)).is_err())
                        .count()
                })
            })
            .collect();
        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(failures, 0);

        for id in &ids {
            let event = seed.get(id).unwrap();
            assert!(event.photo_payload.is_none());
        }
        let leftovers = fs::read_dir(seed.dir())
            .unwrap()
            .filter(|entry| {
                let path = entry.as_ref().unwrap().path();
                path.extension().is_some_and(|ext| ext == "tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_absurd_record_timestamp_does_not_break_appends() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(EVENTS_COLLECTION);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}-x.json", u64::MAX)), "null").unwrap();

        let store = FileEventStore::open(temp.path()).unwrap();
        let event = store.append(draft("still works")).await.unwrap();
        assert_eq!(event.timestamp, u64::MAX);
        assert_eq!(store.get(&event.id).unwrap().text, "still works");
    }
}
