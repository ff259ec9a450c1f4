//! Filters the shared event stream into local celebration triggers.
//!
//! Only events committed after the gate was set up are forwarded, so a cold
//! start never replays the backlog. Muting suppresses forwarding but every
//! well-formed event still lands in the display history.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::history::window_start;
use crate::transport::fire;
use crate::{
    now_millis, CelebrationEvent, EventStore, History, Result, StoreNotification, Subscription,
    SurfaceMessage, TriggerSink,
};

/// Process-wide do-not-disturb switch.
#[derive(Debug, Clone, Default)]
pub struct MuteState(Arc<AtomicBool>);

impl MuteState {
    pub fn new(muted: bool) -> Self {
        Self(Arc::new(AtomicBool::new(muted)))
    }

    pub fn is_muted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, muted: bool) {
        self.0.store(muted, Ordering::SeqCst);
    }

    /// Flip the state and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Forwarded,
    /// Committed before the gate started.
    Historical,
    Muted,
    Malformed,
    /// Forwarded, but no surface was listening.
    Dropped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub forwarded: usize,
    pub historical: usize,
    pub muted: usize,
    pub malformed: usize,
    pub dropped: usize,
}

impl GateStats {
    fn record(&mut self, decision: GateDecision) {
        match decision {
            GateDecision::Forwarded => self.forwarded += 1,
            GateDecision::Historical => self.historical += 1,
            GateDecision::Muted => self.muted += 1,
            GateDecision::Malformed => self.malformed += 1,
            GateDecision::Dropped => self.dropped += 1,
        }
    }
}

pub struct FanoutGate {
    process_start: u64,
    mute: MuteState,
    transport: Arc<dyn TriggerSink>,
    history: Option<Arc<Mutex<History>>>,
}

impl FanoutGate {
    pub fn new(process_start: u64, mute: MuteState, transport: Arc<dyn TriggerSink>) -> Self {
        Self {
            process_start,
            mute,
            transport,
            history: None,
        }
    }

    pub fn with_history(mut self, history: Arc<Mutex<History>>) -> Self {
        self.history = Some(history);
        self
    }

    /// Capture the start time, then subscribe. The start time is taken
    /// before the subscription exists so no callback can precede it.
    pub async fn subscribe(
        store: &dyn EventStore,
        mute: MuteState,
        transport: Arc<dyn TriggerSink>,
    ) -> Result<(Self, Subscription)> {
        let process_start = now_millis();
        let subscription = store.subscribe().await?;
        Ok((Self::new(process_start, mute, transport), subscription))
    }

    pub fn handle(&self, notification: StoreNotification) -> GateDecision {
        let event = match CelebrationEvent::from_record(
            &notification.key,
            notification.value.as_ref(),
        ) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(key = %notification.key, error = %e, "dropping malformed record");
                return GateDecision::Malformed;
            }
        };

        if let Some(history) = &self.history {
            let since = window_start(&chrono::Local::now());
            let mut history = history.lock().unwrap();
            // The window rolls forward at local midnight in long sessions.
            history.expire(since);
            history.insert(event.clone(), since);
        }

        if event.timestamp <= self.process_start {
            return GateDecision::Historical;
        }
        if self.mute.is_muted() {
            tracing::debug!(event_id = %event.id, "muted, not forwarding");
            return GateDecision::Muted;
        }

        let event_id = event.id.clone();
        if fire(self.transport.as_ref(), SurfaceMessage::NewEvent(event)) {
            tracing::info!(event_id = %event_id, "celebration forwarded");
            GateDecision::Forwarded
        } else {
            GateDecision::Dropped
        }
    }

    /// Drain the subscription until the store closes it.
    pub async fn run(self, mut subscription: Subscription) -> GateStats {
        let mut stats = GateStats::default();
        while let Some(notification) = subscription.recv().await {
            stats.record(self.handle(notification));
        }
        stats
    }

    pub fn spawn(self, subscription: Subscription) -> tokio::task::JoinHandle<GateStats> {
        tokio::spawn(self.run(subscription))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelTransport, InMemoryEventStore, NewEvent, PhotoPayload};
    use serde_json::json;

    fn record(timestamp: u64) -> Option<serde_json::Value> {
        Some(json!({
            "text": "yay",
            "sender": "s",
            "isAnonymous": false,
            "timestamp": timestamp,
        }))
    }

    fn notification(key: &str, value: Option<serde_json::Value>) -> StoreNotification {
        StoreNotification {
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn forwards_only_events_after_start() {
        let (transport, mut rx) = ChannelTransport::channel();
        let gate = FanoutGate::new(1_000, MuteState::default(), Arc::new(transport));

        assert_eq!(gate.handle(notification("a", record(999))), GateDecision::Historical);
        assert_eq!(gate.handle(notification("b", record(1_000))), GateDecision::Historical);
        assert_eq!(gate.handle(notification("c", record(1_001))), GateDecision::Forwarded);

        match rx.try_recv().unwrap() {
            SurfaceMessage::NewEvent(event) => assert_eq!(event.id, "c"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn mute_suppresses_but_history_still_records() {
        let (transport, mut rx) = ChannelTransport::channel();
        let history = Arc::new(Mutex::new(History::new()));
        let mute = MuteState::new(true);
        let gate =
            FanoutGate::new(0, mute.clone(), Arc::new(transport)).with_history(history.clone());

        let now = now_millis();
        assert_eq!(gate.handle(notification("a", record(now))), GateDecision::Muted);
        assert!(rx.try_recv().is_err());
        assert_eq!(history.lock().unwrap().len(), 1);

        assert!(!mute.toggle());
        assert_eq!(gate.handle(notification("b", record(now))), GateDecision::Forwarded);
    }

    #[test]
    fn history_drops_entries_that_left_the_window() {
        let (transport, _rx) = ChannelTransport::channel();
        let history = Arc::new(Mutex::new(History::new()));
        let gate = FanoutGate::new(u64::MAX, MuteState::default(), Arc::new(transport))
            .with_history(history.clone());

        let since = window_start(&chrono::Local::now());
        // Recorded by an earlier window, now stale.
        let stale = CelebrationEvent::from_record("stale", record(since - 1).as_ref()).unwrap();
        history.lock().unwrap().backfill(vec![stale], 0);
        assert_eq!(history.lock().unwrap().len(), 1);

        assert_eq!(
            gate.handle(notification("fresh", record(now_millis()))),
            GateDecision::Historical
        );
        let history = history.lock().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].id, "fresh");
    }

    #[test]
    fn malformed_records_never_reach_transport() {
        let (transport, mut rx) = ChannelTransport::channel();
        let gate = FanoutGate::new(0, MuteState::default(), Arc::new(transport));

        assert_eq!(gate.handle(notification("t", None)), GateDecision::Malformed);
        assert_eq!(
            gate.handle(notification("n", Some(serde_json::Value::Null))),
            GateDecision::Malformed
        );
        assert_eq!(
            gate.handle(notification("x", Some(json!({ "sender": 4 })))),
            GateDecision::Malformed
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn missing_surface_is_a_silent_drop() {
        let (transport, rx) = ChannelTransport::channel();
        drop(rx);
        let gate = FanoutGate::new(0, MuteState::default(), Arc::new(transport));
        assert_eq!(gate.handle(notification("a", record(5))), GateDecision::Dropped);
    }

    #[tokio::test]
    async fn cold_start_skips_backlog_and_forwards_new_appends() {
        let store = InMemoryEventStore::new();
        let draft = || NewEvent {
            text: "hello".to_string(),
            sender: "s".to_string(),
            is_anonymous: false,
            emoji_sequence: vec![],
            combo_count: 0,
            photo_payload: Some(PhotoPayload::new(vec![7])),
        };
        store.append(draft()).await.unwrap();
        store.push_raw("tombstone", None);

        let (transport, mut rx) = ChannelTransport::channel();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let (gate, subscription) =
            FanoutGate::subscribe(&store, MuteState::default(), Arc::new(transport))
                .await
                .unwrap();
        let task = gate.spawn(subscription);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;

        let fresh = store.append(draft()).await.unwrap();
        match rx.recv().await.unwrap() {
            SurfaceMessage::NewEvent(event) => assert_eq!(event.id, fresh.id),
            other => panic!("unexpected {other:?}"),
        }
        task.abort();
    }
}
