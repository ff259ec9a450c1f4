use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::{CelebrationEvent, Deferred, NOTIFICATION_DISMISS_MS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn for_event(event: &CelebrationEvent) -> Self {
        let title = if event.is_anonymous {
            "🧚 [Pang] Anonymous news".to_string()
        } else {
            format!("📣 [Pang] News from {}!", event.sender)
        };
        Self {
            title,
            body: event.text.clone(),
        }
    }
}

/// Native notification surface. Must accept calls while its window is hidden.
pub trait NotificationSink: Send + Sync {
    fn show(&self, id: &str, notification: &Notification);
    fn close(&self, id: &str);
}

/// Shows one notification per event and closes each after a fixed delay.
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    dismiss_after: Duration,
    open: HashMap<String, Deferred>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_dismiss_after(sink, Duration::from_millis(NOTIFICATION_DISMISS_MS))
    }

    pub fn with_dismiss_after(sink: Arc<dyn NotificationSink>, dismiss_after: Duration) -> Self {
        Self {
            sink,
            dismiss_after,
            open: HashMap::new(),
        }
    }

    pub fn notify(&mut self, event: &CelebrationEvent) {
        self.open.retain(|_, close| close.is_pending());

        let notification = Notification::for_event(event);
        self.sink.show(&event.id, &notification);

        let sink = self.sink.clone();
        let id = event.id.clone();
        self.open
            .entry(event.id.clone())
            .or_default()
            .arm(format!("notification:{id}"), self.dismiss_after, async move {
                sink.close(&id);
            });
    }

    /// Close every notification still on screen.
    pub fn close_all(&mut self) {
        for (id, mut close) in self.open.drain() {
            if close.cancel() {
                self.sink.close(&id);
            }
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.values().filter(|close| close.is_pending()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
    }

    impl NotificationSink for RecordingSink {
        fn show(&self, id: &str, notification: &Notification) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("show {id} {}", notification.title));
        }

        fn close(&self, id: &str) {
            self.calls.lock().unwrap().push(format!("close {id}"));
        }
    }

    fn event(id: &str, anonymous: bool) -> CelebrationEvent {
        CelebrationEvent {
            id: id.to_string(),
            text: "we won".to_string(),
            sender: if anonymous {
                crate::ANONYMOUS_SENDER.to_string()
            } else {
                "Mina(mkim)".to_string()
            },
            is_anonymous: anonymous,
            timestamp: 1,
            emoji_sequence: vec![],
            combo_count: 0,
            photo_payload: None,
        }
    }

    #[test]
    fn titles_depend_on_anonymity() {
        let named = Notification::for_event(&event("a", false));
        assert_eq!(named.title, "📣 [Pang] News from Mina(mkim)!");
        assert_eq!(named.body, "we won");

        let anonymous = Notification::for_event(&event("b", true));
        assert_eq!(anonymous.title, "🧚 [Pang] Anonymous news");
    }

    #[tokio::test(start_paused = true)]
    async fn closes_after_delay() {
        let sink = Arc::new(RecordingSink::default());
        let mut notifier = Notifier::new(sink.clone());
        notifier.notify(&event("a", false));
        assert_eq!(notifier.open_count(), 1);

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        assert_eq!(sink.calls.lock().unwrap().len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(
            *sink.calls.lock().unwrap(),
            vec!["show a 📣 [Pang] News from Mina(mkim)!".to_string(), "close a".to_string()]
        );
        assert_eq!(notifier.open_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn close_all_dismisses_open_notifications_once() {
        let sink = Arc::new(RecordingSink::default());
        let mut notifier = Notifier::new(sink.clone());
        notifier.notify(&event("a", false));
        notifier.notify(&event("b", true));

        notifier.close_all();
        tokio::time::sleep(Duration::from_millis(10_000)).await;

        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|c| c.starts_with("close")).count(), 2);
    }
}
