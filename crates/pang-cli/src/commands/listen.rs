use anyhow::Result;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use pang::{
    fire, CelebrationSurface, ChannelTransport, EventStore, FanoutGate, History, MuteState,
    Notification, NotificationSink, SurfaceMessage,
};

use crate::output::Output;

/// Control lines accepted on stdin while listening
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Mute,
    Unmute,
    ToggleMute,
    Dismiss,
}

impl Control {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "mute" => Some(Control::Mute),
            "unmute" => Some(Control::Unmute),
            "toggle" => Some(Control::ToggleMute),
            "dismiss" | "d" => Some(Control::Dismiss),
            _ => None,
        }
    }
}

/// Notifications printed as stream events
struct PrintedNotifications {
    output: Output,
}

impl NotificationSink for PrintedNotifications {
    fn show(&self, id: &str, notification: &Notification) {
        self.output.event(
            "notification",
            serde_json::json!({
                "id": id,
                "title": notification.title,
                "body": notification.body,
            }),
        );
    }

    fn close(&self, id: &str) {
        self.output
            .event("notification_closed", serde_json::json!({ "id": id }));
    }
}

/// Visible surface state, reported whenever it changes
#[derive(Debug, Clone, PartialEq, Serialize)]
struct SurfaceState {
    live_batches: usize,
    live_particles: usize,
    photo: Option<String>,
    photo_visible: bool,
    flash: bool,
    shake: bool,
}

impl SurfaceState {
    fn read(surface: &CelebrationSurface) -> Self {
        let resident = surface.photo().resident();
        Self {
            live_batches: surface.engine().live_count(),
            live_particles: surface.engine().live_particles(),
            photo_visible: resident.as_ref().map(|r| r.visible).unwrap_or(false),
            photo: resident.map(|r| r.event_id),
            flash: surface.engine().effects().is_flashing(),
            shake: surface.engine().effects().is_shaking(),
        }
    }
}

/// Run the fan-out gate and the celebration surface until Ctrl+C
pub async fn listen(muted: bool, store: Arc<dyn EventStore>, output: &Output) -> Result<()> {
    let mute = MuteState::new(muted);
    let history = Arc::new(Mutex::new(History::new()));

    let (transport, mut surface_rx) = ChannelTransport::channel();
    let dismiss = transport.clone();
    let (gate, subscription) =
        FanoutGate::subscribe(store.as_ref(), mute.clone(), Arc::new(transport)).await?;
    let gate_task = gate.with_history(history.clone()).spawn(subscription);

    let mut surface = CelebrationSurface::new(
        store.clone(),
        Arc::new(PrintedNotifications { output: *output }),
    );

    output.success_message(
        "listen",
        &format!(
            "Listening for celebrations{}... (type mute, unmute or dismiss; Ctrl+C to stop)",
            if muted { " (muted)" } else { "" }
        ),
    );

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut tick = tokio::time::interval(Duration::from_millis(250));
    let mut last_state = SurfaceState::read(&surface);

    loop {
        tokio::select! {
            message = surface_rx.recv() => {
                let Some(message) = message else { break };
                let update = surface.handle(message);
                output.event("surface", serde_json::to_value(&update)?);
            }
            line = stdin.next_line(), if stdin_open => {
                match line? {
                    Some(line) => match Control::parse(&line) {
                        Some(Control::Mute) => {
                            mute.set(true);
                            output.status("muted", "Celebrations muted");
                        }
                        Some(Control::Unmute) => {
                            mute.set(false);
                            output.status("unmuted", "Celebrations unmuted");
                        }
                        Some(Control::ToggleMute) => {
                            if mute.toggle() {
                                output.status("muted", "Celebrations muted");
                            } else {
                                output.status("unmuted", "Celebrations unmuted");
                            }
                        }
                        Some(Control::Dismiss) => {
                            fire(&dismiss, SurfaceMessage::Dismiss);
                        }
                        None if line.trim().is_empty() => {}
                        None => {
                            let message = format!("Unknown command: {}", line.trim());
                            output.status("unknown", &message);
                        }
                    },
                    None => stdin_open = false,
                }
            }
            _ = tick.tick() => {
                let state = SurfaceState::read(&surface);
                if state != last_state {
                    output.event("state", &state);
                    last_state = state;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    gate_task.abort();
    surface.close().await;
    let seen = history.lock().unwrap().len();
    output.event("stopped", serde_json::json!({ "seen": seen }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pang::{CelebrationEvent, InMemoryEventStore, PhotoPayload};

    #[test]
    fn test_control_parse() {
        assert_eq!(Control::parse("mute"), Some(Control::Mute));
        assert_eq!(Control::parse("  UNMUTE \n"), Some(Control::Unmute));
        assert_eq!(Control::parse("toggle"), Some(Control::ToggleMute));
        assert_eq!(Control::parse("d"), Some(Control::Dismiss));
        assert_eq!(Control::parse("dance"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_state_tracks_photo_and_batches() {
        let store = Arc::new(InMemoryEventStore::new());
        let mut surface = CelebrationSurface::new(
            store,
            Arc::new(PrintedNotifications {
                output: Output::new(true),
            }),
        );
        let idle = SurfaceState::read(&surface);
        assert_eq!(idle.live_batches, 0);
        assert!(idle.photo.is_none());

        surface.handle(SurfaceMessage::NewEvent(CelebrationEvent {
            id: "e1".to_string(),
            text: "hi".to_string(),
            sender: "s".to_string(),
            is_anonymous: false,
            timestamp: 1,
            emoji_sequence: vec!["🔥".to_string(); 5],
            combo_count: 5,
            photo_payload: Some(PhotoPayload::new(vec![1])),
        }));
        let busy = SurfaceState::read(&surface);
        assert_eq!(busy.live_batches, 1);
        assert_eq!(busy.live_particles, 100);
        assert_eq!(busy.photo.as_deref(), Some("e1"));
        assert!(busy.photo_visible);
        assert!(busy.flash && busy.shake);
    }
}
