//! Single-occupancy holder for the photo attached to the latest celebration.
//!
//! Two timelines start on every attach. Locally the photo is visible for
//! 7000 ms, fades for 500 ms and is then released. Remotely, 5000 ms after
//! attach, the record's photo field is cleared in the shared store. A new
//! attach cancels whatever the previous photo still had pending.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{
    Deferred, EventStore, PhotoPayload, PHOTO_FADE_MS, PHOTO_SCRUB_MS, PHOTO_VISIBLE_MS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ResidentPhoto {
    pub event_id: String,
    pub payload: PhotoPayload,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotoTimeline {
    pub visible: Duration,
    pub fade: Duration,
    pub scrub: Duration,
}

impl Default for PhotoTimeline {
    fn default() -> Self {
        Self {
            visible: Duration::from_millis(PHOTO_VISIBLE_MS),
            fade: Duration::from_millis(PHOTO_FADE_MS),
            scrub: Duration::from_millis(PHOTO_SCRUB_MS),
        }
    }
}

#[derive(Debug, Default)]
struct SlotState {
    resident: Option<ResidentPhoto>,
    // Bumped on every attach so a superseded timeline never touches a newer photo.
    generation: u64,
}

pub struct PhotoSlot {
    state: Arc<Mutex<SlotState>>,
    hide: Deferred,
    scrub: Deferred,
    scrub_target: Option<String>,
    store: Arc<dyn EventStore>,
    timeline: PhotoTimeline,
    scrubs_failed: Arc<AtomicUsize>,
}

impl PhotoSlot {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self::with_timeline(store, PhotoTimeline::default())
    }

    pub fn with_timeline(store: Arc<dyn EventStore>, timeline: PhotoTimeline) -> Self {
        Self {
            state: Arc::new(Mutex::new(SlotState::default())),
            hide: Deferred::new(),
            scrub: Deferred::new(),
            scrub_target: None,
            store,
            timeline,
            scrubs_failed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Show `payload` now, replacing any resident photo and its pending timers.
    pub fn attach(&mut self, event_id: &str, payload: PhotoPayload) {
        let hide_cancelled = self.hide.cancel();
        let scrub_cancelled = self.scrub.cancel();

        let generation = {
            let mut state = self.state.lock().unwrap();
            if let Some(previous) = &state.resident {
                tracing::debug!(
                    previous = %previous.event_id,
                    next = %event_id,
                    hide_cancelled,
                    scrub_cancelled,
                    "photo superseded"
                );
            }
            state.generation += 1;
            state.resident = Some(ResidentPhoto {
                event_id: event_id.to_string(),
                payload,
                visible: true,
            });
            state.generation
        };

        self.arm_release(event_id, generation, self.timeline.visible);
        self.arm_scrub(event_id);
    }

    /// Start the fade immediately. The remote scrub stays scheduled.
    pub fn hide_now(&mut self) {
        let target = {
            let mut state = self.state.lock().unwrap();
            let generation = state.generation;
            state.resident.as_mut().map(|resident| {
                resident.visible = false;
                (resident.event_id.clone(), generation)
            })
        };
        if let Some((event_id, generation)) = target {
            self.arm_release(&event_id, generation, Duration::ZERO);
        }
    }

    pub fn resident(&self) -> Option<ResidentPhoto> {
        self.state.lock().unwrap().resident.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .resident
            .as_ref()
            .map(|resident| resident.visible)
            .unwrap_or(false)
    }

    pub fn scrub_pending(&self) -> bool {
        self.scrub.is_pending()
    }

    /// Scrubs that failed and left a payload exposed in the shared store.
    pub fn failed_scrubs(&self) -> usize {
        self.scrubs_failed.load(Ordering::SeqCst)
    }

    fn arm_release(&mut self, event_id: &str, generation: u64, after: Duration) {
        let state = self.state.clone();
        let fade = self.timeline.fade;
        self.hide.arm(format!("hide:{event_id}"), after, async move {
            {
                let mut state = state.lock().unwrap();
                if state.generation != generation {
                    return;
                }
                if let Some(resident) = state.resident.as_mut() {
                    resident.visible = false;
                }
            }
            tokio::time::sleep(fade).await;
            let mut state = state.lock().unwrap();
            if state.generation == generation {
                state.resident = None;
            }
        });
    }

    /// Run a still-pending remote scrub now instead of at its deadline.
    ///
    /// Called when the surface goes away, so a listener that stops within
    /// the scrub delay does not leave the payload in the shared store.
    pub async fn flush_scrub(&mut self) -> bool {
        let Some(id) = self.scrub_target.take() else {
            return false;
        };
        if !self.scrub.cancel() {
            return false;
        }
        scrub(self.store.clone(), self.scrubs_failed.clone(), id).await;
        true
    }

    fn arm_scrub(&mut self, event_id: &str) {
        let store = self.store.clone();
        let failures = self.scrubs_failed.clone();
        let id = event_id.to_string();
        self.scrub_target = Some(id.clone());
        self.scrub.arm(
            format!("scrub:{event_id}"),
            self.timeline.scrub,
            scrub(store, failures, id),
        );
    }
}

async fn scrub(store: Arc<dyn EventStore>, failures: Arc<AtomicUsize>, id: String) {
    match store.clear_photo(&id).await {
        Ok(()) => tracing::info!(event_id = %id, "photo scrubbed from shared store"),
        Err(e) => {
            failures.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(
                event_id = %id,
                error = %e,
                "photo scrub failed; payload stays in the shared store"
            );
        }
    }
}
