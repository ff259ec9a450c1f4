//! The receiving surface. Turns forwarded events into particle batches,
//! photo display and native notifications.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    AnimationBatch, CelebrationEvent, EventStore, Grade, Notification, NotificationSink,
    Notifier, ParticleEngine, PhotoSlot, SurfaceMessage, SurfaceReceiver,
};

/// What one surface message did, for whoever is drawing the surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SurfaceUpdate {
    #[serde(rename_all = "camelCase")]
    Celebrated {
        event_id: String,
        grade: Grade,
        batch: AnimationBatch,
        photo_attached: bool,
        notification: Notification,
    },
    Dismissed,
}

pub struct CelebrationSurface {
    engine: ParticleEngine,
    photo: PhotoSlot,
    notifier: Notifier,
}

impl CelebrationSurface {
    pub fn new(store: Arc<dyn EventStore>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self::with_parts(
            ParticleEngine::new(),
            PhotoSlot::new(store),
            Notifier::new(notifications),
        )
    }

    pub fn with_parts(engine: ParticleEngine, photo: PhotoSlot, notifier: Notifier) -> Self {
        Self {
            engine,
            photo,
            notifier,
        }
    }

    pub fn handle(&mut self, message: SurfaceMessage) -> SurfaceUpdate {
        match message {
            SurfaceMessage::NewEvent(event) => self.celebrate(event),
            SurfaceMessage::Dismiss => {
                self.photo.hide_now();
                self.notifier.close_all();
                SurfaceUpdate::Dismissed
            }
        }
    }

    fn celebrate(&mut self, event: CelebrationEvent) -> SurfaceUpdate {
        let grade = Grade::from_combo(event.combo_count);
        // An empty sequence falls back to the default pool inside the engine.
        let batch = self.engine.spawn(grade, &event.emoji_sequence);

        let photo_attached = match &event.photo_payload {
            Some(payload) => {
                self.photo.attach(&event.id, payload.clone());
                true
            }
            None => false,
        };

        self.notifier.notify(&event);
        SurfaceUpdate::Celebrated {
            event_id: event.id.clone(),
            grade,
            batch,
            photo_attached,
            notification: Notification::for_event(&event),
        }
    }

    /// Handle messages until every sender is gone. Returns how many were handled.
    pub async fn run(&mut self, mut receiver: SurfaceReceiver) -> usize {
        let mut handled = 0;
        while let Some(message) = receiver.recv().await {
            self.handle(message);
            handled += 1;
        }
        handled
    }

    /// Tear the surface down. A photo scrub that has not fired yet runs now.
    pub async fn close(mut self) {
        if self.photo.flush_scrub().await {
            tracing::debug!("pending photo scrub flushed on close");
        }
    }

    pub fn engine(&self) -> &ParticleEngine {
        &self.engine
    }

    pub fn photo(&self) -> &PhotoSlot {
        &self.photo
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}
