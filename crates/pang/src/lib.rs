//! Pang: broadcast a celebration to everyone on the shared channel and play
//! it locally as graded particle batches, a short-lived photo and a native
//! notification.

pub mod celebration;
pub mod composer;
pub mod cooldown;
pub mod deferred;
pub mod effects;
pub mod error;
pub mod fanout;
pub mod history;
pub mod intensity;
pub mod media;
pub mod notification;
pub mod particles;
pub mod photo_slot;
pub mod recommendation;
pub mod store;
pub mod transport;
pub mod types;

pub use celebration::{CelebrationSurface, SurfaceUpdate};
pub use composer::{sender_label, Composer, Draft, MemoryPreferences, PreferenceStore};
pub use cooldown::PhotoCooldown;
pub use deferred::Deferred;
pub use effects::{EffectCounter, ScreenEffects};
pub use error::{Error, Feedback, Result};
pub use fanout::{FanoutGate, GateDecision, GateStats, MuteState};
pub use history::{window_start, DayGroup, History};
pub use intensity::{combo_count, Grade, GradeProfile};
pub use media::{FrameEncoder, JpegFrameEncoder, MediaBudgeter};
pub use notification::{Notification, NotificationSink, Notifier};
pub use particles::{spawn_batch, AnimationBatch, Particle, ParticleEngine};
pub use photo_slot::{PhotoSlot, PhotoTimeline, ResidentPhoto};
pub use recommendation::{recommend, Recommendation};
pub use store::{CommitClock, EventStore, InMemoryEventStore, StoreNotification, Subscription};
pub use transport::{
    fire, operator_name, serve_operator_name, ChannelTransport, NameClient, SurfaceMessage,
    SurfaceReceiver, TriggerSink,
};
pub use types::*;
