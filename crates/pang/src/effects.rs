use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::EFFECT_DURATION_MS;

/// Reference-counted transient effect. Each trigger holds the effect on for
/// its own duration; the effect is active while any trigger is outstanding.
#[derive(Debug, Clone, Default)]
pub struct EffectCounter {
    active: Arc<AtomicUsize>,
}

impl EffectCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self, duration: Duration) {
        self.active.fetch_add(1, Ordering::SeqCst);
        let active = self.active.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            active.fetch_sub(1, Ordering::SeqCst);
        });
    }

    pub fn is_active(&self) -> bool {
        self.count() > 0
    }

    pub fn count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Full-screen flash and shake shown for Mega and God celebrations.
#[derive(Debug, Clone)]
pub struct ScreenEffects {
    pub flash: EffectCounter,
    pub shake: EffectCounter,
    duration: Duration,
}

impl Default for ScreenEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenEffects {
    pub fn new() -> Self {
        Self::with_duration(Duration::from_millis(EFFECT_DURATION_MS))
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            flash: EffectCounter::new(),
            shake: EffectCounter::new(),
            duration,
        }
    }

    pub fn trigger(&self) {
        self.flash.trigger(self.duration);
        self.shake.trigger(self.duration);
    }

    pub fn is_flashing(&self) -> bool {
        self.flash.is_active()
    }

    pub fn is_shaking(&self) -> bool {
        self.shake.is_active()
    }
}
