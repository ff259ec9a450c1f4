//! Particle batches and their independent lifecycles.
//!
//! Every trigger produces one [`AnimationBatch`]. The engine keeps live
//! batches keyed by `batch_id`; each batch carries its own expiry task and is
//! removed by id when that task fires, so overlapping celebrations never cut
//! each other short.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::task::AbortHandle;

use crate::{now_millis, Grade, ScreenEffects, BATCH_TTL_MS, DEFAULT_EMOJI_POOL};

/// Jitter around a burst center, as a share of the viewport.
pub const CENTER_JITTER_PCT: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Particle {
    pub emoji: String,
    /// Horizontal spawn position, percent of viewport width.
    pub x_pct: f64,
    /// Vertical spawn position, percent of viewport height from the top.
    pub y_pct: f64,
    pub drift_px: f64,
    pub rise_px: f64,
    pub rotation_deg: f64,
    pub size_px: f64,
    pub scale: f64,
    pub delay_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationBatch {
    pub batch_id: String,
    pub grade: Grade,
    pub particles: Vec<Particle>,
    pub created_at: u64,
    #[serde(skip)]
    pub ttl: Duration,
}

impl AnimationBatch {
    /// The shared burst center for center-burst grades.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.particles.is_empty() {
            return None;
        }
        let n = self.particles.len() as f64;
        let (x, y) = self
            .particles
            .iter()
            .fold((0.0, 0.0), |(x, y), p| (x + p.x_pct, y + p.y_pct));
        Some((x / n, y / n))
    }
}

/// Build one batch for `grade`, drawing glyphs from `pool` (the default pool
/// when empty).
pub fn spawn_batch<R: Rng + ?Sized>(grade: Grade, pool: &[String], rng: &mut R) -> AnimationBatch {
    let profile = grade.profile();
    let created_at = now_millis();
    let batch_id = format!("{}-{}", created_at, uuid::Uuid::new_v4().simple());

    let center = profile
        .center_burst
        .then(|| (rng.gen_range(30.0..=70.0), rng.gen_range(30.0..=70.0)));

    let particles = (0..profile.particles)
        .map(|_| {
            let emoji = if pool.is_empty() {
                DEFAULT_EMOJI_POOL[rng.gen_range(0..DEFAULT_EMOJI_POOL.len())].to_string()
            } else {
                pool[rng.gen_range(0..pool.len())].clone()
            };
            let (x_pct, y_pct) = match center {
                Some((cx, cy)) => (
                    cx + (rng.gen::<f64>() - 0.5) * CENTER_JITTER_PCT,
                    cy + (rng.gen::<f64>() - 0.5) * CENTER_JITTER_PCT,
                ),
                None => (rng.gen_range(10.0..90.0), 100.0),
            };
            Particle {
                emoji,
                x_pct,
                y_pct,
                drift_px: (rng.gen::<f64>() - 0.5) * 300.0,
                rise_px: rng.gen_range(400.0..800.0),
                rotation_deg: (rng.gen::<f64>() - 0.5) * 720.0,
                size_px: rng.gen_range(20.0..40.0),
                scale: profile.scale,
                delay_secs: rng.gen::<f64>() * profile.max_delay_secs,
            }
        })
        .collect();

    AnimationBatch {
        batch_id,
        grade,
        particles,
        created_at,
        ttl: Duration::from_millis(BATCH_TTL_MS),
    }
}

struct LiveBatch {
    seq: u64,
    batch: AnimationBatch,
    expiry: AbortHandle,
}

#[derive(Default)]
struct LiveSet {
    next_seq: u64,
    batches: HashMap<String, LiveBatch>,
}

pub struct ParticleEngine {
    live: Arc<Mutex<LiveSet>>,
    effects: ScreenEffects,
    ttl: Duration,
}

impl Default for ParticleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleEngine {
    pub fn new() -> Self {
        Self::with_timing(Duration::from_millis(BATCH_TTL_MS), ScreenEffects::new())
    }

    pub fn with_timing(ttl: Duration, effects: ScreenEffects) -> Self {
        Self {
            live: Arc::new(Mutex::new(LiveSet::default())),
            effects,
            ttl,
        }
    }

    /// Spawn a batch, add it to the live set and schedule its own removal.
    pub fn spawn(&self, grade: Grade, pool: &[String]) -> AnimationBatch {
        let mut batch = spawn_batch(grade, pool, &mut rand::thread_rng());
        batch.ttl = self.ttl;

        if grade.profile().screen_effects {
            self.effects.trigger();
        }

        let batch_id = batch.batch_id.clone();
        let live = self.live.clone();
        let ttl = self.ttl;
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let removed = live.lock().unwrap().batches.remove(&batch_id).is_some();
            if removed {
                tracing::debug!(batch_id = %batch_id, "batch expired");
            }
        })
        .abort_handle();

        let mut live = self.live.lock().unwrap();
        let seq = live.next_seq;
        live.next_seq += 1;
        live.batches.insert(
            batch.batch_id.clone(),
            LiveBatch {
                seq,
                batch: batch.clone(),
                expiry,
            },
        );
        tracing::debug!(
            batch_id = %batch.batch_id,
            grade = %grade,
            particles = batch.particles.len(),
            live = live.batches.len(),
            "batch spawned"
        );
        batch
    }

    /// Live batches in spawn order.
    pub fn live_batches(&self) -> Vec<AnimationBatch> {
        let live = self.live.lock().unwrap();
        let mut entries: Vec<&LiveBatch> = live.batches.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.batch.clone()).collect()
    }

    pub fn is_live(&self, batch_id: &str) -> bool {
        self.live.lock().unwrap().batches.contains_key(batch_id)
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().batches.len()
    }

    pub fn live_particles(&self) -> usize {
        self.live
            .lock()
            .unwrap()
            .batches
            .values()
            .map(|entry| entry.batch.particles.len())
            .sum()
    }

    pub fn effects(&self) -> &ScreenEffects {
        &self.effects
    }
}

impl Drop for ParticleEngine {
    fn drop(&mut self) {
        if let Ok(live) = self.live.lock() {
            for entry in live.batches.values() {
                entry.expiry.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(glyphs: &[&str]) -> Vec<String> {
        glyphs.iter().map(|g| g.to_string()).collect()
    }

    #[test]
    fn normal_batches_rise_from_the_bottom_edge() {
        let mut rng = StdRng::seed_from_u64(7);
        let batch = spawn_batch(Grade::Normal, &[], &mut rng);
        assert_eq!(batch.particles.len(), 40);
        assert_eq!(batch.ttl, Duration::from_millis(BATCH_TTL_MS));
        for p in &batch.particles {
            assert_eq!(p.y_pct, 100.0);
            assert!((10.0..90.0).contains(&p.x_pct));
            assert_eq!(p.scale, 1.0);
            assert!(DEFAULT_EMOJI_POOL.contains(&p.emoji.as_str()));
            assert!(p.delay_secs < 0.8);
        }
    }

    #[test]
    fn center_burst_particles_cluster_around_one_center() {
        let mut rng = StdRng::seed_from_u64(11);
        for grade in [Grade::Combo, Grade::Mega, Grade::God] {
            let batch = spawn_batch(grade, &pool(&["🔥"]), &mut rng);
            let profile = grade.profile();
            assert_eq!(batch.particles.len(), profile.particles);

            let xs: Vec<f64> = batch.particles.iter().map(|p| p.x_pct).collect();
            let ys: Vec<f64> = batch.particles.iter().map(|p| p.y_pct).collect();
            let spread = |v: &[f64]| {
                let max = v.iter().cloned().fold(f64::MIN, f64::max);
                let min = v.iter().cloned().fold(f64::MAX, f64::min);
                max - min
            };
            assert!(spread(&xs) <= CENTER_JITTER_PCT);
            assert!(spread(&ys) <= CENTER_JITTER_PCT);

            let (cx, cy) = batch.centroid().unwrap();
            assert!((30.0 - 7.5..=70.0 + 7.5).contains(&cx));
            assert!((30.0 - 7.5..=70.0 + 7.5).contains(&cy));
            assert!(batch.particles.iter().all(|p| p.emoji == "🔥" && p.scale == profile.scale));
        }
    }

    #[test]
    fn god_grade_stretches_start_delays() {
        let mut rng = StdRng::seed_from_u64(3);
        let batch = spawn_batch(Grade::God, &[], &mut rng);
        let latest = batch
            .particles
            .iter()
            .map(|p| p.delay_secs)
            .fold(0.0, f64::max);
        assert!(latest > 0.8);
        assert!(latest < 2.0);
    }

    #[test]
    fn batch_ids_are_unique_within_a_millisecond() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = spawn_batch(Grade::Normal, &[], &mut rng);
        let b = spawn_batch(Grade::Normal, &[], &mut rng);
        assert_ne!(a.batch_id, b.batch_id);
    }

    #[tokio::test(start_paused = true)]
    async fn batches_expire_independently() {
        let engine = ParticleEngine::new();
        let first = engine.spawn(Grade::Normal, &[]);

        tokio::time::sleep(Duration::from_millis(4_000)).await;
        let second = engine.spawn(Grade::Combo, &[]);
        assert_eq!(engine.live_count(), 2);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(engine.is_live(&first.batch_id));
        assert!(engine.is_live(&second.batch_id));

        // t = 5100: only the first batch has reached its ttl.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!engine.is_live(&first.batch_id));
        assert!(engine.is_live(&second.batch_id));
        assert_eq!(engine.live_particles(), 60);

        tokio::time::sleep(Duration::from_millis(4_000)).await;
        assert_eq!(engine.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn live_batches_keep_spawn_order() {
        let engine = ParticleEngine::new();
        let a = engine.spawn(Grade::Normal, &[]);
        let b = engine.spawn(Grade::God, &[]);
        let c = engine.spawn(Grade::Combo, &[]);
        let ids: Vec<String> = engine
            .live_batches()
            .into_iter()
            .map(|batch| batch.batch_id)
            .collect();
        assert_eq!(ids, vec![a.batch_id, b.batch_id, c.batch_id]);
    }

    #[tokio::test(start_paused = true)]
    async fn mega_and_god_trigger_screen_effects() {
        let engine = ParticleEngine::new();
        engine.spawn(Grade::Combo, &[]);
        assert!(!engine.effects().is_flashing());

        engine.spawn(Grade::Mega, &[]);
        assert!(engine.effects().is_flashing());
        assert!(engine.effects().is_shaking());

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert!(!engine.effects().is_flashing());
    }
}
