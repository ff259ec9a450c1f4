use std::time::Duration;

use tokio::time::Instant;

use crate::{Error, Result, PHOTO_COOLDOWN_MS};

/// Minimum spacing between photo sends from one sender.
#[derive(Debug, Clone)]
pub struct PhotoCooldown {
    period: Duration,
    last_send: Option<Instant>,
}

impl Default for PhotoCooldown {
    fn default() -> Self {
        Self::new(Duration::from_millis(PHOTO_COOLDOWN_MS))
    }
}

impl PhotoCooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_send: None,
        }
    }

    /// Resume a cooldown whose last photo send happened `elapsed` ago.
    pub fn resumed(period: Duration, elapsed: Duration) -> Self {
        let last_send = if elapsed >= period {
            None
        } else {
            Instant::now().checked_sub(elapsed)
        };
        Self { period, last_send }
    }

    pub fn remaining(&self) -> Duration {
        self.last_send
            .map(|at| self.period.saturating_sub(at.elapsed()))
            .unwrap_or(Duration::ZERO)
    }

    pub fn check(&self) -> Result<()> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            Ok(())
        } else {
            Err(Error::CooldownActive {
                remaining_seconds: remaining.as_millis().div_ceil(1000) as u64,
            })
        }
    }

    pub fn start(&mut self) {
        self.last_send = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rejects_until_period_elapses() {
        let mut cooldown = PhotoCooldown::default();
        assert!(cooldown.check().is_ok());

        cooldown.start();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        match cooldown.check() {
            Err(Error::CooldownActive { remaining_seconds }) => assert_eq!(remaining_seconds, 8),
            other => panic!("expected cooldown, got {other:?}"),
        }

        tokio::time::sleep(Duration::from_millis(7_499)).await;
        assert!(matches!(
            cooldown.check(),
            Err(Error::CooldownActive {
                remaining_seconds: 1
            })
        ));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(cooldown.check().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn resumed_cooldown_counts_from_previous_send() {
        let cooldown = PhotoCooldown::resumed(Duration::from_secs(10), Duration::from_secs(4));
        assert_eq!(cooldown.remaining(), Duration::from_secs(6));

        let expired = PhotoCooldown::resumed(Duration::from_secs(10), Duration::from_secs(60));
        assert!(expired.check().is_ok());
    }
}
