//! Readiness waiter
//!
//! The database engine keeps initialising for a while after the deployment
//! reports success. This is a fixed, bounded delay rather than a health poll.

use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct ReadinessWaiter {
    delay: Duration,
}

impl ReadinessWaiter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }
        info!(
            delay_secs = self.delay.as_secs(),
            "Waiting for the database server to come up"
        );
        tokio::time::sleep(self.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_waits_full_delay() {
        let started = tokio::time::Instant::now();
        ReadinessWaiter::new(Duration::from_secs(30)).wait().await;
        assert!(started.elapsed() >= Duration::from_secs(30));
    }
}
