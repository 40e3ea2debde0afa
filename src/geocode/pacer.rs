//! Minimum spacing between network calls to one provider.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Keeps consecutive calls at least `interval` apart, measured from the end
/// of the previous call. A zero interval never sleeps.
pub struct Pacer {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Sleep until the interval since the previous call has elapsed.
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        let last = *self.last_call.lock().await;
        if let Some(last) = last {
            tokio::time::sleep_until(last + self.interval).await;
        }
    }

    /// Record that a call just finished.
    pub async fn mark(&self) {
        *self.last_call.lock().await = Some(Instant::now());
    }
}
