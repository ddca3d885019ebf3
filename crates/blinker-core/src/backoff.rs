// Reconnect backoff: exponential, jittered, capped.

use std::time::Duration;

use rand::Rng;

/// Longest wait between reconnect attempts.
pub const MAX_DELAY: Duration = Duration::from_secs(60);

/// Upper bound of the random jitter, as a fraction of the delay.
pub const JITTER_FRACTION: f64 = 0.1;

/// Delay schedule for `wait_for_connection`.
///
/// Attempt `n` (0-based) waits `base * 2^n`, stretched by up to 10%
/// jitter, never more than [`MAX_DELAY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
}

impl Backoff {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            cap: MAX_DELAY,
        }
    }

    /// Delay before retry `attempt` for a given jitter in `[0, 0.1]`.
    pub fn delay(&self, attempt: u32, jitter: f64) -> Duration {
        let exponent = i32::try_from(attempt.min(32)).unwrap_or(32);
        let scaled = self.base.as_secs_f64() * 2f64.powi(exponent);
        let jittered = scaled * (1.0 + jitter.clamp(0.0, JITTER_FRACTION));
        Duration::try_from_secs_f64(jittered.min(self.cap.as_secs_f64())).unwrap_or(self.cap)
    }

    /// Delay before retry `attempt` with fresh random jitter.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0.0..=JITTER_FRACTION);
        self.delay(attempt, jitter)
    }
}
