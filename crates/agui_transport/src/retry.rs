use std::time::Duration;

/// Base delay before the first reconnect.
pub const BASE_DELAY_MS: u64 = 1000;
/// Upper bound for any single reconnect delay.
pub const MAX_DELAY_MS: u64 = 30_000;

/// Compute the capped exponential delay for a 1-based reconnect attempt.
pub fn reconnect_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(30);
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(exponent));
    Duration::from_millis(delay_ms).min(cap)
}

/// Reconnect counter for one push channel.
///
/// Every transport error advances the attempt and yields
/// `min(base * 2^(attempt-1), cap)`; a successful open resets the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(BASE_DELAY_MS),
            Duration::from_millis(MAX_DELAY_MS),
        )
    }
}

impl ReconnectPolicy {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            attempt: 0,
        }
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// Number of consecutive failures since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn on_open(&mut self) {
        self.attempt = 0;
    }

    /// Records a transport error and returns the delay before the next attempt.
    pub fn on_error(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        reconnect_delay(self.attempt, self.base, self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_until_cap() {
        let base = Duration::from_millis(BASE_DELAY_MS);
        let cap = Duration::from_millis(MAX_DELAY_MS);

        assert_eq!(reconnect_delay(1, base, cap).as_millis(), 1000);
        assert_eq!(reconnect_delay(5, base, cap).as_millis(), 16_000);
        assert_eq!(reconnect_delay(6, base, cap).as_millis(), 30_000);
        assert_eq!(reconnect_delay(u32::MAX, base, cap).as_millis(), 30_000);
    }
}
