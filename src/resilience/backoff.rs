//! Exponential backoff for the proxy retry loop.

use std::time::Duration;

/// Calculate the delay before retry number `attempt` (1-based).
///
/// delay = base * 2^attempt, capped at `max_ms`. Deterministic: the retry
/// schedule for a given service is always the same.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential = 2u64.saturating_pow(attempt);
    let delay_ms = base_ms.saturating_mul(exponential).min(max_ms);

    Duration::from_millis(delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt() {
        assert_eq!(calculate_backoff(1, 1_000, 60_000).as_millis(), 2_000);
        assert_eq!(calculate_backoff(2, 1_000, 60_000).as_millis(), 4_000);
        assert_eq!(calculate_backoff(3, 1_000, 60_000).as_millis(), 8_000);
    }

    #[test]
    fn caps_at_max() {
        assert_eq!(calculate_backoff(10, 1_000, 5_000).as_millis(), 5_000);
        // Large attempts must not overflow.
        assert_eq!(calculate_backoff(u32::MAX, 1_000, 5_000).as_millis(), 5_000);
    }

    #[test]
    fn zeroth_attempt_is_immediate() {
        assert_eq!(calculate_backoff(0, 1_000, 5_000).as_millis(), 0);
    }
}
