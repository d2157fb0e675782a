//! Single universal exponential backoff formula shared by every protocol.
//!
//! `backoff(n) = min(baseMs * 2^n * (1 + jitter), maxMs)`, jitter uniform on
//! `[-0.1, 0.1]`.

use std::time::Duration;

pub const BASE_MS: u64 = 1000;
pub const MAX_MS: u64 = 60_000;

/// Compute the backoff delay for retry attempt `n` (0-indexed).
pub fn backoff_duration(attempt: u32) -> Duration {
    backoff_duration_with_jitter(attempt, sample_jitter())
}

fn backoff_duration_with_jitter(attempt: u32, jitter: f64) -> Duration {
    let exponential = (BASE_MS as f64) * 2f64.powi(attempt as i32) * (1.0 + jitter);
    let capped = exponential.min(MAX_MS as f64).max(0.0);
    Duration::from_millis(capped as u64)
}

fn sample_jitter() -> f64 {
    use rand::Rng;
    rand::thread_rng().gen_range(-0.1..=0.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_within_the_documented_envelope() {
        for attempt in 0..10u32 {
            for jitter in [-0.1, -0.05, 0.0, 0.05, 0.1] {
                let got = backoff_duration_with_jitter(attempt, jitter).as_millis() as f64;
                let lower = (BASE_MS as f64) * 2f64.powi(attempt as i32) * 0.9;
                let upper =
                    (MAX_MS as f64).min((BASE_MS as f64) * 2f64.powi(attempt as i32) * 1.1);
                assert!(
                    got >= lower - 1.0 && got <= upper + 1.0,
                    "attempt={attempt} jitter={jitter} got={got} lower={lower} upper={upper}"
                );
            }
        }
    }

    #[test]
    fn caps_at_max_ms_for_large_attempts() {
        let got = backoff_duration_with_jitter(20, 0.1);
        assert_eq!(got, Duration::from_millis(MAX_MS));
    }
}
