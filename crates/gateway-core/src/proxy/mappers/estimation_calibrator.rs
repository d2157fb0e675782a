//! Tracks the drift between [`super::context_manager`]'s pre-request token
//! estimate and the real `usageMetadata` count reported once a response
//! completes, and uses the running ratio to correct future estimates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

static CALIBRATOR: LazyLock<EstimationCalibrator> = LazyLock::new(EstimationCalibrator::new);

/// Returns the process-wide calibrator singleton.
pub fn get_calibrator() -> &'static EstimationCalibrator {
    &CALIBRATOR
}

/// Maintains a running sum of estimated vs. actual token counts, scaled by
/// a fixed-point factor so the ratio can be tracked with atomics alone.
pub struct EstimationCalibrator {
    estimated_sum: AtomicU64,
    actual_sum: AtomicU64,
}

const SCALE: u64 = 1_000;

impl EstimationCalibrator {
    fn new() -> Self {
        Self { estimated_sum: AtomicU64::new(0), actual_sum: AtomicU64::new(0) }
    }

    /// Records an observed (estimated, actual) pair from a completed request.
    pub fn record(&self, estimated: u32, actual: u32) {
        self.estimated_sum.fetch_add(u64::from(estimated), Ordering::Relaxed);
        self.actual_sum.fetch_add(u64::from(actual), Ordering::Relaxed);
    }

    /// Scales a raw estimate by the running actual/estimated ratio observed
    /// so far. With no history yet, returns the raw estimate unchanged.
    pub fn calibrate(&self, raw_estimate: u32) -> u32 {
        let estimated_sum = self.estimated_sum.load(Ordering::Relaxed);
        let actual_sum = self.actual_sum.load(Ordering::Relaxed);
        if estimated_sum == 0 {
            return raw_estimate;
        }
        let ratio_scaled = actual_sum.saturating_mul(SCALE) / estimated_sum;
        let calibrated = (u64::from(raw_estimate).saturating_mul(ratio_scaled)) / SCALE;
        calibrated.min(u64::from(u32::MAX)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrates_toward_observed_ratio() {
        let calibrator = EstimationCalibrator::new();
        assert_eq!(calibrator.calibrate(100), 100);

        calibrator.record(100, 150);
        assert_eq!(calibrator.calibrate(100), 150);
    }
}
