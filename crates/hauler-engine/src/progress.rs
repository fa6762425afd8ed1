//! Per-record progress state
//!
//! Bridges raw offset changes to the [`SpeedEstimator`] in `hauler-core`:
//! tracks the instant of the previous sample so each acknowledged chunk
//! contributes one `(bytes, elapsed)` observation. Uses `tokio::time`
//! instants so tests can drive the clock deterministically.

use tokio::time::Instant;

use hauler_core::domain::progress::SpeedEstimator;

/// Timing state feeding the speed estimator for one upload
#[derive(Debug)]
pub struct ProgressState {
    /// Instant of the previous offset sample; `None` until the transfer starts
    last_sample: Option<Instant>,
    estimator: SpeedEstimator,
}

impl ProgressState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_sample: None,
            estimator: SpeedEstimator::new(),
        }
    }

    /// Starts (or restarts) the sampling clock when a transfer is admitted
    pub fn begin(&mut self) {
        self.last_sample = Some(Instant::now());
    }

    /// Folds an acknowledged offset advance into the estimator
    pub fn on_offset_advance(&mut self, bytes_delta: u64) {
        let now = Instant::now();
        if let Some(last) = self.last_sample {
            self.estimator.record(bytes_delta, now - last);
        }
        self.last_sample = Some(now);
    }

    /// Restarts the sampling clock without recording a sample
    ///
    /// Used after an offset re-query: the elapsed time covered
    /// synchronization, not transfer, and would skew the speed.
    pub fn resync(&mut self) {
        self.last_sample = Some(Instant::now());
    }

    /// Clears all state for an upload restarted from scratch
    pub fn reset(&mut self) {
        self.last_sample = None;
        self.estimator.reset();
    }

    /// The current speed estimate
    #[must_use]
    pub fn estimator(&self) -> &SpeedEstimator {
        &self.estimator
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}
