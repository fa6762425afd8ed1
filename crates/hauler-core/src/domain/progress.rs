//! Progress derivation: percentage, smoothed speed, and ETA
//!
//! [`ProgressEntry`] is the display-ready snapshot handed to observers on
//! every state change. [`SpeedEstimator`] smooths the instantaneous transfer
//! rate with an exponentially weighted moving average so that the ETA does
//! not jitter under bursty network conditions while staying responsive.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::newtypes::FileId;
use super::record::{UploadRecord, UploadStatus};

/// Weight given to the previous smoothed speed sample
const SMOOTHING_OLD: f64 = 0.7;

/// Weight given to the newest instantaneous sample
const SMOOTHING_NEW: f64 = 0.3;

// ============================================================================
// ProgressEntry
// ============================================================================

/// Display-ready progress snapshot for one upload
///
/// Recomputed on every offset or status change and delivered synchronously
/// to subscribed observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Id of the upload this entry describes
    pub file_id: FileId,
    /// Original file name, for display
    pub file_name: String,
    /// Bytes acknowledged by the server so far
    pub uploaded_bytes: u64,
    /// Total file size in bytes
    pub total_bytes: u64,
    /// `uploaded_bytes / total_bytes * 100`, clamped to `[0, 100]`
    pub progress_percent: f64,
    /// Smoothed transfer rate; `None` before the first sample
    pub speed_bytes_per_sec: Option<f64>,
    /// Estimated seconds to completion; `None` when the speed is unknown or zero
    pub eta_seconds: Option<f64>,
    /// Current lifecycle status
    pub status: UploadStatus,
    /// Last failure message, present only when `status == Error`
    pub error: Option<String>,
}

impl ProgressEntry {
    /// Builds an entry from a record and the current speed estimate
    #[must_use]
    pub fn from_record(record: &UploadRecord, estimator: &SpeedEstimator) -> Self {
        let uploaded = record.offset();
        let total = record.file_size();
        let remaining = total.saturating_sub(uploaded);
        Self {
            file_id: record.file_id().clone(),
            file_name: record.file_name().to_string(),
            uploaded_bytes: uploaded,
            total_bytes: total,
            progress_percent: percent(uploaded, total),
            speed_bytes_per_sec: estimator.speed(),
            eta_seconds: estimator.eta_seconds(remaining),
            status: record.status(),
            error: record.error().map(str::to_string),
        }
    }
}

/// Computes a clamped completion percentage
///
/// A zero-byte file counts as fully uploaded.
#[must_use]
pub fn percent(uploaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (uploaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

// ============================================================================
// SpeedEstimator
// ============================================================================

/// Exponentially smoothed transfer-rate estimator
///
/// `smoothed = smoothed * 0.7 + instantaneous * 0.3`; the first sample seeds
/// the average directly.
#[derive(Debug, Clone, Default)]
pub struct SpeedEstimator {
    smoothed: Option<f64>,
}

impl SpeedEstimator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one offset delta into the moving average
    ///
    /// Zero-duration samples are ignored: they carry no rate information
    /// and would divide by zero.
    ///
    /// # Arguments
    /// * `bytes_delta` - Bytes acknowledged since the previous sample
    /// * `elapsed` - Wall-clock time since the previous sample
    pub fn record(&mut self, bytes_delta: u64, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return;
        }
        let instantaneous = bytes_delta as f64 / secs;
        self.smoothed = Some(match self.smoothed {
            Some(prev) => prev * SMOOTHING_OLD + instantaneous * SMOOTHING_NEW,
            None => instantaneous,
        });
    }

    /// Current smoothed speed in bytes per second
    #[must_use]
    pub fn speed(&self) -> Option<f64> {
        self.smoothed
    }

    /// Estimated seconds until `remaining` bytes are transferred
    ///
    /// `None` when no sample has been recorded or the smoothed speed is zero.
    #[must_use]
    pub fn eta_seconds(&self, remaining: u64) -> Option<f64> {
        match self.smoothed {
            Some(speed) if speed > 0.0 => Some(remaining as f64 / speed),
            _ => None,
        }
    }

    /// Clears the estimate, e.g. when an upload is reset from scratch
    pub fn reset(&mut self) {
        self.smoothed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::newtypes::TargetPath;

    // ---- percent ----

    #[test]
    fn test_percent_basic() {
        assert_eq!(percent(0, 200), 0.0);
        assert_eq!(percent(50, 200), 25.0);
        assert_eq!(percent(200, 200), 100.0);
    }

    #[test]
    fn test_percent_zero_byte_file() {
        assert_eq!(percent(0, 0), 100.0);
    }

    // ---- SpeedEstimator ----

    #[test]
    fn test_first_sample_seeds_average() {
        let mut est = SpeedEstimator::new();
        assert!(est.speed().is_none());

        est.record(1000, Duration::from_secs(1));
        assert_eq!(est.speed(), Some(1000.0));
    }

    #[test]
    fn test_smoothing_weights() {
        let mut est = SpeedEstimator::new();
        est.record(1000, Duration::from_secs(1));
        est.record(2000, Duration::from_secs(1));
        // 1000 * 0.7 + 2000 * 0.3
        let speed = est.speed().unwrap();
        assert!((speed - 1300.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_elapsed_is_ignored() {
        let mut est = SpeedEstimator::new();
        est.record(1000, Duration::from_secs(1));
        est.record(5000, Duration::ZERO);
        assert_eq!(est.speed(), Some(1000.0));
    }

    #[test]
    fn test_eta() {
        let mut est = SpeedEstimator::new();
        assert!(est.eta_seconds(500).is_none());

        est.record(100, Duration::from_secs(1));
        assert_eq!(est.eta_seconds(500), Some(5.0));
        assert_eq!(est.eta_seconds(0), Some(0.0));
    }

    #[test]
    fn test_eta_undefined_at_zero_speed() {
        let mut est = SpeedEstimator::new();
        est.record(0, Duration::from_secs(1));
        assert!(est.eta_seconds(500).is_none());
    }

    #[test]
    fn test_reset() {
        let mut est = SpeedEstimator::new();
        est.record(100, Duration::from_secs(1));
        est.reset();
        assert!(est.speed().is_none());
    }

    // ---- ProgressEntry ----

    #[test]
    fn test_entry_from_record() {
        let mut record = UploadRecord::new(
            "clip.mp4".to_string(),
            1000,
            TargetPath::root(),
            100,
            3,
        );
        record.set_status(UploadStatus::Uploading).unwrap();
        record.set_offset(250).unwrap();

        let mut est = SpeedEstimator::new();
        est.record(250, Duration::from_secs(1));

        let entry = ProgressEntry::from_record(&record, &est);
        assert_eq!(entry.uploaded_bytes, 250);
        assert_eq!(entry.total_bytes, 1000);
        assert_eq!(entry.progress_percent, 25.0);
        assert_eq!(entry.speed_bytes_per_sec, Some(250.0));
        assert_eq!(entry.eta_seconds, Some(3.0));
        assert_eq!(entry.status, UploadStatus::Uploading);
        assert!(entry.error.is_none());
    }

    #[test]
    fn test_entry_carries_error_message() {
        let mut record =
            UploadRecord::new("clip.mp4".to_string(), 1000, TargetPath::root(), 100, 3);
        record.set_status(UploadStatus::Uploading).unwrap();
        record.set_error("timed out").unwrap();

        let entry = ProgressEntry::from_record(&record, &SpeedEstimator::new());
        assert_eq!(entry.status, UploadStatus::Error);
        assert_eq!(entry.error.as_deref(), Some("timed out"));
    }
}
