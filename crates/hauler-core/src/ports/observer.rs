//! Progress observer port (driving/primary port)
//!
//! UI callers register observers with the engine; the engine delivers a
//! fresh [`ProgressEntry`] synchronously after every state change. The
//! engine owns subscriber lifetimes and drops per-file observers when an
//! upload is cancelled or completes.

use crate::domain::progress::ProgressEntry;

/// Sink for progress notifications
///
/// Implementations must be cheap: delivery happens inline on the upload
/// task, so a slow observer stalls its own file's transfer.
pub trait IProgressObserver: Send + Sync {
    /// Called after every offset or status change
    fn on_progress(&self, entry: &ProgressEntry);
}

/// Closures can act as observers directly
impl<F> IProgressObserver for F
where
    F: Fn(&ProgressEntry) + Send + Sync,
{
    fn on_progress(&self, entry: &ProgressEntry) {
        self(entry);
    }
}
