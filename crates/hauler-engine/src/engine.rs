//! Upload engine facade
//!
//! [`UploadEngine`] is the single entry point for callers: enqueue files,
//! pause / resume / cancel / retry them, and subscribe to progress. It owns
//! all per-file state and composes the ports: an [`IUploadServer`] for the
//! wire, one [`IFileSource`] per file for the bytes, and registered
//! [`IProgressObserver`]s for notifications.
//!
//! ## Locking discipline
//!
//! Every lock here is a `std::sync::Mutex` held for plain data access only,
//! never across an `.await`. DashMap guards are dropped (the inner `Arc`s
//! cloned out) before the scheduler lock is taken, and observers are invoked
//! only after every lock has been released.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hauler_core::config::EngineConfig;
use hauler_core::domain::newtypes::{FileId, TargetPath};
use hauler_core::domain::progress::ProgressEntry;
use hauler_core::domain::record::{UploadRecord, UploadStatus};
use hauler_core::ports::{IFileSource, IProgressObserver, IUploadServer};

use crate::progress::ProgressState;
use crate::scheduler::Scheduler;
use crate::transfer;

// ============================================================================
// Per-file entry
// ============================================================================

/// Everything the engine tracks for one enqueued file
pub(crate) struct UploadEntry {
    pub(crate) record: Arc<Mutex<UploadRecord>>,
    pub(crate) source: Arc<dyn IFileSource>,
    pub(crate) progress: Arc<Mutex<ProgressState>>,
    /// Token for the currently admitted task; replaced on each admission
    /// so a resume after pause gets a fresh, uncancelled token.
    pub(crate) cancel: Mutex<CancellationToken>,
}

/// Clone-out view handed to the per-file transfer task
pub(crate) struct TaskContext {
    pub(crate) record: Arc<Mutex<UploadRecord>>,
    pub(crate) source: Arc<dyn IFileSource>,
    pub(crate) progress: Arc<Mutex<ProgressState>>,
    pub(crate) cancel: CancellationToken,
}

// ============================================================================
// UploadEngine
// ============================================================================

/// Resumable chunked upload engine
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct UploadEngine {
    inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) server: Arc<dyn IUploadServer>,
    pub(crate) config: EngineConfig,
    records: DashMap<FileId, Arc<UploadEntry>>,
    scheduler: Mutex<Scheduler>,
    file_observers: DashMap<FileId, Vec<Arc<dyn IProgressObserver>>>,
    global_observers: Mutex<Vec<Arc<dyn IProgressObserver>>>,
}

impl UploadEngine {
    /// Creates an engine over an upload server with resolved settings
    pub fn new(server: Arc<dyn IUploadServer>, config: EngineConfig) -> Self {
        let limit = config.max_concurrent_uploads.max(1);
        Self {
            inner: Arc::new(EngineInner {
                server,
                config,
                records: DashMap::new(),
                scheduler: Mutex::new(Scheduler::new(limit)),
                file_observers: DashMap::new(),
                global_observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Creates an engine, first applying any server-advertised settings
    ///
    /// A failure fetching the remote config is logged and ignored; the
    /// engine starts with the local settings.
    pub async fn connect(server: Arc<dyn IUploadServer>, mut config: EngineConfig) -> Self {
        let cancel = CancellationToken::new();
        match server.fetch_config(&cancel).await {
            Ok(Some(remote)) => {
                config.apply_remote(&remote);
                info!(
                    chunk_size = config.chunk_size,
                    max_concurrent = config.max_concurrent_uploads,
                    "Applied server transfer settings"
                );
            }
            Ok(None) => debug!("Server exposes no transfer settings"),
            Err(e) => warn!("Failed to fetch server transfer settings: {e}"),
        }
        Self::new(server, config)
    }

    /// The resolved settings this engine runs with
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub(crate) fn server(&self) -> &dyn IUploadServer {
        self.inner.server.as_ref()
    }

    // ------------------------------------------------------------------
    // Enqueue
    // ------------------------------------------------------------------

    /// Enqueues files for upload under `target` and starts transferring
    /// up to the concurrency limit
    ///
    /// Sources carrying a relative path (folder uploads) are targeted at
    /// `target/<relative directory>`, preserving the folder structure.
    ///
    /// # Returns
    /// The ids of the enqueued files, in input order
    pub fn enqueue(&self, sources: Vec<Arc<dyn IFileSource>>, target: &TargetPath) -> Vec<FileId> {
        let mut ids = Vec::with_capacity(sources.len());

        for source in sources {
            let file_target = resolve_target(target, source.as_ref());
            let record = UploadRecord::new(
                source.file_name().to_string(),
                source.len(),
                file_target,
                self.inner.config.chunk_size,
                self.inner.config.max_retries,
            );
            let file_id = record.file_id().clone();
            info!(
                file_id = %file_id,
                file_name = source.file_name(),
                size = source.len(),
                "Enqueued upload"
            );

            let entry = Arc::new(UploadEntry {
                record: Arc::new(Mutex::new(record)),
                source,
                progress: Arc::new(Mutex::new(ProgressState::new())),
                cancel: Mutex::new(CancellationToken::new()),
            });
            self.inner.records.insert(file_id.clone(), entry);
            self.inner
                .scheduler
                .lock()
                .unwrap()
                .push_back(file_id.clone());

            self.notify(&file_id);
            ids.push(file_id);
        }

        self.pump();
        ids
    }

    // ------------------------------------------------------------------
    // Control operations
    // ------------------------------------------------------------------

    /// Pauses an upload
    ///
    /// An active transfer is interrupted mid-chunk; a queued file is
    /// withdrawn from the queue. Returns false when the id is unknown or
    /// the upload is not pausable (completed, failed, already paused).
    pub fn pause(&self, file_id: &FileId) -> bool {
        let Some(entry) = self.entry(file_id) else {
            return false;
        };

        let paused_from = {
            let mut record = entry.record.lock().unwrap();
            let from = record.status();
            match from {
                UploadStatus::Uploading | UploadStatus::Pending => {
                    if record.set_status(UploadStatus::Paused).is_err() {
                        return false;
                    }
                    // The server may have received more bytes than were
                    // acknowledged before the abort; resume must re-query.
                    record.mark_offset_untrusted();
                    from
                }
                _ => return false,
            }
        };

        match paused_from {
            UploadStatus::Uploading => {
                // The running task observes the token, releases its slot,
                // and exits without touching the status again.
                entry.cancel.lock().unwrap().cancel();
            }
            _ => {
                self.inner.scheduler.lock().unwrap().remove_queued(file_id);
            }
        }

        info!(file_id = %file_id, "Paused upload");
        self.notify(file_id);
        true
    }

    /// Resumes a paused upload, prioritizing it over newly queued files
    ///
    /// Returns false when the id is unknown or the upload is not paused.
    pub fn resume(&self, file_id: &FileId) -> bool {
        let Some(entry) = self.entry(file_id) else {
            return false;
        };

        {
            let mut record = entry.record.lock().unwrap();
            if record.status() != UploadStatus::Paused
                || record.set_status(UploadStatus::Pending).is_err()
            {
                return false;
            }
        }

        self.inner
            .scheduler
            .lock()
            .unwrap()
            .push_front(file_id.clone());

        info!(file_id = %file_id, "Resumed upload");
        self.notify(file_id);
        self.pump();
        true
    }

    /// Cancels an upload and forgets it
    ///
    /// The record and its observers are dropped immediately; the remote
    /// resource is deleted best-effort in the background. Returns false
    /// when the id is unknown (including a second cancel).
    pub fn cancel(&self, file_id: &FileId) -> bool {
        let Some((_, entry)) = self.inner.records.remove(file_id) else {
            return false;
        };

        entry.cancel.lock().unwrap().cancel();
        {
            let mut scheduler = self.inner.scheduler.lock().unwrap();
            scheduler.remove_queued(file_id);
        }
        self.inner.file_observers.remove(file_id);

        let handle = entry.record.lock().unwrap().upload_handle().cloned();
        if let Some(handle) = handle {
            // One best-effort attempt with its own token; the entry's token
            // is already cancelled and must not abort the cleanup.
            let server = Arc::clone(&self.inner.server);
            let id = file_id.clone();
            tokio::spawn(async move {
                let cancel = CancellationToken::new();
                match server.delete_upload(&handle, &cancel).await {
                    Ok(()) => debug!(file_id = %id, "Deleted remote upload resource"),
                    Err(e) => warn!(file_id = %id, "Failed to delete remote upload resource: {e}"),
                }
            });
        }

        info!(file_id = %file_id, "Cancelled upload");
        true
    }

    /// Retries a failed upload from scratch, overwriting the destination
    ///
    /// The caller has confirmed the destination conflict; the upload is
    /// restarted with a fresh resource and an empty retry budget. Returns
    /// false when the id is unknown or the upload is not in `Error`.
    pub fn retry_with_replace(&self, file_id: &FileId) -> bool {
        let Some(entry) = self.entry(file_id) else {
            return false;
        };

        {
            let mut record = entry.record.lock().unwrap();
            if record.reset_for_replace().is_err() {
                return false;
            }
        }
        entry.progress.lock().unwrap().reset();

        self.inner
            .scheduler
            .lock()
            .unwrap()
            .push_front(file_id.clone());

        info!(file_id = %file_id, "Retrying upload with replace");
        self.notify(file_id);
        self.pump();
        true
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Subscribes an observer to one upload's progress
    ///
    /// The subscription is dropped automatically when the upload completes
    /// or is cancelled. No-op for an unknown id.
    pub fn subscribe(&self, file_id: &FileId, observer: Arc<dyn IProgressObserver>) {
        if !self.inner.records.contains_key(file_id) {
            return;
        }
        self.inner
            .file_observers
            .entry(file_id.clone())
            .or_default()
            .push(observer);
    }

    /// Subscribes an observer to every upload's progress
    pub fn subscribe_all(&self, observer: Arc<dyn IProgressObserver>) {
        self.inner.global_observers.lock().unwrap().push(observer);
    }

    /// Current progress snapshot for one upload; `None` for an unknown id
    pub fn snapshot(&self, file_id: &FileId) -> Option<ProgressEntry> {
        let entry = self.entry(file_id)?;
        Some(entry_snapshot(&entry))
    }

    /// Progress snapshots for every tracked upload
    pub fn snapshot_all(&self) -> Vec<ProgressEntry> {
        self.inner
            .records
            .iter()
            .map(|kv| entry_snapshot(kv.value()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Scheduling internals
    // ------------------------------------------------------------------

    fn entry(&self, file_id: &FileId) -> Option<Arc<UploadEntry>> {
        self.inner
            .records
            .get(file_id)
            .map(|kv| Arc::clone(kv.value()))
    }

    /// Fills free transfer slots from the queue
    pub(crate) fn pump(&self) {
        let admitted = self.inner.scheduler.lock().unwrap().admit();
        for file_id in admitted {
            self.spawn_transfer(file_id);
        }
    }

    /// Releases the slot held by a finished task and refills the queue
    ///
    /// Single lock acquisition so no other caller can observe the freed
    /// slot before the queue is drained into it. A record that went back
    /// to `Pending` while its task was winding down (resume racing the
    /// cancelled task's exit) is re-queued here, since `resume` could not
    /// queue it while the id was still in the active set.
    pub(crate) fn release_and_pump(&self, file_id: &FileId) {
        let admitted = {
            let mut scheduler = self.inner.scheduler.lock().unwrap();
            scheduler.release(file_id);
            if let Some(entry) = self.entry(file_id) {
                if entry.record.lock().unwrap().status() == UploadStatus::Pending {
                    scheduler.push_front(file_id.clone());
                }
            }
            scheduler.admit()
        };
        for next in admitted {
            self.spawn_transfer(next);
        }
    }

    fn spawn_transfer(&self, file_id: FileId) {
        let engine = self.clone();
        tokio::spawn(async move {
            transfer::run_transfer(engine, file_id).await;
        });
    }

    /// Builds the task view for an admitted id, installing a fresh token
    ///
    /// Returns `None` when the record was cancelled between admission and
    /// task startup.
    pub(crate) fn task_context(&self, file_id: &FileId) -> Option<TaskContext> {
        let entry = self.entry(file_id)?;
        let cancel = CancellationToken::new();
        *entry.cancel.lock().unwrap() = cancel.clone();
        Some(TaskContext {
            record: Arc::clone(&entry.record),
            source: Arc::clone(&entry.source),
            progress: Arc::clone(&entry.progress),
            cancel,
        })
    }

    // ------------------------------------------------------------------
    // Notification
    // ------------------------------------------------------------------

    /// Delivers a fresh progress entry to all subscribed observers
    ///
    /// The entry is built and the observer lists cloned under short locks;
    /// delivery happens after every lock has been released.
    pub(crate) fn notify(&self, file_id: &FileId) {
        let Some(entry) = self.entry(file_id) else {
            return;
        };
        let snapshot = entry_snapshot(&entry);

        let mut observers: Vec<Arc<dyn IProgressObserver>> = Vec::new();
        if let Some(subs) = self.inner.file_observers.get(file_id) {
            observers.extend(subs.iter().cloned());
        }
        observers.extend(self.inner.global_observers.lock().unwrap().iter().cloned());

        for observer in observers {
            observer.on_progress(&snapshot);
        }
    }

    /// Drops per-file subscriptions once an upload reaches `Completed`
    pub(crate) fn drop_file_observers(&self, file_id: &FileId) {
        self.inner.file_observers.remove(file_id);
    }
}

fn entry_snapshot(entry: &UploadEntry) -> ProgressEntry {
    let record = entry.record.lock().unwrap();
    let progress = entry.progress.lock().unwrap();
    ProgressEntry::from_record(&record, progress.estimator())
}

/// Resolves the per-file target directory for folder uploads
///
/// A source with relative path `photos/2024/img.jpg` under base `/inbox`
/// targets `/inbox/photos/2024`. An unjoinable relative path falls back to
/// the base with a warning rather than failing the enqueue.
fn resolve_target(base: &TargetPath, source: &dyn IFileSource) -> TargetPath {
    let Some(relative) = source.relative_path() else {
        return base.clone();
    };
    let Some((dir, _name)) = relative.rsplit_once('/') else {
        return base.clone();
    };
    match base.join(dir) {
        Ok(target) => target,
        Err(e) => {
            warn!(
                relative,
                "Invalid relative path, uploading to base target: {e}"
            );
            base.clone()
        }
    }
}
