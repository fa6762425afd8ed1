//! Per-file transfer task
//!
//! One task runs per admitted upload and drives the full protocol sequence:
//! create the resource if needed, verify the offset whenever it is untrusted,
//! then append chunks until every byte is acknowledged. The task exits when
//! the upload completes, fails permanently, or its cancellation token fires
//! (pause or cancel); the status decision for a cancellation was already
//! made by the engine, so the task just stops.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use hauler_core::domain::newtypes::FileId;
use hauler_core::domain::record::UploadStatus;
use hauler_core::ports::ProtocolError;

use crate::engine::{TaskContext, UploadEngine};

/// Linear backoff delay before retry attempt `retry_count`
fn backoff_for(base: Duration, retry_count: u32) -> Duration {
    base * retry_count
}

/// Drives one upload to completion, error, or interruption
pub(crate) async fn run_transfer(engine: UploadEngine, file_id: FileId) {
    // Cancelled between admission and startup: just free the slot.
    let Some(ctx) = engine.task_context(&file_id) else {
        engine.release_and_pump(&file_id);
        return;
    };

    {
        let mut record = ctx.record.lock().unwrap();
        // A pause can land between admission and startup; leave the record
        // alone and let resume re-queue it.
        if record.set_status(UploadStatus::Uploading).is_err() {
            drop(record);
            engine.release_and_pump(&file_id);
            return;
        }
    }
    ctx.progress.lock().unwrap().begin();
    engine.notify(&file_id);

    drive(&engine, &file_id, &ctx).await;
    engine.release_and_pump(&file_id);
}

async fn drive(engine: &UploadEngine, file_id: &FileId, ctx: &TaskContext) {
    loop {
        let (status, handle, offset, trusted, size) = {
            let record = ctx.record.lock().unwrap();
            (
                record.status(),
                record.upload_handle().cloned(),
                record.offset(),
                record.offset_trusted(),
                record.file_size(),
            )
        };

        // Pause or cancel flipped the status while a wire call was in
        // flight; the engine already handled the transition.
        if status != UploadStatus::Uploading {
            return;
        }

        // Step 1: negotiate the resource
        let Some(handle) = handle else {
            let snapshot = ctx.record.lock().unwrap().clone();
            match engine
                .server()
                .create_upload(&snapshot, &ctx.cancel)
                .await
            {
                Ok(handle) => {
                    debug!(file_id = %file_id, handle = %handle, "Created upload resource");
                    ctx.record.lock().unwrap().set_upload_handle(handle);
                }
                Err(ProtocolError::Cancelled) => return,
                Err(e) => {
                    fail(engine, file_id, ctx, format!("create failed: {e}"));
                    return;
                }
            }
            continue;
        };

        // Step 2: verify the offset after create, conflict, or resume
        if !trusted {
            match engine.server().query_offset(&handle, &ctx.cancel).await {
                Ok(server_offset) => {
                    if ctx
                        .record
                        .lock()
                        .unwrap()
                        .set_offset(server_offset)
                        .is_err()
                    {
                        fail(
                            engine,
                            file_id,
                            ctx,
                            format!(
                                "server offset {server_offset} exceeds file size {size}"
                            ),
                        );
                        return;
                    }
                    ctx.progress.lock().unwrap().resync();
                    engine.notify(file_id);
                }
                Err(ProtocolError::Cancelled) => return,
                Err(e) => {
                    if !backoff(engine, file_id, ctx, &e).await {
                        return;
                    }
                }
            }
            continue;
        }

        // Step 3: done?
        if offset >= size {
            complete(engine, file_id, ctx);
            return;
        }

        // Step 4: append the next chunk
        let (start, end) = ctx.record.lock().unwrap().next_chunk_range();
        let data = match ctx.source.read_range(start, end - start).await {
            Ok(data) => data,
            Err(e) => {
                fail(engine, file_id, ctx, format!("read failed: {e}"));
                return;
            }
        };

        match engine
            .server()
            .append_chunk(&handle, start, &data, &ctx.cancel)
            .await
        {
            Ok(new_offset) => {
                let done = {
                    let mut record = ctx.record.lock().unwrap();
                    let delta = new_offset.saturating_sub(record.offset());
                    if record.set_offset(new_offset).is_err() {
                        drop(record);
                        fail(
                            engine,
                            file_id,
                            ctx,
                            format!("server offset {new_offset} exceeds file size {size}"),
                        );
                        return;
                    }
                    record.reset_retries();
                    ctx.progress.lock().unwrap().on_offset_advance(delta);
                    record.is_complete()
                };
                if done {
                    complete(engine, file_id, ctx);
                    return;
                }
                engine.notify(file_id);
            }
            Err(ProtocolError::OffsetConflict) => {
                // Expected synchronization event: adopt the server's offset
                // and continue immediately, without touching the retry budget.
                match engine.server().query_offset(&handle, &ctx.cancel).await {
                    Ok(server_offset) => {
                        if ctx
                            .record
                            .lock()
                            .unwrap()
                            .set_offset(server_offset)
                            .is_err()
                        {
                            fail(
                                engine,
                                file_id,
                                ctx,
                                format!(
                                    "server offset {server_offset} exceeds file size {size}"
                                ),
                            );
                            return;
                        }
                        ctx.progress.lock().unwrap().resync();
                        info!(
                            file_id = %file_id,
                            server_offset,
                            "Resolved offset conflict from server"
                        );
                        engine.notify(file_id);
                    }
                    Err(ProtocolError::Cancelled) => return,
                    Err(e) => {
                        if !backoff(engine, file_id, ctx, &e).await {
                            return;
                        }
                    }
                }
            }
            Err(ProtocolError::Cancelled) => return,
            Err(e) => {
                if !backoff(engine, file_id, ctx, &e).await {
                    return;
                }
            }
        }
    }
}

/// Marks the upload failed and notifies observers
fn fail(engine: &UploadEngine, file_id: &FileId, ctx: &TaskContext, message: String) {
    error!(file_id = %file_id, "Upload failed: {message}");
    // The transition can only fail if pause/cancel won a race; the record
    // then already left Uploading and keeps its state.
    let _ = ctx.record.lock().unwrap().set_error(message);
    engine.notify(file_id);
}

/// Marks the upload completed and drops its per-file subscriptions
fn complete(engine: &UploadEngine, file_id: &FileId, ctx: &TaskContext) {
    let _ = ctx.record.lock().unwrap().set_status(UploadStatus::Completed);
    info!(file_id = %file_id, "Upload completed");
    engine.notify(file_id);
    engine.drop_file_observers(file_id);
}

/// Counts a retryable failure and sleeps the linear backoff delay
///
/// Returns false when the budget is exhausted (the upload is failed) or the
/// sleep was interrupted by cancellation.
async fn backoff(
    engine: &UploadEngine,
    file_id: &FileId,
    ctx: &TaskContext,
    err: &ProtocolError,
) -> bool {
    let (attempt, exhausted, base) = {
        let mut record = ctx.record.lock().unwrap();
        let attempt = record.increment_retry();
        (attempt, record.retries_exhausted(), engine.config().backoff_base)
    };

    if exhausted {
        fail(engine, file_id, ctx, format!("retries exhausted: {err}"));
        return false;
    }

    let delay = backoff_for(base, attempt);
    warn!(
        file_id = %file_id,
        attempt,
        delay_ms = delay.as_millis() as u64,
        "Chunk failed, backing off: {err}"
    );
    tokio::select! {
        _ = ctx.cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
