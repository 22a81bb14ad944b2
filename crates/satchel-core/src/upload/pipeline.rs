//! Per-file upload pipeline.
//!
//! Each attached file runs one pipeline task:
//! registered (progress 0) -> dimensions extracted (progress 0.6, images
//! only) -> submitted -> finalized (progress 1, authoritative id). Milestones
//! are merged into the registry keyed by the stable handle, so completions
//! landing in any order can never touch an unrelated record.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::media::decode_dimensions;
use crate::models::{
    AttachmentPatch, FileHandle, PROGRESS_DIMENSIONS_EXTRACTED, PROGRESS_PERSISTED,
};
use crate::preview::PreviewRef;
use crate::registry::AttachmentRegistry;

use super::{UploadRequest, UploadService};

/// A spawned upload with its own completion and cancellation handles.
#[derive(Debug)]
pub struct UploadTask {
    /// Stable handle of the record this task is uploading.
    pub handle: FileHandle,
    cancellation: CancellationToken,
    join: JoinHandle<Result<()>>,
}

impl UploadTask {
    pub(crate) fn new(
        handle: FileHandle,
        cancellation: CancellationToken,
        join: JoinHandle<Result<()>>,
    ) -> Self {
        Self {
            handle,
            cancellation,
            join,
        }
    }

    /// Signal abandonment of this upload. Registry state already merged is
    /// not rolled back.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Token observed by this task; chained from the session root token.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the pipeline task has finished (in any way).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the pipeline to finish and surface its outcome.
    pub async fn wait(self) -> Result<()> {
        match self.join.await {
            Ok(result) => result,
            Err(error) => Err(Error::Transport(format!("Upload task failed: {error}"))),
        }
    }
}

/// Run one file's upload pipeline to completion.
///
/// The record must already be registered under `request.provisional_id`.
pub async fn run_upload(
    registry: Arc<Mutex<AttachmentRegistry>>,
    service: Arc<dyn UploadService>,
    mut request: UploadRequest,
    cancellation: CancellationToken,
) -> Result<()> {
    let handle = request.provisional_id;

    if request.mime_type.starts_with("image/") {
        match decode_dimensions(&request.bytes) {
            Ok((width, height)) => {
                request.width = Some(width);
                request.height = Some(height);
                lock_shared(&registry).update(
                    handle,
                    AttachmentPatch {
                        progress: Some(PROGRESS_DIMENSIONS_EXTRACTED),
                        width: Some(width),
                        height: Some(height),
                        ..AttachmentPatch::default()
                    },
                );
            }
            Err(error) => {
                warn!(handle = %handle, "Skipping image dimensions: {error}");
            }
        }
    }

    let file_name = request.file_name.clone();
    let receipt = tokio::select! {
        () = cancellation.cancelled() => {
            debug!(handle = %handle, "Upload cancelled before service acknowledgment");
            return Err(Error::Cancelled(format!(
                "Upload of {file_name} was cancelled"
            )));
        }
        result = service.upload(request) => result?,
    };

    let correlation = match receipt.temp_file_id.parse::<FileHandle>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(
                handle = %handle,
                temp_file_id = %receipt.temp_file_id,
                "Service returned an unparseable temp_file_id, correlating by local handle"
            );
            handle
        }
    };

    let mut registry = lock_shared(&registry);
    let preview = match registry.get(correlation) {
        Some(record) if record.preview.is_none() && record.is_image() => {
            Some(PreviewRef::from_remote(receipt.filepath.clone()))
        }
        Some(_) => None,
        None => {
            // Completion racing a manual removal; expected and harmless.
            debug!(handle = %correlation, "Dropping upload completion for removed attachment");
            return Ok(());
        }
    };

    registry.update(
        correlation,
        AttachmentPatch {
            file_id: Some(receipt.file_id),
            stored_path: Some(receipt.filepath),
            progress: Some(PROGRESS_PERSISTED),
            persisted: Some(true),
            preview,
            clear_payload: true,
            ..AttachmentPatch::default()
        },
    );
    Ok(())
}

// Registry mutations are atomic merges, so a poisoned lock still guards a
// consistent registry; recover the guard instead of propagating the panic.
pub(crate) fn lock_shared(
    registry: &Mutex<AttachmentRegistry>,
) -> MutexGuard<'_, AttachmentRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}
