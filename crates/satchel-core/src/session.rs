//! Attachment session: the owning component for one editing session.
//!
//! The session wires the registry, upload pipelines, projector, and blob
//! fetcher together. It is the single state-owning mutation path: pipelines
//! and callers never hold the registry directly, they go through session
//! operations (or the task handles the session returns).

use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::{GatewayConfig, SessionCredentials};
use crate::error::{Error, Result};
use crate::media::{infer_mime_type, BlobResolver};
use crate::models::{AttachmentRecord, FileHandle, ResourceCategory, ToolResourceMap};
use crate::preview::PreviewRef;
use crate::project::{self, FileLookup};
use crate::registry::{AttachmentRegistry, UploadStats};
use crate::upload::pipeline::lock_shared;
use crate::upload::{run_upload, HttpUploadService, UploadRequest, UploadService, UploadTask};
use crate::util::format_byte_size;

/// Default per-file upload ceiling.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// One file picked by the user for attachment.
#[derive(Debug, Clone)]
pub struct FileSelection {
    /// Original file name.
    pub file_name: String,
    /// Declared content type, if the picker provided one.
    pub content_type: Option<String>,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
    /// Functional category tag, if the caller specified one.
    pub category: Option<ResourceCategory>,
}

/// Attachment orchestration for one owning entity (e.g. a prompt draft).
pub struct AttachmentSession {
    registry: Arc<Mutex<AttachmentRegistry>>,
    service: Arc<dyn UploadService>,
    agent_endpoint: String,
    max_upload_bytes: u64,
    cancel_root: Mutex<CancellationToken>,
}

impl AttachmentSession {
    /// Create a session over an explicit upload service.
    pub fn new(service: Arc<dyn UploadService>, agent_endpoint: impl Into<String>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(AttachmentRegistry::new())),
            service,
            agent_endpoint: agent_endpoint.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cancel_root: Mutex::new(CancellationToken::new()),
        }
    }

    /// Create a session uploading through the configured HTTP gateway.
    pub fn for_gateway(config: &GatewayConfig, credentials: SessionCredentials) -> Result<Self> {
        let service = HttpUploadService::new(config, credentials)?;
        Ok(Self::new(
            Arc::new(service),
            config.agent_endpoint.clone(),
        ))
    }

    /// Override the per-file upload ceiling.
    #[must_use]
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Attach one file: register a placeholder record synchronously, then
    /// spawn its upload pipeline.
    ///
    /// The placeholder is visible in the registry before this call returns,
    /// so the interface never shows an unregistered file. Must be called
    /// within a Tokio runtime.
    pub fn attach(&self, selection: FileSelection) -> Result<UploadTask> {
        let file_name = selection.file_name.trim().to_string();
        if file_name.is_empty() {
            return Err(Error::InvalidInput(
                "Attachment file name cannot be empty".to_string(),
            ));
        }
        let byte_len = selection.bytes.len() as u64;
        if byte_len > self.max_upload_bytes {
            return Err(Error::InvalidInput(format!(
                "Attachment {file_name} is too large ({}, limit {})",
                format_byte_size(byte_len),
                format_byte_size(self.max_upload_bytes)
            )));
        }

        let mime_type = infer_mime_type(selection.content_type.as_deref(), &file_name);
        let payload = Bytes::from(selection.bytes);
        let handle = FileHandle::new();

        let preview = mime_type
            .starts_with("image/")
            .then(|| PreviewRef::from_bytes(mime_type.clone(), payload.clone()));

        let record = AttachmentRecord::pending(
            handle,
            file_name.clone(),
            mime_type.clone(),
            payload.clone(),
            selection.category,
            preview,
        )?;
        lock_shared(&self.registry).register(record);

        let request = UploadRequest {
            endpoint: self.agent_endpoint.clone(),
            file_name,
            mime_type,
            bytes: payload,
            provisional_id: handle,
            width: None,
            height: None,
            tool_resource: selection.category,
        };

        let cancellation = self.root_token().child_token();
        let join = tokio::spawn(run_upload(
            Arc::clone(&self.registry),
            Arc::clone(&self.service),
            request,
            cancellation.clone(),
        ));

        Ok(UploadTask::new(handle, cancellation, join))
    }

    /// Attach several files as independent concurrent pipelines.
    ///
    /// Stops at the first selection that fails validation; files attached
    /// before the failure keep uploading.
    pub fn attach_all(&self, selections: Vec<FileSelection>) -> Result<Vec<UploadTask>> {
        selections
            .into_iter()
            .map(|selection| self.attach(selection))
            .collect()
    }

    /// Detach a file, releasing its preview reference.
    ///
    /// A late upload completion for a detached file is silently dropped by
    /// the registry.
    pub fn detach(&self, handle: FileHandle) -> bool {
        lock_shared(&self.registry).remove(handle)
    }

    /// Clear all attachments, e.g. when the owning entity switches.
    pub fn reset(&self) {
        lock_shared(&self.registry).reset(Vec::new());
    }

    /// Signal abandonment of every in-flight submission.
    ///
    /// Registry state already merged stays merged; subsequent attaches get a
    /// fresh root token.
    pub fn abort_uploads(&self) {
        let mut root = self
            .cancel_root
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        root.cancel();
        *root = CancellationToken::new();
    }

    /// Records in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AttachmentRecord> {
        lock_shared(&self.registry).snapshot()
    }

    /// Subscribe to registry snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<AttachmentRecord>> {
        lock_shared(&self.registry).subscribe()
    }

    /// True iff every attachment is persisted with an authoritative id.
    #[must_use]
    pub fn all_ready(&self) -> bool {
        lock_shared(&self.registry).all_ready()
    }

    /// Per-category attachment counts.
    #[must_use]
    pub fn stats(&self) -> UploadStats {
        lock_shared(&self.registry).stats()
    }

    /// Project the registry into the persisted tool-resource shape.
    #[must_use]
    pub fn tool_resources(&self) -> ToolResourceMap {
        project::project(&self.snapshot())
    }

    /// Replace the registry with records rebuilt from persisted state.
    pub async fn restore(
        &self,
        map: &ToolResourceMap,
        lookup: &dyn FileLookup,
        resolver: &dyn BlobResolver,
    ) {
        let records = project::restore(map, lookup, resolver).await;
        lock_shared(&self.registry).reset(records);
    }

    fn root_token(&self) -> CancellationToken {
        self.cancel_root
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
