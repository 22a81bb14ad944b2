//! Attachment record model

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::preview::PreviewRef;
use crate::util::unix_timestamp_millis_now;

use super::category::ResourceCategory;

/// Progress value of a freshly registered record.
pub const PROGRESS_REGISTERED: f32 = 0.0;
/// Progress value once image dimensions have been extracted.
pub const PROGRESS_DIMENSIONS_EXTRACTED: f32 = 0.6;
/// Progress value of a fully persisted record.
pub const PROGRESS_PERSISTED: f32 = 1.0;

/// Stable internal handle for an attachment, using UUID v7.
///
/// Generated at selection time and never rewritten; doubles as the
/// provisional identifier correlated against upload acknowledgments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle(Uuid);

impl FileHandle {
    /// Create a new unique handle using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this handle.
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for FileHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Authoritative identifier assigned by the upload service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Persisted metadata for a single file, as returned by the owning
/// system's file lookup during restoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub file_id: FileId,
    pub filename: String,
    pub mime_type: String,
    pub byte_size: u64,
    pub filepath: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// One attached or restored file tracked by the registry.
#[derive(Debug, Clone)]
pub struct AttachmentRecord {
    /// Stable handle; also the provisional upload identifier.
    pub handle: FileHandle,
    /// Service-assigned identifier, `None` until persisted.
    pub file_id: Option<FileId>,
    /// Content MIME type.
    pub mime_type: String,
    /// Display file name.
    pub display_name: String,
    /// Service storage path; empty until upload completes.
    pub stored_path: String,
    /// Upload progress in [0, 1]; monotonically non-decreasing.
    pub progress: f32,
    /// Renderable preview reference, if one exists.
    pub preview: Option<PreviewRef>,
    /// Attachment size in bytes.
    pub byte_size: u64,
    /// Pixel width, images only.
    pub width: Option<u32>,
    /// Pixel height, images only.
    pub height: Option<u32>,
    /// Whether the service has persisted this attachment.
    pub persisted: bool,
    /// Functional category tag, if the caller specified one.
    pub category: Option<ResourceCategory>,
    /// Raw bytes pending upload; cleared after submission.
    pub payload: Option<Bytes>,
    /// Creation timestamp (Unix ms).
    pub created_at: i64,
}

impl AttachmentRecord {
    /// Create a pending record for a freshly selected file.
    pub fn pending(
        handle: FileHandle,
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        payload: Bytes,
        category: Option<ResourceCategory>,
        preview: Option<PreviewRef>,
    ) -> Result<Self> {
        let display_name = display_name.into().trim().to_string();
        let mime_type = mime_type.into().trim().to_string();

        if display_name.is_empty() {
            return Err(Error::InvalidInput(
                "Attachment display name cannot be empty".to_string(),
            ));
        }
        if mime_type.is_empty() {
            return Err(Error::InvalidInput(
                "Attachment mime_type cannot be empty".to_string(),
            ));
        }
        if payload.is_empty() {
            return Err(Error::InvalidInput(
                "Attachment payload cannot be empty".to_string(),
            ));
        }

        let byte_size = payload.len() as u64;
        Ok(Self {
            handle,
            file_id: None,
            mime_type,
            display_name,
            stored_path: String::new(),
            progress: PROGRESS_REGISTERED,
            preview,
            byte_size,
            width: None,
            height: None,
            persisted: false,
            category,
            payload: Some(payload),
            created_at: unix_timestamp_millis_now(),
        })
    }

    /// Create an authoritative record for an already-persisted file.
    pub fn restored(
        metadata: FileMetadata,
        category: Option<ResourceCategory>,
        preview: Option<PreviewRef>,
    ) -> Self {
        Self {
            handle: FileHandle::new(),
            file_id: Some(metadata.file_id),
            mime_type: metadata.mime_type,
            display_name: metadata.filename,
            stored_path: metadata.filepath,
            progress: PROGRESS_PERSISTED,
            preview,
            byte_size: metadata.byte_size,
            width: metadata.width,
            height: metadata.height,
            persisted: true,
            category,
            payload: None,
            created_at: unix_timestamp_millis_now(),
        }
    }

    /// Synthesize a placeholder for a persisted identifier whose metadata
    /// could not be resolved. Restoration must never fail outright, so the
    /// record carries progress 1 with an empty path and a synthetic name.
    pub fn placeholder(file_id: FileId, category: Option<ResourceCategory>) -> Self {
        let display_name = format!("attachment-{file_id}");
        Self {
            handle: FileHandle::new(),
            file_id: Some(file_id),
            mime_type: "application/octet-stream".to_string(),
            display_name,
            stored_path: String::new(),
            progress: PROGRESS_PERSISTED,
            preview: None,
            byte_size: 0,
            width: None,
            height: None,
            persisted: true,
            category,
            payload: None,
            created_at: unix_timestamp_millis_now(),
        }
    }

    /// Whether the declared type indicates an image.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Whether this record is fully persisted with an authoritative id.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.file_id.is_some() && self.progress >= PROGRESS_PERSISTED
    }

    /// Merge a partial patch into this record.
    ///
    /// Progress merges as `max(old, new)` so it can never decrease. A
    /// replaced preview reference is released before the new one is stored.
    pub fn merge(&mut self, patch: AttachmentPatch) {
        if let Some(file_id) = patch.file_id {
            self.file_id = Some(file_id);
        }
        if let Some(stored_path) = patch.stored_path {
            self.stored_path = stored_path;
        }
        if let Some(progress) = patch.progress {
            self.progress = self.progress.max(progress);
        }
        if let Some(width) = patch.width {
            self.width = Some(width);
        }
        if let Some(height) = patch.height {
            self.height = Some(height);
        }
        if let Some(persisted) = patch.persisted {
            self.persisted = persisted;
        }
        if let Some(preview) = patch.preview {
            if let Some(existing) = self.preview.take() {
                existing.release();
            }
            self.preview = Some(preview);
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if patch.clear_payload {
            self.payload = None;
        }
    }
}

/// Partial update applied to an [`AttachmentRecord`] by [`merge`].
///
/// [`merge`]: AttachmentRecord::merge
#[derive(Debug, Clone, Default)]
pub struct AttachmentPatch {
    pub file_id: Option<FileId>,
    pub stored_path: Option<String>,
    pub progress: Option<f32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub persisted: Option<bool>,
    pub preview: Option<PreviewRef>,
    pub category: Option<ResourceCategory>,
    pub clear_payload: bool,
}
