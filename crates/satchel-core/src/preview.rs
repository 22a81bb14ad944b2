//! Ownership-bearing preview references.
//!
//! A [`PreviewRef`] owns the renderable content backing an attachment
//! preview: decoded bytes held in memory, or a remote location the rendering
//! layer can resolve. The underlying resource is released exactly once;
//! clones handed out in registry snapshots share it, so releasing through
//! any clone invalidates all of them.

use std::sync::{Arc, Mutex};

use bytes::Bytes;

/// Content backing a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewSource {
    /// In-memory bytes with their MIME type.
    Memory { mime_type: String, bytes: Bytes },
    /// Remote path or URL resolvable by the rendering layer.
    Remote { location: String },
}

/// Shared, release-once handle over preview content.
#[derive(Debug, Clone)]
pub struct PreviewRef {
    inner: Arc<Mutex<Option<PreviewSource>>>,
}

impl PreviewRef {
    /// Create a preview over in-memory bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self::from_source(PreviewSource::Memory {
            mime_type: mime_type.into(),
            bytes,
        })
    }

    /// Create a preview over a remote location.
    pub fn from_remote(location: impl Into<String>) -> Self {
        Self::from_source(PreviewSource::Remote {
            location: location.into(),
        })
    }

    fn from_source(source: PreviewSource) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(source))),
        }
    }

    /// Read the backing content. Returns `None` once released.
    #[must_use]
    pub fn source(&self) -> Option<PreviewSource> {
        let guard = self.inner.lock().ok()?;
        guard.as_ref().cloned()
    }

    /// Whether the underlying resource has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.source().is_none()
    }

    /// Release the underlying resource.
    ///
    /// Returns `true` when this call actually freed the resource and `false`
    /// when it was already released. Releasing twice is a no-op, not an
    /// error.
    pub fn release(&self) -> bool {
        let Ok(mut guard) = self.inner.lock() else {
            return false;
        };
        guard.take().is_some()
    }
}
