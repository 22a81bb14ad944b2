//! Attachment registry.
//!
//! The registry is the single source of truth for what is attached,
//! uploading, or fully persisted. Records are kept in insertion order and
//! keyed by their stable [`FileHandle`]; an auxiliary index maps
//! authoritative [`FileId`]s back to handles. All mutation flows through the
//! five operations below (or their [`RegistryCommand`] dispatch), and every
//! mutation synchronously publishes the new snapshot to subscribers before
//! returning.

use std::collections::HashMap;

use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::models::{
    AttachmentPatch, AttachmentRecord, FileHandle, FileId, PROGRESS_PERSISTED,
};

/// Mutation commands accepted by [`AttachmentRegistry::apply`].
#[derive(Debug)]
pub enum RegistryCommand {
    Register(AttachmentRecord),
    Update {
        handle: FileHandle,
        patch: AttachmentPatch,
    },
    Remove(FileHandle),
    Reset(Vec<AttachmentRecord>),
}

/// Per-category attachment counts derived from the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub total: usize,
    pub images: usize,
    pub documents: usize,
    pub uploading: usize,
}

/// Ordered-by-insertion, handle-keyed collection of attachment records.
#[derive(Debug)]
pub struct AttachmentRegistry {
    records: IndexMap<FileHandle, AttachmentRecord>,
    by_file_id: HashMap<FileId, FileHandle>,
    snapshot_tx: watch::Sender<Vec<AttachmentRecord>>,
}

impl AttachmentRegistry {
    #[must_use]
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        Self {
            records: IndexMap::new(),
            by_file_id: HashMap::new(),
            snapshot_tx,
        }
    }

    /// Subscribe to registry snapshots. The receiver observes every
    /// mutation in order, starting from the current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<AttachmentRecord>> {
        self.snapshot_tx.subscribe()
    }

    /// Apply a mutation command. This is the only mutation path besides the
    /// named operations it dispatches to.
    pub fn apply(&mut self, command: RegistryCommand) {
        match command {
            RegistryCommand::Register(record) => {
                self.register(record);
            }
            RegistryCommand::Update { handle, patch } => self.update(handle, patch),
            RegistryCommand::Remove(handle) => {
                self.remove(handle);
            }
            RegistryCommand::Reset(records) => self.reset(records),
        }
    }

    /// Register a new record. A colliding handle is a logged no-op.
    ///
    /// Returns `true` when the record was inserted.
    pub fn register(&mut self, record: AttachmentRecord) -> bool {
        if self.records.contains_key(&record.handle) {
            warn!(handle = %record.handle, "Ignoring attachment registration with colliding handle");
            return false;
        }

        if let Some(file_id) = record.file_id.clone() {
            self.by_file_id.insert(file_id, record.handle);
        }
        self.records.insert(record.handle, record);
        self.publish();
        true
    }

    /// Merge a partial patch into an existing record.
    ///
    /// Unknown handles are a silent no-op: an upload completion racing a
    /// manual removal is expected and harmless.
    pub fn update(&mut self, handle: FileHandle, patch: AttachmentPatch) {
        let Some(record) = self.records.get_mut(&handle) else {
            debug!(handle = %handle, "Dropping update for unknown attachment handle");
            return;
        };

        if let Some(file_id) = patch.file_id.clone() {
            self.by_file_id.insert(file_id, handle);
        }
        record.merge(patch);
        self.publish();
    }

    /// Remove a record, releasing its preview reference.
    ///
    /// Returns `true` when a record was removed.
    pub fn remove(&mut self, handle: FileHandle) -> bool {
        let Some(record) = self.records.shift_remove(&handle) else {
            debug!(handle = %handle, "Dropping removal for unknown attachment handle");
            return false;
        };

        if let Some(file_id) = &record.file_id {
            self.by_file_id.remove(file_id);
        }
        if let Some(preview) = &record.preview {
            preview.release();
        }
        self.publish();
        true
    }

    /// Replace the entire registry contents, releasing the previews of all
    /// outgoing records. Used when the owning entity switches.
    pub fn reset(&mut self, records: Vec<AttachmentRecord>) {
        for record in self.records.values() {
            if let Some(preview) = &record.preview {
                preview.release();
            }
        }
        self.records.clear();
        self.by_file_id.clear();

        for record in records {
            if self.records.contains_key(&record.handle) {
                warn!(handle = %record.handle, "Ignoring reset record with colliding handle");
                continue;
            }
            if let Some(file_id) = record.file_id.clone() {
                self.by_file_id.insert(file_id, record.handle);
            }
            self.records.insert(record.handle, record);
        }
        self.publish();
    }

    /// Records in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AttachmentRecord> {
        self.records.values().cloned().collect()
    }

    /// Look up a record by its stable handle.
    #[must_use]
    pub fn get(&self, handle: FileHandle) -> Option<&AttachmentRecord> {
        self.records.get(&handle)
    }

    /// Resolve an authoritative identifier back to its handle.
    #[must_use]
    pub fn find_by_file_id(&self, file_id: &FileId) -> Option<FileHandle> {
        self.by_file_id.get(file_id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True iff every record is persisted with an authoritative identifier.
    /// An empty registry is vacuously ready.
    #[must_use]
    pub fn all_ready(&self) -> bool {
        self.records.values().all(AttachmentRecord::is_ready)
    }

    /// Per-category counts. A record still uploading counts only as
    /// `uploading`; completed records bucket by image vs non-image.
    #[must_use]
    pub fn stats(&self) -> UploadStats {
        let mut stats = UploadStats {
            total: self.records.len(),
            ..UploadStats::default()
        };

        for record in self.records.values() {
            if record.progress < PROGRESS_PERSISTED {
                stats.uploading += 1;
            } else if record.is_image() {
                stats.images += 1;
            } else {
                stats.documents += 1;
            }
        }
        stats
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

impl Default for AttachmentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
