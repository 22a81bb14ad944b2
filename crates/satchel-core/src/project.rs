//! Resource projection between the registry and the persisted
//! tool-resource shape.
//!
//! `project` and `restore` are pure, stateless transforms. Projection only
//! ever sees records that already hold an authoritative identifier;
//! restoration only ever reconstructs already-persisted attachments, so
//! in-flight upload state is lost across a project/restore cycle by design.

use std::collections::HashMap;

use tracing::debug;

use crate::media::BlobResolver;
use crate::models::{
    AttachmentRecord, FileId, FileMetadata, ResourceCategory, ToolResourceMap,
};
use crate::preview::PreviewRef;

/// Metadata lookup seam for restoration.
pub trait FileLookup: Send + Sync {
    fn find(&self, file_id: &FileId) -> Option<FileMetadata>;
}

impl FileLookup for HashMap<FileId, FileMetadata> {
    fn find(&self, file_id: &FileId) -> Option<FileMetadata> {
        self.get(file_id).cloned()
    }
}

/// Category assignment for a record without an explicit tag.
///
/// Unrecognized mime types intentionally fall back to search indexing; do
/// not widen this mapping without confirming downstream intent.
#[must_use]
pub fn infer_category(mime_type: &str) -> ResourceCategory {
    if mime_type.starts_with("image/") {
        return ResourceCategory::ImageEdit;
    }
    // PDF and text-like types index into search, and so does everything
    // else until a dedicated category exists.
    ResourceCategory::Search
}

/// Group the authoritative identifiers of persisted records by category.
///
/// Records still uploading (no authoritative id) are excluded. Returns an
/// empty map when no record qualifies.
#[must_use]
pub fn project(records: &[AttachmentRecord]) -> ToolResourceMap {
    let mut map = ToolResourceMap::new();

    for record in records {
        let Some(file_id) = record.file_id.clone() else {
            continue;
        };
        let category = record
            .category
            .unwrap_or_else(|| infer_category(&record.mime_type));
        map.insert(category, file_id);
    }
    map
}

/// Rebuild authoritative registry records from a persisted tool-resource
/// map.
///
/// Identifiers the lookup cannot resolve synthesize placeholder records;
/// restoration never fails outright. Image types get a renderable preview
/// through the blob resolver, falling back to the raw stored path.
pub async fn restore(
    map: &ToolResourceMap,
    lookup: &dyn FileLookup,
    resolver: &dyn BlobResolver,
) -> Vec<AttachmentRecord> {
    let mut records = Vec::with_capacity(map.len());

    for (category, entry) in map.iter() {
        for file_id in &entry.file_ids {
            let Some(metadata) = lookup.find(file_id) else {
                debug!(file_id = %file_id, "Persisted identifier missing from lookup, synthesizing placeholder");
                records.push(AttachmentRecord::placeholder(
                    file_id.clone(),
                    Some(category),
                ));
                continue;
            };

            let preview = if metadata.mime_type.starts_with("image/") {
                match resolver.resolve(file_id).await {
                    Some(preview) => Some(preview),
                    None => Some(PreviewRef::from_remote(metadata.filepath.clone())),
                }
            } else {
                None
            };

            records.push(AttachmentRecord::restored(metadata, Some(category), preview));
        }
    }
    records
}
