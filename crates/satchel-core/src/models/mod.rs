//! Data models for Satchel

mod attachment;
mod category;
mod tool_resource;

pub use attachment::{
    AttachmentPatch, AttachmentRecord, FileHandle, FileId, FileMetadata,
    PROGRESS_DIMENSIONS_EXTRACTED, PROGRESS_PERSISTED, PROGRESS_REGISTERED,
};
pub use category::ResourceCategory;
pub use tool_resource::{ToolResourceEntry, ToolResourceMap};
