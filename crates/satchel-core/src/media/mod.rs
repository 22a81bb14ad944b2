//! Media helpers: MIME inference, image dimension probing, and the
//! authenticated blob fetcher.

mod fetch;
mod image;

pub use fetch::{AuthenticatedBlobFetcher, BlobResolver};
pub use image::decode_dimensions;

/// Infer a usable MIME type from a declared content-type hint and the file
/// name.
///
/// A declared type wins unless it is the generic octet-stream, or a `text/`
/// type shadowing a name whose extension clearly indicates media (browsers
/// and pickers sometimes mislabel media files this way).
pub fn infer_mime_type(content_type: Option<&str>, file_name: &str) -> String {
    let extension_guess = mime_guess::from_path(file_name)
        .first_raw()
        .map(str::to_string);

    if let Some(content_type) = content_type {
        let trimmed = content_type.trim();
        if !trimmed.is_empty() {
            let normalized = trimmed.to_ascii_lowercase();

            if normalized != "application/octet-stream"
                && !(normalized.starts_with("text/")
                    && extension_guess.as_deref().is_some_and(is_media_mime_type))
            {
                return trimmed.to_string();
            }
        }
    }

    extension_guess.unwrap_or_else(|| {
        mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    })
}

fn is_media_mime_type(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
        || mime_type.starts_with("video/")
        || mime_type.starts_with("audio/")
}
