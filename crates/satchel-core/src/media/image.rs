//! In-memory image dimension probing.

use image::GenericImageView;

use crate::error::{Error, Result};

/// Decode image bytes purely to obtain pixel dimensions.
///
/// The whole payload is decoded in memory; callers should only invoke this
/// for declared image types.
pub fn decode_dimensions(source_bytes: &[u8]) -> Result<(u32, u32)> {
    if source_bytes.is_empty() {
        return Err(Error::InvalidInput(
            "Image source bytes cannot be empty".to_string(),
        ));
    }

    let decoded = image::load_from_memory(source_bytes)
        .map_err(|error| Error::ImageDecode(format!("Failed to decode image: {error}")))?;

    Ok(decoded.dimensions())
}
