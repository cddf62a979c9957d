//! Clipboard image encoding and decoding.
//!
//! Raw RGBA clipboard payloads are PNG-compressed before hashing and
//! storage; decoded images are kept as `RgbaImage` for cache residency.

use image::RgbaImage;
use std::io::Cursor;
use tracing::debug;

use crate::error::{HistoryError, Result};

/// Encode a raw RGBA buffer as PNG bytes.
///
/// Fails if the buffer doesn't match `width * height * 4` or the PNG
/// encoder rejects the image; the capture is aborted in that case.
pub fn encode_rgba_to_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>> {
    let rgba_image = RgbaImage::from_raw(width, height, rgba.to_vec()).ok_or_else(|| {
        HistoryError::ImageEncode(format!(
            "RGBA buffer length {} does not match {}x{} dimensions",
            rgba.len(),
            width,
            height
        ))
    })?;

    let mut png_data = Vec::new();
    let mut cursor = Cursor::new(&mut png_data);
    rgba_image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| HistoryError::ImageEncode(e.to_string()))?;

    Ok(png_data)
}

/// Decode stored PNG bytes back to an RGBA image.
///
/// Returns `None` on malformed data; a blob that no longer decodes is
/// treated the same as a missing blob.
pub fn decode_png(png_bytes: &[u8]) -> Option<RgbaImage> {
    let img = image::load_from_memory_with_format(png_bytes, image::ImageFormat::Png).ok()?;
    let rgba = img.to_rgba8();
    debug!(
        width = rgba.width(),
        height = rgba.height(),
        "Decoded clipboard image"
    );
    Some(rgba)
}

/// Read PNG dimensions from the header without a full decode.
pub fn png_dimensions(png_bytes: &[u8]) -> Option<(u32, u32)> {
    let cursor = Cursor::new(png_bytes);
    let reader = image::ImageReader::with_format(cursor, image::ImageFormat::Png);
    reader.into_dimensions().ok()
}

/// Estimated resident memory cost of a decoded image.
///
/// width x height x 4 bytes (RGBA), ignoring compressed size. This is a
/// documented approximation used for cache budget accounting, not an exact
/// byte count.
pub fn estimated_cost(width: u32, height: u32) -> u64 {
    width as u64 * height as u64 * 4
}
