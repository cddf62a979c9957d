//! System clipboard writes.
//!
//! The core supplies raw text/bytes; this module is the arboard-backed
//! collaborator that puts an entry back on the clipboard.

use anyhow::{Context, Result};
use arboard::Clipboard;
use std::borrow::Cow;
use tracing::info;

use crate::history::image::decode_png;
use crate::history::service::ClipboardHistory;
use crate::history::types::{Entry, EntryPayload};

/// Copy a history entry's content back to the system clipboard.
pub fn copy_entry_to_clipboard(history: &ClipboardHistory, entry: &Entry) -> Result<()> {
    let payload = history
        .entry_payload(entry)
        .context("entry content is unrecoverable")?;

    let mut clipboard = Clipboard::new().context("failed to open system clipboard")?;
    match payload {
        EntryPayload::Text(text) => {
            clipboard
                .set_text(text)
                .context("failed to write text to clipboard")?;
            info!("Copied text entry to clipboard");
        }
        EntryPayload::ImagePng(png) => {
            let rgba = decode_png(&png).context("stored image no longer decodes")?;
            let (width, height) = (rgba.width() as usize, rgba.height() as usize);
            clipboard
                .set_image(arboard::ImageData {
                    width,
                    height,
                    bytes: Cow::Owned(rgba.into_raw()),
                })
                .context("failed to write image to clipboard")?;
            info!(width, height, "Copied image entry to clipboard");
        }
    }
    Ok(())
}
