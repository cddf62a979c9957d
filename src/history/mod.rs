//! Clipboard History Module
//!
//! Content-addressed clipboard history: bounded newest-first entry list,
//! one PNG blob per unique image fingerprint, a cost-accounted decoded-
//! image cache, and JSON manifest persistence on a background worker.
//!
//! ## Module Structure
//! - `types`: core types (Entry, Category, CapturePayload)
//! - `blob_store`: fingerprinting and on-disk image blobs
//! - `image`: PNG encoding/decoding and cost estimation
//! - `image_cache`: bounded in-memory decoded-image cache
//! - `store`: bounded newest-first history list
//! - `manifest`: JSON wire format
//! - `persist`: manifest persistence worker
//! - `service`: the orchestrator wiring everything together
//! - `monitor`: background clipboard polling and maintenance
//! - `clipboard`: system clipboard writes

mod blob_store;
mod clipboard;
mod image;
mod image_cache;
mod manifest;
mod monitor;
mod persist;
mod service;
mod store;
mod types;

pub use types::{
    Category, CaptureOutcome, CapturePayload, Entry, EntryContent, EntryKind, EntryPayload,
};

pub use blob_store::{fingerprint, BlobStore};

pub use image::{decode_png, encode_rgba_to_png, estimated_cost, png_dimensions};

pub use image_cache::{ImageCache, InsertStatus};

pub use manifest::ManifestRecord;

pub use store::HistoryStore;

pub use service::{ClipboardHistory, StoragePaths};

pub use monitor::{start_monitoring, MonitorHandle};

pub use clipboard::copy_entry_to_clipboard;
