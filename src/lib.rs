//! clipkeep - bounded, content-addressed clipboard history.
//!
//! Captures clipboard events (text or image payloads), deduplicates
//! consecutive repeats, retains a bounded ordered history, and persists
//! that history across restarts while keeping memory and disk usage
//! bounded. Images are stored once per unique content fingerprint as PNG
//! blobs; decoded pixels live in a budgeted in-memory cache.
//!
//! The [`history::ClipboardHistory`] service is the entry point; the
//! `clipkeep` binary wraps it in a polling monitor daemon.

pub mod config;
pub mod error;
pub mod history;
pub mod logging;

pub use config::Config;
pub use error::{HistoryError, Result, ResultExt};
pub use history::{
    Category, CaptureOutcome, CapturePayload, ClipboardHistory, Entry, EntryContent, EntryKind,
    EntryPayload, StoragePaths,
};
