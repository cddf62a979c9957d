//! Manifest wire format.
//!
//! The manifest is a JSON array, one record per history entry,
//! newest-first:
//!
//! ```json
//! [
//!   { "type": "text",  "timestamp": "2024-05-01T12:00:00Z", "text": "hello" },
//!   { "type": "image", "timestamp": "2024-05-01T11:59:00Z", "hash": "ab34..." }
//! ]
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::history::types::{Entry, EntryContent};

/// One serialized history record, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ManifestRecord {
    Text {
        timestamp: DateTime<Utc>,
        text: String,
    },
    Image {
        timestamp: DateTime<Utc>,
        hash: String,
    },
}

impl From<&Entry> for ManifestRecord {
    fn from(entry: &Entry) -> Self {
        match &entry.content {
            EntryContent::Text(text) => ManifestRecord::Text {
                timestamp: entry.timestamp,
                text: text.clone(),
            },
            EntryContent::Image { fingerprint } => ManifestRecord::Image {
                timestamp: entry.timestamp,
                hash: fingerprint.clone(),
            },
        }
    }
}

impl From<ManifestRecord> for Entry {
    fn from(record: ManifestRecord) -> Self {
        match record {
            ManifestRecord::Text { timestamp, text } => Entry {
                timestamp,
                content: EntryContent::Text(text),
            },
            ManifestRecord::Image { timestamp, hash } => Entry {
                timestamp,
                content: EntryContent::Image { fingerprint: hash },
            },
        }
    }
}

pub fn encode(records: &[ManifestRecord]) -> Result<String> {
    Ok(serde_json::to_string(records)?)
}

/// Parse manifest JSON. Unparsable JSON or a schema mismatch surfaces as
/// `CorruptManifest`; per-entry recovery (missing blobs) happens later in
/// the store, not here.
pub fn decode(json: &str) -> Result<Vec<ManifestRecord>> {
    Ok(serde_json::from_str(json)?)
}
