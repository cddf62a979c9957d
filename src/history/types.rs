//! Core types for the clipboard history cache.

use chrono::{DateTime, Utc};

/// What kind of content an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Text,
    Image,
}

/// Content of a history entry.
///
/// Text is stored inline; images are stored as a fingerprint reference to a
/// blob on disk, so the enum itself guarantees that exactly one of
/// {text, fingerprint} is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryContent {
    Text(String),
    Image {
        /// SHA-256 of the encoded PNG bytes, hex-encoded.
        fingerprint: String,
    },
}

/// One history record. Immutable once created; the only mutation the store
/// performs is removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub timestamp: DateTime<Utc>,
    pub content: EntryContent,
}

impl Entry {
    pub fn text(text: impl Into<String>) -> Self {
        Entry {
            timestamp: Utc::now(),
            content: EntryContent::Text(text.into()),
        }
    }

    pub fn image(fingerprint: impl Into<String>) -> Self {
        Entry {
            timestamp: Utc::now(),
            content: EntryContent::Image {
                fingerprint: fingerprint.into(),
            },
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self.content {
            EntryContent::Text(_) => EntryKind::Text,
            EntryContent::Image { .. } => EntryKind::Image,
        }
    }

    /// Inline text, if this is a text entry.
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            EntryContent::Text(text) => Some(text),
            EntryContent::Image { .. } => None,
        }
    }

    /// Blob fingerprint, if this is an image entry.
    pub fn fingerprint(&self) -> Option<&str> {
        match &self.content {
            EntryContent::Text(_) => None,
            EntryContent::Image { fingerprint } => Some(fingerprint),
        }
    }
}

/// Category view over the history, for list projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Category {
    #[default]
    All,
    Text,
    Image,
}

impl Category {
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Category::All => true,
            Category::Text => entry.kind() == EntryKind::Text,
            Category::Image => entry.kind() == EntryKind::Image,
        }
    }
}

/// A clipboard payload handed to the orchestrator by the platform layer.
#[derive(Debug, Clone)]
pub enum CapturePayload {
    Text(String),
    Image {
        width: u32,
        height: u32,
        /// Tightly packed RGBA, `width * height * 4` bytes.
        rgba: Vec<u8>,
    },
}

/// Raw content of an entry for external collaborators (clipboard writer,
/// file writer). The core supplies bytes; delivery is the caller's job.
#[derive(Debug, Clone)]
pub enum EntryPayload {
    Text(String),
    /// Encoded PNG bytes as stored in the blob store.
    ImagePng(Vec<u8>),
}

/// What a capture did to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A new entry was prepended.
    Added,
    /// Identical to the current head; dropped.
    DuplicateOfHead,
    /// Empty or unrecognized payload; nothing happened.
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_matches_content() {
        let text = Entry::text("hello");
        assert_eq!(text.kind(), EntryKind::Text);
        assert_eq!(text.as_text(), Some("hello"));
        assert_eq!(text.fingerprint(), None);

        let image = Entry::image("deadbeef");
        assert_eq!(image.kind(), EntryKind::Image);
        assert_eq!(image.as_text(), None);
        assert_eq!(image.fingerprint(), Some("deadbeef"));
    }

    #[test]
    fn test_category_matching() {
        let text = Entry::text("hello");
        let image = Entry::image("deadbeef");

        assert!(Category::All.matches(&text));
        assert!(Category::All.matches(&image));
        assert!(Category::Text.matches(&text));
        assert!(!Category::Text.matches(&image));
        assert!(Category::Image.matches(&image));
        assert!(!Category::Image.matches(&text));
    }
}
