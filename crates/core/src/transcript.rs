use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const EMPTY_TRANSCRIPT_PLACEHOLDER: &str = "(No messages logged)";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub content: String,
}

impl TranscriptEntry {
    pub fn render(&self) -> String {
        format!("[{}] {}: {}", self.timestamp.format(TIMESTAMP_FORMAT), self.author, self.content)
    }
}

/// A rendered, write-once transcript document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    pub filename: String,
    pub body: String,
}

impl Transcript {
    /// `entries` must already be ordered oldest-first.
    pub fn render(channel_name: &str, entries: &[TranscriptEntry]) -> Self {
        let body = if entries.is_empty() {
            EMPTY_TRANSCRIPT_PLACEHOLDER.to_owned()
        } else {
            entries.iter().map(TranscriptEntry::render).collect::<Vec<_>>().join("\n")
        };

        Self { filename: format!("{channel_name}.txt"), body }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body.into_bytes()
    }
}
