//! SSE wire protocol
//!
//! Frames exchanged between the streaming relay and the client stream
//! consumer. The JSON field names and tag values (`type`, `content`,
//! `fullMessage`, `error`, `done`) are load-bearing; existing clients
//! parse them verbatim.

use serde::{Deserialize, Serialize};

/// SSE line prefix
pub const SSE_DATA_PREFIX: &str = "data: ";

/// A single frame of the normalized stream protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    /// Incremental content delta
    Chunk {
        /// Delta text for this frame
        content: String,
        /// Accumulated text so far
        #[serde(rename = "fullMessage")]
        full_message: String,
        /// Always false for chunk frames
        done: bool,
    },
    /// Terminal success frame
    Done {
        /// Always empty for done frames
        content: String,
        /// Final accumulated text (trimmed, double quotes stripped)
        #[serde(rename = "fullMessage")]
        full_message: String,
        /// Always true for done frames
        done: bool,
    },
    /// Terminal error frame
    Error {
        /// Human-readable error message
        error: String,
        /// Always true for error frames
        done: bool,
    },
}

impl StreamFrame {
    /// Build a chunk frame
    pub fn chunk(content: impl Into<String>, full_message: impl Into<String>) -> Self {
        Self::Chunk {
            content: content.into(),
            full_message: full_message.into(),
            done: false,
        }
    }

    /// Build a done frame, applying the final-message post-processing:
    /// surrounding whitespace trimmed and all `"` characters removed.
    /// The quote stripping mirrors the behavior existing clients depend
    /// on; see DESIGN.md before changing it.
    pub fn done(full_message: &str) -> Self {
        Self::Done {
            content: String::new(),
            full_message: full_message.trim().replace('"', ""),
            done: true,
        }
    }

    /// Build an error frame
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { error: message.into(), done: true }
    }

    /// True for `done` and `error` frames
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Chunk { done, .. } => *done,
            Self::Done { .. } | Self::Error { .. } => true,
        }
    }

    /// Encode the frame as a complete SSE event (`data: <json>\n\n`)
    pub fn to_sse_bytes(&self) -> Vec<u8> {
        // Serialization of this enum cannot fail; fields are plain strings.
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("{}{}\n\n", SSE_DATA_PREFIX, json).into_bytes()
    }
}
