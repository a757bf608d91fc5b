// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Subarchive channel archiver.

use thiserror::Error;

/// The primary error type used across all Subarchive adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Configuration errors (invalid values, unusable backend selection).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection failure, command failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Remote feed errors (transport failure, non-success status, malformed payload).
    #[error("feed error: {message}")]
    Feed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A channel name could not be mapped to a channel handle.
    #[error("failed to resolve channel `{name}`: {message}")]
    Resolve { name: String, message: String },

    /// The establish-context call for a channel failed.
    #[error("handshake failed for channel `{channel}`: {message}")]
    Handshake { channel: String, message: String },

    /// Content did not pass the archive keyword filter.
    #[error("content rejected by keyword filter")]
    Filtered,

    /// The message carries a media shape the classifier does not handle.
    #[error("unsupported message class: {kind}")]
    UnsupportedClass { kind: String },

    /// Fewer bytes reached the destination file than were received.
    #[error("short write: received {expected} bytes, wrote {written}")]
    ShortWrite { expected: usize, written: usize },

    /// The feed answered a file-part request with something other than data.
    #[error("unexpected file part type: {kind}")]
    UnexpectedPart { kind: String },

    /// A stored record exists but cannot be decoded.
    #[error("corrupt archive record `{key}`: {message}")]
    CorruptRecord { key: String, message: String },

    /// Adapter health check failed.
    #[error("health check failed for {name}: {source}")]
    HealthCheckFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ArchiveError {
    /// Wraps any error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Builds a feed error without an underlying source.
    pub fn feed(message: impl Into<String>) -> Self {
        Self::Feed {
            message: message.into(),
            source: None,
        }
    }

    /// True when the keyword filter rejected the content.
    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Filtered)
    }

    /// True when the classifier could not place the message in a class.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedClass { .. })
    }
}
