// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the feed, sync, and storage crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Feed,
    Storage,
    Observability,
}

/// Opaque marker for "everything up to here has been seen" on one channel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProgressToken(pub i32);

impl std::fmt::Display for ProgressToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A subscribed broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// The name the resolver was given (public username or invite hash).
    pub name: String,
    /// Display title.
    pub title: String,
    /// Stable numeric id.
    pub channel_id: i64,
    /// Capability required by every call made on this channel.
    pub access_hash: i64,
    /// Last-seen progress token. Only the sync engine moves it.
    #[serde(default)]
    pub progress_token: ProgressToken,
}

/// Outcome of checking an invite link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteStatus {
    /// The session is already a member; the channel is usable.
    Joined(Channel),
    /// The session has not joined the channel behind the invite.
    NotJoined { title: String },
}

/// One photo rendition offered by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PhotoRendition {
    /// A rendition stored remotely with a declared byte size.
    Sized { kind: String, size: u64 },
    /// A small rendition whose bytes are inlined in the message.
    Cached { kind: String, bytes: Vec<u8> },
    /// A progressively encoded rendition; the last entry is the full size.
    Progressive { kind: String, sizes: Vec<u64> },
}

impl PhotoRendition {
    /// The rendition's size code.
    pub fn kind(&self) -> &str {
        match self {
            Self::Sized { kind, .. } | Self::Cached { kind, .. } | Self::Progressive { kind, .. } => {
                kind
            }
        }
    }

    /// Byte size of the rendition.
    pub fn byte_size(&self) -> u64 {
        match self {
            Self::Sized { size, .. } => *size,
            Self::Cached { bytes, .. } => bytes.len() as u64,
            Self::Progressive { sizes, .. } => sizes.iter().copied().max().unwrap_or(0),
        }
    }
}

/// A photo attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoMedia {
    pub id: i64,
    pub access_hash: i64,
    pub file_reference: String,
    /// Upload time of the photo, seconds since the Unix epoch.
    pub date: i64,
    pub renditions: Vec<PhotoRendition>,
}

impl PhotoMedia {
    /// The largest offered rendition, if any.
    pub fn largest_rendition(&self) -> Option<&PhotoRendition> {
        self.renditions.iter().max_by_key(|r| r.byte_size())
    }
}

/// A document attachment (video, audio, or anything else).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMedia {
    pub id: i64,
    pub access_hash: i64,
    pub file_reference: String,
    pub date: i64,
    pub mime_type: String,
    pub size: u64,
    /// Explicit file name attribute, when the uploader set one.
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Media attached to an incoming message.
///
/// Documents are split by MIME prefix when they cross the feed boundary,
/// so downstream code only ever matches on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    Photo(PhotoMedia),
    Video(DocumentMedia),
    Audio(DocumentMedia),
    Document(DocumentMedia),
    /// Any shape the archiver does not understand (polls, geo points, web pages, ...).
    Other { kind: String },
}

impl Media {
    /// Wraps a document in the variant its MIME type declares.
    pub fn from_document(doc: DocumentMedia) -> Self {
        if doc.mime_type.starts_with("video/") {
            Self::Video(doc)
        } else if doc.mime_type.starts_with("audio/") {
            Self::Audio(doc)
        } else {
            Self::Document(doc)
        }
    }

    /// Where the media's bytes can be fetched from, if it has any.
    pub fn location(&self) -> Option<FileLocation> {
        match self {
            Self::Photo(photo) => Some(FileLocation::Photo {
                id: photo.id,
                access_hash: photo.access_hash,
                file_reference: photo.file_reference.clone(),
                thumb_size: photo
                    .largest_rendition()
                    .map(|r| r.kind().to_string())
                    .unwrap_or_else(|| "x".to_string()),
            }),
            Self::Video(doc) | Self::Audio(doc) | Self::Document(doc) => {
                Some(FileLocation::Document {
                    id: doc.id,
                    access_hash: doc.access_hash,
                    file_reference: doc.file_reference.clone(),
                })
            }
            Self::Other { .. } => None,
        }
    }
}

/// Remote location of a downloadable file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileLocation {
    Photo {
        id: i64,
        access_hash: i64,
        file_reference: String,
        thumb_size: String,
    },
    Document {
        id: i64,
        access_hash: i64,
        file_reference: String,
    },
}

/// A post received from a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Message id, monotonic within one channel.
    pub id: i32,
    pub channel_id: i64,
    /// Publication time, seconds since the Unix epoch.
    pub timestamp: i64,
    pub text: String,
    pub media: Option<Media>,
    pub is_reply: bool,
}

/// The class a message is routed by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageClass {
    Note,
    Photo,
    Video,
    Audio,
    Document,
}

impl MessageClass {
    pub const ALL: [MessageClass; 5] = [
        MessageClass::Note,
        MessageClass::Photo,
        MessageClass::Video,
        MessageClass::Audio,
        MessageClass::Document,
    ];
}

/// A message that made it through classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedMessage {
    pub class: MessageClass,
    /// Canonical file name; empty for notes.
    pub file_name: String,
    /// Byte size of the attachment; zero for notes.
    pub file_size: u64,
    pub location: Option<FileLocation>,
    pub message: IncomingMessage,
}

/// Result of asking the feed what changed since a progress token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedDifference {
    /// Nothing new, but the token may still have moved.
    Empty { token: ProgressToken },
    /// New messages, in feed order.
    NewMessages {
        messages: Vec<IncomingMessage>,
        token: ProgressToken,
    },
    /// The gap since the requested token is too large to return. The
    /// messages in it are skipped and polling resumes from `token`.
    TooLong { token: ProgressToken },
}

impl FeedDifference {
    /// The token to advance to after handling this difference.
    pub fn token(&self) -> ProgressToken {
        match self {
            Self::Empty { token } | Self::NewMessages { token, .. } | Self::TooLong { token } => {
                *token
            }
        }
    }
}

/// One answer to a file-part request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePart {
    Chunk(Vec<u8>),
    /// The feed sent something other than file bytes (e.g. a CDN redirect).
    Unexpected { kind: String },
}

/// The durable, externally visible unit of the archive.
///
/// Field names double as the hash field names of the persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    #[serde(rename = "url")]
    pub channel_url: String,
    #[serde(rename = "name")]
    pub channel_name: String,
    #[serde(rename = "date")]
    pub published_at: i64,
    pub content: String,
    #[serde(rename = "chanid")]
    pub channel_id: i64,
    #[serde(rename = "msgid")]
    pub message_id: i64,
}

/// Cursor value meaning "start of feed" once a zero cursor has been mapped.
pub const CURSOR_START: i64 = i64::MAX;

/// Cursor value meaning "no more pages".
pub const CURSOR_EXHAUSTED: i64 = -1;

/// One page of archive records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePage {
    /// Score of the last returned record, or [`CURSOR_EXHAUSTED`].
    pub next_cursor: i64,
    pub records: Vec<ArchiveRecord>,
}
