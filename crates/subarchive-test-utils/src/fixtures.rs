// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for channels, messages, and media used across test suites.

use subarchive_core::{
    Channel, DocumentMedia, FileLocation, IncomingMessage, Media, PhotoMedia, PhotoRendition,
    ProgressToken,
};

pub fn channel(name: &str, channel_id: i64) -> Channel {
    Channel {
        name: name.to_string(),
        title: format!("{name} title"),
        channel_id,
        access_hash: channel_id * 1000 + 7,
        progress_token: ProgressToken::default(),
    }
}

/// A plain-text post.
pub fn note(channel_id: i64, id: i32, timestamp: i64, text: &str) -> IncomingMessage {
    IncomingMessage {
        id,
        channel_id,
        timestamp,
        text: text.to_string(),
        media: None,
        is_reply: false,
    }
}

/// A reply to another post.
pub fn reply(channel_id: i64, id: i32, timestamp: i64, text: &str) -> IncomingMessage {
    IncomingMessage {
        is_reply: true,
        ..note(channel_id, id, timestamp, text)
    }
}

/// A post carrying `media`.
pub fn with_media(channel_id: i64, id: i32, timestamp: i64, media: Media) -> IncomingMessage {
    IncomingMessage {
        media: Some(media),
        ..note(channel_id, id, timestamp, "")
    }
}

pub fn photo(id: i64, date: i64, sizes: &[(&str, u64)]) -> PhotoMedia {
    PhotoMedia {
        id,
        access_hash: id + 1,
        file_reference: format!("photo-ref-{id}"),
        date,
        renditions: sizes
            .iter()
            .map(|(kind, size)| PhotoRendition::Sized {
                kind: kind.to_string(),
                size: *size,
            })
            .collect(),
    }
}

pub fn document(id: i64, date: i64, mime_type: &str, size: u64) -> DocumentMedia {
    DocumentMedia {
        id,
        access_hash: id + 1,
        file_reference: format!("doc-ref-{id}"),
        date,
        mime_type: mime_type.to_string(),
        size,
        file_name: None,
    }
}

/// Location of the document built by [`document`] with the same id.
pub fn document_location(id: i64) -> FileLocation {
    FileLocation::Document {
        id,
        access_hash: id + 1,
        file_reference: format!("doc-ref-{id}"),
    }
}
