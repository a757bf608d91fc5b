// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message classification.
//!
//! Routes an incoming post to one [`MessageClass`] and derives the canonical
//! file name and byte size of its attachment. Pure: nothing here touches the
//! network or the archive.

use std::sync::LazyLock;

use regex::Regex;

use subarchive_core::{
    ArchiveError, ClassifiedMessage, DocumentMedia, IncomingMessage, Media, MessageClass,
};

/// Characters no file system accepts in a file name.
static FORBIDDEN_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]+"#).unwrap());

/// Classify a message received on the channel known as `channel_name`.
///
/// Returns `Ok(None)` for a note without text, which is dropped.
pub fn classify(
    channel_name: &str,
    message: IncomingMessage,
) -> Result<Option<ClassifiedMessage>, ArchiveError> {
    let (class, file_name, file_size) = match &message.media {
        None if message.text.is_empty() => return Ok(None),
        None => (MessageClass::Note, String::new(), 0),
        Some(Media::Photo(photo)) => (
            MessageClass::Photo,
            format!("{channel_name}_{}.jpg", photo.date),
            photo.largest_rendition().map_or(0, |r| r.byte_size()),
        ),
        Some(Media::Video(doc)) => (
            MessageClass::Video,
            document_name(channel_name, doc, "mp4", message.timestamp),
            doc.size,
        ),
        Some(Media::Audio(doc)) => (
            MessageClass::Audio,
            document_name(channel_name, doc, "mp3", message.timestamp),
            doc.size,
        ),
        Some(Media::Document(doc)) => (
            MessageClass::Document,
            document_name(channel_name, doc, "pdf", message.timestamp),
            doc.size,
        ),
        Some(Media::Other { kind }) => {
            return Err(ArchiveError::UnsupportedClass { kind: kind.clone() });
        }
    };

    let location = message.media.as_ref().and_then(Media::location);
    Ok(Some(ClassifiedMessage {
        class,
        file_name,
        file_size,
        location,
        message,
    }))
}

/// The uploader's file name when present, else `<channel>_<date>.<ext>`.
fn document_name(channel_name: &str, doc: &DocumentMedia, ext: &str, sent_at: i64) -> String {
    match doc.file_name.as_deref() {
        Some(name) => sanitize_file_name(name, sent_at),
        None => format!("{channel_name}_{}.{ext}", doc.date),
    }
}

/// Make an uploader-supplied file name safe to create on disk.
///
/// Trims, turns spaces into underscores and strips forbidden characters.
/// An empty result falls back to `file_<fallback_ts>`.
pub fn sanitize_file_name(name: &str, fallback_ts: i64) -> String {
    let name = name.trim().replace(' ', "_");
    let name = FORBIDDEN_CHARS.replace_all(&name, "");
    if name.is_empty() {
        format!("file_{fallback_ts}")
    } else {
        name.into_owned()
    }
}
