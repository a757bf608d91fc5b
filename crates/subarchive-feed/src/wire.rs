// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON contract of the feed bridge.
//!
//! The bridge holds the authenticated session and exposes the handful of
//! channel calls the archiver needs. These types mirror its payloads and are
//! converted into core types at the boundary, so the rest of the workspace
//! never sees a wire shape.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use subarchive_core::{
    Channel, DocumentMedia, FileLocation, IncomingMessage, InviteStatus, Media, PhotoMedia,
    PhotoRendition, ProgressToken,
};

/// Channel as returned by resolve and invite calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireChannel {
    pub id: i64,
    pub access_hash: i64,
    pub title: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl WireChannel {
    /// Convert into a channel handle known by `name`.
    pub fn into_channel(self, name: String) -> Channel {
        Channel {
            name,
            title: self.title,
            channel_id: self.id,
            access_hash: self.access_hash,
            progress_token: ProgressToken::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WireInvite {
    Joined { channel: WireChannel },
    NotJoined { title: String },
}

impl WireInvite {
    pub fn into_status(self, hash: &str) -> InviteStatus {
        match self {
            Self::Joined { channel } => InviteStatus::Joined(channel.into_channel(hash.to_string())),
            Self::NotJoined { title } => InviteStatus::NotJoined { title },
        }
    }
}

/// Body shared by every per-channel call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRef {
    pub channel_id: i64,
    pub access_hash: i64,
}

impl From<&Channel> for ChannelRef {
    fn from(channel: &Channel) -> Self {
        Self {
            channel_id: channel.channel_id,
            access_hash: channel.access_hash,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullChannelResponse {
    pub pts: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRequest {
    #[serde(flatten)]
    pub channel: ChannelRef,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferenceRequest {
    #[serde(flatten)]
    pub channel: ChannelRef,
    pub pts: i32,
    pub limit: u32,
}

/// Answer to a difference poll.
///
/// `too_long` means the gap could not be returned; `pts` is where polling
/// resumes. Any other `type` fails to decode and is handled like a transient
/// error, which keeps the caller's token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DifferenceResponse {
    Empty {
        pts: i32,
    },
    New {
        pts: i32,
        #[serde(default)]
        messages: Vec<WireMessage>,
    },
    TooLong {
        pts: i32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePartRequest {
    pub location: FileLocation,
    pub offset: u64,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub id: i32,
    pub date: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reply_to: Option<i32>,
    #[serde(default)]
    pub media: Option<WireMedia>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePhoto {
    pub id: i64,
    pub access_hash: i64,
    pub file_reference: String,
    pub date: i64,
    #[serde(default)]
    pub sizes: Vec<PhotoRendition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireDocument {
    pub id: i64,
    pub access_hash: i64,
    pub file_reference: String,
    pub date: i64,
    #[serde(default)]
    pub mime_type: String,
    pub size: u64,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Media attached to a message, tagged by `type`.
///
/// Only unknown tags become [`WireMedia::Other`]; a photo or document with a
/// broken body is a decode error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMedia {
    Photo(WirePhoto),
    Document(WireDocument),
    /// Media shapes the bridge forwards but the archiver ignores.
    #[serde(untagged)]
    Other {
        #[serde(rename = "type")]
        kind: String,
    },
}

impl<'de> Deserialize<'de> for WireMedia {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| D::Error::missing_field("type"))?
            .to_string();
        match kind.as_str() {
            "photo" => WirePhoto::deserialize(value)
                .map(WireMedia::Photo)
                .map_err(|e| D::Error::custom(format!("malformed photo: {e}"))),
            "document" => WireDocument::deserialize(value)
                .map(WireMedia::Document)
                .map_err(|e| D::Error::custom(format!("malformed document: {e}"))),
            _ => Ok(WireMedia::Other { kind }),
        }
    }
}

impl From<WireMedia> for Media {
    fn from(media: WireMedia) -> Self {
        match media {
            WireMedia::Photo(photo) => Media::Photo(PhotoMedia {
                id: photo.id,
                access_hash: photo.access_hash,
                file_reference: photo.file_reference,
                date: photo.date,
                renditions: photo.sizes,
            }),
            WireMedia::Document(doc) => Media::from_document(DocumentMedia {
                id: doc.id,
                access_hash: doc.access_hash,
                file_reference: doc.file_reference,
                date: doc.date,
                mime_type: doc.mime_type,
                size: doc.size,
                file_name: doc.file_name,
            }),
            WireMedia::Other { kind } => Media::Other { kind },
        }
    }
}

impl WireMessage {
    pub fn into_incoming(self, channel_id: i64) -> IncomingMessage {
        IncomingMessage {
            id: self.id,
            channel_id,
            timestamp: self.date,
            text: self.message,
            media: self.media.map(Media::from),
            is_reply: self.reply_to.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_media_is_split_by_mime() {
        let msg: WireMessage = serde_json::from_value(json!({
            "id": 3,
            "date": 1_710_000_000,
            "media": {
                "type": "document",
                "id": 1, "access_hash": 2, "file_reference": "ab", "date": 1_709_999_000,
                "mime_type": "audio/mpeg", "size": 4096, "file_name": "song.mp3"
            }
        }))
        .unwrap();

        let incoming = msg.into_incoming(77);
        assert_eq!(incoming.channel_id, 77);
        assert!(!incoming.is_reply);
        assert!(matches!(incoming.media, Some(Media::Audio(ref d)) if d.size == 4096));
    }

    #[test]
    fn unknown_media_type_becomes_other() {
        let media: WireMedia = serde_json::from_value(json!({"type": "geo", "lat": 1.0})).unwrap();
        assert_eq!(
            Media::from(media),
            Media::Other {
                kind: "geo".to_string()
            }
        );
    }

    #[test]
    fn malformed_known_media_is_an_error() {
        let photo = serde_json::from_value::<WireMedia>(json!({"type": "photo", "id": 1}));
        assert!(photo.unwrap_err().to_string().contains("malformed photo"));

        let doc = serde_json::from_value::<WireMedia>(json!({"type": "document", "id": 1}));
        assert!(doc.is_err());

        let untyped = serde_json::from_value::<WireMedia>(json!({"id": 1}));
        assert!(untyped.is_err());
    }

    #[test]
    fn message_with_malformed_photo_fails_to_decode() {
        let msg = serde_json::from_value::<WireMessage>(json!({
            "id": 3, "date": 1, "media": {"type": "photo", "id": 1}
        }));
        assert!(msg.is_err());
    }

    #[test]
    fn reply_marker_sets_flag() {
        let msg: WireMessage = serde_json::from_value(json!({
            "id": 9, "date": 1, "message": "re", "reply_to": 8
        }))
        .unwrap();
        assert!(msg.into_incoming(1).is_reply);
    }

    #[test]
    fn photo_sizes_decode_every_rendition_shape() {
        let media: WireMedia = serde_json::from_value(json!({
            "type": "photo", "id": 1, "access_hash": 2, "file_reference": "ab", "date": 5,
            "sizes": [
                {"type": "sized", "kind": "m", "size": 300},
                {"type": "cached", "kind": "s", "bytes": [1, 2, 3]},
                {"type": "progressive", "kind": "y", "sizes": [100, 900]}
            ]
        }))
        .unwrap();
        let Media::Photo(photo) = Media::from(media) else {
            panic!("expected photo");
        };
        assert_eq!(photo.largest_rendition().unwrap().kind(), "y");
    }

    #[test]
    fn difference_variants_decode() {
        let empty: DifferenceResponse =
            serde_json::from_value(json!({"type": "empty", "pts": 12})).unwrap();
        assert!(matches!(empty, DifferenceResponse::Empty { pts: 12 }));

        let too_long: DifferenceResponse =
            serde_json::from_value(json!({"type": "too_long", "pts": 40})).unwrap();
        assert!(matches!(too_long, DifferenceResponse::TooLong { pts: 40 }));

        let missing_pts = serde_json::from_value::<DifferenceResponse>(json!({"type": "too_long"}));
        assert!(missing_pts.is_err());
    }

    #[test]
    fn history_request_flattens_channel_ref() {
        let body = serde_json::to_value(HistoryRequest {
            channel: ChannelRef {
                channel_id: 1,
                access_hash: 2,
            },
            limit: 20,
        })
        .unwrap();
        assert_eq!(body, json!({"channel_id": 1, "access_hash": 2, "limit": 20}));
    }
}
