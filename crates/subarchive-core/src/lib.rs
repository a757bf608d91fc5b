// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Subarchive channel archiver.
//!
//! This crate provides the trait definitions, error type, and domain types
//! used throughout the Subarchive workspace. The feed client and storage
//! backends implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ArchiveError;
pub use types::{
    AdapterType, ArchivePage, ArchiveRecord, Channel, ClassifiedMessage, DocumentMedia,
    FeedDifference, FileLocation, FilePart, HealthStatus, IncomingMessage, InviteStatus, Media,
    MessageClass, PhotoMedia, PhotoRendition, ProgressToken, CURSOR_EXHAUSTED, CURSOR_START,
};

pub use traits::{ArchiveBackend, ChannelFeed, PluginAdapter};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn doc(mime: &str) -> DocumentMedia {
        DocumentMedia {
            id: 7,
            access_hash: 8,
            file_reference: "ref".into(),
            date: 1_710_000_000,
            mime_type: mime.into(),
            size: 1024,
            file_name: None,
        }
    }

    #[test]
    fn documents_split_by_mime_prefix() {
        assert!(matches!(Media::from_document(doc("video/mp4")), Media::Video(_)));
        assert!(matches!(Media::from_document(doc("audio/ogg")), Media::Audio(_)));
        assert!(matches!(
            Media::from_document(doc("application/pdf")),
            Media::Document(_)
        ));
        assert!(matches!(Media::from_document(doc("")), Media::Document(_)));
    }

    #[test]
    fn message_class_round_trips_lowercase() {
        for class in MessageClass::ALL {
            let s = class.to_string();
            assert_eq!(s, s.to_lowercase());
            assert_eq!(MessageClass::from_str(&s).unwrap(), class);
        }
        assert!(MessageClass::from_str("sticker").is_err());
    }

    #[test]
    fn largest_rendition_wins() {
        let photo = PhotoMedia {
            id: 1,
            access_hash: 2,
            file_reference: "r".into(),
            date: 0,
            renditions: vec![
                PhotoRendition::Sized {
                    kind: "m".into(),
                    size: 20_000,
                },
                PhotoRendition::Progressive {
                    kind: "y".into(),
                    sizes: vec![10_000, 40_000, 90_000],
                },
                PhotoRendition::Cached {
                    kind: "s".into(),
                    bytes: vec![0; 300],
                },
            ],
        };
        let best = photo.largest_rendition().unwrap();
        assert_eq!(best.kind(), "y");
        assert_eq!(best.byte_size(), 90_000);

        match Media::Photo(photo).location() {
            Some(FileLocation::Photo { thumb_size, .. }) => assert_eq!(thumb_size, "y"),
            other => panic!("expected photo location, got {other:?}"),
        }
    }

    #[test]
    fn other_media_has_no_location() {
        let media = Media::Other {
            kind: "poll".into(),
        };
        assert!(media.location().is_none());
    }

    #[test]
    fn archive_record_uses_wire_field_names() {
        let record = ArchiveRecord {
            channel_url: "foo".into(),
            channel_name: "Foo".into(),
            published_at: 1_710_000_000,
            content: "hello".into(),
            channel_id: 42,
            message_id: 5,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["url"], "foo");
        assert_eq!(json["name"], "Foo");
        assert_eq!(json["date"], 1_710_000_000);
        assert_eq!(json["chanid"], 42);
        assert_eq!(json["msgid"], 5);
    }

    #[test]
    fn difference_token_accessor() {
        let empty = FeedDifference::Empty {
            token: ProgressToken(9),
        };
        assert_eq!(empty.token(), ProgressToken(9));
        let full = FeedDifference::NewMessages {
            messages: vec![],
            token: ProgressToken(12),
        };
        assert_eq!(full.token(), ProgressToken(12));
        let gap = FeedDifference::TooLong {
            token: ProgressToken(40),
        };
        assert_eq!(gap.token(), ProgressToken(40));
    }

    #[test]
    fn error_predicates() {
        assert!(ArchiveError::Filtered.is_filtered());
        assert!(
            ArchiveError::UnsupportedClass {
                kind: "poll".into()
            }
            .is_unsupported()
        );
        assert!(!ArchiveError::Internal("x".into()).is_filtered());
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel_feed<T: ChannelFeed>() {}
        fn _assert_archive_backend<T: ArchiveBackend>() {}
    }

    proptest! {
        #[test]
        fn any_video_mime_is_video(subtype in "[a-z0-9.+-]{1,16}") {
            let media = Media::from_document(doc(&format!("video/{subtype}")));
            prop_assert!(matches!(media, Media::Video(_)));
        }
    }
}
