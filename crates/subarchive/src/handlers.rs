// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default message handlers wired into the dispatch registry.
//!
//! Notes are appended to the archive. Media classes listed in
//! `media.classes` are downloaded into `media.download_dir` when it is set.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use subarchive_config::model::MediaConfig;
use subarchive_core::{ArchiveError, Channel, ChannelFeed, ClassifiedMessage, MessageClass};
use subarchive_feed::MediaRetriever;
use subarchive_storage::{AddOutcome, ArchiveStore};
use subarchive_sync::{DispatchRegistry, MessageHandler};

/// Appends note text to the archive.
pub struct ArchiveNoteHandler {
    store: ArchiveStore,
}

impl ArchiveNoteHandler {
    pub fn new(store: ArchiveStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MessageHandler for ArchiveNoteHandler {
    async fn handle(
        &self,
        channel: &Channel,
        message: &ClassifiedMessage,
    ) -> Result<(), ArchiveError> {
        let post = &message.message;
        let outcome = self
            .store
            .add_new_item(
                &channel.name,
                &channel.title,
                post.timestamp,
                &post.text,
                channel.channel_id,
                i64::from(post.id),
            )
            .await?;
        if outcome == AddOutcome::Duplicate {
            debug!(channel = %channel.name, msg_id = post.id, "note already archived");
        }
        Ok(())
    }
}

/// Saves attachments under a download directory by canonical file name.
pub struct MediaSaveHandler {
    retriever: MediaRetriever,
    dir: PathBuf,
}

impl MediaSaveHandler {
    pub fn new(retriever: MediaRetriever, dir: PathBuf) -> Self {
        Self { retriever, dir }
    }
}

#[async_trait]
impl MessageHandler for MediaSaveHandler {
    async fn handle(
        &self,
        channel: &Channel,
        message: &ClassifiedMessage,
    ) -> Result<(), ArchiveError> {
        let Some(location) = &message.location else {
            warn!(channel = %channel.name, msg_id = message.message.id, "media without a location");
            return Ok(());
        };
        let dest = self.dir.join(&message.file_name);
        self.retriever
            .save(location, message.file_size, &dest)
            .await?;
        Ok(())
    }
}

/// Build the registry: notes go to the archive, configured media classes to disk.
pub fn build_registry(
    media: &MediaConfig,
    store: ArchiveStore,
    feed: Arc<dyn ChannelFeed>,
) -> Result<DispatchRegistry, ArchiveError> {
    let mut builder =
        DispatchRegistry::builder().on(MessageClass::Note, Arc::new(ArchiveNoteHandler::new(store)));

    let Some(dir) = &media.download_dir else {
        info!("media.download_dir not set, attachments are not saved");
        return Ok(builder.build());
    };

    let saver: Arc<dyn MessageHandler> = Arc::new(MediaSaveHandler::new(
        MediaRetriever::new(feed),
        PathBuf::from(dir),
    ));
    for name in &media.classes {
        let class = MessageClass::from_str(name)
            .map_err(|_| ArchiveError::Config(format!("unknown media class `{name}`")))?;
        if class == MessageClass::Note {
            continue;
        }
        builder = builder.on(class, saver.clone());
    }

    let registry = builder.build();
    info!(classes = ?registry.classes(), dir = %dir, "message handlers registered");
    Ok(registry)
}
