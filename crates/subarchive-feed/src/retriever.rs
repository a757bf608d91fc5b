// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chunked media download.
//!
//! Files are fetched sequentially in fixed-size parts and appended to the
//! destination as they arrive, so memory use is bounded by one chunk. A part
//! shorter than the chunk size ends the download; the declared size only
//! feeds progress logging.
//!
//! On failure the partial file is left in place for the caller to discard.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use subarchive_core::{ArchiveError, ChannelFeed, FileLocation, FilePart};

/// Bytes requested per file part.
pub const CHUNK_SIZE: u32 = 512 * 1024;

/// Streams remote files to local storage through a [`ChannelFeed`].
#[derive(Clone)]
pub struct MediaRetriever {
    feed: Arc<dyn ChannelFeed>,
}

impl MediaRetriever {
    pub fn new(feed: Arc<dyn ChannelFeed>) -> Self {
        Self { feed }
    }

    /// Download `location` into a newly created file at `dest`.
    ///
    /// Returns the number of bytes written.
    pub async fn save(
        &self,
        location: &FileLocation,
        declared_size: u64,
        dest: &Path,
    ) -> Result<u64, ArchiveError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArchiveError::Internal(format!("failed to create {}: {e}", parent.display())))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| ArchiveError::Internal(format!("failed to create {}: {e}", dest.display())))?;

        let label = dest.display().to_string();
        let downloaded = self
            .download_into(location, declared_size, &mut file, &label)
            .await?;
        file.flush()
            .await
            .map_err(|e| ArchiveError::Internal(format!("failed to flush {label}: {e}")))?;

        info!(file = %label, size = downloaded, "download complete");
        Ok(downloaded)
    }

    /// Fetch parts from offset zero and append them to `writer`.
    pub async fn download_into<W>(
        &self,
        location: &FileLocation,
        declared_size: u64,
        writer: &mut W,
        label: &str,
    ) -> Result<u64, ArchiveError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut offset: u64 = 0;
        loop {
            let bytes = match self.feed.file_part(location, offset, CHUNK_SIZE).await? {
                FilePart::Chunk(bytes) => bytes,
                FilePart::Unexpected { kind } => return Err(ArchiveError::UnexpectedPart { kind }),
            };

            let written = writer
                .write(&bytes)
                .await
                .map_err(|e| ArchiveError::Internal(format!("failed to write {label}: {e}")))?;
            if written != bytes.len() {
                return Err(ArchiveError::ShortWrite {
                    expected: bytes.len(),
                    written,
                });
            }

            offset += written as u64;
            subarchive_prometheus::record_download_bytes(written as u64);
            debug!(file = label, progress = %download_progress(offset, declared_size), "chunk written");

            if written < CHUNK_SIZE as usize {
                return Ok(offset);
            }
        }
    }
}

/// Formats `dl/tot=pct`.
fn download_progress(downloaded: u64, total: u64) -> String {
    let percent = if total == 0 {
        0.0
    } else {
        downloaded as f64 * 100.0 / total as f64
    };
    format!("{downloaded}/{total}={percent:.2}")
}
