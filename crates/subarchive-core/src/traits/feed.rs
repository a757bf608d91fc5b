// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote channel feed trait.

use async_trait::async_trait;

use crate::error::ArchiveError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Channel, FeedDifference, FileLocation, FilePart, IncomingMessage, InviteStatus,
    ProgressToken,
};

/// A remote source of broadcast channel posts.
///
/// The feed is stateless from the caller's point of view: the only memory of
/// what has been seen is the [`ProgressToken`] the caller passes back in.
#[async_trait]
pub trait ChannelFeed: PluginAdapter {
    /// Maps a public username to a channel handle.
    async fn resolve_username(&self, username: &str) -> Result<Channel, ArchiveError>;

    /// Checks an invite hash (without the leading `+`).
    async fn check_invite(&self, hash: &str) -> Result<InviteStatus, ArchiveError>;

    /// Establishes update context for a channel and returns its current token.
    ///
    /// The feed does not deliver differences for a channel before this call.
    async fn full_channel(&self, channel: &Channel) -> Result<ProgressToken, ArchiveError>;

    /// Fetches up to `limit` of the most recent posts, newest first.
    async fn history(
        &self,
        channel: &Channel,
        limit: u32,
    ) -> Result<Vec<IncomingMessage>, ArchiveError>;

    /// Asks for everything new since `since`.
    async fn difference(
        &self,
        channel: &Channel,
        since: ProgressToken,
        limit: u32,
    ) -> Result<FeedDifference, ArchiveError>;

    /// Fetches `limit` bytes of a file starting at `offset`.
    async fn file_part(
        &self,
        location: &FileLocation,
        offset: u64,
        limit: u32,
    ) -> Result<FilePart, ArchiveError>;
}
