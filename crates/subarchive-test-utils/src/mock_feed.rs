// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel feed for deterministic testing.
//!
//! `MockFeed` implements `ChannelFeed` with scripted responses and records
//! every call for assertion in tests.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use subarchive_core::{
    AdapterType, ArchiveError, Channel, ChannelFeed, FeedDifference, FileLocation, FilePart,
    HealthStatus, IncomingMessage, InviteStatus, PluginAdapter, ProgressToken,
};

/// One recorded call against the mock feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCall {
    ResolveUsername(String),
    CheckInvite(String),
    FullChannel(i64),
    History {
        channel_id: i64,
        limit: u32,
    },
    Difference {
        channel_id: i64,
        since: ProgressToken,
        limit: u32,
    },
    FilePart {
        offset: u64,
        limit: u32,
    },
}

#[derive(Default)]
struct Script {
    usernames: HashMap<String, Channel>,
    invites: HashMap<String, InviteStatus>,
    handshakes: HashMap<i64, Result<ProgressToken, String>>,
    history: HashMap<i64, Result<Vec<IncomingMessage>, String>>,
    differences: HashMap<i64, VecDeque<Result<FeedDifference, String>>>,
    files: HashMap<FileLocation, Vec<u8>>,
    unexpected_parts: HashSet<FileLocation>,
}

/// A scripted remote feed.
///
/// Unscripted calls fall back to benign answers: handshakes return token 0,
/// history is empty, and a drained difference queue reports no change.
pub struct MockFeed {
    script: Mutex<Script>,
    calls: Mutex<Vec<FeedCall>>,
    notify: Notify,
}

impl MockFeed {
    /// Create a mock feed with nothing scripted.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    /// Make `username` resolve to `channel`.
    pub async fn add_username(&self, username: &str, channel: Channel) {
        self.script
            .lock()
            .await
            .usernames
            .insert(username.to_string(), channel);
    }

    /// Script the answer for an invite hash (without the `+`).
    pub async fn add_invite(&self, hash: &str, status: InviteStatus) {
        self.script
            .lock()
            .await
            .invites
            .insert(hash.to_string(), status);
    }

    /// Script the handshake answer for a channel.
    pub async fn set_handshake(&self, channel_id: i64, result: Result<ProgressToken, String>) {
        self.script
            .lock()
            .await
            .handshakes
            .insert(channel_id, result);
    }

    /// Script the history answer for a channel.
    pub async fn set_history(&self, channel_id: i64, result: Result<Vec<IncomingMessage>, String>) {
        self.script.lock().await.history.insert(channel_id, result);
    }

    /// Queue a difference answer for a channel.
    pub async fn push_difference(&self, channel_id: i64, result: Result<FeedDifference, String>) {
        self.script
            .lock()
            .await
            .differences
            .entry(channel_id)
            .or_default()
            .push_back(result);
    }

    /// Serve `bytes` for file-part requests on `location`.
    pub async fn add_file(&self, location: FileLocation, bytes: Vec<u8>) {
        self.script.lock().await.files.insert(location, bytes);
    }

    /// Answer file-part requests on `location` with a non-data part.
    pub async fn add_unexpected_part(&self, location: FileLocation) {
        self.script.lock().await.unexpected_parts.insert(location);
    }

    /// All calls made so far, in order.
    pub async fn calls(&self) -> Vec<FeedCall> {
        self.calls.lock().await.clone()
    }

    /// Number of difference polls made for a channel.
    pub async fn difference_count(&self, channel_id: i64) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c, FeedCall::Difference { channel_id: id, .. } if *id == channel_id))
            .count()
    }

    /// Wait until the recorded calls satisfy `done`.
    pub async fn wait_until(&self, done: impl Fn(&[FeedCall]) -> bool) {
        loop {
            let notified = self.notify.notified();
            if done(&self.calls.lock().await) {
                return;
            }
            notified.await;
        }
    }

    async fn record(&self, call: FeedCall) {
        self.calls.lock().await.push(call);
        self.notify.notify_waiters();
    }
}

impl Default for MockFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockFeed {
    fn name(&self) -> &str {
        "mock-feed"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Feed
    }

    async fn health_check(&self) -> Result<HealthStatus, ArchiveError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelFeed for MockFeed {
    async fn resolve_username(&self, username: &str) -> Result<Channel, ArchiveError> {
        self.record(FeedCall::ResolveUsername(username.to_string()))
            .await;
        self.script
            .lock()
            .await
            .usernames
            .get(username)
            .cloned()
            .ok_or_else(|| ArchiveError::Resolve {
                name: username.to_string(),
                message: "USERNAME_NOT_OCCUPIED".to_string(),
            })
    }

    async fn check_invite(&self, hash: &str) -> Result<InviteStatus, ArchiveError> {
        self.record(FeedCall::CheckInvite(hash.to_string())).await;
        self.script
            .lock()
            .await
            .invites
            .get(hash)
            .cloned()
            .ok_or_else(|| ArchiveError::Resolve {
                name: hash.to_string(),
                message: "INVITE_HASH_INVALID".to_string(),
            })
    }

    async fn full_channel(&self, channel: &Channel) -> Result<ProgressToken, ArchiveError> {
        self.record(FeedCall::FullChannel(channel.channel_id)).await;
        match self.script.lock().await.handshakes.get(&channel.channel_id) {
            None => Ok(ProgressToken(0)),
            Some(Ok(token)) => Ok(*token),
            Some(Err(message)) => Err(ArchiveError::feed(message.clone())),
        }
    }

    async fn history(
        &self,
        channel: &Channel,
        limit: u32,
    ) -> Result<Vec<IncomingMessage>, ArchiveError> {
        self.record(FeedCall::History {
            channel_id: channel.channel_id,
            limit,
        })
        .await;
        match self.script.lock().await.history.get(&channel.channel_id) {
            None => Ok(Vec::new()),
            Some(Ok(messages)) => Ok(messages.iter().take(limit as usize).cloned().collect()),
            Some(Err(message)) => Err(ArchiveError::feed(message.clone())),
        }
    }

    async fn difference(
        &self,
        channel: &Channel,
        since: ProgressToken,
        limit: u32,
    ) -> Result<FeedDifference, ArchiveError> {
        let next = self
            .script
            .lock()
            .await
            .differences
            .get_mut(&channel.channel_id)
            .and_then(VecDeque::pop_front);
        // Record after popping so a waiter sees the call only once its answer is consumed.
        self.record(FeedCall::Difference {
            channel_id: channel.channel_id,
            since,
            limit,
        })
        .await;
        match next {
            None => Ok(FeedDifference::Empty { token: since }),
            Some(Ok(diff)) => Ok(diff),
            Some(Err(message)) => Err(ArchiveError::feed(message)),
        }
    }

    async fn file_part(
        &self,
        location: &FileLocation,
        offset: u64,
        limit: u32,
    ) -> Result<FilePart, ArchiveError> {
        self.record(FeedCall::FilePart { offset, limit }).await;
        let script = self.script.lock().await;
        if script.unexpected_parts.contains(location) {
            return Ok(FilePart::Unexpected {
                kind: "upload.fileCdnRedirect".to_string(),
            });
        }
        let bytes = script
            .files
            .get(location)
            .ok_or_else(|| ArchiveError::feed("FILE_REFERENCE_EXPIRED"))?;
        let start = (offset as usize).min(bytes.len());
        let end = start.saturating_add(limit as usize).min(bytes.len());
        Ok(FilePart::Chunk(bytes[start..end].to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn resolves_scripted_usernames_only() {
        let feed = MockFeed::new();
        feed.add_username("foo", fixtures::channel("foo", 1)).await;

        assert_eq!(feed.resolve_username("foo").await.unwrap().channel_id, 1);
        assert!(feed.resolve_username("bar").await.is_err());
        assert_eq!(
            feed.calls().await,
            vec![
                FeedCall::ResolveUsername("foo".into()),
                FeedCall::ResolveUsername("bar".into())
            ]
        );
    }

    #[tokio::test]
    async fn drained_difference_queue_reports_no_change() {
        let feed = MockFeed::new();
        let chan = fixtures::channel("foo", 1);
        feed.push_difference(
            1,
            Ok(FeedDifference::Empty {
                token: ProgressToken(5),
            }),
        )
        .await;

        let first = feed.difference(&chan, ProgressToken(1), 50).await.unwrap();
        assert_eq!(first.token(), ProgressToken(5));
        let second = feed.difference(&chan, ProgressToken(5), 50).await.unwrap();
        assert_eq!(
            second,
            FeedDifference::Empty {
                token: ProgressToken(5)
            }
        );
        assert_eq!(feed.difference_count(1).await, 2);
    }

    #[tokio::test]
    async fn file_parts_slice_the_payload() {
        let feed = MockFeed::new();
        let location = fixtures::document_location(9);
        feed.add_file(location.clone(), (0u8..10).collect()).await;

        let part = feed.file_part(&location, 8, 4).await.unwrap();
        assert_eq!(part, FilePart::Chunk(vec![8, 9]));
        let part = feed.file_part(&location, 10, 4).await.unwrap();
        assert_eq!(part, FilePart::Chunk(vec![]));
    }

    #[tokio::test]
    async fn wait_until_returns_once_condition_holds() {
        let feed = std::sync::Arc::new(MockFeed::new());
        let waiter = {
            let feed = feed.clone();
            tokio::spawn(async move {
                feed.wait_until(|calls| calls.len() >= 2).await;
            })
        };
        let chan = fixtures::channel("foo", 1);
        feed.full_channel(&chan).await.unwrap();
        feed.full_channel(&chan).await.unwrap();
        waiter.await.unwrap();
    }
}
