// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel incremental sync.
//!
//! Each channel runs as its own task:
//!
//! 1. **Handshake**: fetch the channel context and its current progress token.
//!    Failure ends the channel's task.
//! 2. **Backlog** (only when `history_depth > 0`): replay recent history once.
//! 3. **Polling**: every interval, ask for everything since the token. Both new
//!    and empty answers advance the token; an error keeps it for the next tick.
//!
//! Replies are discarded before classification. Messages from one answer are
//! dispatched in feed order. Tasks share nothing but the handlers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use subarchive_config::model::SyncConfig;
use subarchive_core::{Channel, ChannelFeed, FeedDifference, IncomingMessage, ProgressToken};
use subarchive_feed::classify;
use subarchive_storage::ArchiveStore;

use crate::dispatch::DispatchRegistry;

/// Tunables for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub history_depth: u32,
    pub poll_interval: Duration,
    pub diff_limit: u32,
}

impl SyncSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            history_depth: config.history_depth,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            diff_limit: config.diff_limit,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Turns the feed into an ordered stream of new messages per channel.
#[derive(Clone)]
pub struct SyncEngine {
    feed: Arc<dyn ChannelFeed>,
    registry: Arc<DispatchRegistry>,
    settings: SyncSettings,
    progress: Option<ArchiveStore>,
}

impl SyncEngine {
    pub fn new(
        feed: Arc<dyn ChannelFeed>,
        registry: DispatchRegistry,
        settings: SyncSettings,
    ) -> Self {
        Self {
            feed,
            registry: Arc::new(registry),
            settings,
            progress: None,
        }
    }

    /// Resume from and persist progress tokens through `store`.
    pub fn with_progress_store(mut self, store: ArchiveStore) -> Self {
        self.progress = Some(store);
        self
    }

    /// Run one task per channel until `cancel` fires.
    ///
    /// Returns once every channel task has exited.
    pub async fn run(&self, channels: Vec<Channel>, cancel: CancellationToken) {
        let mut units = JoinSet::new();
        for channel in channels {
            let engine = self.clone();
            let cancel = cancel.clone();
            units.spawn(async move { engine.run_channel(channel, cancel).await });
        }
        info!(channels = units.len(), "sync engine started");

        while let Some(result) = units.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "channel task aborted");
            }
        }
        info!("sync engine stopped");
    }

    async fn run_channel(&self, mut channel: Channel, cancel: CancellationToken) {
        let handshake = tokio::select! {
            _ = cancel.cancelled() => return,
            result = self.feed.full_channel(&channel) => result,
        };
        channel.progress_token = match handshake {
            Ok(token) => token,
            Err(e) => {
                error!(channel = %channel.name, title = %channel.title, error = %e, "handshake failed, channel stopped");
                return;
            }
        };

        if let Some(stored) = self.load_progress(&channel).await {
            info!(channel = %channel.name, stored = %stored, remote = %channel.progress_token, "resuming from stored progress");
            channel.progress_token = stored;
        }

        if self.settings.history_depth > 0 {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = self.replay_backlog(&channel) => {}
            }
        }

        info!(channel = %channel.name, pts = %channel.progress_token, "polling");
        let period = self.settings.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let answer = tokio::select! {
                _ = cancel.cancelled() => break,
                answer = self.feed.difference(&channel, channel.progress_token, self.settings.diff_limit) => answer,
            };

            match answer {
                Ok(diff) => {
                    let token = diff.token();
                    match diff {
                        FeedDifference::NewMessages { messages, .. } => {
                            debug!(channel = %channel.name, count = messages.len(), "new messages");
                            for message in messages {
                                self.process(&channel, message).await;
                            }
                        }
                        FeedDifference::TooLong { .. } => {
                            warn!(channel = %channel.name, from = %channel.progress_token, to = %token, "difference too long, skipping gap");
                            subarchive_prometheus::record_poll_error(&channel.name);
                        }
                        FeedDifference::Empty { .. } => {}
                    }
                    self.advance(&mut channel, token).await;
                }
                Err(e) => {
                    warn!(channel = %channel.name, pts = %channel.progress_token, error = %e, "difference poll failed");
                    subarchive_prometheus::record_poll_error(&channel.name);
                }
            }
        }

        info!(channel = %channel.name, "channel stopped");
    }

    async fn replay_backlog(&self, channel: &Channel) {
        match self.feed.history(channel, self.settings.history_depth).await {
            Ok(messages) => {
                info!(channel = %channel.name, count = messages.len(), "replaying backlog");
                for message in messages {
                    self.process(channel, message).await;
                }
            }
            Err(e) => {
                warn!(channel = %channel.name, error = %e, "history fetch failed");
                subarchive_prometheus::record_poll_error(&channel.name);
            }
        }
    }

    async fn process(&self, channel: &Channel, message: IncomingMessage) {
        let msg_id = message.id;
        if message.is_reply {
            trace!(channel = %channel.name, msg_id, "skipping reply");
            return;
        }

        let classified = match classify(&channel.name, message) {
            Ok(Some(classified)) => classified,
            Ok(None) => {
                trace!(channel = %channel.name, msg_id, "blank note");
                return;
            }
            Err(e) => {
                debug!(channel = %channel.name, msg_id, error = %e, "skipping message");
                return;
            }
        };

        let class = classified.class.to_string();
        match self.registry.dispatch(channel, &classified).await {
            Ok(true) => subarchive_prometheus::record_message(&channel.name, &class),
            Ok(false) => {}
            Err(e) if e.is_filtered() => {
                warn!(channel = %channel.name, msg_id, class = %class, "filtered");
            }
            Err(e) => {
                error!(channel = %channel.name, msg_id, class = %class, error = %e, "handler failed");
            }
        }
    }

    async fn advance(&self, channel: &mut Channel, token: ProgressToken) {
        if token == channel.progress_token {
            return;
        }
        trace!(channel = %channel.name, from = %channel.progress_token, to = %token, "progress advanced");
        channel.progress_token = token;
        if let Some(store) = &self.progress
            && let Err(e) = store.save_progress(channel.channel_id, token).await
        {
            warn!(channel = %channel.name, pts = %token, error = %e, "failed to persist progress");
        }
    }

    async fn load_progress(&self, channel: &Channel) -> Option<ProgressToken> {
        let store = self.progress.as_ref()?;
        match store.load_progress(channel.channel_id).await {
            Ok(token) => token,
            Err(e) => {
                warn!(channel = %channel.name, error = %e, "failed to load stored progress");
                None
            }
        }
    }
}
