// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel resolution.
//!
//! Maps configured names to channel handles. A name starting with `+` is an
//! invite hash; anything else is a public username. Channels that cannot be
//! resolved are skipped with a warning.

use std::collections::HashSet;

use tracing::{info, warn};

use subarchive_core::{Channel, ChannelFeed, InviteStatus};

/// Resolve every name, keeping the first handle for each channel id.
pub async fn resolve_channels(feed: &dyn ChannelFeed, names: &[String]) -> Vec<Channel> {
    let mut seen = HashSet::new();
    let mut channels = Vec::new();

    for name in names {
        let name = name.trim();
        let Some(channel) = resolve_one(feed, name).await else {
            continue;
        };
        if seen.insert(channel.channel_id) {
            channels.push(channel);
        } else {
            info!(name, channel_id = channel.channel_id, "duplicate channel, skipping");
        }
    }

    channels
}

async fn resolve_one(feed: &dyn ChannelFeed, name: &str) -> Option<Channel> {
    if let Some(hash) = name.strip_prefix('+') {
        return match feed.check_invite(hash).await {
            Ok(InviteStatus::Joined(channel)) => {
                info!(
                    name = hash,
                    channel_id = channel.channel_id,
                    title = %channel.title,
                    "private channel resolved"
                );
                Some(channel)
            }
            Ok(InviteStatus::NotJoined { title }) => {
                warn!(name = hash, title = %title, "not a member of invited channel, skipping");
                None
            }
            Err(e) => {
                warn!(name = hash, error = %e, "invite check failed, skipping");
                None
            }
        };
    }

    match feed.resolve_username(name).await {
        Ok(channel) => {
            info!(
                name,
                channel_id = channel.channel_id,
                title = %channel.title,
                "public channel resolved"
            );
            Some(channel)
        }
        Err(e) => {
            warn!(name, error = %e, "resolve failed, skipping");
            None
        }
    }
}
