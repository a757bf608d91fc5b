// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `subarchive list` and `subarchive resolve`: one-shot commands that print
//! JSON to stdout and exit.

use serde_json::json;
use tracing::info;

use subarchive_config::model::SubarchiveConfig;
use subarchive_core::{ArchiveBackend, ArchiveError, PluginAdapter};
use subarchive_feed::{resolve_channels, HttpFeed};
use subarchive_gateway::PageLimits;
use subarchive_storage::{backend_from_config, ArchiveStore, StoreSettings};

/// Open the configured backend and wrap it in a store.
pub async fn open_store(config: &SubarchiveConfig) -> Result<ArchiveStore, ArchiveError> {
    let backend = backend_from_config(&config.storage);
    backend.initialize().await?;
    info!(backend = backend.name(), namespace = %config.storage.namespace, "archive backend ready");
    Ok(ArchiveStore::new(
        backend,
        StoreSettings::from_config(&config.storage, &config.archive),
    ))
}

/// Print one archive page in the read API's shape.
pub async fn run_list(
    config: &SubarchiveConfig,
    offset: i64,
    number: Option<i64>,
) -> Result<(), ArchiveError> {
    let store = open_store(config).await?;
    let limit = PageLimits::from(&config.gateway).clamp(number);

    let total = store.total().await?;
    let page = store.query(offset, limit).await?;
    let body = json!({
        "total": total,
        "offset": page.next_cursor,
        "items": page.records,
    });
    print_json(&body)?;

    store.backend().shutdown().await
}

/// Print the channel handles the configured names resolve to.
pub async fn run_resolve(config: &SubarchiveConfig) -> Result<(), ArchiveError> {
    let feed = HttpFeed::new(&config.feed)?;
    let channels = resolve_channels(&feed, &config.channels.names).await;
    info!(requested = config.channels.names.len(), resolved = channels.len(), "channels resolved");
    print_json(&channels)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), ArchiveError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ArchiveError::Internal(format!("failed to encode output: {e}")))?;
    println!("{text}");
    Ok(())
}
