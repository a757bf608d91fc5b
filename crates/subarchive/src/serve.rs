// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `subarchive serve` command implementation.
//!
//! Probes the feed bridge, opens the archive backend, resolves the configured
//! channels, wires the default handlers into a dispatch registry, then runs
//! the sync engine alongside the read API until SIGINT/SIGTERM.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use subarchive_config::model::SubarchiveConfig;
use subarchive_core::{ArchiveError, ChannelFeed, HealthStatus, PluginAdapter};
use subarchive_feed::{resolve_channels, HttpFeed};
use subarchive_sync::shutdown;
use subarchive_sync::{SyncEngine, SyncSettings};

use subarchive_gateway::{GatewayState, HealthState, PageLimits, ServerConfig};

use crate::handlers::build_registry;
use crate::list::open_store;

/// Runs the `subarchive serve` command.
pub async fn run_serve(config: SubarchiveConfig) -> Result<(), ArchiveError> {
    info!("starting subarchive serve");

    // Initialize Prometheus metrics (if enabled and compiled in).
    #[cfg(feature = "prometheus")]
    let _prometheus_adapter = if config.prometheus.enabled {
        match subarchive_prometheus::PrometheusAdapter::new() {
            Ok(adapter) => {
                info!("prometheus metrics enabled");
                Some(adapter)
            }
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        debug!("prometheus metrics disabled by configuration");
        None
    };

    // An unreachable bridge means no authenticated session: fatal.
    let feed = Arc::new(HttpFeed::new(&config.feed)?);
    match feed.health_check().await? {
        HealthStatus::Healthy => info!(base_url = %config.feed.base_url, "feed bridge healthy"),
        HealthStatus::Degraded(reason) => warn!(reason = %reason, "feed bridge degraded"),
        HealthStatus::Unhealthy(reason) => {
            error!(reason = %reason, "feed bridge unavailable");
            eprintln!(
                "error: feed bridge at {} is not usable: {reason}",
                config.feed.base_url
            );
            return Err(ArchiveError::HealthCheckFailed {
                name: feed.name().to_string(),
                source: reason.into(),
            });
        }
    }
    let feed: Arc<dyn ChannelFeed> = feed;

    let store = open_store(&config).await?;
    match store.total().await {
        Ok(total) => info!(total, "archive opened"),
        Err(e) => warn!(error = %e, "failed to count archive"),
    }

    let channels = resolve_channels(feed.as_ref(), &config.channels.names).await;
    if channels.is_empty() {
        warn!("no channels resolved, only the read API will run");
    }

    let registry = build_registry(&config.media, store.clone(), feed.clone())?;
    let mut engine = SyncEngine::new(
        feed.clone(),
        registry,
        SyncSettings::from_config(&config.sync),
    );
    if config.sync.persist_progress {
        info!("progress tokens persisted in the archive backend");
        engine = engine.with_progress_store(store.clone());
    }

    let cancel = shutdown::install_signal_handler();

    // Start the read API (if enabled).
    let gateway = if config.gateway.enabled {
        #[cfg(feature = "prometheus")]
        let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
            _prometheus_adapter.as_ref().map(|adapter| {
                let handle = adapter.handle().clone();
                Arc::new(move || handle.render()) as Arc<dyn Fn() -> String + Send + Sync>
            });
        #[cfg(not(feature = "prometheus"))]
        let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> = None;

        let state = GatewayState {
            store: store.clone(),
            pages: PageLimits::from(&config.gateway),
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render,
            },
        };
        let server_config = ServerConfig::from(&config.gateway);
        let server_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            let result =
                subarchive_gateway::start_server(&server_config, state, server_cancel.clone()).await;
            if let Err(e) = result {
                error!(error = %e, "read API failed, shutting down");
                server_cancel.cancel();
            }
        }))
    } else {
        debug!("read API disabled by configuration");
        None
    };

    engine.run(channels, cancel.clone()).await;

    // The engine also returns when every channel stopped on its own; the
    // read API keeps serving until a signal arrives.
    if let Some(handle) = gateway {
        if !cancel.is_cancelled() {
            info!("all channels stopped, read API still serving");
        }
        if let Err(e) = handle.await {
            error!(error = %e, "read API task aborted");
        }
    }

    if let Err(e) = store.backend().shutdown().await {
        warn!(error = %e, "archive backend shutdown failed");
    }
    info!("subarchive stopped");
    Ok(())
}
