// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the read API.

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use subarchive_config::model::GatewayConfig;
use subarchive_core::ArchiveError;
use subarchive_storage::ArchiveStore;

use crate::handlers;

/// Health state for the `/health` and `/metrics` endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Page size bounds for `/list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: i64,
    pub max_size: i64,
}

impl PageLimits {
    /// Resolve the requested page size: absent or non-positive means the
    /// default, anything above the maximum is cut down to it.
    pub fn clamp(&self, requested: Option<i64>) -> usize {
        let size = match requested {
            Some(n) if n > 0 => n.min(self.max_size),
            _ => self.default_size,
        };
        size.max(1) as usize
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::from(&GatewayConfig::default())
    }
}

impl From<&GatewayConfig> for PageLimits {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            default_size: config.default_page_size,
            max_size: config.max_page_size,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub store: ArchiveStore,
    pub pages: PageLimits,
    pub health: HealthState,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

impl From<&GatewayConfig> for ServerConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Build the read API router.
///
/// - GET /list and GET /subs/list (one archive page)
/// - GET /health
/// - GET /metrics
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/list", get(handlers::get_list))
        .route("/subs/list", get(handlers::get_list))
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve the read API until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), ArchiveError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ArchiveError::Internal(format!("failed to bind read API to {addr}: {e}")))?;

    tracing::info!("read API listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| ArchiveError::Internal(format!("read API server error: {e}")))?;

    tracing::info!("read API stopped");
    Ok(())
}
