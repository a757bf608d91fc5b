// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the read API.
//!
//! Handles GET /list, GET /health, GET /metrics.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};

use subarchive_core::{ArchivePage, ArchiveRecord, HealthStatus, PluginAdapter, CURSOR_EXHAUSTED};

use crate::server::GatewayState;

/// Query parameters for GET /list.
///
/// Both values are kept as raw strings so a malformed number falls back to
/// its default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub offset: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
}

impl ListParams {
    /// Cursor to read below; 0 (start of feed) when absent or not a number.
    pub fn cursor(&self) -> i64 {
        parse_int(self.offset.as_deref()).unwrap_or(0)
    }

    /// Requested page size, if it parses.
    pub fn number(&self) -> Option<i64> {
        parse_int(self.number.as_deref())
    }
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse().ok())
}

/// Response body for GET /list.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub rtn: i32,
    pub msg: &'static str,
    pub total: i64,
    /// Cursor for the next page; -1 once the archive is exhausted.
    pub offset: i64,
    pub items: Vec<ArchiveRecord>,
}

impl ListResponse {
    fn page(total: i64, page: ArchivePage) -> Self {
        Self {
            rtn: 0,
            msg: "succ",
            total,
            offset: page.next_cursor,
            items: page.records,
        }
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub backend: String,
}

/// GET /list
///
/// Failures never reach the client in detail: a failed count reports 0 and a
/// failed read degrades to an empty, exhausted page.
pub async fn get_list(
    State(state): State<GatewayState>,
    Query(params): Query<ListParams>,
) -> Json<ListResponse> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!("list", request_id = %request_id);

    async move {
        let cursor = params.cursor();
        let number = state.pages.clamp(params.number());
        info!(cursor, number, "list request");

        let total = match state.store.total().await {
            Ok(total) => total,
            Err(e) => {
                warn!(error = %e, "failed to count archive");
                0
            }
        };

        let page = match state.store.query(cursor, number).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, cursor, "archive query failed");
                ArchivePage {
                    next_cursor: CURSOR_EXHAUSTED,
                    records: Vec::new(),
                }
            }
        };

        info!(returned = page.records.len(), next = page.next_cursor, "list response");
        Json(ListResponse::page(total, page))
    }
    .instrument(span)
    .await
}

/// GET /health
///
/// Reports the archive backend's health. Unhealthy answers 503.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let backend = state.store.backend();
    let (code, status) = match backend.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok".to_string()),
        Ok(HealthStatus::Degraded(reason)) => (StatusCode::OK, format!("degraded: {reason}")),
        Ok(HealthStatus::Unhealthy(reason)) => {
            (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {reason}"))
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {e}")),
    };

    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        backend: backend.name().to_string(),
    };
    (code, Json(body)).into_response()
}

/// GET /metrics
///
/// Prometheus text format, or 404 when metrics are disabled.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
