// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for Subarchive.
//!
//! Uses the metrics-rs facade with the Prometheus exporter.
//! Metrics are rendered as Prometheus text format via the `render()` method,
//! which is exposed through the gateway's /metrics endpoint.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use subarchive_core::{AdapterType, ArchiveError, HealthStatus, PluginAdapter};

pub use recording::{
    record_archived, record_download_bytes, record_message, record_poll_error, register_metrics,
    set_archive_items,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Create a new PrometheusAdapter.
    ///
    /// Installs the Prometheus recorder globally. Only one recorder can be
    /// installed per process. Returns an error if a recorder is already installed.
    pub fn new() -> Result<Self, ArchiveError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            ArchiveError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Get a reference to the Prometheus handle for rendering.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, ArchiveError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A local recorder keeps these tests independent of the global one.
    fn render_with(record: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            record();
        });
        handle.render()
    }

    #[test]
    fn archived_outcomes_are_labelled() {
        let text = render_with(|| {
            record_archived("stored");
            record_archived("stored");
            record_archived("duplicate");
        });
        assert!(text.contains(r#"subarchive_archived_total{outcome="stored"} 2"#));
        assert!(text.contains(r#"subarchive_archived_total{outcome="duplicate"} 1"#));
    }

    #[test]
    fn messages_carry_channel_and_class() {
        let text = render_with(|| record_message("foo", "photo"));
        assert!(text.contains("subarchive_messages_total"));
        assert!(text.contains(r#"channel="foo""#));
        assert!(text.contains(r#"class="photo""#));
    }

    #[test]
    fn archive_items_gauge_is_set() {
        let text = render_with(|| set_archive_items(12.0));
        assert!(text.contains("subarchive_archive_items 12"));
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_download_bytes(10);
        record_poll_error("foo");
    }
}
