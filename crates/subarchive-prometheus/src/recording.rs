// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge};

/// Register all Subarchive metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "subarchive_messages_total",
        "Messages dispatched by the sync engine, by channel and class"
    );
    describe_counter!(
        "subarchive_archived_total",
        "Archive append attempts by outcome"
    );
    describe_counter!(
        "subarchive_poll_errors_total",
        "Failed diff polls and backlog fetches"
    );
    describe_counter!(
        "subarchive_download_bytes_total",
        "Media bytes written to disk"
    );
    describe_gauge!("subarchive_archive_items", "Records in the archive index");
}

/// Record a classified message handed to dispatch.
pub fn record_message(channel: &str, class: &str) {
    metrics::counter!(
        "subarchive_messages_total",
        "channel" => channel.to_string(),
        "class" => class.to_string()
    )
    .increment(1);
}

/// Record an archive append outcome (`stored`, `duplicate`, `filtered`, `failed`).
pub fn record_archived(outcome: &'static str) {
    metrics::counter!("subarchive_archived_total", "outcome" => outcome).increment(1);
}

pub fn record_poll_error(channel: &str) {
    metrics::counter!("subarchive_poll_errors_total", "channel" => channel.to_string())
        .increment(1);
}

pub fn record_download_bytes(bytes: u64) {
    metrics::counter!("subarchive_download_bytes_total").increment(bytes);
}

/// Set the archive cardinality.
pub fn set_archive_items(count: f64) {
    metrics::gauge!("subarchive_archive_items").set(count);
}
