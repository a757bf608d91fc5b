// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Subarchive channel archiver.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Subarchive configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubarchiveConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Remote feed bridge settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Channels to subscribe to.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Sync engine settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Archive backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Archive content settings.
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Media download settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Read API settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Remote feed bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    /// Base URL of the feed bridge.
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,

    /// Bearer token sent to the bridge.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Per-request timeout. `None` leaves it to the transport.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            api_token: None,
            request_timeout_secs: None,
        }
    }
}

fn default_feed_base_url() -> String {
    "http://127.0.0.1:2011".to_string()
}

/// Subscribed channel list.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelsConfig {
    /// Public usernames, or invite hashes prefixed with `+`.
    #[serde(default)]
    pub names: Vec<String>,
}

/// Sync engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Number of historical posts replayed once at startup. Zero skips the backlog.
    #[serde(default)]
    pub history_depth: u32,

    /// Seconds between difference polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum messages requested per difference poll.
    #[serde(default = "default_diff_limit")]
    pub diff_limit: u32,

    /// Persist progress tokens in the archive backend and resume from them.
    #[serde(default)]
    pub persist_progress: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            history_depth: 0,
            poll_interval_secs: default_poll_interval_secs(),
            diff_limit: default_diff_limit(),
            persist_progress: false,
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_diff_limit() -> u32 {
    50
}

/// Which key-value store backs the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Redis,
}

/// Archive backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend selection.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Redis connection URL, used when `backend = "redis"`.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// SQLite database path, used when `backend = "sqlite"`.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Index key. Changing it starts an empty archive.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Upper bound on a single backend operation, in seconds.
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: default_redis_url(),
            database_path: default_database_path(),
            namespace: default_namespace(),
            op_timeout_secs: default_op_timeout_secs(),
        }
    }
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("subarchive").join("archive.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("archive.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_namespace() -> String {
    "z_subs_index_v3".to_string()
}

fn default_op_timeout_secs() -> u64 {
    10
}

/// Archive content configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Prefix prepended to channel URLs when records are read back.
    #[serde(default = "default_display_prefix")]
    pub display_prefix: String,

    /// Content must contain one of these to be archived. Empty accepts everything.
    #[serde(default = "default_required_keywords")]
    pub required_keywords: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            display_prefix: default_display_prefix(),
            required_keywords: default_required_keywords(),
        }
    }
}

fn default_display_prefix() -> String {
    "t.me/".to_string()
}

fn default_required_keywords() -> Vec<String> {
    vec!["机场".to_string(), "订阅".to_string(), "节点".to_string()]
}

/// Media download configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Directory downloads are written into. `None` disables downloads.
    #[serde(default)]
    pub download_dir: Option<String>,

    /// Message classes whose attachments are downloaded.
    #[serde(default = "default_media_classes")]
    pub classes: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            classes: default_media_classes(),
        }
    }
}

fn default_media_classes() -> Vec<String> {
    ["photo", "video", "audio", "document"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Read API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Serve the read API.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Page size used when `number` is absent or not positive.
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,

    /// Largest page a single request may ask for.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_gateway_host(),
            port: default_gateway_port(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    2010
}

fn default_page_size() -> i64 {
    20
}

fn default_max_page_size() -> i64 {
    100
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Install the recorder and expose `/metrics`.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
