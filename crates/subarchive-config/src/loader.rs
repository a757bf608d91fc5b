// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./subarchive.toml` > `~/.config/subarchive/subarchive.toml`
//! > `/etc/subarchive/subarchive.toml` with environment variable overrides via
//! the `SUBARCHIVE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SubarchiveConfig;

/// Top-level sections an env var may address.
const SECTIONS: &[&str] = &[
    "log",
    "feed",
    "channels",
    "sync",
    "storage",
    "archive",
    "media",
    "gateway",
    "prometheus",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/subarchive/subarchive.toml` (system-wide)
/// 3. `~/.config/subarchive/subarchive.toml` (user XDG config)
/// 4. `./subarchive.toml` (local directory)
/// 5. `SUBARCHIVE_*` environment variables
pub fn load_config() -> Result<SubarchiveConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SubarchiveConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SubarchiveConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SubarchiveConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SubarchiveConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for standard config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SubarchiveConfig::default()))
        .merge(Toml::file("/etc/subarchive/subarchive.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("subarchive/subarchive.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("subarchive.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `SUBARCHIVE_STORAGE_REDIS_URL` must map to `storage.redis_url`,
/// not `storage.redis.url`.
fn env_provider() -> Env {
    Env::prefixed("SUBARCHIVE_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env key to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_first_section_only() {
        assert_eq!(map_env_key("storage_redis_url"), "storage.redis_url");
        assert_eq!(map_env_key("sync_persist_progress"), "sync.persist_progress");
        assert_eq!(map_env_key("gateway_max_page_size"), "gateway.max_page_size");
        assert_eq!(map_env_key("log_level"), "log.level");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("catalog_size"), "catalog_size");
    }
}
