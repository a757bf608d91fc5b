// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as positive intervals, usable backend URLs, and known class names.

use std::str::FromStr;

use subarchive_core::MessageClass;

use crate::diagnostic::ConfigError;
use crate::model::{StorageBackend, SubarchiveConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than stopping at the first one.
pub fn validate_config(config: &SubarchiveConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.sync.poll_interval_secs == 0 {
        fail("sync.poll_interval_secs must be greater than zero".to_string());
    }

    if !(1..=100).contains(&config.sync.diff_limit) {
        fail(format!(
            "sync.diff_limit must be between 1 and 100, got {}",
            config.sync.diff_limit
        ));
    }

    if config.storage.op_timeout_secs == 0 {
        fail("storage.op_timeout_secs must be greater than zero".to_string());
    }

    let namespace = &config.storage.namespace;
    if namespace.is_empty() || namespace.chars().any(char::is_whitespace) {
        fail(format!(
            "storage.namespace `{namespace}` must be non-empty and contain no whitespace"
        ));
    }

    match config.storage.backend {
        StorageBackend::Redis => {
            let url = &config.storage.redis_url;
            if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
                fail(format!(
                    "storage.redis_url `{url}` must start with redis:// or rediss://"
                ));
            }
        }
        StorageBackend::Sqlite => {
            if config.storage.database_path.trim().is_empty() {
                fail("storage.database_path must not be empty".to_string());
            }
        }
    }

    let host = config.gateway.host.trim();
    let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
    let is_valid_hostname = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
    if !is_valid_ip && !is_valid_hostname {
        fail(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if config.gateway.default_page_size <= 0 {
        fail("gateway.default_page_size must be greater than zero".to_string());
    }

    if config.gateway.default_page_size > config.gateway.max_page_size {
        fail(format!(
            "gateway.default_page_size ({}) exceeds gateway.max_page_size ({})",
            config.gateway.default_page_size, config.gateway.max_page_size
        ));
    }

    for class in &config.media.classes {
        if MessageClass::from_str(class).is_err() {
            fail(format!(
                "media.classes entry `{class}` is not one of: note, photo, video, audio, document"
            ));
        }
    }

    for name in &config.channels.names {
        if name.trim().is_empty() || name.trim() == "+" {
            fail("channels.names must not contain empty entries".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
