// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archive persistence for Subarchive.
//!
//! [`ArchiveStore`] implements idempotent appends and cursor pagination on top
//! of any [`ArchiveBackend`](subarchive_core::ArchiveBackend). Two backends
//! ship here: SQLite (WAL mode, embedded migrations, single-writer via
//! `tokio-rusqlite`) and Redis (sorted set plus hashes).

pub mod database;
pub mod migrations;
pub mod redis_backend;
pub mod sqlite;
pub mod store;

use std::sync::Arc;

use subarchive_config::model::{StorageBackend, StorageConfig};
use subarchive_core::ArchiveBackend;

pub use database::Database;
pub use redis_backend::RedisBackend;
pub use sqlite::SqliteBackend;
pub use store::{
    member_key, normalize_content, score, AddOutcome, ArchiveStore, KeywordFilter, StoreSettings,
    EPOCH_OFFSET, PARAGRAPH_MARKER,
};

/// Build the configured backend. It still needs [`ArchiveBackend::initialize`].
pub fn backend_from_config(config: &StorageConfig) -> Arc<dyn ArchiveBackend> {
    match config.backend {
        StorageBackend::Sqlite => Arc::new(SqliteBackend::new(config.database_path.clone())),
        StorageBackend::Redis => Arc::new(RedisBackend::new(config.redis_url.clone())),
    }
}
