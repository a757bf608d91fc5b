// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use subarchive_core::ArchiveError;
use tracing::debug;

use crate::migrations;

const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;
PRAGMA foreign_keys = ON;";

/// Convert a tokio-rusqlite error into `ArchiveError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ArchiveError {
    ArchiveError::storage(e)
}

/// Handle to the archive database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run migrations.
    pub async fn open(path: &str) -> Result<Self, ArchiveError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(ArchiveError::storage)?;
        }

        // Migrations run on a short-lived blocking connection before the
        // async handle takes over.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), ArchiveError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(ArchiveError::storage)?;
            conn.execute_batch(PRAGMAS).map_err(ArchiveError::storage)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| ArchiveError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(ArchiveError::storage)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "archive database opened");
        Ok(Self { conn })
    }

    /// The async connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}
