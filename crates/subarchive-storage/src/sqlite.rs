// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ArchiveBackend trait.
//!
//! The sorted index and hash records are emulated with two tables. Scores are
//! stored as exact 64-bit integers.

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use tokio::sync::OnceCell;
use tracing::debug;

use subarchive_core::{
    AdapterType, ArchiveBackend, ArchiveError, ArchiveRecord, HealthStatus, PluginAdapter,
    ProgressToken,
};

use crate::database::{map_tr_err, Database};

/// SQLite-backed archive backend.
///
/// The database is lazily opened on the first call to
/// [`ArchiveBackend::initialize`].
pub struct SqliteBackend {
    database_path: String,
    db: OnceCell<Database>,
}

impl SqliteBackend {
    /// Create a backend for the database at `database_path`.
    ///
    /// The database is not opened until [`ArchiveBackend::initialize`] is called.
    pub fn new(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, ArchiveError> {
        self.db.get().ok_or_else(|| ArchiveError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ArchiveError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ArchiveError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

/// Row decode outcome; a decode failure is reported as a corrupt record.
type Decoded = Result<ArchiveRecord, String>;

#[async_trait]
impl ArchiveBackend for SqliteBackend {
    async fn initialize(&self) -> Result<(), ArchiveError> {
        let db = Database::open(&self.database_path).await?;
        self.db.set(db).map_err(|_| ArchiveError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.database_path, "SQLite archive backend initialized");
        Ok(())
    }

    async fn index_contains(&self, index: &str, member: &str) -> Result<bool, ArchiveError> {
        let (index, member) = (index.to_string(), member.to_string());
        self.db()?
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT 1 FROM archive_index WHERE namespace = ?1 AND member = ?2",
                    params![index, member],
                    |_| Ok(()),
                )
                .optional()
                .map(|found| found.is_some())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn index_add(&self, index: &str, score: i64, member: &str) -> Result<(), ArchiveError> {
        let (index, member) = (index.to_string(), member.to_string());
        self.db()?
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO archive_index (namespace, member, score)
                     VALUES (?1, ?2, ?3)",
                    params![index, member, score],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn index_rev_range_below(
        &self,
        index: &str,
        cursor: i64,
        limit: usize,
    ) -> Result<Vec<String>, ArchiveError> {
        let index = index.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db()?
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT member FROM archive_index
                     WHERE namespace = ?1 AND score < ?2
                     ORDER BY score DESC LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![index, cursor, limit], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn index_len(&self, index: &str) -> Result<i64, ArchiveError> {
        let index = index.to_string();
        self.db()?
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM archive_index WHERE namespace = ?1",
                    params![index],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
    }

    async fn record_put(&self, key: &str, record: &ArchiveRecord) -> Result<(), ArchiveError> {
        let key = key.to_string();
        let r = record.clone();
        self.db()?
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO archive_records
                     (key, url, name, date, content, chanid, msgid)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        key,
                        r.channel_url,
                        r.channel_name,
                        r.published_at,
                        r.content,
                        r.channel_id,
                        r.message_id,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn record_get(&self, key: &str) -> Result<Option<ArchiveRecord>, ArchiveError> {
        let lookup = key.to_string();
        let decoded: Option<Decoded> = self
            .db()?
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT url, name, date, content, chanid, msgid
                     FROM archive_records WHERE key = ?1",
                    params![lookup],
                    |row| {
                        let decode = || -> Result<ArchiveRecord, rusqlite::Error> {
                            Ok(ArchiveRecord {
                                channel_url: row.get(0)?,
                                channel_name: row.get(1)?,
                                published_at: row.get(2)?,
                                content: row.get(3)?,
                                channel_id: row.get(4)?,
                                message_id: row.get(5)?,
                            })
                        };
                        Ok(decode().map_err(|e| e.to_string()))
                    },
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)?;

        match decoded {
            None => Ok(None),
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(message)) => Err(ArchiveError::CorruptRecord {
                key: key.to_string(),
                message,
            }),
        }
    }

    async fn progress_load(
        &self,
        namespace: &str,
        channel_id: i64,
    ) -> Result<Option<ProgressToken>, ArchiveError> {
        let namespace = namespace.to_string();
        self.db()?
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT pts FROM sync_progress WHERE namespace = ?1 AND channel_id = ?2",
                    params![namespace, channel_id],
                    |row| row.get::<_, i32>(0),
                )
                .optional()
            })
            .await
            .map(|pts| pts.map(ProgressToken))
            .map_err(map_tr_err)
    }

    async fn progress_save(
        &self,
        namespace: &str,
        channel_id: i64,
        token: ProgressToken,
    ) -> Result<(), ArchiveError> {
        let namespace = namespace.to_string();
        self.db()?
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sync_progress (namespace, channel_id, pts) VALUES (?1, ?2, ?3)
                     ON CONFLICT (namespace, channel_id) DO UPDATE SET
                        pts = excluded.pts,
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                    params![namespace, channel_id, token.0],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(msg_id: i64) -> ArchiveRecord {
        ArchiveRecord {
            channel_url: "foo".into(),
            channel_name: "Foo".into(),
            published_at: 1_710_000_000 + msg_id,
            content: format!("post {msg_id}"),
            channel_id: 42,
            message_id: msg_id,
        }
    }

    async fn open(dir: &tempfile::TempDir) -> SqliteBackend {
        let path = dir.path().join("archive.db");
        let backend = SqliteBackend::new(path.to_string_lossy());
        backend.initialize().await.unwrap();
        backend
    }

    #[tokio::test]
    async fn sqlite_backend_implements_plugin_adapter() {
        let backend = SqliteBackend::new("unused.db");
        assert_eq!(backend.name(), "sqlite");
        assert_eq!(backend.version(), semver::Version::new(0, 1, 0));
        assert_eq!(backend.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_creates_database_and_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("archive.db");
        let backend = SqliteBackend::new(path.to_string_lossy());
        backend.initialize().await.unwrap();
        assert!(path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let backend = open(&dir).await;
        assert!(backend.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_requires_initialize() {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("h.db").to_string_lossy());
        assert!(backend.health_check().await.is_err());
        backend.initialize().await.unwrap();
        assert_eq!(backend.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn index_is_scoped_by_namespace() {
        let dir = tempdir().unwrap();
        let backend = open(&dir).await;

        backend.index_add("a", 10, "foo_1").await.unwrap();
        backend.index_add("b", 20, "foo_1").await.unwrap();

        assert!(backend.index_contains("a", "foo_1").await.unwrap());
        assert!(!backend.index_contains("a", "foo_2").await.unwrap());
        assert_eq!(backend.index_len("a").await.unwrap(), 1);
        assert_eq!(backend.index_len("b").await.unwrap(), 1);
        assert_eq!(backend.index_len("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn index_add_keeps_existing_score() {
        let dir = tempdir().unwrap();
        let backend = open(&dir).await;

        backend.index_add("idx", 10, "foo_1").await.unwrap();
        backend.index_add("idx", 99, "foo_1").await.unwrap();

        assert_eq!(backend.index_len("idx").await.unwrap(), 1);
        assert!(backend.index_rev_range_below("idx", 11, 10).await.unwrap() == vec!["foo_1"]);
    }

    #[tokio::test]
    async fn rev_range_is_descending_with_open_upper_bound() {
        let dir = tempdir().unwrap();
        let backend = open(&dir).await;
        for (score, member) in [(1, "m1"), (2, "m2"), (3, "m3"), (4, "m4")] {
            backend.index_add("idx", score, member).await.unwrap();
        }

        let page = backend.index_rev_range_below("idx", 3, 10).await.unwrap();
        assert_eq!(page, vec!["m2", "m1"]);

        let page = backend.index_rev_range_below("idx", i64::MAX, 2).await.unwrap();
        assert_eq!(page, vec!["m4", "m3"]);
    }

    #[tokio::test]
    async fn records_round_trip_and_missing_is_none() {
        let dir = tempdir().unwrap();
        let backend = open(&dir).await;

        backend.record_put("idx_foo_1", &record(1)).await.unwrap();
        assert_eq!(
            backend.record_get("idx_foo_1").await.unwrap(),
            Some(record(1))
        );
        assert_eq!(backend.record_get("idx_foo_2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn mistyped_row_is_reported_corrupt() {
        let dir = tempdir().unwrap();
        let backend = open(&dir).await;

        backend
            .db()
            .unwrap()
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO archive_records (key, url, name, date, content, chanid, msgid)
                     VALUES ('bad', 'foo', 'Foo', 'yesterday', 'x', 1, 1)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let err = backend.record_get("bad").await.unwrap_err();
        assert!(matches!(err, ArchiveError::CorruptRecord { ref key, .. } if key == "bad"));
    }

    #[tokio::test]
    async fn progress_is_upserted_per_channel() {
        let dir = tempdir().unwrap();
        let backend = open(&dir).await;

        assert_eq!(backend.progress_load("idx", 7).await.unwrap(), None);
        backend.progress_save("idx", 7, ProgressToken(100)).await.unwrap();
        backend.progress_save("idx", 7, ProgressToken(140)).await.unwrap();
        backend.progress_save("idx", 8, ProgressToken(3)).await.unwrap();

        assert_eq!(
            backend.progress_load("idx", 7).await.unwrap(),
            Some(ProgressToken(140))
        );
        assert_eq!(
            backend.progress_load("idx", 8).await.unwrap(),
            Some(ProgressToken(3))
        );
    }

    #[tokio::test]
    async fn shutdown_runs_checkpoint() {
        let dir = tempdir().unwrap();
        let backend = open(&dir).await;
        backend.record_put("k", &record(1)).await.unwrap();
        backend.shutdown().await.unwrap();
    }
}
