// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis implementation of the ArchiveBackend trait.
//!
//! The index is a sorted set and each record a hash. Redis scores are
//! doubles, so scores above 2^53 are rounded by the server.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use tokio::sync::OnceCell;
use tracing::debug;

use subarchive_core::{
    AdapterType, ArchiveBackend, ArchiveError, ArchiveRecord, HealthStatus, PluginAdapter,
    ProgressToken,
};

/// Redis-backed archive backend.
pub struct RedisBackend {
    url: String,
    conn: OnceCell<MultiplexedConnection>,
}

impl RedisBackend {
    /// Create a backend for the server at `url` (`redis://host:port/db`).
    ///
    /// No connection is made until [`ArchiveBackend::initialize`] is called.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: OnceCell::new(),
        }
    }

    /// A handle to the shared multiplexed connection.
    fn conn(&self) -> Result<MultiplexedConnection, ArchiveError> {
        self.conn.get().cloned().ok_or_else(|| ArchiveError::Storage {
            source: "redis not initialized -- call initialize() first".into(),
        })
    }
}

fn progress_key(namespace: &str) -> String {
    format!("{namespace}_progress")
}

/// Decode an HGETALL reply into a record.
fn decode_record(key: &str, mut fields: HashMap<String, String>) -> Result<ArchiveRecord, ArchiveError> {
    let corrupt = |message: String| ArchiveError::CorruptRecord {
        key: key.to_string(),
        message,
    };
    let mut take = |field: &str| {
        fields
            .remove(field)
            .ok_or_else(|| corrupt(format!("missing field `{field}`")))
    };
    let channel_url = take("url")?;
    let channel_name = take("name")?;
    let date = take("date")?;
    let content = take("content")?;
    let chanid = take("chanid")?;
    let msgid = take("msgid")?;

    let int = |field: &str, value: &str| {
        value
            .parse::<i64>()
            .map_err(|e| corrupt(format!("field `{field}`: {e}")))
    };

    Ok(ArchiveRecord {
        channel_url,
        channel_name,
        published_at: int("date", &date)?,
        content,
        channel_id: int("chanid", &chanid)?,
        message_id: int("msgid", &msgid)?,
    })
}

#[async_trait]
impl PluginAdapter for RedisBackend {
    fn name(&self) -> &str {
        "redis"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ArchiveError> {
        let mut conn = self.conn()?;
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(ArchiveError::storage)?;
        if reply == "PONG" {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(format!("unexpected PING reply: {reply}")))
        }
    }

    async fn shutdown(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}

#[async_trait]
impl ArchiveBackend for RedisBackend {
    async fn initialize(&self) -> Result<(), ArchiveError> {
        let client = Client::open(self.url.as_str()).map_err(ArchiveError::storage)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(ArchiveError::storage)?;
        self.conn.set(conn).map_err(|_| ArchiveError::Storage {
            source: "redis already initialized".into(),
        })?;
        debug!(url = %self.url, "redis archive backend initialized");
        Ok(())
    }

    async fn index_contains(&self, index: &str, member: &str) -> Result<bool, ArchiveError> {
        let mut conn = self.conn()?;
        let score: Option<f64> = redis::cmd("ZSCORE")
            .arg(index)
            .arg(member)
            .query_async(&mut conn)
            .await
            .map_err(ArchiveError::storage)?;
        Ok(score.is_some())
    }

    async fn index_add(&self, index: &str, score: i64, member: &str) -> Result<(), ArchiveError> {
        let mut conn = self.conn()?;
        let _added: i64 = redis::cmd("ZADD")
            .arg(index)
            .arg("NX")
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await
            .map_err(ArchiveError::storage)?;
        Ok(())
    }

    async fn index_rev_range_below(
        &self,
        index: &str,
        cursor: i64,
        limit: usize,
    ) -> Result<Vec<String>, ArchiveError> {
        let mut conn = self.conn()?;
        // Inclusive: the cursor's stored double may be shared with unread members.
        redis::cmd("ZREVRANGEBYSCORE")
            .arg(index)
            .arg(cursor)
            .arg("-inf")
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .query_async(&mut conn)
            .await
            .map_err(ArchiveError::storage)
    }

    fn exact_scores(&self) -> bool {
        false
    }

    async fn index_len(&self, index: &str) -> Result<i64, ArchiveError> {
        let mut conn = self.conn()?;
        redis::cmd("ZCARD")
            .arg(index)
            .query_async(&mut conn)
            .await
            .map_err(ArchiveError::storage)
    }

    async fn record_put(&self, key: &str, record: &ArchiveRecord) -> Result<(), ArchiveError> {
        let mut conn = self.conn()?;
        let _: i64 = redis::cmd("HSET")
            .arg(key)
            .arg("url")
            .arg(&record.channel_url)
            .arg("name")
            .arg(&record.channel_name)
            .arg("date")
            .arg(record.published_at)
            .arg("content")
            .arg(&record.content)
            .arg("chanid")
            .arg(record.channel_id)
            .arg("msgid")
            .arg(record.message_id)
            .query_async(&mut conn)
            .await
            .map_err(ArchiveError::storage)?;
        Ok(())
    }

    async fn record_get(&self, key: &str) -> Result<Option<ArchiveRecord>, ArchiveError> {
        let mut conn = self.conn()?;
        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(ArchiveError::storage)?;
        if fields.is_empty() {
            return Ok(None);
        }
        decode_record(key, fields).map(Some)
    }

    async fn progress_load(
        &self,
        namespace: &str,
        channel_id: i64,
    ) -> Result<Option<ProgressToken>, ArchiveError> {
        let mut conn = self.conn()?;
        let pts: Option<i32> = redis::cmd("HGET")
            .arg(progress_key(namespace))
            .arg(channel_id)
            .query_async(&mut conn)
            .await
            .map_err(ArchiveError::storage)?;
        Ok(pts.map(ProgressToken))
    }

    async fn progress_save(
        &self,
        namespace: &str,
        channel_id: i64,
        token: ProgressToken,
    ) -> Result<(), ArchiveError> {
        let mut conn = self.conn()?;
        let _: i64 = redis::cmd("HSET")
            .arg(progress_key(namespace))
            .arg(channel_id)
            .arg(token.0)
            .query_async(&mut conn)
            .await
            .map_err(ArchiveError::storage)?;
        Ok(())
    }
}
