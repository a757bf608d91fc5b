// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory archive backend with failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use subarchive_core::{
    AdapterType, ArchiveBackend, ArchiveError, ArchiveRecord, HealthStatus, PluginAdapter,
    ProgressToken,
};

#[derive(Default)]
struct State {
    indexes: HashMap<String, HashMap<String, i64>>,
    records: HashMap<String, ArchiveRecord>,
    progress: HashMap<(String, i64), ProgressToken>,
}

/// A `HashMap`-backed [`ArchiveBackend`].
///
/// `stall` delays every call, which together with a paused tokio clock lets
/// tests drive the store's operation timeout. `double_scores` rounds scores
/// to `f64` the way Redis stores them.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    stall: Option<Duration>,
    double_scores: bool,
    fail_record_put: AtomicBool,
    fail_index_add: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose every call sleeps for `stall` first.
    pub fn stalling(stall: Duration) -> Self {
        Self {
            stall: Some(stall),
            ..Self::default()
        }
    }

    /// A backend that compares scores as `f64` and ranges inclusively.
    pub fn with_double_scores() -> Self {
        Self {
            double_scores: true,
            ..Self::default()
        }
    }

    /// Make subsequent record writes fail.
    pub fn fail_record_put(&self, fail: bool) {
        self.fail_record_put.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent index writes fail.
    pub fn fail_index_add(&self, fail: bool) {
        self.fail_index_add.store(fail, Ordering::SeqCst);
    }

    /// Drop a record while leaving its index entry in place.
    pub async fn remove_record(&self, key: &str) -> Option<ArchiveRecord> {
        self.state.lock().await.records.remove(key)
    }

    pub async fn record_count(&self) -> usize {
        self.state.lock().await.records.len()
    }

    async fn pause(&self) {
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
    }
}

#[async_trait]
impl PluginAdapter for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ArchiveError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}

#[async_trait]
impl ArchiveBackend for MemoryBackend {
    async fn initialize(&self) -> Result<(), ArchiveError> {
        Ok(())
    }

    async fn index_contains(&self, index: &str, member: &str) -> Result<bool, ArchiveError> {
        self.pause().await;
        let state = self.state.lock().await;
        Ok(state
            .indexes
            .get(index)
            .is_some_and(|entries| entries.contains_key(member)))
    }

    async fn index_add(&self, index: &str, score: i64, member: &str) -> Result<(), ArchiveError> {
        self.pause().await;
        if self.fail_index_add.load(Ordering::SeqCst) {
            return Err(ArchiveError::storage(std::io::Error::other("index write refused")));
        }
        self.state
            .lock()
            .await
            .indexes
            .entry(index.to_string())
            .or_default()
            .entry(member.to_string())
            .or_insert(score);
        Ok(())
    }

    async fn index_rev_range_below(
        &self,
        index: &str,
        cursor: i64,
        limit: usize,
    ) -> Result<Vec<String>, ArchiveError> {
        self.pause().await;
        let state = self.state.lock().await;
        let Some(entries) = state.indexes.get(index) else {
            return Ok(Vec::new());
        };
        let mut below: Vec<(&String, i64)> = if self.double_scores {
            let bound = cursor as f64;
            entries
                .iter()
                .map(|(member, score)| (member, *score))
                .filter(|(_, score)| (*score as f64) <= bound)
                .collect()
        } else {
            entries
                .iter()
                .filter(|(_, score)| **score < cursor)
                .map(|(member, score)| (member, *score))
                .collect()
        };
        if self.double_scores {
            below.sort_by(|a, b| {
                (b.1 as f64)
                    .total_cmp(&(a.1 as f64))
                    .then_with(|| b.0.cmp(a.0))
            });
        } else {
            below.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(a.0)));
        }
        Ok(below
            .into_iter()
            .take(limit)
            .map(|(member, _)| member.clone())
            .collect())
    }

    fn exact_scores(&self) -> bool {
        !self.double_scores
    }

    async fn index_len(&self, index: &str) -> Result<i64, ArchiveError> {
        self.pause().await;
        let state = self.state.lock().await;
        Ok(state.indexes.get(index).map_or(0, |e| e.len() as i64))
    }

    async fn record_put(&self, key: &str, record: &ArchiveRecord) -> Result<(), ArchiveError> {
        self.pause().await;
        if self.fail_record_put.load(Ordering::SeqCst) {
            return Err(ArchiveError::storage(std::io::Error::other("record write refused")));
        }
        self.state
            .lock()
            .await
            .records
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn record_get(&self, key: &str) -> Result<Option<ArchiveRecord>, ArchiveError> {
        self.pause().await;
        Ok(self.state.lock().await.records.get(key).cloned())
    }

    async fn progress_load(
        &self,
        namespace: &str,
        channel_id: i64,
    ) -> Result<Option<ProgressToken>, ArchiveError> {
        self.pause().await;
        let state = self.state.lock().await;
        Ok(state
            .progress
            .get(&(namespace.to_string(), channel_id))
            .copied())
    }

    async fn progress_save(
        &self,
        namespace: &str,
        channel_id: i64,
        token: ProgressToken,
    ) -> Result<(), ArchiveError> {
        self.pause().await;
        self.state
            .lock()
            .await
            .progress
            .insert((namespace.to_string(), channel_id), token);
        Ok(())
    }
}
