// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value backend trait behind the archive store.

use async_trait::async_trait;

use crate::error::ArchiveError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ArchiveRecord, ProgressToken};

/// Sorted-index plus hash-record primitives the archive store is built on.
///
/// Backends do not interpret scores or member keys; the store derives both.
#[async_trait]
pub trait ArchiveBackend: PluginAdapter {
    /// Opens connections and prepares schema. Called once before use.
    async fn initialize(&self) -> Result<(), ArchiveError>;

    /// Whether `member` is present in the sorted index.
    async fn index_contains(&self, index: &str, member: &str) -> Result<bool, ArchiveError>;

    /// Adds `member` with `score`. An existing member is left untouched.
    async fn index_add(&self, index: &str, score: i64, member: &str) -> Result<(), ArchiveError>;

    /// Members with score below `cursor`, highest score first.
    ///
    /// Backends without [`exact_scores`](Self::exact_scores) may also return
    /// members whose stored score rounds to the cursor.
    async fn index_rev_range_below(
        &self,
        index: &str,
        cursor: i64,
        limit: usize,
    ) -> Result<Vec<String>, ArchiveError>;

    /// Whether stored scores keep full `i64` precision.
    ///
    /// When false, neighbouring scores can collapse to one stored value and the
    /// store re-sorts loaded records by their exact score.
    fn exact_scores(&self) -> bool {
        true
    }

    /// Number of members in the index.
    async fn index_len(&self, index: &str) -> Result<i64, ArchiveError>;

    /// Writes the hash record stored under `key`.
    async fn record_put(&self, key: &str, record: &ArchiveRecord) -> Result<(), ArchiveError>;

    /// Reads the hash record under `key`; `Ok(None)` when it does not exist.
    async fn record_get(&self, key: &str) -> Result<Option<ArchiveRecord>, ArchiveError>;

    /// Loads the persisted progress token for a channel.
    async fn progress_load(
        &self,
        namespace: &str,
        channel_id: i64,
    ) -> Result<Option<ProgressToken>, ArchiveError>;

    /// Persists the progress token for a channel.
    async fn progress_save(
        &self,
        namespace: &str,
        channel_id: i64,
        token: ProgressToken,
    ) -> Result<(), ArchiveError>;
}
