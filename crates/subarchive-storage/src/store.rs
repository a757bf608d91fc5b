// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The archive store: idempotent append and cursor-based reverse-chronological reads.
//!
//! Layout on top of any [`ArchiveBackend`]:
//! - one sorted index keyed by the namespace, entries `(score, member)`
//! - one record per member keyed by `<namespace>_<member>`
//!
//! Index membership is the single source of truth for "already archived",
//! so the record is always written before the index entry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use subarchive_config::model::{ArchiveConfig, StorageConfig};
use subarchive_core::{
    ArchiveBackend, ArchiveError, ArchivePage, ArchiveRecord, ProgressToken, CURSOR_EXHAUSTED,
    CURSOR_START,
};

/// Start of the score epoch (2024-01-01T00:00:00+08:00).
pub const EPOCH_OFFSET: i64 = 1_704_038_400;

/// Marker newlines are replaced with before storage.
pub const PARAGRAPH_MARKER: &str = "</ p>";

/// Derive the index score for a post.
///
/// Posts from the same second are ordered by message id, which occupies the
/// low 31 bits.
pub fn score(published_at: i64, message_id: i64) -> i64 {
    (published_at.wrapping_sub(EPOCH_OFFSET) << 31) | (message_id & 0x7fff_ffff)
}

/// Index member key for a post.
pub fn member_key(channel_url: &str, message_id: i64) -> String {
    format!("{channel_url}_{message_id}")
}

/// Replace newlines with the paragraph marker.
pub fn normalize_content(content: &str) -> String {
    content.replace('\n', PARAGRAPH_MARKER)
}

/// Outcome of a successful [`ArchiveStore::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The record and index entry were written.
    Stored,
    /// The member was already indexed; nothing was written.
    Duplicate,
}

/// Allow-list of substrings content must contain to be archived.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new(keywords: Vec<String>) -> Self {
        let keywords = keywords.into_iter().filter(|k| !k.is_empty()).collect();
        Self { keywords }
    }

    /// An empty filter accepts everything.
    pub fn accepts(&self, content: &str) -> bool {
        self.keywords.is_empty() || self.keywords.iter().any(|k| content.contains(k.as_str()))
    }
}

/// Settings for an [`ArchiveStore`].
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub namespace: String,
    pub display_prefix: String,
    pub filter: KeywordFilter,
    pub op_timeout: Duration,
}

impl StoreSettings {
    pub fn from_config(storage: &StorageConfig, archive: &ArchiveConfig) -> Self {
        Self {
            namespace: storage.namespace.clone(),
            display_prefix: archive.display_prefix.clone(),
            filter: KeywordFilter::new(archive.required_keywords.clone()),
            op_timeout: Duration::from_secs(storage.op_timeout_secs),
        }
    }
}

/// Score-ordered archive of channel posts.
///
/// Cheap to clone; clones share the backend. Safe for concurrent callers.
#[derive(Clone)]
pub struct ArchiveStore {
    backend: Arc<dyn ArchiveBackend>,
    settings: Arc<StoreSettings>,
}

impl ArchiveStore {
    pub fn new(backend: Arc<dyn ArchiveBackend>, settings: StoreSettings) -> Self {
        Self {
            backend,
            settings: Arc::new(settings),
        }
    }

    /// The backend this store writes through.
    pub fn backend(&self) -> &Arc<dyn ArchiveBackend> {
        &self.backend
    }

    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    fn record_key(&self, member: &str) -> String {
        format!("{}_{member}", self.settings.namespace)
    }

    /// Run one backend call under the per-operation timeout.
    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, ArchiveError>>,
    ) -> Result<T, ArchiveError> {
        let duration = self.settings.op_timeout;
        tokio::time::timeout(duration, op)
            .await
            .map_err(|_| ArchiveError::Timeout { duration })?
    }

    /// Append a record unless its member is already indexed.
    pub async fn add(&self, record: &ArchiveRecord) -> Result<AddOutcome, ArchiveError> {
        let index = self.settings.namespace.as_str();
        let member = member_key(&record.channel_url, record.message_id);

        if self.bounded(self.backend.index_contains(index, &member)).await? {
            debug!(member = %member, "already archived");
            subarchive_prometheus::record_archived("duplicate");
            return Ok(AddOutcome::Duplicate);
        }

        let key = self.record_key(&member);
        if let Err(e) = self.bounded(self.backend.record_put(&key, record)).await {
            subarchive_prometheus::record_archived("failed");
            return Err(e);
        }

        let score = score(record.published_at, record.message_id);
        if let Err(e) = self.bounded(self.backend.index_add(index, score, &member)).await {
            subarchive_prometheus::record_archived("failed");
            return Err(e);
        }

        debug!(member = %member, score, "archived");
        subarchive_prometheus::record_archived("stored");
        Ok(AddOutcome::Stored)
    }

    /// Normalize, filter, and append a post.
    ///
    /// Returns [`ArchiveError::Filtered`] when the content carries none of the
    /// required keywords.
    pub async fn add_new_item(
        &self,
        channel_url: &str,
        channel_name: &str,
        published_at: i64,
        content: &str,
        channel_id: i64,
        message_id: i64,
    ) -> Result<AddOutcome, ArchiveError> {
        let content = normalize_content(content);
        if !self.settings.filter.accepts(&content) {
            subarchive_prometheus::record_archived("filtered");
            return Err(ArchiveError::Filtered);
        }

        let record = ArchiveRecord {
            channel_url: channel_url.to_string(),
            channel_name: channel_name.to_string(),
            published_at,
            content,
            channel_id,
            message_id,
        };
        self.add(&record).await
    }

    /// Read up to `limit` records with score strictly below `cursor`, newest first.
    ///
    /// A zero cursor means start of feed. Records that are missing or cannot be
    /// decoded are skipped.
    ///
    /// On backends that store scores as doubles, members sharing a stored score
    /// come back in arbitrary order. The window is then widened until every
    /// member that could outrank the page's last record has been loaded, and
    /// records are ordered by their exact score.
    pub async fn query(&self, cursor: i64, limit: usize) -> Result<ArchivePage, ArchiveError> {
        let cursor = if cursor == 0 { CURSOR_START } else { cursor };
        let index = self.settings.namespace.as_str();
        let exact = self.backend.exact_scores();

        let mut candidates: Vec<(i64, ArchiveRecord)> = Vec::new();
        let mut floor: Option<f64> = None;
        let mut loaded = 0;
        let mut window = limit;
        loop {
            let members = self
                .bounded(self.backend.index_rev_range_below(index, cursor, window))
                .await?;

            for member in members.iter().skip(loaded) {
                let key = self.record_key(member);
                match self.bounded(self.backend.record_get(&key)).await {
                    Ok(Some(record)) => {
                        let exact_score = score(record.published_at, record.message_id);
                        let stored = exact_score as f64;
                        floor = Some(floor.map_or(stored, |f| f.min(stored)));
                        if exact_score < cursor {
                            candidates.push((exact_score, record));
                        }
                    }
                    Ok(None) => warn!(member = %member, "indexed record is missing, skipping"),
                    Err(e) => warn!(member = %member, error = %e, "failed to load record, skipping"),
                }
            }
            loaded = members.len();

            if exact || members.len() < window || window == usize::MAX {
                break;
            }
            // Unloaded members store at most `floor`; only records above it are settled.
            let settled = floor.map_or(0, |f| {
                candidates
                    .iter()
                    .filter(|(s, _)| (*s as f64) > f)
                    .count()
            });
            if settled >= limit {
                break;
            }
            window = window.saturating_mul(2);
        }

        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates.truncate(limit);

        let next_cursor = candidates.last().map_or(CURSOR_EXHAUSTED, |(s, _)| *s);
        let records = candidates
            .into_iter()
            .map(|(_, mut record)| {
                record.channel_url = format!("{}{}", self.settings.display_prefix, record.channel_url);
                record
            })
            .collect();

        Ok(ArchivePage {
            next_cursor,
            records,
        })
    }

    /// Number of archived records.
    pub async fn total(&self) -> Result<i64, ArchiveError> {
        let total = self
            .bounded(self.backend.index_len(&self.settings.namespace))
            .await?;
        subarchive_prometheus::set_archive_items(total as f64);
        Ok(total)
    }

    /// Load the persisted progress token for a channel.
    pub async fn load_progress(&self, channel_id: i64) -> Result<Option<ProgressToken>, ArchiveError> {
        self.bounded(
            self.backend
                .progress_load(&self.settings.namespace, channel_id),
        )
        .await
    }

    /// Persist the progress token for a channel.
    pub async fn save_progress(
        &self,
        channel_id: i64,
        token: ProgressToken,
    ) -> Result<(), ArchiveError> {
        self.bounded(
            self.backend
                .progress_save(&self.settings.namespace, channel_id, token),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn score_orders_by_time_then_message_id() {
        let t = EPOCH_OFFSET + 86_400;
        assert!(score(t, 500) < score(t + 1, 1));
        assert!(score(t, 1) < score(t, 2));
        assert_eq!(score(EPOCH_OFFSET, 7), 7);
    }

    #[test]
    fn extreme_dates_do_not_overflow() {
        assert_eq!(score(i64::MIN, 1) & 0x7fff_ffff, 1);
        assert_eq!(score(i64::MAX, 0), (i64::MAX.wrapping_sub(EPOCH_OFFSET)) << 31);
        assert!(score(0, 5) < 0);
    }

    #[test]
    fn nearby_scores_share_a_double_in_2026() {
        let t = 1_776_297_600;
        assert_eq!(score(t, 1000) as f64, score(t, 1003) as f64);
        assert_ne!(score(t, 1000), score(t, 1003));
    }

    #[test]
    fn member_key_joins_url_and_id() {
        assert_eq!(member_key("foo", 12), "foo_12");
    }

    #[test]
    fn newlines_become_paragraph_markers() {
        assert_eq!(normalize_content("a\nb\n"), "a</ p>b</ p>");
        assert_eq!(normalize_content("plain"), "plain");
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = KeywordFilter::new(vec![]);
        assert!(filter.accepts("anything"));
        let filter = KeywordFilter::new(vec![String::new()]);
        assert!(filter.accepts("anything"));
    }

    #[test]
    fn filter_needs_one_keyword() {
        let filter = KeywordFilter::new(vec!["机场".into(), "节点".into()]);
        assert!(filter.accepts("新机场推荐"));
        assert!(filter.accepts("免费节点"));
        assert!(!filter.accepts("weather today"));
    }

    proptest! {
        #[test]
        fn later_second_always_scores_higher(
            offset in 0i64..200_000_000,
            a in 0i64..=0x7fff_ffff,
            b in 0i64..=0x7fff_ffff,
        ) {
            let t = EPOCH_OFFSET + offset;
            prop_assert!(score(t, a) < score(t + 1, b));
        }

        #[test]
        fn same_second_orders_by_message_id(
            offset in 0i64..200_000_000,
            a in 0i64..0x7fff_ffff,
        ) {
            let t = EPOCH_OFFSET + offset;
            prop_assert!(score(t, a) < score(t, a + 1));
        }
    }
}
