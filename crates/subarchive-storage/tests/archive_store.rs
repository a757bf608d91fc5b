// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the archive store over the in-memory and SQLite backends.

use std::sync::Arc;
use std::time::Duration;

use subarchive_core::{ArchiveBackend, ArchiveError, ArchiveRecord, CURSOR_EXHAUSTED, CURSOR_START};
use subarchive_storage::{
    member_key, score, AddOutcome, ArchiveStore, KeywordFilter, SqliteBackend, StoreSettings,
    EPOCH_OFFSET,
};
use subarchive_test_utils::MemoryBackend;

const NS: &str = "z_subs_index_v3";
const T0: i64 = EPOCH_OFFSET + 10_000_000;

fn settings(keywords: &[&str]) -> StoreSettings {
    StoreSettings {
        namespace: NS.to_string(),
        display_prefix: "t.me/".to_string(),
        filter: KeywordFilter::new(keywords.iter().map(|k| k.to_string()).collect()),
        op_timeout: Duration::from_secs(10),
    }
}

fn record(url: &str, msg_id: i64, published_at: i64) -> ArchiveRecord {
    ArchiveRecord {
        channel_url: url.to_string(),
        channel_name: format!("{url} title"),
        published_at,
        content: format!("post {msg_id}"),
        channel_id: 42,
        message_id: msg_id,
    }
}

fn memory_store() -> (Arc<MemoryBackend>, ArchiveStore) {
    let backend = Arc::new(MemoryBackend::new());
    let store = ArchiveStore::new(backend.clone(), settings(&[]));
    (backend, store)
}

async fn ingest_one_to_five(store: &ArchiveStore) {
    for id in 1..=5 {
        let outcome = store
            .add_new_item("foo", "Foo", T0 + id * 60, &format!("post {id}"), 42, id)
            .await
            .unwrap();
        assert_eq!(outcome, AddOutcome::Stored);
    }
}

fn ids(records: &[ArchiveRecord]) -> Vec<i64> {
    records.iter().map(|r| r.message_id).collect()
}

async fn assert_one_to_five_pages(store: &ArchiveStore) {
    let page = store.query(0, 2).await.unwrap();
    assert_eq!(ids(&page.records), vec![5, 4]);
    assert_eq!(page.next_cursor, score(T0 + 4 * 60, 4));

    let page = store.query(page.next_cursor, 2).await.unwrap();
    assert_eq!(ids(&page.records), vec![3, 2]);
    assert_eq!(page.next_cursor, score(T0 + 2 * 60, 2));

    let page = store.query(page.next_cursor, 2).await.unwrap();
    assert_eq!(ids(&page.records), vec![1]);
    assert_eq!(page.next_cursor, score(T0 + 60, 1));

    let page = store.query(page.next_cursor, 2).await.unwrap();
    assert!(page.records.is_empty());
    assert_eq!(page.next_cursor, CURSOR_EXHAUSTED);
}

#[tokio::test]
async fn end_to_end_pagination_over_memory_backend() {
    let (_, store) = memory_store();
    ingest_one_to_five(&store).await;
    assert_one_to_five_pages(&store).await;
    assert_eq!(store.total().await.unwrap(), 5);
}

#[tokio::test]
async fn end_to_end_pagination_over_sqlite_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.db");
    let backend = Arc::new(SqliteBackend::new(path.to_string_lossy()));
    backend.initialize().await.unwrap();
    let store = ArchiveStore::new(backend, settings(&[]));

    ingest_one_to_five(&store).await;
    assert_one_to_five_pages(&store).await;
    assert_eq!(store.total().await.unwrap(), 5);
}

#[tokio::test]
async fn adding_twice_stores_one_record_and_one_index_entry() {
    let (backend, store) = memory_store();
    let rec = record("foo", 7, T0);

    assert_eq!(store.add(&rec).await.unwrap(), AddOutcome::Stored);
    assert_eq!(store.add(&rec).await.unwrap(), AddOutcome::Duplicate);

    assert_eq!(store.total().await.unwrap(), 1);
    assert_eq!(backend.record_count().await, 1);
}

#[tokio::test]
async fn query_prefixes_url_at_read_time_only() {
    let (backend, store) = memory_store();
    store.add(&record("foo", 1, T0)).await.unwrap();

    let page = store.query(0, 10).await.unwrap();
    assert_eq!(page.records[0].channel_url, "t.me/foo");

    let stored = backend
        .record_get(&format!("{NS}_{}", member_key("foo", 1)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.channel_url, "foo");
}

#[tokio::test]
async fn add_new_item_replaces_newlines() {
    let (_, store) = memory_store();
    store
        .add_new_item("foo", "Foo", T0, "line one\nline two", 42, 1)
        .await
        .unwrap();
    let page = store.query(0, 10).await.unwrap();
    assert_eq!(page.records[0].content, "line one</ p>line two");
}

#[tokio::test]
async fn cursor_record_is_never_repeated() {
    let (_, store) = memory_store();
    for id in 1..=3 {
        store.add(&record("foo", id, T0 + id)).await.unwrap();
    }
    let boundary = score(T0 + 2, 2);
    let page = store.query(boundary, 10).await.unwrap();
    assert_eq!(ids(&page.records), vec![1]);
}

#[tokio::test]
async fn chained_pages_visit_every_record_once_in_decreasing_order() {
    let (_, store) = memory_store();
    // Several posts share a second so ordering falls back to message id.
    for id in 1..=23 {
        let url = if id % 2 == 0 { "foo" } else { "bar" };
        store.add(&record(url, id, T0 + id / 3)).await.unwrap();
    }

    let mut seen = Vec::new();
    let mut cursor = 0;
    loop {
        let page = store.query(cursor, 4).await.unwrap();
        if page.records.is_empty() {
            assert_eq!(page.next_cursor, CURSOR_EXHAUSTED);
            break;
        }
        seen.extend(page.records.iter().map(|r| score(r.published_at, r.message_id)));
        cursor = page.next_cursor;
    }

    assert_eq!(seen.len(), 23);
    assert!(seen.windows(2).all(|w| w[0] > w[1]));
}

/// Posts from one second in 2026 whose scores collide once rounded to `f64`.
async fn ingest_colliding_scores(store: &ArchiveStore) -> usize {
    let t = 1_776_297_600;
    let mut count = 0;
    for id in 1000..=1040 {
        let url = if id % 3 == 0 { "foo" } else { "bar" };
        store.add(&record(url, id, t)).await.unwrap();
        count += 1;
    }
    for id in [7, 2_000_000] {
        store.add(&record("baz", id, t + 1)).await.unwrap();
        count += 1;
    }
    assert_eq!(score(t, 1000) as f64, score(t, 1003) as f64);
    count
}

async fn walk_all_pages(store: &ArchiveStore, limit: usize) -> Vec<i64> {
    let mut seen = Vec::new();
    let mut cursor = 0;
    loop {
        let page = store.query(cursor, limit).await.unwrap();
        if page.records.is_empty() {
            assert_eq!(page.next_cursor, CURSOR_EXHAUSTED);
            break;
        }
        assert!(page.records.len() <= limit);
        seen.extend(page.records.iter().map(|r| score(r.published_at, r.message_id)));
        cursor = page.next_cursor;
    }
    seen
}

#[tokio::test]
async fn double_score_backend_pages_every_colliding_record_once() {
    for limit in [1, 2, 5, 50] {
        let backend = Arc::new(MemoryBackend::with_double_scores());
        let store = ArchiveStore::new(backend, settings(&[]));
        let count = ingest_colliding_scores(&store).await;

        let seen = walk_all_pages(&store, limit).await;
        assert_eq!(seen.len(), count, "limit {limit}");
        assert!(seen.windows(2).all(|w| w[0] > w[1]), "limit {limit}");
    }
}

#[tokio::test]
async fn double_score_backend_fills_page_past_already_read_neighbours() {
    let backend = Arc::new(MemoryBackend::with_double_scores());
    let store = ArchiveStore::new(backend, settings(&[]));
    ingest_colliding_scores(&store).await;

    let t = 1_776_297_600;
    // Everything above this record shares its stored double with it.
    let cursor = score(t, 1030);
    let page = store.query(cursor, 3).await.unwrap();
    assert_eq!(ids(&page.records), vec![1029, 1028, 1027]);
    assert_eq!(page.next_cursor, score(t, 1027));
}

#[tokio::test]
async fn keyword_filter_sees_normalised_content() {
    let backend = Arc::new(MemoryBackend::new());
    let store = ArchiveStore::new(backend, settings(&["one</ p>two"]));

    store
        .add_new_item("foo", "Foo", T0, "one\ntwo", 42, 1)
        .await
        .unwrap();
    let err = store
        .add_new_item("foo", "Foo", T0 + 1, "one two", 42, 2)
        .await
        .unwrap_err();
    assert!(err.is_filtered());
    assert_eq!(store.total().await.unwrap(), 1);
}

#[tokio::test]
async fn filtered_content_is_rejected_and_never_listed() {
    let backend = Arc::new(MemoryBackend::new());
    let store = ArchiveStore::new(backend, settings(&["机场", "订阅", "节点"]));

    let err = store
        .add_new_item("foo", "Foo", T0, "nothing relevant here", 42, 1)
        .await
        .unwrap_err();
    assert!(err.is_filtered());

    store
        .add_new_item("foo", "Foo", T0 + 1, "新的订阅链接", 42, 2)
        .await
        .unwrap();

    let page = store.query(0, 10).await.unwrap();
    assert_eq!(ids(&page.records), vec![2]);
    assert_eq!(store.total().await.unwrap(), 1);
}

#[tokio::test]
async fn missing_record_is_skipped_from_page() {
    let (backend, store) = memory_store();
    for id in 1..=3 {
        store.add(&record("foo", id, T0 + id)).await.unwrap();
    }
    backend
        .remove_record(&format!("{NS}_{}", member_key("foo", 3)))
        .await
        .unwrap();

    let page = store.query(0, 3).await.unwrap();
    assert_eq!(ids(&page.records), vec![2, 1]);
    assert_eq!(page.next_cursor, score(T0 + 1, 1));
    // The index still counts the orphaned entry.
    assert_eq!(store.total().await.unwrap(), 3);
}

#[tokio::test]
async fn page_of_only_missing_records_reports_exhausted() {
    let (backend, store) = memory_store();
    store.add(&record("foo", 1, T0)).await.unwrap();
    backend
        .remove_record(&format!("{NS}_{}", member_key("foo", 1)))
        .await
        .unwrap();

    let page = store.query(CURSOR_START, 5).await.unwrap();
    assert!(page.records.is_empty());
    assert_eq!(page.next_cursor, CURSOR_EXHAUSTED);
}

#[tokio::test]
async fn failed_record_write_leaves_no_index_entry() {
    let (backend, store) = memory_store();
    backend.fail_record_put(true);

    let err = store.add(&record("foo", 1, T0)).await.unwrap_err();
    assert!(matches!(err, ArchiveError::Storage { .. }));
    assert_eq!(store.total().await.unwrap(), 0);

    // Not indexed, so a retry goes through once the backend recovers.
    backend.fail_record_put(false);
    assert_eq!(
        store.add(&record("foo", 1, T0)).await.unwrap(),
        AddOutcome::Stored
    );
}

#[tokio::test(start_paused = true)]
async fn stalled_backend_times_out() {
    let backend = Arc::new(MemoryBackend::stalling(Duration::from_secs(30)));
    let store = ArchiveStore::new(backend, settings(&[]));

    let err = store.total().await.unwrap_err();
    assert!(
        matches!(err, ArchiveError::Timeout { duration } if duration == Duration::from_secs(10))
    );
}

#[tokio::test]
async fn progress_round_trips_through_store() {
    let (_, store) = memory_store();
    assert_eq!(store.load_progress(42).await.unwrap(), None);
    store
        .save_progress(42, subarchive_core::ProgressToken(900))
        .await
        .unwrap();
    assert_eq!(
        store.load_progress(42).await.unwrap(),
        Some(subarchive_core::ProgressToken(900))
    );
}
