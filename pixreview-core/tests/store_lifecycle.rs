//! Integration test for the review-state store lifecycle.
//!
//! Exercises: open, migrate, get/set/remove, keys, snapshot, reset,
//! data_version change detection across connections.

use pixreview_core::{ClassificationState, ResetPolicy, ResetScope, ReviewKey, ReviewStore};

fn temp_db_path() -> std::path::PathBuf {
    let dir = tempfile::TempDir::new().unwrap();
    dir.keep().join("nested").join("reviews.db")
}

fn key(name: &str) -> ReviewKey {
    ReviewKey::new(format!("https://x/{name}.html"), format!("{name}-hash"))
}

#[tokio::test]
async fn full_store_lifecycle() {
    let path = temp_db_path();
    let store = ReviewStore::open(&path).await.unwrap();

    // Schema and journal mode, checked through an independent connection.
    {
        let db = rusqlite::Connection::open(&path).unwrap();
        let version: i64 = db
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1, "schema_version should be 1");
        let journal: String = db.query_row("PRAGMA journal_mode", [], |r| r.get(0)).unwrap();
        assert_eq!(journal, "wal", "journal_mode should be wal");
    }

    // Absent keys read as unset.
    assert_eq!(store.get(&key("a")).await.unwrap(), ClassificationState::Unset);
    assert!(store.keys().await.unwrap().is_empty());

    // set then get returns what was written; writes overwrite.
    store.set(&key("a"), ClassificationState::Rejected).await.unwrap();
    store.set(&key("a"), ClassificationState::Accepted).await.unwrap();
    assert_eq!(store.get(&key("a")).await.unwrap(), ClassificationState::Accepted);

    store.set(&key("b"), ClassificationState::PendingUpdate).await.unwrap();
    assert_eq!(store.get(&key("b")).await.unwrap(), ClassificationState::PendingUpdate);

    // The hash is part of the identity.
    let stale = ReviewKey::new("https://x/a.html", "older-hash");
    assert_eq!(store.get(&stale).await.unwrap(), ClassificationState::Unset);

    // Enumeration returns the storage keys.
    let keys = store.keys().await.unwrap();
    assert_eq!(keys, vec![key("a").storage_key(), key("b").storage_key()]);

    // Writing Unset removes the row.
    store.set(&key("b"), ClassificationState::Unset).await.unwrap();
    assert_eq!(store.keys().await.unwrap().len(), 1);

    // Persistence: a second store on the same file sees the verdict.
    let reopened = ReviewStore::open(&path).await.unwrap();
    assert_eq!(reopened.get(&key("a")).await.unwrap(), ClassificationState::Accepted);
}

#[tokio::test]
async fn reset_accepted_removes_exactly_accepted() {
    let store = ReviewStore::open(temp_db_path()).await.unwrap();
    store.set(&key("a"), ClassificationState::Accepted).await.unwrap();
    store.set(&key("b"), ClassificationState::Rejected).await.unwrap();
    store.set(&key("c"), ClassificationState::PendingUpdate).await.unwrap();
    store.set(&key("d"), ClassificationState::Accepted).await.unwrap();

    let report = store.reset(ResetScope::Accepted, ResetPolicy::default()).await.unwrap();
    assert_eq!(report.removed, 2);
    assert!(report.failed.is_empty());

    let left = store.snapshot().await.unwrap();
    assert_eq!(left.len(), 2);
    assert_eq!(left[&key("b").storage_key()], ClassificationState::Rejected);
    assert_eq!(left[&key("c").storage_key()], ClassificationState::PendingUpdate);
}

#[tokio::test]
async fn reset_all_honours_pending_policy() {
    let store = ReviewStore::open(temp_db_path()).await.unwrap();
    for (name, state) in [
        ("a", ClassificationState::Accepted),
        ("b", ClassificationState::Rejected),
        ("c", ClassificationState::PendingUpdate),
    ] {
        store.set(&key(name), state).await.unwrap();
    }

    let report = store.reset(ResetScope::All, ResetPolicy::default()).await.unwrap();
    assert_eq!(report.removed, 2);
    assert_eq!(store.get(&key("c")).await.unwrap(), ClassificationState::PendingUpdate);

    let policy = ResetPolicy { all_includes_pending: true };
    let report = store.reset(ResetScope::All, policy).await.unwrap();
    assert_eq!(report.removed, 1);
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn reset_where_accepts_any_predicate() {
    let store = ReviewStore::open(temp_db_path()).await.unwrap();
    store.set(&key("a"), ClassificationState::Rejected).await.unwrap();
    store.set(&key("b"), ClassificationState::PendingUpdate).await.unwrap();

    let report = store
        .reset_where(|s| s == ClassificationState::PendingUpdate)
        .await
        .unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(store.get(&key("a")).await.unwrap(), ClassificationState::Rejected);
}

#[tokio::test]
async fn unknown_values_read_as_unset() {
    let path = temp_db_path();
    let store = ReviewStore::open(&path).await.unwrap();
    {
        let db = rusqlite::Connection::open(&path).unwrap();
        db.execute(
            "INSERT INTO review_state (key, value, updated_at) VALUES (?1, 'frobnicated', 0)",
            rusqlite::params![key("a").storage_key()],
        )
        .unwrap();
    }
    assert_eq!(store.get(&key("a")).await.unwrap(), ClassificationState::Unset);
    assert!(store.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn data_version_tracks_other_connections_only() {
    let path = temp_db_path();
    let index_side = ReviewStore::open(&path).await.unwrap();
    let review_side = ReviewStore::open(&path).await.unwrap();

    let before = index_side.data_version().await.unwrap();

    // A write through the index's own connection does not notify it.
    index_side.set(&key("a"), ClassificationState::Rejected).await.unwrap();
    assert_eq!(index_side.data_version().await.unwrap(), before);

    // A write from another connection does.
    review_side.set(&key("a"), ClassificationState::Accepted).await.unwrap();
    assert_ne!(index_side.data_version().await.unwrap(), before);
    assert_eq!(index_side.get(&key("a")).await.unwrap(), ClassificationState::Accepted);
}

#[tokio::test]
async fn reset_skips_keys_that_cannot_be_removed() {
    let path = temp_db_path();
    let store = ReviewStore::open(&path).await.unwrap();
    for name in ["a", "b", "c"] {
        store.set(&key(name), ClassificationState::Accepted).await.unwrap();
    }
    let locked = key("b").storage_key();
    {
        let db = rusqlite::Connection::open(&path).unwrap();
        db.execute_batch(&format!(
            "CREATE TRIGGER keep_b BEFORE DELETE ON review_state
             WHEN OLD.key = '{locked}'
             BEGIN SELECT RAISE(ABORT, 'row is locked'); END;"
        ))
        .unwrap();
    }

    let report = store.reset(ResetScope::Accepted, ResetPolicy::default()).await.unwrap();
    assert_eq!(report.removed, 2);
    assert_eq!(report.failed, vec![locked.clone()]);
    assert_eq!(store.keys().await.unwrap(), vec![locked]);
}
