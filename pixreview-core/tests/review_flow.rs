//! End-to-end classification flow: index order, store writes, promotion.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::future::Future;

use pixreview_core::nav::{EntrySource, Opener};
use pixreview_core::promote::{BaselinePromoter, PromoteError, PromotionRequest};
use pixreview_core::review::{mark_state, MarkError, MarkOutcome};
use pixreview_core::{ClassificationState, IndexEntry, ReviewKey, ReviewStore};

struct Listing {
    origin: String,
    entries: Vec<IndexEntry>,
}

impl EntrySource for Listing {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn ordered_entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

fn entry(name: &str, hash: &str) -> IndexEntry {
    IndexEntry {
        key: ReviewKey::new(format!("https://x/{name}.html"), hash),
        name: name.to_owned(),
        href: format!("{name}.html"),
    }
}

/// Records requests and answers with a fixed result.
struct FakePromoter {
    calls: AtomicUsize,
    fail_with: Option<PromoteError>,
}

impl FakePromoter {
    fn ok() -> Self {
        Self { calls: AtomicUsize::new(0), fail_with: None }
    }

    fn failing(err: PromoteError) -> Self {
        Self { calls: AtomicUsize::new(0), fail_with: Some(err) }
    }
}

impl BaselinePromoter for FakePromoter {
    fn promote(&self, request: &PromotionRequest) -> impl Future<Output = Result<(), PromoteError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.test, "test1");
        let result = match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        };
        async move { result }
    }
}

async fn temp_store() -> ReviewStore {
    let dir = tempfile::TempDir::new().unwrap();
    ReviewStore::open(dir.keep().join("reviews.db")).await.unwrap()
}

#[tokio::test]
async fn accept_records_verdict_and_advances_in_index_order() {
    let store = temp_store().await;
    let listing: Rc<dyn EntrySource> = Rc::new(Listing {
        origin: "https://x".to_owned(),
        entries: vec![entry("test1", "deadbeef"), entry("test2", "cafe")],
    });
    let opener = Opener::new(Rc::downgrade(&listing));

    let key = ReviewKey::new("https://x/test1.html", "deadbeef");
    let next = opener.next_after(&key, |_| true).map(|e| e.key.locator);
    assert_eq!(next.as_deref(), Some("https://x/test2.html"));

    let promoter = FakePromoter::ok();
    let outcome = mark_state(&store, &promoter, &key, ClassificationState::Accepted, next.as_deref())
        .await
        .unwrap();

    assert_eq!(outcome, MarkOutcome::Advance("https://x/test2.html".to_owned()));
    let snapshot = store.snapshot().await.unwrap();
    assert_eq!(snapshot["https://x/test1.html+deadbeef"], ClassificationState::Accepted);
    assert_eq!(promoter.calls.load(Ordering::SeqCst), 0, "accept never promotes");

    // Once the index is gone the same lookup yields nothing.
    drop(listing);
    assert!(!opener.is_open());
    assert!(opener.next_after(&key, |_| true).is_none());
}

#[tokio::test]
async fn reject_on_last_case_closes() {
    let store = temp_store().await;
    let key = ReviewKey::new("https://x/test2.html", "cafe");
    let outcome = mark_state(&store, &FakePromoter::ok(), &key, ClassificationState::Rejected, None)
        .await
        .unwrap();
    assert_eq!(outcome, MarkOutcome::Close);
    assert_eq!(store.get(&key).await.unwrap(), ClassificationState::Rejected);
}

#[tokio::test]
async fn successful_update_ends_accepted() {
    let store = temp_store().await;
    let key = ReviewKey::new("https://x/test1.html", "deadbeef");
    let promoter = FakePromoter::ok();

    let outcome = mark_state(&store, &promoter, &key, ClassificationState::PendingUpdate, Some("https://x/test2.html"))
        .await
        .unwrap();

    assert_eq!(outcome, MarkOutcome::Advance("https://x/test2.html".to_owned()));
    assert_eq!(promoter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.get(&key).await.unwrap(), ClassificationState::Accepted);
}

#[tokio::test]
async fn failed_update_restores_previous_state() {
    let store = temp_store().await;
    let key = ReviewKey::new("https://x/test1.html", "deadbeef");
    store.set(&key, ClassificationState::Rejected).await.unwrap();

    let promoter = FakePromoter::failing(PromoteError::Status(500));
    let err = mark_state(&store, &promoter, &key, ClassificationState::PendingUpdate, Some("https://x/test2.html"))
        .await
        .unwrap_err();

    assert!(matches!(err, MarkError::Promotion(PromoteError::Status(500))), "got {err:?}");
    assert_eq!(store.get(&key).await.unwrap(), ClassificationState::Rejected);
}

#[tokio::test]
async fn failed_update_on_unreviewed_case_leaves_it_unset() {
    let store = temp_store().await;
    let key = ReviewKey::new("https://x/test1.html", "deadbeef");
    let promoter = FakePromoter::failing(PromoteError::Transport("connection refused".to_owned()));

    assert!(mark_state(&store, &promoter, &key, ClassificationState::PendingUpdate, None).await.is_err());
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn unset_is_not_an_action() {
    let store = temp_store().await;
    let key = ReviewKey::new("https://x/test1.html", "deadbeef");
    let err = mark_state(&store, &FakePromoter::ok(), &key, ClassificationState::Unset, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MarkError::InvalidAction(ClassificationState::Unset)));
    assert!(store.keys().await.unwrap().is_empty());
}
