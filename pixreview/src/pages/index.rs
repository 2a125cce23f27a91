//! Index page: the ordered listing of test cases with their verdicts.

use std::collections::HashMap;
use std::rc::Rc;

use pixreview_core::document::{origin_of, Document, DocumentError, LoadedDocument};
use pixreview_core::nav::{EntrySource, Opener};
use pixreview_core::{ClassificationState, IndexEntry, ResetPolicy, ResetReport, ResetScope, ReviewStore, StoreError};
use ratatui::widgets::ListState;

use crate::event::PageId;

/// Entry order and origin of one index document, shared read-only with the
/// review pages it opens.
#[derive(Debug)]
pub struct IndexListing {
    origin: String,
    entries: Vec<IndexEntry>,
}

impl IndexListing {
    pub fn from_document(doc: &LoadedDocument) -> Result<Self, DocumentError> {
        Ok(Self { origin: origin_of(doc.locator.as_str()), entries: doc.entries()? })
    }
}

impl EntrySource for IndexListing {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn ordered_entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

/// Per-state totals shown in the summary line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub accepted: usize,
    pub rejected: usize,
    pub pending: usize,
    pub unset: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.accepted + self.rejected + self.pending + self.unset
    }
}

pub struct IndexPage {
    pub id: PageId,
    pub title: String,
    listing: Rc<IndexListing>,
    /// Stored states keyed by `ReviewKey::storage_key()`.
    states: HashMap<String, ClassificationState>,
    pub list_state: ListState,
    /// Last `data_version` seen; `None` until the first activation.
    data_version: Option<i64>,
}

impl IndexPage {
    pub fn new(id: PageId, doc: &LoadedDocument) -> Result<Self, DocumentError> {
        let title = match &doc.document {
            Document::Index(index) => index.title.clone(),
            Document::Case(_) => None,
        }
        .unwrap_or_else(|| doc.locator.to_string());
        let listing = Rc::new(IndexListing::from_document(doc)?);
        let mut list_state = ListState::default();
        if !listing.entries.is_empty() {
            list_state.select(Some(0));
        }
        Ok(Self { id, title, listing, states: HashMap::new(), list_state, data_version: None })
    }

    /// Re-reads every state. Runs when the page is first shown and whenever
    /// the user comes back to it from a review.
    pub async fn activate(&mut self, store: &ReviewStore) -> Result<(), StoreError> {
        self.data_version = Some(store.data_version().await?);
        self.states = store.snapshot().await?;
        tracing::debug!(page = self.id, stored = self.states.len(), "index snapshot loaded");
        Ok(())
    }

    /// Reloads the snapshot if another process committed since the last look.
    ///
    /// Returns `true` when the listing changed.
    pub async fn poll(&mut self, store: &ReviewStore) -> Result<bool, StoreError> {
        let version = store.data_version().await?;
        if self.data_version == Some(version) {
            return Ok(false);
        }
        tracing::debug!(page = self.id, version, "review database changed elsewhere");
        self.activate(store).await?;
        Ok(true)
    }

    pub async fn reset(
        &mut self,
        store: &ReviewStore,
        scope: ResetScope,
        policy: ResetPolicy,
    ) -> Result<ResetReport, StoreError> {
        let report = store.reset(scope, policy).await?;
        self.activate(store).await?;
        Ok(report)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        self.listing.ordered_entries()
    }

    pub fn state_of(&self, entry: &IndexEntry) -> ClassificationState {
        self.states.get(&entry.key.storage_key()).copied().unwrap_or_default()
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for entry in self.entries() {
            match self.state_of(entry) {
                ClassificationState::Accepted => counts.accepted += 1,
                ClassificationState::Rejected => counts.rejected += 1,
                ClassificationState::PendingUpdate => counts.pending += 1,
                ClassificationState::Unset => counts.unset += 1,
            }
        }
        counts
    }

    pub fn selected(&self) -> Option<&IndexEntry> {
        self.list_state.selected().and_then(|i| self.entries().get(i))
    }

    /// Moves the selection onto `locator`, if it is listed.
    pub fn select_locator(&mut self, locator: &str) {
        if let Some(i) = self.entries().iter().position(|e| e.key.locator == locator) {
            self.list_state.select(Some(i));
        }
    }

    pub fn select_next(&mut self) {
        self.list_state.select_next();
    }

    pub fn select_previous(&mut self) {
        self.list_state.select_previous();
    }

    pub fn select_first(&mut self) {
        self.list_state.select_first();
    }

    pub fn select_last(&mut self) {
        self.list_state.select_last();
    }

    /// Link handed to a review page opened as a dependent of this index.
    pub fn opener(&self) -> Opener {
        let weak = Rc::downgrade(&self.listing);
        Opener::new(weak)
    }
}
