//! Central application state for pixreview.
//!
//! `App` owns the page stack, the current input mode and the handles every
//! page shares (review store, promoter, image loader, event sender). Pure
//! state changes happen in the keybinding dispatcher; anything that touches
//! the store or the filesystem arrives here as an [`Action`] and runs on the
//! main loop, so pages are only ever mutated from one place.

use std::path::Path;

use anyhow::Context;
use pixreview_core::document::{Document, LoadedDocument};
use pixreview_core::nav::Opener;
use pixreview_core::review::{mark_state, MarkError, MarkOutcome};
use pixreview_core::{ClassificationState, ResetScope, ReviewStore};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::Config;
use crate::event::{AppEvent, PageId};
use crate::loader::types::LoadedPair;
use crate::loader::Loader;
use crate::pages::index::IndexPage;
use crate::pages::review::{MarkJob, ReviewPage};
use crate::pages::Page;
use crate::promote::HttpPromoter;

/// Input mode controlling which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Full-screen help overlay is shown above the page.
    HelpOverlay,
    /// Asking whether to remove every verdict in the scope.
    ConfirmReset(ResetScope),
    /// Asking whether to quit while a baseline update is still running.
    ConfirmQuit,
}

/// Work that needs the store, the filesystem or a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open the selected index row; `dependent` keeps the link to the index.
    OpenSelected { dependent: bool },
    /// Classify the case on screen.
    Mark(ClassificationState),
    /// Skip to the next case without classifying.
    NextCase,
    /// Leave the review and return to the index below it.
    Back,
    Reset(ResetScope),
}

pub struct App {
    pub mode: Mode,
    pages: Vec<Page>,
    /// One-line message shown in the status bar until the next action.
    pub status: Option<String>,
    pub help_scroll: u16,
    next_page_id: PageId,
    store: ReviewStore,
    promoter: HttpPromoter,
    loader: Loader,
    tx: UnboundedSender<AppEvent>,
    config: Config,
}

impl App {
    pub fn new(
        store: ReviewStore,
        promoter: HttpPromoter,
        loader: Loader,
        tx: UnboundedSender<AppEvent>,
        config: Config,
    ) -> Self {
        Self {
            mode: Mode::default(),
            pages: Vec::new(),
            status: None,
            help_scroll: 0,
            next_page_id: 1,
            store,
            promoter,
            loader,
            tx,
            config,
        }
    }

    /// Opens the document given on the command line as the first page.
    /// A case opened this way is a top-level review.
    pub async fn open_document(&mut self, path: &Path) -> anyhow::Result<()> {
        let doc = LoadedDocument::from_path(path)?;
        let page = match &doc.document {
            Document::Index(_) => {
                let mut page = IndexPage::new(self.alloc_id(), &doc)?;
                page.activate(&self.store).await.context("loading review states")?;
                Page::Index(page)
            }
            Document::Case(_) => Page::Review(self.build_review(&doc, None).await?),
        };
        tracing::info!(locator = %doc.locator, "document opened");
        self.pages.push(page);
        Ok(())
    }

    pub fn top(&self) -> Option<&Page> {
        self.pages.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Page> {
        self.pages.last_mut()
    }

    /// Number of pages on the stack.
    pub fn depth(&self) -> usize {
        self.pages.len()
    }

    /// `true` while any review page waits on a classification.
    pub fn has_pending_work(&self) -> bool {
        self.pages.iter().any(|p| matches!(p, Page::Review(r) if r.is_busy()))
    }

    pub async fn perform(&mut self, action: Action) {
        self.status = None;
        let result = match action {
            Action::OpenSelected { dependent } => self.open_selected(dependent).await,
            Action::Mark(state) => {
                self.mark(state);
                Ok(())
            }
            Action::NextCase => self.next_case().await,
            Action::Back => self.back().await,
            Action::Reset(scope) => self.reset(scope).await,
        };
        if let Err(e) = result {
            let message = format!("{e:#}");
            tracing::warn!(?action, error = %message, "action failed");
            self.status = Some(message);
        }
    }

    /// Logic tick: the index listing picks up verdicts other processes wrote.
    pub async fn on_tick(&mut self) {
        let store = self.store.clone();
        if let Some(Page::Index(index)) = self.pages.last_mut() {
            if let Err(e) = index.poll(&store).await {
                tracing::warn!(error = %e, "polling review states failed");
            }
        }
    }

    pub fn on_pair_loaded(&mut self, pair: LoadedPair) {
        match self.pages.last_mut() {
            Some(Page::Review(review)) if review.id == pair.page => review.apply_pair(pair),
            _ => tracing::debug!(page = pair.page, "dropping pair for a page no longer shown"),
        }
    }

    pub fn on_frame_tick(&mut self, page: PageId, generation: u64) {
        if let Some(Page::Review(review)) = self.pages.last_mut() {
            if review.id == page {
                review.on_frame_tick(generation);
            }
        }
    }

    pub async fn on_marked(&mut self, page: PageId, result: Result<MarkOutcome, MarkError>) {
        let Some(Page::Review(review)) = self.pages.last_mut().filter(|p| p.id() == page) else {
            tracing::info!(page, ok = result.is_ok(), "classification finished after leaving the page");
            return;
        };
        review.finish_mark(&result);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.status = Some(format!("Not saved: {e}"));
                return;
            }
        };

        let navigated = match outcome {
            MarkOutcome::Advance(locator) => {
                let opener = review.opener();
                self.replace_review(&locator, opener).await
            }
            MarkOutcome::Close => self.close_session().await,
        };
        if let Err(e) = navigated {
            self.status = Some(format!("{e:#}"));
        }
    }

    fn alloc_id(&mut self) -> PageId {
        let id = self.next_page_id;
        self.next_page_id += 1;
        id
    }

    async fn build_review(&mut self, doc: &LoadedDocument, opener: Option<Opener>) -> anyhow::Result<ReviewPage> {
        let id = self.alloc_id();
        let mut page = ReviewPage::new(id, doc, opener, self.tx.clone(), self.config.frame_delay())?;
        page.activate(&self.store, &self.loader, self.config.skip_classified)
            .await
            .context("loading review state")?;
        Ok(page)
    }

    async fn open_selected(&mut self, dependent: bool) -> anyhow::Result<()> {
        let Some(Page::Index(index)) = self.pages.last() else {
            return Ok(());
        };
        let Some(entry) = index.selected() else {
            return Ok(());
        };
        let locator = entry.key.locator.clone();
        let opener = dependent.then(|| index.opener());

        let doc = LoadedDocument::from_locator(&locator)?;
        let page = self.build_review(&doc, opener).await?;
        self.pages.push(Page::Review(page));
        Ok(())
    }

    fn mark(&mut self, state: ClassificationState) {
        let Some(Page::Review(review)) = self.pages.last_mut() else {
            return;
        };
        let Some(job) = review.begin_mark(state) else {
            self.status = Some("Still saving the previous verdict".to_owned());
            return;
        };
        if state == ClassificationState::PendingUpdate {
            self.status = Some(format!("Updating baseline via {}", self.promoter.endpoint()));
        }
        self.spawn_mark(job);
    }

    fn spawn_mark(&self, job: MarkJob) {
        let store = self.store.clone();
        let promoter = self.promoter.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = mark_state(&store, &promoter, &job.key, job.action, job.next.as_deref()).await;
            let _ = tx.send(AppEvent::Marked { page: job.page, result });
        });
    }

    async fn next_case(&mut self) -> anyhow::Result<()> {
        let Some(Page::Review(review)) = self.pages.last() else {
            return Ok(());
        };
        if review.is_busy() {
            return Ok(());
        }
        match review.next_entry().map(|e| e.key.locator.clone()) {
            Some(locator) => {
                let opener = review.opener();
                self.replace_review(&locator, opener).await
            }
            None => {
                self.status = Some("No next case".to_owned());
                Ok(())
            }
        }
    }

    /// Swaps the review on top for the case at `locator`.
    async fn replace_review(&mut self, locator: &str, opener: Option<Opener>) -> anyhow::Result<()> {
        let doc = LoadedDocument::from_locator(locator)?;
        let page = self.build_review(&doc, opener).await?;
        if let Some(top) = self.pages.last_mut() {
            *top = Page::Review(page);
        }
        Ok(())
    }

    /// Ends a review session that has no next case. A dependent review
    /// returns to its index; a top-level one stays put.
    async fn close_session(&mut self) -> anyhow::Result<()> {
        let dependent = matches!(self.pages.last(), Some(Page::Review(r)) if r.is_dependent());
        if dependent && self.pages.len() > 1 {
            self.back().await
        } else {
            self.status = Some("Saved. No next case".to_owned());
            Ok(())
        }
    }

    async fn back(&mut self) -> anyhow::Result<()> {
        if self.pages.len() < 2 || !matches!(self.pages.last(), Some(Page::Review(_))) {
            return Ok(());
        }
        let Some(Page::Review(left)) = self.pages.pop() else {
            return Ok(());
        };
        let store = self.store.clone();
        if let Some(Page::Index(index)) = self.pages.last_mut() {
            index.select_locator(&left.key.locator);
            index.activate(&store).await.context("reloading review states")?;
        }
        Ok(())
    }

    async fn reset(&mut self, scope: ResetScope) -> anyhow::Result<()> {
        let policy = self.config.reset_policy();
        let store = self.store.clone();
        let Some(Page::Index(index)) = self.pages.last_mut() else {
            return Ok(());
        };
        let report = index.reset(&store, scope, policy).await.context("resetting verdicts")?;
        self.status = Some(if report.failed.is_empty() {
            format!("Removed {} verdicts", report.removed)
        } else {
            format!("Removed {} verdicts, {} could not be removed", report.removed, report.failed.len())
        });
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Writes an index with two cases under `dir` and returns the index path.
    pub(crate) fn write_run(dir: &Path) -> std::path::PathBuf {
        RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255])).save(dir.join("rec.png")).unwrap();
        RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])).save(dir.join("act.png")).unwrap();
        for (name, hash) in [("test1", "aa"), ("test2", "bb")] {
            std::fs::write(
                dir.join(format!("{name}.json")),
                format!(r#"{{"page":"case","actual_hash":"{hash}","images":["rec.png","act.png"]}}"#),
            )
            .unwrap();
        }
        std::fs::write(
            dir.join("index.json"),
            r#"{"page":"index","rows":[
                {"href":"test1.json","actual_hash":"aa"},
                {"href":"test2.json","actual_hash":"bb"}]}"#,
        )
        .unwrap();
        dir.join("index.json")
    }

    pub(crate) async fn test_app(dir: &Path) -> (App, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let store = ReviewStore::open(dir.join("reviews.db")).await.unwrap();
        // Nothing listens here; only the update action would reach it.
        let promoter = HttpPromoter::new("http://127.0.0.1:9/fixtures.json", Duration::from_millis(200)).unwrap();
        let loader = Loader::spawn(tx.clone()).unwrap();
        (App::new(store, promoter, loader, tx, Config::default()), rx)
    }

    async fn next_marked(rx: &mut UnboundedReceiver<AppEvent>) -> (PageId, Result<MarkOutcome, MarkError>) {
        loop {
            match rx.recv().await {
                Some(AppEvent::Marked { page, result }) => return (page, result),
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        }
    }

    fn top_review(app: &App) -> &ReviewPage {
        match app.top() {
            Some(Page::Review(r)) => r,
            _ => panic!("top page is not a review"),
        }
    }

    #[tokio::test]
    async fn dependent_review_walks_the_index_and_returns() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut app, mut rx) = test_app(dir.path()).await;
        app.open_document(&write_run(dir.path())).await.unwrap();

        app.perform(Action::OpenSelected { dependent: true }).await;
        assert_eq!(app.depth(), 2);
        assert_eq!(top_review(&app).title, "test1");
        assert_eq!(top_review(&app).next_entry().unwrap().name, "test2");

        app.perform(Action::Mark(ClassificationState::Accepted)).await;
        let (page, result) = next_marked(&mut rx).await;
        app.on_marked(page, result).await;
        assert_eq!(app.depth(), 2, "advance replaces the review");
        assert_eq!(top_review(&app).title, "test2");

        app.perform(Action::Mark(ClassificationState::Rejected)).await;
        let (page, result) = next_marked(&mut rx).await;
        app.on_marked(page, result).await;
        assert_eq!(app.depth(), 1, "last case closes back to the index");

        let Some(Page::Index(index)) = app.top() else { panic!("expected the index") };
        let counts = index.counts();
        assert_eq!((counts.accepted, counts.rejected, counts.unset), (1, 1, 0));
        assert_eq!(index.selected().unwrap().name, "test2");
    }

    #[tokio::test]
    async fn top_level_review_has_no_next_case() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut app, mut rx) = test_app(dir.path()).await;
        app.open_document(&write_run(dir.path())).await.unwrap();

        app.perform(Action::OpenSelected { dependent: false }).await;
        assert!(top_review(&app).next_entry().is_none());

        app.perform(Action::Mark(ClassificationState::Accepted)).await;
        let (page, result) = next_marked(&mut rx).await;
        app.on_marked(page, result).await;
        assert_eq!(app.depth(), 2, "top-level close is a no-op");
        assert_eq!(app.status.as_deref(), Some("Saved. No next case"));
    }

    #[tokio::test]
    async fn failed_update_keeps_the_reviewer_on_the_case() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut app, mut rx) = test_app(dir.path()).await;
        app.open_document(&write_run(dir.path())).await.unwrap();
        app.perform(Action::OpenSelected { dependent: true }).await;

        app.perform(Action::Mark(ClassificationState::PendingUpdate)).await;
        assert!(app.has_pending_work());
        let (page, result) = next_marked(&mut rx).await;
        app.on_marked(page, result).await;

        assert!(!app.has_pending_work());
        assert_eq!(top_review(&app).title, "test1");
        assert_eq!(top_review(&app).displayed_state(), ClassificationState::Unset);
        assert!(app.status.as_deref().unwrap().starts_with("Not saved"));
    }

    #[tokio::test]
    async fn reset_from_the_index_reports_removals() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut app, mut rx) = test_app(dir.path()).await;
        app.open_document(&write_run(dir.path())).await.unwrap();
        app.perform(Action::OpenSelected { dependent: true }).await;
        app.perform(Action::Mark(ClassificationState::Accepted)).await;
        let (page, result) = next_marked(&mut rx).await;
        app.on_marked(page, result).await;
        app.perform(Action::Back).await;

        app.perform(Action::Reset(ResetScope::All)).await;
        assert_eq!(app.status.as_deref(), Some("Removed 1 verdicts"));
    }
}
