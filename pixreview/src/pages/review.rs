//! Review page: one test case, its screenshot pair and its verdict.
//!
//! The page owns everything about the session on that case: the decoded pair
//! and diff, the playback cursor and timer for animated cases, the opener
//! link back to the index, and the classification in flight. Navigating away
//! drops the page, which aborts its frame timer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use image::RgbaImage;
use pixreview_core::diff::{diff_images, DiffOptions};
use pixreview_core::document::{case_stem, Document, DocumentError, LoadedDocument};
use pixreview_core::frames::FrameSequence;
use pixreview_core::nav::Opener;
use pixreview_core::playback::{FramePlayback, FrameUpdate, PlaybackError, PlaybackState};
use pixreview_core::review::{MarkError, MarkOutcome};
use pixreview_core::{ClassificationState, IndexEntry, ReviewKey, ReviewStore, StoreError};
use ratatui::layout::{Position, Rect};
use tokio::sync::mpsc::UnboundedSender;

use crate::event::{AppEvent, PageId};
use crate::loader::types::{LoadRequest, LoadedPair};
use crate::loader::Loader;
use crate::timer::FrameTimer;

const MIN_FRAME_DELAY: Duration = Duration::from_millis(50);
const MAX_FRAME_DELAY: Duration = Duration::from_secs(5);

/// Diff raster plus its mismatch count.
#[derive(Debug)]
pub struct DiffView {
    pub mismatch_count: usize,
    pub raster: RgbaImage,
}

#[derive(Debug)]
pub struct Compared {
    pub recorded: RgbaImage,
    pub actual: RgbaImage,
    /// `Err` holds the reason the pair could not be compared (size mismatch).
    pub diff: Result<DiffView, String>,
}

/// Where the screenshot pair is in its lifecycle.
#[derive(Debug)]
pub enum PairView {
    Loading,
    Unavailable(String),
    Ready(Box<Compared>),
}

/// Animated capture of a case with its cursor and timer.
pub struct Playback {
    frames: FrameSequence,
    controller: FramePlayback,
    timer: FrameTimer,
    frame_error: Option<String>,
    /// Where the scrub bar was last drawn; empty until the first render.
    pub scrub_area: Rect,
}

impl Playback {
    fn start(paths: Vec<PathBuf>, delay: Duration, timer: FrameTimer) -> Self {
        let (controller, update, command) = FramePlayback::start(paths.len(), delay);
        let mut playback = Self {
            frames: FrameSequence::deferred(paths),
            controller,
            timer,
            frame_error: None,
            scrub_area: Rect::default(),
        };
        if let Some(update) = update {
            playback.show(update);
        }
        if let Some(command) = command {
            playback.timer.apply(command);
        }
        playback
    }

    fn show(&mut self, update: FrameUpdate) {
        self.frame_error = self.frames.show(update.index).err().map(|e| e.to_string());
    }

    /// The frame under the cursor, if it decoded.
    pub fn current(&self) -> Option<&RgbaImage> {
        self.frames.peek(self.controller.cursor())
    }

    pub fn frame_error(&self) -> Option<&str> {
        self.frame_error.as_deref()
    }

    pub fn cursor(&self) -> usize {
        self.controller.cursor()
    }

    pub fn len(&self) -> usize {
        self.controller.len()
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn delay(&self) -> Duration {
        self.controller.delay()
    }

    pub fn toggle(&mut self) {
        if let Some(command) = self.controller.toggle() {
            self.timer.apply(command);
        }
    }

    pub fn step(&mut self, delta: isize) -> Result<(), PlaybackError> {
        let update = self.controller.step(delta)?;
        self.show(update);
        Ok(())
    }

    pub fn seek(&mut self, index: usize) {
        if let Some(update) = self.controller.seek(index) {
            self.show(update);
        }
    }

    /// Seeks to the frame under a click on the scrub bar. Returns `false`
    /// when the position is outside the bar.
    pub fn scrub_to(&mut self, column: u16, row: u16) -> bool {
        let area = self.scrub_area;
        if !area.contains(Position { x: column, y: row }) {
            return false;
        }
        let offset = usize::from(column - area.x);
        self.seek(offset * self.len() / usize::from(area.width));
        true
    }

    /// Halves (`faster`) or doubles the delay within sane bounds. Takes
    /// effect on the next play.
    pub fn change_delay(&mut self, faster: bool) -> Duration {
        let current = self.controller.delay();
        let delay = if faster { current / 2 } else { current * 2 };
        let delay = delay.clamp(MIN_FRAME_DELAY, MAX_FRAME_DELAY);
        self.controller.set_delay(delay);
        delay
    }

    fn on_tick(&mut self, generation: u64) -> bool {
        match self.controller.on_timer(generation) {
            Some(update) => {
                self.show(update);
                true
            }
            None => false,
        }
    }
}

/// Everything a spawned classification task needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkJob {
    pub page: PageId,
    pub key: ReviewKey,
    pub action: ClassificationState,
    pub next: Option<String>,
}

pub struct ReviewPage {
    pub id: PageId,
    pub key: ReviewKey,
    pub title: String,
    recorded_path: PathBuf,
    actual_path: PathBuf,
    opener: Option<Opener>,
    next: Option<IndexEntry>,
    state: ClassificationState,
    pub pair: PairView,
    pub playback: Option<Playback>,
    in_flight: Option<ClassificationState>,
}

impl ReviewPage {
    /// Builds the page for a case document. `opener` is `Some` when the case
    /// was opened from an index as a dependent review.
    pub fn new(
        id: PageId,
        doc: &LoadedDocument,
        opener: Option<Opener>,
        tx: UnboundedSender<AppEvent>,
        frame_delay: Duration,
    ) -> Result<Self, DocumentError> {
        let (Document::Case(case), Some(key)) = (&doc.document, doc.review_key()) else {
            return Err(DocumentError::Invalid {
                path: doc.locator.to_string(),
                reason: "not a single-case document".to_owned(),
            });
        };
        let recorded_path = doc.resolve_path(&case.images[0])?;
        let actual_path = doc.resolve_path(&case.images[1])?;
        let frames = case
            .frames
            .iter()
            .map(|f| doc.resolve_path(f))
            .collect::<Result<Vec<_>, _>>()?;

        let playback = (!frames.is_empty())
            .then(|| Playback::start(frames, frame_delay, FrameTimer::new(id, tx)));
        let title = case
            .title
            .clone()
            .or_else(|| case_stem(&key.locator))
            .unwrap_or_else(|| key.locator.clone());

        Ok(Self {
            id,
            key,
            title,
            recorded_path,
            actual_path,
            opener,
            next: None,
            state: ClassificationState::Unset,
            pair: PairView::Loading,
            playback,
            in_flight: None,
        })
    }

    /// Starts decoding the pair, reads the stored verdict and works out the
    /// next case.
    pub async fn activate(
        &mut self,
        store: &ReviewStore,
        loader: &Loader,
        skip_classified: bool,
    ) -> Result<(), StoreError> {
        let queued = loader.request(LoadRequest {
            page: self.id,
            recorded: self.recorded_path.clone(),
            actual: self.actual_path.clone(),
        });
        if !queued {
            self.pair = PairView::Unavailable("image loader is not running".to_owned());
        }

        self.state = store.get(&self.key).await?;

        let classified: Option<HashMap<String, ClassificationState>> =
            if skip_classified && self.opener.is_some() { Some(store.snapshot().await?) } else { None };
        self.next = self.opener.as_ref().and_then(|opener| {
            opener.next_after(&self.key, |entry| {
                classified
                    .as_ref()
                    .and_then(|states| states.get(&entry.key.storage_key()))
                    .is_none_or(|state| !state.is_verdict())
            })
        });
        tracing::debug!(
            page = self.id,
            key = %self.key,
            next = self.next.as_ref().map(|e| e.key.locator.as_str()),
            "review page activated"
        );
        Ok(())
    }

    /// Takes the loader's reply. Ignores replies meant for another page.
    pub fn apply_pair(&mut self, loaded: LoadedPair) {
        if loaded.page != self.id {
            return;
        }
        self.pair = match loaded.images {
            Ok(pair) => {
                let diff = diff_images(&pair.recorded, &pair.actual, &DiffOptions::review())
                    .map(|result| DiffView { mismatch_count: result.mismatch_count, raster: result.into_image() })
                    .map_err(|e| e.to_string());
                match &diff {
                    Ok(view) => tracing::info!(key = %self.key, mismatches = view.mismatch_count, "pair compared"),
                    Err(e) => tracing::warn!(key = %self.key, error = %e, "pair not comparable"),
                }
                PairView::Ready(Box::new(Compared { recorded: pair.recorded, actual: pair.actual, diff }))
            }
            Err(e) => PairView::Unavailable(e.to_string()),
        };
    }

    pub fn on_frame_tick(&mut self, generation: u64) -> bool {
        self.playback.as_mut().is_some_and(|p| p.on_tick(generation))
    }

    /// State to display: the stored verdict, or `PendingUpdate` while a
    /// baseline update is running.
    pub fn displayed_state(&self) -> ClassificationState {
        match self.in_flight {
            Some(ClassificationState::PendingUpdate) => ClassificationState::PendingUpdate,
            _ => self.state,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// `true` while the index this case was opened from is still alive.
    pub fn is_dependent(&self) -> bool {
        self.opener.as_ref().is_some_and(Opener::is_open)
    }

    pub fn opener(&self) -> Option<Opener> {
        self.opener.clone()
    }

    pub fn next_entry(&self) -> Option<&IndexEntry> {
        self.next.as_ref()
    }

    /// Prepares a classification. `None` while another one is running.
    pub fn begin_mark(&mut self, action: ClassificationState) -> Option<MarkJob> {
        if self.in_flight.is_some() || action == ClassificationState::Unset {
            return None;
        }
        self.in_flight = Some(action);
        Some(MarkJob {
            page: self.id,
            key: self.key.clone(),
            action,
            next: self.next.as_ref().map(|e| e.key.locator.clone()),
        })
    }

    /// Records the outcome of the running classification.
    pub fn finish_mark(&mut self, result: &Result<MarkOutcome, MarkError>) {
        let Some(action) = self.in_flight.take() else {
            return;
        };
        if result.is_ok() {
            self.state = match action {
                ClassificationState::PendingUpdate => ClassificationState::Accepted,
                other => other,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::types::DecodedPair;
    use image::Rgba;
    use pixreview_core::promote::PromoteError;
    use std::path::Path;

    fn write_png(dir: &Path, name: &str, px: [u8; 4]) {
        RgbaImage::from_pixel(4, 4, Rgba(px)).save(dir.join(name)).unwrap();
    }

    fn case_doc(dir: &Path, frames: &[&str]) -> LoadedDocument {
        write_png(dir, "rec.png", [255, 255, 255, 255]);
        write_png(dir, "act.png", [0, 0, 0, 255]);
        for f in frames {
            write_png(dir, f, [9, 9, 9, 255]);
        }
        let frames = frames.iter().map(|f| format!("\"{f}\"")).collect::<Vec<_>>().join(",");
        let raw = format!(
            r#"{{"page":"case","actual_hash":"deadbeef","images":["rec.png","act.png"],"frames":[{frames}]}}"#
        );
        std::fs::write(dir.join("test1.json"), raw).unwrap();
        LoadedDocument::from_path(dir.join("test1.json")).unwrap()
    }

    fn page(doc: &LoadedDocument) -> ReviewPage {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        ReviewPage::new(4, doc, None, tx, Duration::from_millis(100)).unwrap()
    }

    #[test]
    fn builds_key_and_title_from_case() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = case_doc(dir.path(), &[]);
        let page = page(&doc);
        assert_eq!(page.key.actual_hash, "deadbeef");
        assert_eq!(page.title, "test1");
        assert!(page.playback.is_none());
        assert!(!page.is_dependent());
    }

    #[test]
    fn pair_reply_runs_the_diff() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut page = page(&case_doc(dir.path(), &[]));
        let reply = |id| LoadedPair {
            page: id,
            images: Ok(DecodedPair {
                recorded: RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255])),
                actual: RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])),
            }),
        };

        page.apply_pair(reply(99));
        assert!(matches!(page.pair, PairView::Loading), "foreign replies are ignored");

        page.apply_pair(reply(4));
        let PairView::Ready(compared) = &page.pair else { panic!("pair not ready") };
        assert_eq!(compared.diff.as_ref().unwrap().mismatch_count, 16);
    }

    #[test]
    fn size_mismatch_is_shown_not_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut page = page(&case_doc(dir.path(), &[]));
        page.apply_pair(LoadedPair {
            page: 4,
            images: Ok(DecodedPair {
                recorded: RgbaImage::new(4, 4),
                actual: RgbaImage::new(5, 4),
            }),
        });
        let PairView::Ready(compared) = &page.pair else { panic!("pair not ready") };
        assert!(compared.diff.is_err());
    }

    #[test]
    fn one_classification_at_a_time() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut page = page(&case_doc(dir.path(), &[]));

        let job = page.begin_mark(ClassificationState::PendingUpdate).unwrap();
        assert_eq!(job.next, None);
        assert_eq!(page.displayed_state(), ClassificationState::PendingUpdate);
        assert!(page.begin_mark(ClassificationState::Accepted).is_none());

        page.finish_mark(&Err(MarkError::Promotion(PromoteError::Status(500))));
        assert_eq!(page.displayed_state(), ClassificationState::Unset);

        page.begin_mark(ClassificationState::PendingUpdate).unwrap();
        page.finish_mark(&Ok(MarkOutcome::Close));
        assert_eq!(page.displayed_state(), ClassificationState::Accepted);
        assert!(page.begin_mark(ClassificationState::Unset).is_none());
    }

    #[tokio::test]
    async fn playback_decodes_first_frame_and_steps_when_paused() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = case_doc(dir.path(), &["f0.png", "f1.png", "f2.png"]);
        let mut page = page(&doc);

        let playback = page.playback.as_mut().unwrap();
        assert_eq!(playback.len(), 3);
        assert!(playback.current().is_some(), "frame 0 is shown at start");
        assert_eq!(playback.step(1), Err(PlaybackError::NotPaused));

        playback.toggle();
        playback.step(-1).unwrap();
        assert_eq!(playback.cursor(), 2);
        playback.seek(10);
        assert_eq!(playback.cursor(), 2);
        assert_eq!(playback.change_delay(true), Duration::from_millis(50));
        assert_eq!(playback.change_delay(true), MIN_FRAME_DELAY);

        // A tick from the generation armed before the pause is stale.
        assert!(!page.on_frame_tick(1));
    }

    #[tokio::test]
    async fn scrub_clicks_map_to_frames() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = case_doc(dir.path(), &["f0.png", "f1.png", "f2.png", "f3.png"]);
        let mut page = page(&doc);
        let playback = page.playback.as_mut().unwrap();
        playback.scrub_area = Rect::new(10, 5, 40, 1);

        assert!(!playback.scrub_to(30, 4), "row above the bar");
        assert_eq!(playback.cursor(), 0);
        assert!(playback.scrub_to(30, 5));
        assert_eq!(playback.cursor(), 2);
        assert!(playback.scrub_to(49, 5));
        assert_eq!(playback.cursor(), 3);
        assert!(playback.scrub_to(10, 5));
        assert_eq!(playback.cursor(), 0);
    }

    #[test]
    fn dropping_the_index_ends_the_dependency() {
        use crate::pages::index::IndexListing;
        use pixreview_core::nav::EntrySource;
        use std::rc::Rc;

        let dir = tempfile::TempDir::new().unwrap();
        let index = crate::app::tests::write_run(dir.path());
        let index_doc = LoadedDocument::from_path(index).unwrap();
        let listing: Rc<dyn EntrySource> = Rc::new(IndexListing::from_document(&index_doc).unwrap());
        let case = LoadedDocument::from_path(dir.path().join("test1.json")).unwrap();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let opener = Opener::new(Rc::downgrade(&listing));
        let page = ReviewPage::new(2, &case, Some(opener), tx, Duration::from_millis(100)).unwrap();

        assert!(page.is_dependent());
        drop(listing);
        assert!(!page.is_dependent());
    }
}
