//! Keybinding dispatcher for pixreview.
//!
//! Translates raw crossterm `KeyEvent`s into `App` mutations and returns a
//! `KeyAction` telling the event loop what to do next. Pure UI changes (list
//! selection, playback cursor, overlays) happen here directly; anything that
//! touches the store or the filesystem is handed back as `KeyAction::Run` so
//! the event loop can await it.

use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use pixreview_core::{ClassificationState, ResetScope};

use crate::app::{Action, App, Mode};
use crate::pages::index::IndexPage;
use crate::pages::review::ReviewPage;
use crate::pages::Page;

/// Control-flow signal returned from the key dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Keep going and redraw.
    Continue,
    /// Exit cleanly.
    Quit,
    /// Run an action that needs the store or a background task.
    Run(Action),
}

/// Dispatches a key event to the handler matching the current mode.
pub fn handle_key(key: KeyEvent, app: &mut App) -> KeyAction {
    match app.mode {
        Mode::HelpOverlay => handle_help(key, app),
        Mode::ConfirmReset(scope) => handle_confirm_reset(key, app, scope),
        Mode::ConfirmQuit => handle_confirm_quit(key, app),
        Mode::Normal => handle_normal(key, app),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, app: &mut App) -> KeyAction {
    match key.code {
        KeyCode::Char('?') => {
            app.help_scroll = 0;
            app.mode = Mode::HelpOverlay;
            return KeyAction::Continue;
        }
        KeyCode::Char('q') => {
            return if app.has_pending_work() {
                app.mode = Mode::ConfirmQuit;
                KeyAction::Continue
            } else {
                KeyAction::Quit
            };
        }
        _ => {}
    }

    let mut status = None;
    let action = match app.top_mut() {
        Some(Page::Index(index)) => handle_index_key(key, index),
        Some(Page::Review(review)) => handle_review_key(key, review, &mut status),
        None => KeyAction::Continue,
    };
    if let Some(message) = status {
        app.status = Some(message);
    }
    if let KeyAction::Run(Action::Reset(scope)) = action {
        // Bulk resets always go through the confirm dialog first.
        app.mode = Mode::ConfirmReset(scope);
        return KeyAction::Continue;
    }
    action
}

/// Keys on the index listing: selection, opening cases and bulk resets.
fn handle_index_key(key: KeyEvent, index: &mut IndexPage) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => index.select_next(),
        KeyCode::Char('k') | KeyCode::Up => index.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => index.select_first(),
        KeyCode::Char('G') | KeyCode::End => index.select_last(),
        KeyCode::Enter | KeyCode::Char('l') => {
            return KeyAction::Run(Action::OpenSelected { dependent: true });
        }
        KeyCode::Char('o') => return KeyAction::Run(Action::OpenSelected { dependent: false }),
        KeyCode::Char('R') => return KeyAction::Run(Action::Reset(ResetScope::All)),
        KeyCode::Char('A') => return KeyAction::Run(Action::Reset(ResetScope::Accepted)),
        KeyCode::Char('X') => return KeyAction::Run(Action::Reset(ResetScope::Rejected)),
        _ => {}
    }
    KeyAction::Continue
}

/// Keys on a review page: verdicts, navigation and frame playback.
fn handle_review_key(key: KeyEvent, review: &mut ReviewPage, status: &mut Option<String>) -> KeyAction {
    match key.code {
        KeyCode::Char('a') => return KeyAction::Run(Action::Mark(ClassificationState::Accepted)),
        KeyCode::Char('x') => return KeyAction::Run(Action::Mark(ClassificationState::Rejected)),
        KeyCode::Char('u') => return KeyAction::Run(Action::Mark(ClassificationState::PendingUpdate)),
        KeyCode::Char('n') => return KeyAction::Run(Action::NextCase),
        KeyCode::Esc | KeyCode::Char('b') => return KeyAction::Run(Action::Back),
        _ => {}
    }

    let Some(playback) = review.playback.as_mut() else {
        return KeyAction::Continue;
    };
    match key.code {
        KeyCode::Char(' ') => playback.toggle(),
        KeyCode::Char('h') | KeyCode::Left => {
            if let Err(e) = playback.step(-1) {
                *status = Some(e.to_string());
            }
        }
        KeyCode::Char('l') | KeyCode::Right => {
            if let Err(e) = playback.step(1) {
                *status = Some(e.to_string());
            }
        }
        KeyCode::Home => playback.seek(0),
        KeyCode::End => playback.seek(playback.len().saturating_sub(1)),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let delay = playback.change_delay(true);
            *status = Some(format!("Frame delay {} ms", delay.as_millis()));
        }
        KeyCode::Char('-') => {
            let delay = playback.change_delay(false);
            *status = Some(format!("Frame delay {} ms", delay.as_millis()));
        }
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Overlays and dialogs
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, app: &mut App) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.help_scroll = app.help_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => app.help_scroll = app.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => app.help_scroll = 0,
        KeyCode::Char('G') => app.help_scroll = u16::MAX,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => app.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

/// `y` runs the reset, `n` or `Esc` cancels. Other keys are ignored.
fn handle_confirm_reset(key: KeyEvent, app: &mut App, scope: ResetScope) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.mode = Mode::Normal;
            KeyAction::Run(Action::Reset(scope))
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.mode = Mode::Normal;
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

fn handle_confirm_quit(key: KeyEvent, app: &mut App) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => KeyAction::Quit,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.mode = Mode::Normal;
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Scroll wheel moves the index selection, or scrolls the help overlay
/// while it is shown. A left click or drag on the scrub bar seeks.
pub fn handle_mouse(mouse: MouseEvent, app: &mut App) -> KeyAction {
    let down = match mouse.kind {
        MouseEventKind::ScrollDown => true,
        MouseEventKind::ScrollUp => false,
        MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
            if app.mode == Mode::Normal {
                if let Some(Page::Review(review)) = app.top_mut() {
                    if let Some(playback) = review.playback.as_mut() {
                        playback.scrub_to(mouse.column, mouse.row);
                    }
                }
            }
            return KeyAction::Continue;
        }
        _ => return KeyAction::Continue,
    };
    if app.mode == Mode::HelpOverlay {
        app.help_scroll = if down { app.help_scroll.saturating_add(3) } else { app.help_scroll.saturating_sub(3) };
    } else if let Some(Page::Index(index)) = app.top_mut() {
        if down {
            index.select_next();
        } else {
            index.select_previous();
        }
    }
    KeyAction::Continue
}
