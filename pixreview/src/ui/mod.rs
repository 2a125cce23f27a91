//! UI rendering for pixreview.
//!
//! `render()` is the single entry point, called from the event loop's
//! `terminal.draw()` closure. It draws the page on top of the stack, the
//! status bar, then whichever overlay the current mode asks for.

mod layout;
pub mod help;
pub mod index_view;
pub mod keybindings;
pub mod raster;
pub mod review_view;

use ratatui::{style::Style, widgets::Block, Frame};

use crate::app::{App, Mode};
use crate::pages::Page;
use crate::theme::Theme;
use layout::{compute_layout, render_status_bar};

/// Renders one complete frame. Never call `terminal.draw()` anywhere else.
pub fn render(frame: &mut Frame, app: &mut App, theme: &Theme) {
    frame.render_widget(Block::new().style(Style::default().bg(theme.background)), frame.area());
    let [page_area, status_bar] = compute_layout(frame);

    match app.top_mut() {
        Some(Page::Index(index)) => index_view::render_index(frame, page_area, index, theme),
        Some(Page::Review(review)) => review_view::render_review(frame, page_area, review, theme),
        None => {}
    }

    render_status_bar(frame, status_bar, app, theme);

    match app.mode {
        Mode::HelpOverlay => help::render_help_overlay(frame, theme, app.help_scroll),
        Mode::ConfirmReset(scope) => help::render_confirm_reset(frame, theme, scope),
        Mode::ConfirmQuit => help::render_confirm_quit(frame, theme),
        Mode::Normal => {}
    }
}
