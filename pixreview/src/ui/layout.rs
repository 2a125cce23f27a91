//! Layout arithmetic and shared chrome for pixreview.
//!
//! Pure layout: no application state is mutated here. Called inside
//! `terminal.draw()` on every render so each frame reflects the live terminal
//! size.
//!
//! # Panel geometry
//!
//! The screen is a page area above a 1-row status bar. The review page splits
//! its area further into a header and two or three image panels; at fewer
//! than 90 columns the panels stack vertically instead.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use crate::app::{App, Mode};
use crate::pages::Page;
use crate::theme::Theme;

/// Returns `[page, status_bar]` for the current frame.
pub fn compute_layout(frame: &Frame) -> [Rect; 2] {
    frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]))
}

/// Splits `area` into `count` equal panels whose borders overlap by one cell.
///
/// Side by side when the area is wide enough, stacked otherwise.
pub fn panel_row(area: Rect, count: usize) -> Vec<Rect> {
    let constraints = vec![Constraint::Fill(1); count.max(1)];
    let layout = if area.width >= 90 {
        Layout::horizontal(constraints)
    } else {
        Layout::vertical(constraints)
    };
    layout.spacing(Spacing::Overlap(1)).split(area).to_vec()
}

/// Inner `Rect` of a panel after removing the 1-cell border on each side.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Builds a bordered `Block` for a panel.
///
/// `BorderType::Thick` marks the panel that reflects the current verdict or
/// the running playback; others are `Plain`. `MergeStrategy::Fuzzy` keeps the
/// junctions right when thick and plain borders meet.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_active: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_active {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_active { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Renders the 1-row status bar.
///
/// Left: a page indicator (`INDEX` or `REVIEW`, with stack depth when a
/// review sits on an index). Right of it: the transient status message if
/// there is one, otherwise a short key hint for the current mode.
pub fn render_status_bar(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let page_text = match app.top() {
        Some(Page::Index(_)) => " INDEX ".to_owned(),
        Some(Page::Review(_)) if app.depth() > 1 => format!(" REVIEW {} ", app.depth()),
        Some(Page::Review(_)) => " REVIEW ".to_owned(),
        None => " EMPTY ".to_owned(),
    };
    let page_span = Span::styled(page_text, Style::default().fg(theme.status_page).add_modifier(Modifier::BOLD));

    let tail = match &app.status {
        Some(message) => Span::styled(format!(" {message}"), Style::default().fg(theme.status_message)),
        None => Span::raw(format!(" {}", hint(app))),
    };

    frame.render_widget(
        Paragraph::new(Line::from(vec![page_span, tail]))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}

fn hint(app: &App) -> &'static str {
    match (app.mode, app.top()) {
        (Mode::HelpOverlay, _) => "j/k scroll  ? close",
        (Mode::ConfirmReset(_) | Mode::ConfirmQuit, _) => "y confirm  n cancel",
        (Mode::Normal, Some(Page::Index(_))) => "enter review  R reset  ? help  q quit",
        (Mode::Normal, Some(Page::Review(r))) if r.playback.is_some() => {
            "a accept  x reject  u update  space play  ? help"
        }
        (Mode::Normal, _) => "a accept  x reject  u update  n next  esc back  ? help",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_areas_split_side_by_side() {
        let panels = panel_row(Rect::new(0, 0, 120, 40), 3);
        assert_eq!(panels.len(), 3);
        assert!(panels.iter().all(|p| p.y == 0 && p.height == 40));
        assert!(panels[1].x > panels[0].x);
    }

    #[test]
    fn narrow_areas_stack() {
        let panels = panel_row(Rect::new(0, 0, 60, 40), 2);
        assert!(panels.iter().all(|p| p.width == 60));
        assert!(panels[1].y > panels[0].y);
    }
}
