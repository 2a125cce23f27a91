//! Review page renderer.
//!
//! Header with the case title, verdict badge, mismatch count and the next
//! case, then the image panels: recorded, actual and diff for a still case,
//! or the frame player and the diff for an animated one.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};

use image::RgbaImage;
use pixreview_core::playback::PlaybackState;
use pixreview_core::ClassificationState;

use crate::pages::review::{PairView, Playback, ReviewPage};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block, panel_row};
use crate::ui::raster::Raster;

pub fn render_review(frame: &mut Frame, area: Rect, review: &mut ReviewPage, theme: &Theme) {
    let [header, body] = area.layout(&Layout::vertical([Constraint::Length(2), Constraint::Fill(1)]));
    render_header(frame, header, review, theme);

    let state = review.displayed_state();
    let panel_count = if review.playback.is_some() { 2 } else { 3 };
    let panels = panel_row(body, panel_count);

    let diff_area = match review.playback.as_mut() {
        Some(playback) => {
            render_playback(frame, panels[0], playback, theme);
            panels[1]
        }
        None => {
            // The panel the verdict sided with gets the active border.
            let recorded = still(review, Still::Recorded);
            let actual = still(review, Still::Actual);
            render_image_panel(frame, panels[0], " Recorded ", state == ClassificationState::Rejected, recorded, theme);
            render_image_panel(frame, panels[1], " Actual ", state == ClassificationState::Accepted, actual, theme);
            panels[2]
        }
    };

    let diff = match &review.pair {
        PairView::Ready(compared) => match &compared.diff {
            Ok(view) => Ok(&view.raster),
            Err(reason) => Err(reason.as_str()),
        },
        PairView::Loading => Err("Loading..."),
        PairView::Unavailable(reason) => Err(reason.as_str()),
    };
    render_image_panel(frame, diff_area, " Diff ", false, diff, theme);
}

enum Still {
    Recorded,
    Actual,
}

fn still(review: &ReviewPage, which: Still) -> Result<&RgbaImage, &str> {
    match &review.pair {
        PairView::Ready(compared) => Ok(match which {
            Still::Recorded => &compared.recorded,
            Still::Actual => &compared.actual,
        }),
        PairView::Loading => Err("Loading..."),
        PairView::Unavailable(reason) => Err(reason.as_str()),
    }
}

fn render_header(frame: &mut Frame, area: Rect, review: &ReviewPage, theme: &Theme) {
    let (badge, badge_color) = theme.badge(review.displayed_state());
    let title = Line::from(vec![
        Span::styled(format!(" {badge} "), Style::default().fg(badge_color)),
        Span::styled(review.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", review.key.actual_hash), Style::default().fg(theme.placeholder)),
    ]);

    let mut detail = vec![match &review.pair {
        PairView::Ready(compared) => match &compared.diff {
            Ok(view) if view.mismatch_count == 0 => {
                Span::styled(" identical", Style::default().fg(theme.identical))
            }
            Ok(view) => Span::styled(
                format!(" {} mismatched pixels", view.mismatch_count),
                Style::default().fg(theme.mismatch),
            ),
            Err(_) => Span::styled(" not comparable", Style::default().fg(theme.mismatch)),
        },
        PairView::Loading => Span::styled(" comparing...", Style::default().fg(theme.placeholder)),
        PairView::Unavailable(_) => Span::styled(" images unavailable", Style::default().fg(theme.mismatch)),
    }];
    match review.next_entry() {
        Some(next) => detail.push(Span::raw(format!("   next: {}", next.name))),
        None if review.is_dependent() => detail.push(Span::raw("   last case")),
        None => {}
    }

    frame.render_widget(Paragraph::new(vec![title, Line::from(detail)]), area);
}

/// Draws `image` inside a bordered panel, or `placeholder` text when there
/// is nothing to show.
fn render_image_panel(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    is_active: bool,
    image: Result<&RgbaImage, &str>,
    theme: &Theme,
) {
    frame.render_widget(panel_block(title.to_owned(), is_active, theme), area);
    let inner = inner_rect(area);
    match image {
        Ok(image) => frame.render_widget(Raster::new(image), inner),
        Err(placeholder) => frame.render_widget(
            Paragraph::new(placeholder.to_owned())
                .style(Style::default().fg(theme.placeholder))
                .wrap(Wrap { trim: true }),
            inner,
        ),
    }
}

/// Draws the frame player and records where its scrub bar landed so mouse
/// clicks can seek.
fn render_playback(frame: &mut Frame, area: Rect, playback: &mut Playback, theme: &Theme) {
    let marker = match playback.state() {
        PlaybackState::Playing => "▶",
        PlaybackState::Paused => "⏸",
    };
    let title = format!(
        " Frames {}/{} {marker} {}ms ",
        playback.cursor() + 1,
        playback.len(),
        playback.delay().as_millis()
    );
    frame.render_widget(panel_block(title, playback.state() == PlaybackState::Playing, theme), area);

    let [image_area, scrub_area] =
        inner_rect(area).layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));
    playback.scrub_area = scrub_area;
    match (playback.current(), playback.frame_error()) {
        (Some(image), _) => frame.render_widget(Raster::new(image), image_area),
        (None, reason) => frame.render_widget(
            Paragraph::new(reason.unwrap_or("Loading...").to_owned())
                .style(Style::default().fg(theme.placeholder))
                .wrap(Wrap { trim: true }),
            image_area,
        ),
    }

    let (filled, empty) = scrub_split(playback.cursor(), playback.len(), scrub_area.width as usize);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("━".repeat(filled), Style::default().fg(theme.scrub_filled)),
            Span::styled("─".repeat(empty), Style::default().fg(theme.scrub_empty)),
        ])),
        scrub_area,
    );
}

/// Cells of a `width`-wide scrub bar filled for `cursor` out of `len`
/// frames, and the cells left empty. The last frame fills the bar.
pub fn scrub_split(cursor: usize, len: usize, width: usize) -> (usize, usize) {
    if len == 0 {
        return (0, width);
    }
    let filled = ((cursor.min(len - 1) + 1) * width / len).min(width);
    (filled, width - filled)
}
