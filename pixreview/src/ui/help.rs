//! Help overlay and confirmation dialogs.
//!
//! Both draw a centred modal over the page, erasing the background with
//! `Clear` first, inside the same `terminal.draw()` closure as everything
//! else.

use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use pixreview_core::ResetScope;

use crate::theme::Theme;

/// Renders the help overlay scrolled by `help_scroll` rows.
///
/// Skipped on terminals narrower than 50 columns, where the modal would
/// collapse to nothing.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 50 {
        return;
    }

    let overlay_area = frame.area().centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help  j/k scroll, ? or Esc to dismiss ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text() -> Text<'static> {
    let heading = |s: &'static str| Line::styled(s, Style::default().add_modifier(Modifier::BOLD));
    Text::from(vec![
        heading("Index"),
        Line::from("  j / k         Next / previous case"),
        Line::from("  g / G         First / last case"),
        Line::from("  Enter / l     Review the case; verdicts move on to the next one"),
        Line::from("  o             Review only this case"),
        Line::from("  R             Remove every verdict in this run"),
        Line::from("  A / X         Remove accepted / rejected verdicts"),
        Line::from(""),
        heading("Review"),
        Line::from("  a             Accept: the actual output is correct"),
        Line::from("  x             Reject: the actual output is a regression"),
        Line::from("  u             Update the recorded baseline, then accept"),
        Line::from("  n             Skip to the next case"),
        Line::from("  Esc / b       Back to the index"),
        Line::from(""),
        heading("Frames"),
        Line::from("  Space         Play / pause"),
        Line::from("  h / l         Previous / next frame (paused)"),
        Line::from("  Home / End    First / last frame"),
        Line::from("  Click bar     Jump to that frame"),
        Line::from("  + / -         Faster / slower"),
        Line::from(""),
        heading("General"),
        Line::from("  ?             Open / close this help overlay"),
        Line::from("  q             Quit (asks while a baseline update is running)"),
    ])
}

/// Modal asking whether to run a bulk reset of `scope`.
pub fn render_confirm_reset(frame: &mut Frame, theme: &Theme, scope: ResetScope) {
    let what = match scope {
        ResetScope::All => "every verdict",
        ResetScope::Accepted => "all accepted verdicts",
        ResetScope::Rejected => "all rejected verdicts",
    };
    render_dialog(frame, theme, " Reset ", format!("Remove {what} for this run?  (y/n)"));
}

pub fn render_confirm_quit(frame: &mut Frame, theme: &Theme) {
    render_dialog(
        frame,
        theme,
        " Quit ",
        "A baseline update is still running. Quit anyway?  (y/n)".to_owned(),
    );
}

fn render_dialog(frame: &mut Frame, theme: &Theme, title: &'static str, message: String) {
    let area = dialog_area(frame.area());
    if area.is_empty() {
        return;
    }
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(message)
            .block(Block::bordered().title(title).border_style(Style::default().fg(theme.border_active)))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn dialog_area(screen: Rect) -> Rect {
    screen.centered(Constraint::Length(screen.width.min(60)), Constraint::Length(screen.height.min(5)))
}
