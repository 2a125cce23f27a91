//! Index page renderer: a summary line over the list of cases.
//!
//! Each row shows the verdict badge, the case name and a short form of the
//! actual-output hash. Rows follow document order.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
};

use crate::pages::index::{Counts, IndexPage};
use crate::theme::Theme;
use crate::ui::layout::panel_block;
use pixreview_core::ClassificationState;

const SHORT_HASH: usize = 10;

pub fn render_index(frame: &mut Frame, area: Rect, index: &mut IndexPage, theme: &Theme) {
    let [summary_area, list_area] = area.layout(&Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]));

    frame.render_widget(Paragraph::new(summary_line(index.counts(), theme)), summary_area);

    let title = format!(" {} ({}) ", index.title, index.entries().len());
    let block = panel_block(title, true, theme);

    let items: Vec<ListItem> = if index.entries().is_empty() {
        vec![ListItem::new(Line::styled("No cases in this run", Style::default().fg(theme.placeholder)))]
    } else {
        index
            .entries()
            .iter()
            .map(|entry| {
                let (badge, color) = theme.badge(index.state_of(entry));
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{badge} "), Style::default().fg(color)),
                    Span::raw(entry.name.clone()),
                    Span::styled(
                        format!("  {}", short_hash(&entry.key.actual_hash)),
                        Style::default().fg(theme.placeholder),
                    ),
                ]))
            })
            .collect()
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::REVERSED));

    frame.render_stateful_widget(list, list_area, &mut index.list_state);
}

fn summary_line(counts: Counts, theme: &Theme) -> Line<'static> {
    let part = |n: usize, label: &str, state: ClassificationState| {
        Span::styled(format!("  {n} {label}"), Style::default().fg(theme.badge(state).1))
    };
    Line::from(vec![
        Span::styled(format!(" {} cases", counts.total()), Style::default().add_modifier(Modifier::BOLD)),
        part(counts.accepted, "accepted", ClassificationState::Accepted),
        part(counts.rejected, "rejected", ClassificationState::Rejected),
        part(counts.pending, "updating", ClassificationState::PendingUpdate),
        part(counts.unset, "unreviewed", ClassificationState::Unset),
    ])
}

fn short_hash(hash: &str) -> &str {
    match hash.char_indices().nth(SHORT_HASH) {
        Some((cut, _)) => &hash[..cut],
        None => hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_shortened_on_char_boundaries() {
        assert_eq!(short_hash("0123456789abcdef"), "0123456789");
        assert_eq!(short_hash("beef"), "beef");
        assert_eq!(short_hash("ééééééééééé"), "éééééééééé");
    }

    #[test]
    fn summary_lists_every_state() {
        let counts = Counts { accepted: 2, rejected: 1, pending: 0, unset: 4 };
        let text: String = summary_line(counts, &Theme::dark()).spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, " 7 cases  2 accepted  1 rejected  0 updating  4 unreviewed");
    }
}
