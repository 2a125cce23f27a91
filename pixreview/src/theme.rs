//! Color theme system for pixreview.
//!
//! Two built-in themes:
//!
//! - `dark` uses ANSI 16 colors so it works on any terminal, including
//!   256-color SSH sessions.
//! - `catppuccin_mocha` uses the Catppuccin Mocha palette in RGB and wants a
//!   truecolor terminal.
//!
//! Screenshot rasters are always drawn in truecolor regardless of theme; the
//! theme only covers chrome (borders, badges, status bar, scrub bar).

use pixreview_core::ClassificationState;
use ratatui::style::Color;

/// All color values used across pixreview's UI surfaces.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_active: Color,
    pub border_inactive: Color,

    // Classification badges
    pub badge_accepted: Color,
    pub badge_rejected: Color,
    pub badge_pending: Color,
    pub badge_unset: Color,

    // Review page
    /// Mismatch count when the pair differs.
    pub mismatch: Color,
    /// Mismatch count when the pair is identical.
    pub identical: Color,
    /// Filled part of the playback scrub bar.
    pub scrub_filled: Color,
    pub scrub_empty: Color,
    /// Placeholder text inside panels ("Loading...", decode errors).
    pub placeholder: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    /// Page indicator on the left of the status bar.
    pub status_page: Color,
    /// Transient status messages (errors, "no next case").
    pub status_message: Color,

    pub background: Color,
}

impl Theme {
    /// The built-in dark theme using ANSI 16 colors.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            badge_accepted: Color::Green,
            badge_rejected: Color::Red,
            badge_pending: Color::Yellow,
            badge_unset: Color::DarkGray,

            mismatch: Color::Red,
            identical: Color::Green,
            scrub_filled: Color::Cyan,
            scrub_empty: Color::DarkGray,
            placeholder: Color::DarkGray,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_page: Color::Cyan,
            status_message: Color::Yellow,

            background: Color::Reset,
        }
    }

    /// Catppuccin Mocha in RGB truecolor.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let teal = Color::Rgb(148, 226, 213); // #94e2d5
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let base = Color::Rgb(30, 30, 46); // #1e1e2e
        let text = Color::Rgb(205, 214, 244); // #cdd6f4
        let peach = Color::Rgb(250, 179, 135); // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            badge_accepted: green,
            badge_rejected: red,
            badge_pending: peach,
            badge_unset: overlay1,

            mismatch: red,
            identical: green,
            scrub_filled: teal,
            scrub_empty: surface1,
            placeholder: overlay1,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_page: lavender,
            status_message: yellow,

            background: base,
        }
    }

    /// Resolves a theme name from config. Unknown names fall back to `dark`
    /// so a typo never prevents startup.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }

    /// Badge text and color for a classification state.
    pub fn badge(&self, state: ClassificationState) -> (&'static str, Color) {
        match state {
            ClassificationState::Accepted => ("[ok]", self.badge_accepted),
            ClassificationState::Rejected => ("[xx]", self.badge_rejected),
            ClassificationState::PendingUpdate => ("[..]", self.badge_pending),
            ClassificationState::Unset => ("[  ]", self.badge_unset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_theme_falls_back_to_dark() {
        assert_eq!(Theme::from_name("solarized").border_active, Theme::dark().border_active);
        assert_eq!(
            Theme::from_name("catppuccin_mocha").background,
            Theme::catppuccin_mocha().background
        );
    }

    #[test]
    fn every_state_has_a_distinct_badge() {
        let theme = Theme::dark();
        let badges: Vec<_> = [
            ClassificationState::Unset,
            ClassificationState::Accepted,
            ClassificationState::Rejected,
            ClassificationState::PendingUpdate,
        ]
        .into_iter()
        .map(|s| theme.badge(s).0)
        .collect();
        let mut unique = badges.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), badges.len());
    }
}
