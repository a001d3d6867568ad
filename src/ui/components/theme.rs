//! Color palettes for the live view.
//!
//! The query bar and active toggles get the accent; facets, hints and the
//! footer stay in the muted tone so result rows remain the focus.

use ratatui::style::{Color, Modifier, Style};

/// Dark palette swatches.
pub mod colors {
    use ratatui::style::Color;

    pub const INK: Color = Color::Rgb(29, 32, 33); // #1d2021
    pub const INK_RAISED: Color = Color::Rgb(40, 40, 40); // #282828
    pub const RULE: Color = Color::Rgb(80, 73, 69); // #504945
    pub const RULE_ACTIVE: Color = Color::Rgb(131, 165, 152); // #83a598

    pub const PAPER: Color = Color::Rgb(235, 219, 178); // #ebdbb2
    pub const FADED: Color = Color::Rgb(146, 131, 116); // #928374
    pub const GHOST: Color = Color::Rgb(102, 92, 84); // #665c54

    pub const AMBER: Color = Color::Rgb(250, 189, 47); // #fabd2f
    pub const LEAF: Color = Color::Rgb(184, 187, 38); // #b8bb26
    pub const RUST: Color = Color::Rgb(254, 128, 25); // #fe8019
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThemePalette {
    pub accent: Color,
    pub fg: Color,
    pub hint: Color,
    pub border: Color,
    pub border_focus: Color,
    pub disabled: Color,
    pub success: Color,
    pub warning: Color,
    /// Row backgrounds, alternating.
    pub stripe_even: Color,
    pub stripe_odd: Color,
}

impl ThemePalette {
    pub fn light() -> Self {
        Self {
            accent: Color::Rgb(175, 58, 3),        // burnt orange
            fg: Color::Rgb(60, 56, 54),            // #3c3836
            hint: Color::Rgb(124, 111, 100),       // #7c6f64
            border: Color::Rgb(213, 196, 161),     // #d5c4a1
            border_focus: Color::Rgb(7, 102, 120), // teal
            disabled: Color::Rgb(189, 174, 147),   // #bdae93
            success: Color::Rgb(121, 116, 14),     // olive
            warning: Color::Rgb(157, 0, 6),        // brick
            stripe_even: Color::Rgb(251, 241, 199),
            stripe_odd: Color::Rgb(242, 229, 188),
        }
    }

    pub fn dark() -> Self {
        Self {
            accent: colors::AMBER,
            fg: colors::PAPER,
            hint: colors::FADED,
            border: colors::RULE,
            border_focus: colors::RULE_ACTIVE,
            disabled: colors::GHOST,
            success: colors::LEAF,
            warning: colors::RUST,
            stripe_even: colors::INK,
            stripe_odd: colors::INK_RAISED,
        }
    }

    /// Pick a palette from `LSEARCH_THEME` (`light` or `dark`, default dark).
    pub fn from_env() -> Self {
        match dotenvy::var("LSEARCH_THEME") {
            Ok(v) if v.eq_ignore_ascii_case("light") => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn title(self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn title_subtle(self) -> Style {
        Style::default().fg(self.fg).add_modifier(Modifier::BOLD)
    }

    pub fn hint_style(self) -> Style {
        Style::default().fg(self.hint)
    }

    pub fn border_style(self) -> Style {
        Style::default().fg(self.border)
    }

    pub fn border_focus_style(self) -> Style {
        Style::default().fg(self.border_focus)
    }

    pub fn warning_style(self) -> Style {
        Style::default()
            .fg(self.warning)
            .add_modifier(Modifier::BOLD)
    }

    pub fn stripe(self, idx: usize) -> Style {
        let bg = if idx % 2 == 0 {
            self.stripe_even
        } else {
            self.stripe_odd
        };
        Style::default().bg(bg).fg(self.fg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripes_alternate() {
        let p = ThemePalette::dark();
        assert_eq!(p.stripe(0).bg, Some(colors::INK));
        assert_eq!(p.stripe(1).bg, Some(colors::INK_RAISED));
        assert_eq!(p.stripe(2), p.stripe(0));
    }

    #[test]
    fn focus_border_differs_from_resting_border() {
        for p in [ThemePalette::dark(), ThemePalette::light()] {
            assert_ne!(p.border_style(), p.border_focus_style());
        }
    }
}
