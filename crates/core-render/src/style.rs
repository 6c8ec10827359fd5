//! Cell styling: colors plus attribute flags.
//!
//! Styles are plain values compared per cell by the diff; the renderer
//! only emits a style change when the next printed cell differs from the
//! last style written.

use bitflags::bitflags;
use crossterm::style::Color;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attrs: u8 {
        const BOLD      = 0b0000_0001;
        const DIM       = 0b0000_0010;
        const ITALIC    = 0b0000_0100;
        const UNDERLINE = 0b0000_1000;
        const BLINK     = 0b0001_0000;
        const REVERSE   = 0b0010_0000;
        const HIDDEN    = 0b0100_0000;
        const STRIKE    = 0b1000_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub attrs: Attrs,
}

impl Style {
    pub const DEFAULT: Style = Style {
        fg: None,
        bg: None,
        attrs: Attrs::empty(),
    };

    pub fn fg(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    pub fn bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    pub fn with(mut self, attrs: Attrs) -> Self {
        self.attrs |= attrs;
        self
    }

    pub fn reverse() -> Self {
        Self::DEFAULT.with(Attrs::REVERSE)
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// `other` layered on top: its colors win where set, attributes add up.
    pub fn merge(self, other: Style) -> Style {
        Style {
            fg: other.fg.or(self.fg),
            bg: other.bg.or(self.bg),
            attrs: self.attrs | other.attrs,
        }
    }
}

/// A run of text sharing one style, the unit controls hand to the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledText {
    pub style: Style,
    pub text: String,
}

impl StyledText {
    pub fn new(style: Style, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(Style::DEFAULT, text)
    }
}
