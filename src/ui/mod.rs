//! Terminal output for redlines and highlights.
pub mod highlights;
pub mod text_view;

use std::fmt::Display;
use std::io::{self, Write};

use crossterm::style::{Attribute, Color, ContentStyle, StyledContent};

use crate::theme::Theme;

/// Writes themed text, or plain text when colour is off.
#[derive(Debug, Clone)]
pub struct Painter<'t> {
    theme: &'t Theme,
    color: bool,
}

/// The roles a piece of output can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Text,
    Muted,
    Added,
    Removed,
    Highlight,
}

impl<'t> Painter<'t> {
    pub fn new(theme: &'t Theme, color: bool) -> Self {
        Self { theme, color }
    }

    pub fn color_enabled(&self) -> bool {
        self.color
    }

    fn style(&self, role: Role) -> ContentStyle {
        let theme = self.theme;
        let (fg, bg): (Color, Option<Color>) = match role {
            Role::Text => (theme.text.into(), None),
            Role::Muted => (theme.muted.into(), None),
            Role::Added => (theme.added_fg.into(), Some(theme.added_bg.into())),
            Role::Removed => (theme.removed_fg.into(), Some(theme.removed_bg.into())),
            Role::Highlight => (theme.highlight_fg.into(), Some(theme.highlight_bg.into())),
        };
        let mut style = ContentStyle::new();
        style.foreground_color = Some(fg);
        style.background_color = bg;
        if role == Role::Removed {
            style.attributes.set(Attribute::CrossedOut);
        }
        style
    }

    pub fn paint<W: Write, D: Display>(&self, out: &mut W, role: Role, content: D) -> io::Result<()> {
        if self.color {
            write!(out, "{}", StyledContent::new(self.style(role), content))
        } else {
            write!(out, "{content}")
        }
    }
}
