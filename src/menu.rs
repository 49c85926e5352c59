//! Slide-out feed menu visibility.

use std::fmt;

/// Marker class a renderer applies to the page root while the menu is hidden.
pub const MENU_HIDDEN_CLASS: &str = "menu-hidden";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Hidden,
    Visible,
}

impl MenuState {
    pub fn flipped(self) -> Self {
        match self {
            MenuState::Hidden => MenuState::Visible,
            MenuState::Visible => MenuState::Hidden,
        }
    }
}

impl fmt::Display for MenuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuState::Hidden => f.write_str("hidden"),
            MenuState::Visible => f.write_str("visible"),
        }
    }
}

/// Visibility of the feed menu. Starts hidden; only [`toggle`](Self::toggle)
/// changes it, and the change is visible to the very next read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuVisibility {
    state: MenuState,
}

impl MenuVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the state and returns the new one.
    pub fn toggle(&mut self) -> MenuState {
        self.state = self.state.flipped();
        tracing::debug!(state = %self.state, "Menu toggled");
        self.state
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_hidden(&self) -> bool {
        self.state == MenuState::Hidden
    }

    /// `Some("menu-hidden")` while hidden, `None` while shown.
    pub fn marker_class(&self) -> Option<&'static str> {
        self.is_hidden().then_some(MENU_HIDDEN_CLASS)
    }
}
