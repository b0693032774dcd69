//! Platform-agnostic keyboard routing: key presses in, lifecycle commands out
use crate::config::RETURN_GLYPH;
use crate::model::Command;

/// A key press, normalised to browser `KeyboardEvent.key` naming
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn has_modifier(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// Command for a key press, and whether the platform's default action for
/// that key (browser back navigation, form submit) has to be suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routed {
    pub command: Command,
    pub prevent_default: bool,
}

/// Key mapping configuration
#[derive(Clone, Debug)]
pub struct KeyBindings {
    pub clear: String,
    pub delete_last: String,
    pub newline: String,
    pub newline_glyph: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            clear: "Escape".to_string(),
            delete_last: "Backspace".to_string(),
            newline: "Enter".to_string(),
            newline_glyph: RETURN_GLYPH,
        }
    }
}

/// Stateless key press to command mapping
#[derive(Clone, Debug, Default)]
pub struct InputRouter {
    bindings: KeyBindings,
}

impl InputRouter {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    /// Modifier chords are left to the OS / browser (copy, reload, ...).
    pub fn route(&self, input: &KeyInput) -> Option<Routed> {
        if input.has_modifier() {
            return None;
        }

        let key = input.key.as_str();
        if key == self.bindings.clear {
            return Some(Routed { command: Command::Clear, prevent_default: false });
        }
        if key == self.bindings.delete_last {
            return Some(Routed { command: Command::DeleteLast, prevent_default: true });
        }
        if key == self.bindings.newline {
            return Some(Routed {
                command: Command::Spawn(self.bindings.newline_glyph),
                prevent_default: true,
            });
        }

        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(Routed { command: Command::Spawn(ch), prevent_default: false }),
            _ => None,
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::KeyboardEvent;

    pub fn keyboard_event_to_input(e: &KeyboardEvent) -> KeyInput {
        KeyInput {
            key: e.key(),
            ctrl: e.ctrl_key(),
            alt: e.alt_key(),
            meta: e.meta_key(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use super::*;
    use winit::event::{ElementState, KeyEvent};
    use winit::keyboard::{Key, ModifiersState, NamedKey};

    /// Convert a winit key press, `None` for releases
    pub fn key_event_to_input(event: &KeyEvent, modifiers: ModifiersState) -> Option<KeyInput> {
        if event.state != ElementState::Pressed {
            return None;
        }
        Some(KeyInput {
            key: key_name(&event.logical_key),
            ctrl: modifiers.control_key(),
            alt: modifiers.alt_key(),
            meta: modifiers.super_key(),
        })
    }

    /// Name a logical key the way the DOM does
    pub fn key_name(key: &Key) -> String {
        match key {
            Key::Character(s) => s.to_string(),
            Key::Named(NamedKey::Space) => " ".to_string(),
            Key::Named(named) => format!("{named:?}"),
            Key::Dead(_) => "Dead".to_string(),
            Key::Unidentified(_) => "Unidentified".to_string(),
        }
    }

}

#[cfg(test)]
impl KeyInput {
    fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(input: KeyInput) -> Option<Command> {
        InputRouter::default().route(&input).map(|r| r.command)
    }

    #[test]
    fn test_printable_key_spawns() {
        assert_eq!(route(KeyInput::new("a")), Some(Command::Spawn('a')));
        assert_eq!(route(KeyInput::new("Z")), Some(Command::Spawn('Z')));
        assert_eq!(route(KeyInput::new("7")), Some(Command::Spawn('7')));
        assert_eq!(route(KeyInput::new(" ")), Some(Command::Spawn(' ')));
        assert_eq!(route(KeyInput::new("ß")), Some(Command::Spawn('ß')));
    }

    #[test]
    fn test_modifier_chords_pass_through() {
        assert_eq!(route(KeyInput::new("a").with_ctrl()), None);
        assert_eq!(route(KeyInput::new("a").with_alt()), None);
        assert_eq!(route(KeyInput::new("a").with_meta()), None);
        assert_eq!(route(KeyInput::new("Escape").with_ctrl()), None);
        assert_eq!(route(KeyInput::new("Backspace").with_meta()), None);
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(route(KeyInput::new("Escape")), Some(Command::Clear));
        assert_eq!(route(KeyInput::new("Backspace")), Some(Command::DeleteLast));
        assert_eq!(route(KeyInput::new("Enter")), Some(Command::Spawn('↵')));
    }

    #[test]
    fn test_other_keys_are_ignored() {
        for key in ["F1", "ArrowLeft", "Shift", "Tab", "Dead", "Unidentified", ""] {
            assert_eq!(route(KeyInput::new(key)), None, "key {key:?}");
        }
    }

    #[test]
    fn test_default_action_suppressed_for_backspace_and_enter() {
        let router = InputRouter::default();
        let prevents = |key: &str| router.route(&KeyInput::new(key)).map(|r| r.prevent_default);

        assert_eq!(prevents("Backspace"), Some(true));
        assert_eq!(prevents("Enter"), Some(true));
        assert_eq!(prevents("Escape"), Some(false));
        assert_eq!(prevents("a"), Some(false));
    }

    #[test]
    fn test_custom_bindings() {
        let router = InputRouter::new(KeyBindings {
            clear: "Delete".to_string(),
            newline: "NumpadEnter".to_string(),
            newline_glyph: '¶',
            ..KeyBindings::default()
        });
        let cmd = |key: &str| router.route(&KeyInput::new(key)).map(|r| r.command);

        assert_eq!(cmd("Delete"), Some(Command::Clear));
        assert_eq!(cmd("Escape"), None);
        assert_eq!(cmd("NumpadEnter"), Some(Command::Spawn('¶')));
    }
}
