use std::str::FromStr;

use thiserror::Error;

use crate::geometry::GridOffset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Enter,
    Escape,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub ctrl: bool,
    /// Cmd on macOS.
    pub meta: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            key,
            ctrl: true,
            meta: false,
        }
    }

    pub fn is_undo_shortcut(&self) -> bool {
        (self.ctrl || self.meta) && matches!(self.key, Key::Char('z' | 'Z'))
    }

    /// Grid step for an arrow key: 15 minutes vertically, one day horizontally.
    pub fn keyboard_step(&self) -> Option<GridOffset> {
        if self.ctrl || self.meta {
            return None;
        }
        match self.key {
            Key::ArrowUp => Some(GridOffset::new(0, -1)),
            Key::ArrowDown => Some(GridOffset::new(0, 1)),
            Key::ArrowLeft => Some(GridOffset::new(-1, 0)),
            Key::ArrowRight => Some(GridOffset::new(1, 0)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised key: {0}")]
pub struct ParseKeyError(String);

/// Parses names such as `ArrowRight`, `Enter`, `Esc`, `Ctrl+Z` or `Cmd+z`.
impl FromStr for KeyInput {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut input = KeyInput::plain(Key::Escape);
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some(name) = parts.pop().filter(|name| !name.is_empty()) else {
            return Err(ParseKeyError(s.to_string()));
        };
        for modifier in parts {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => input.ctrl = true,
                "cmd" | "meta" | "super" => input.meta = true,
                _ => return Err(ParseKeyError(s.to_string())),
            }
        }

        input.key = match name.to_ascii_lowercase().as_str() {
            "arrowup" | "up" => Key::ArrowUp,
            "arrowdown" | "down" => Key::ArrowDown,
            "arrowleft" | "left" => Key::ArrowLeft,
            "arrowright" | "right" => Key::ArrowRight,
            "enter" | "return" => Key::Enter,
            "escape" | "esc" => Key::Escape,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                    _ => return Err(ParseKeyError(s.to_string())),
                }
            }
        };
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_modifiers() {
        assert_eq!("ArrowRight".parse::<KeyInput>(), Ok(KeyInput::plain(Key::ArrowRight)));
        assert_eq!("esc".parse::<KeyInput>(), Ok(KeyInput::plain(Key::Escape)));
        assert_eq!("Ctrl+Z".parse::<KeyInput>(), Ok(KeyInput::ctrl(Key::Char('z'))));

        let cmd: KeyInput = "Cmd+z".parse().expect("cmd");
        assert!(cmd.meta && cmd.is_undo_shortcut());

        assert!("Hyper+Z".parse::<KeyInput>().is_err());
        assert!("PageDown".parse::<KeyInput>().is_err());
        assert!("".parse::<KeyInput>().is_err());
    }

    #[test]
    fn arrows_step_by_slot_or_day() {
        assert_eq!(
            KeyInput::plain(Key::ArrowDown).keyboard_step(),
            Some(GridOffset::new(0, 1))
        );
        assert_eq!(
            KeyInput::plain(Key::ArrowLeft).keyboard_step(),
            Some(GridOffset::new(-1, 0))
        );
        assert_eq!(KeyInput::plain(Key::Enter).keyboard_step(), None);
        assert_eq!(KeyInput::ctrl(Key::ArrowUp).keyboard_step(), None);
        assert!(!KeyInput::plain(Key::Char('z')).is_undo_shortcut());
    }
}
