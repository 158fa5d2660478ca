//! Input event types and key mappings.

use crate::error::{Error, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Simplified key representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    F(u8),
    Other,
}

impl From<KeyCode> for Key {
    fn from(code: KeyCode) -> Self {
        match code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Esc => Key::Escape,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Tab => Key::Tab,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::F(n) => Key::F(n),
            _ => Key::Other,
        }
    }
}

/// Key modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        Self {
            ctrl: mods.contains(KeyModifiers::CONTROL),
            alt: mods.contains(KeyModifiers::ALT),
            shift: mods.contains(KeyModifiers::SHIFT),
        }
    }
}

/// A parsed key binding such as `alt+l` or `Esc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyBinding {
    /// Parse a binding string. Modifier names are case-insensitive.
    pub fn parse(binding: &str) -> Result<Self> {
        let mut modifiers = Modifiers::default();
        let mut key = None;

        for part in binding.split('+').map(str::trim) {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" | "cmd" | "commandorcontrol" => modifiers.ctrl = true,
                "alt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "" => return Err(Error::config(format!("empty key in binding '{}'", binding))),
                name => {
                    if key.is_some() {
                        return Err(Error::config(format!(
                            "more than one key in binding '{}'",
                            binding
                        )));
                    }
                    key = Some(parse_key(name).ok_or_else(|| {
                        Error::config(format!("unknown key '{}' in binding '{}'", part, binding))
                    })?);
                }
            }
        }

        let key = key.ok_or_else(|| Error::config(format!("no key in binding '{}'", binding)))?;
        Ok(Self { key, modifiers })
    }
}

impl std::fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.alt {
            write!(f, "Alt+")?;
        }
        if self.modifiers.shift {
            write!(f, "Shift+")?;
        }
        match self.key {
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Key::F(n) => write!(f, "F{}", n),
            other => write!(f, "{:?}", other),
        }
    }
}

fn parse_key(name: &str) -> Option<Key> {
    let key = match name {
        "enter" | "return" => Key::Enter,
        "esc" | "escape" => Key::Escape,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "tab" => Key::Tab,
        "up" => Key::Up,
        "down" => Key::Down,
        "left" => Key::Left,
        "right" => Key::Right,
        "home" => Key::Home,
        "end" => Key::End,
        "space" => Key::Char(' '),
        s if s.starts_with('f') && s.len() > 1 && s.len() <= 3 => Key::F(s[1..].parse().ok()?),
        s => {
            let mut chars = s.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            Key::Char(c)
        }
    };
    Some(key)
}

/// A processed input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        Self {
            key: Key::from(event.code),
            modifiers: Modifiers::from(event.modifiers),
        }
    }
}

impl InputEvent {
    /// Create a new input event.
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Get the character if this is a plain character input.
    pub fn char(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if !self.modifiers.ctrl && !self.modifiers.alt => Some(c),
            _ => None,
        }
    }

    /// Check if this matches a parsed binding.
    ///
    /// Letters match either case; shift is only compared for non-letters.
    pub fn matches_binding(&self, binding: &KeyBinding) -> bool {
        if self.modifiers.ctrl != binding.modifiers.ctrl
            || self.modifiers.alt != binding.modifiers.alt
        {
            return false;
        }
        match (self.key, binding.key) {
            (Key::Char(a), Key::Char(b)) if b.is_ascii_alphabetic() => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b && self.modifiers.shift == binding.modifiers.shift,
        }
    }

    /// Check if this matches a key binding string (e.g., "Ctrl+q", "Enter").
    pub fn matches(&self, binding: &str) -> bool {
        KeyBinding::parse(binding).is_ok_and(|b| self.matches_binding(&b))
    }
}
