//! Logical keys produced by the key parser and consumed by key bindings.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A logical key.
///
/// Control chords are folded into `Control(c)` using the terminal's view of
/// them: Enter is `Control('m')`, Tab is `Control('i')`, Backspace (both
/// `0x08` and `0x7f`) is `Control('h')`. `Any` exists only in binding
/// sequences and matches every other key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Char(char),
    Control(char),
    Escape,
    Left,
    Right,
    Up,
    Down,
    ControlLeft,
    ControlRight,
    ControlUp,
    ControlDown,
    ShiftLeft,
    ShiftRight,
    ShiftUp,
    ShiftDown,
    Home,
    End,
    ControlHome,
    ControlEnd,
    Insert,
    Delete,
    ShiftDelete,
    ControlDelete,
    PageUp,
    PageDown,
    BackTab,
    F(u8),
    /// Cursor position report; the payload stays in `KeyPress::data`.
    CprResponse,
    /// Whole bracketed paste; the pasted text is in `KeyPress::data`.
    BracketedPaste,
    /// Mouse report; decode `KeyPress::data` with `MouseEvent::parse`.
    Mouse,
    ScrollUp,
    ScrollDown,
    /// Sequences the terminal sends that should be swallowed.
    Ignore,
    Any,
}

impl Key {
    pub const ENTER: Key = Key::Control('m');
    pub const TAB: Key = Key::Control('i');
    pub const BACKSPACE: Key = Key::Control('h');

    /// Data a terminal would send for this key when it is a single byte.
    pub fn default_data(self) -> String {
        match self {
            Key::Char(c) => c.to_string(),
            Key::Control('@') => "\x00".to_string(),
            Key::Control(c @ 'a'..='z') => char::from(c as u8 - b'a' + 1).to_string(),
            Key::Control('\\') => "\x1c".to_string(),
            Key::Control(']') => "\x1d".to_string(),
            Key::Control('^') => "\x1e".to_string(),
            Key::Control('_') => "\x1f".to_string(),
            Key::Escape => "\x1b".to_string(),
            _ => String::new(),
        }
    }

    /// Whether this key inserts its data as text when bound to self-insert.
    pub fn is_printable(self) -> bool {
        matches!(self, Key::Char(c) if !c.is_control())
    }
}

/// One key press: the logical key plus the raw text that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: Key,
    pub data: String,
}

impl KeyPress {
    pub fn new(key: Key, data: impl Into<String>) -> Self {
        Self {
            key,
            data: data.into(),
        }
    }

    /// Key press carrying the key's default data.
    pub fn key(key: Key) -> Self {
        Self {
            key,
            data: key.default_data(),
        }
    }

    pub fn char(c: char) -> Self {
        Self::key(Key::Char(c))
    }
}

impl From<Key> for KeyPress {
    fn from(key: Key) -> Self {
        KeyPress::key(key)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("empty key name")]
    Empty,
    #[error("unknown key name `{0}`")]
    Unknown(String),
}

const NAMED: &[(&str, Key)] = &[
    ("escape", Key::Escape),
    ("esc", Key::Escape),
    ("enter", Key::ENTER),
    ("tab", Key::TAB),
    ("backspace", Key::BACKSPACE),
    ("space", Key::Char(' ')),
    ("left", Key::Left),
    ("right", Key::Right),
    ("up", Key::Up),
    ("down", Key::Down),
    ("c-left", Key::ControlLeft),
    ("c-right", Key::ControlRight),
    ("c-up", Key::ControlUp),
    ("c-down", Key::ControlDown),
    ("s-left", Key::ShiftLeft),
    ("s-right", Key::ShiftRight),
    ("s-up", Key::ShiftUp),
    ("s-down", Key::ShiftDown),
    ("home", Key::Home),
    ("end", Key::End),
    ("c-home", Key::ControlHome),
    ("c-end", Key::ControlEnd),
    ("insert", Key::Insert),
    ("delete", Key::Delete),
    ("s-delete", Key::ShiftDelete),
    ("c-delete", Key::ControlDelete),
    ("pageup", Key::PageUp),
    ("pagedown", Key::PageDown),
    ("s-tab", Key::BackTab),
    ("c-space", Key::Control('@')),
    ("<any>", Key::Any),
    ("<cpr>", Key::CprResponse),
    ("<paste>", Key::BracketedPaste),
    ("<mouse>", Key::Mouse),
    ("<scroll-up>", Key::ScrollUp),
    ("<scroll-down>", Key::ScrollDown),
    ("<ignore>", Key::Ignore),
];

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(KeyParseError::Empty);
        }
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::Char(c));
        }
        let lower = s.to_ascii_lowercase();
        if let Some((_, key)) = NAMED.iter().find(|(name, _)| *name == lower) {
            return Ok(*key);
        }
        if let Some(rest) = lower.strip_prefix("c-") {
            let mut rest_chars = rest.chars();
            if let (Some(c), None) = (rest_chars.next(), rest_chars.next())
                && (c.is_ascii_lowercase() || "@\\]^_".contains(c))
            {
                return Ok(Key::Control(c));
            }
        }
        if let Some(n) = lower.strip_prefix('f')
            && let Ok(n) = n.parse::<u8>()
            && (1..=24).contains(&n)
        {
            return Ok(Key::F(n));
        }
        Err(KeyParseError::Unknown(s.to_string()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(' ') => f.write_str("space"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Control('m') => f.write_str("enter"),
            Key::Control('i') => f.write_str("tab"),
            Key::Control('h') => f.write_str("backspace"),
            Key::Control('@') => f.write_str("c-space"),
            Key::Control(c) => write!(f, "c-{c}"),
            Key::F(n) => write!(f, "f{n}"),
            other => {
                let name = NAMED
                    .iter()
                    .find(|(_, key)| key == other)
                    .map(|(name, _)| *name)
                    .unwrap_or("?");
                f.write_str(name)
            }
        }
    }
}

/// Parse a whitespace separated key sequence such as `"c-x c-e"` or `"escape f"`.
pub fn parse_key_sequence(s: &str) -> Result<Vec<Key>, KeyParseError> {
    let keys = s
        .split_whitespace()
        .map(Key::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    if keys.is_empty() {
        return Err(KeyParseError::Empty);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_named_and_control_keys() {
        assert_eq!("c-a".parse::<Key>(), Ok(Key::Control('a')));
        assert_eq!("Enter".parse::<Key>(), Ok(Key::Control('m')));
        assert_eq!("f12".parse::<Key>(), Ok(Key::F(12)));
        assert_eq!("x".parse::<Key>(), Ok(Key::Char('x')));
        assert_eq!("<any>".parse::<Key>(), Ok(Key::Any));
        assert!(matches!("f99".parse::<Key>(), Err(KeyParseError::Unknown(_))));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for key in [
            Key::Control('x'),
            Key::ENTER,
            Key::Escape,
            Key::F(3),
            Key::Char(' '),
            Key::BackTab,
            Key::ControlLeft,
        ] {
            assert_eq!(key.to_string().parse::<Key>(), Ok(key));
        }
    }

    #[test]
    fn sequences() {
        assert_eq!(
            parse_key_sequence("c-x c-e"),
            Ok(vec![Key::Control('x'), Key::Control('e')])
        );
        assert_eq!(parse_key_sequence("  "), Err(KeyParseError::Empty));
    }

    #[test]
    fn default_data_for_control_keys() {
        assert_eq!(Key::Control('a').default_data(), "\x01");
        assert_eq!(Key::ENTER.default_data(), "\r");
        assert_eq!(KeyPress::char('q').data, "q");
    }
}
