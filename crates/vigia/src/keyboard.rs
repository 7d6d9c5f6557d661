//! Keys, chords, and the host platform's primary modifier.

use crate::result::{VigiaError, VigiaResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system family the harness runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// macOS
    MacOs,
    /// Linux
    Linux,
    /// Windows
    Windows,
    /// Anything else
    Other,
}

impl Platform {
    /// Platform of the compile target
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// Primary shortcut modifier: Command on macOS, Control elsewhere
pub const fn modifier_key_for(platform: Platform) -> Key {
    match platform {
        Platform::MacOs => Key::Meta,
        Platform::Linux | Platform::Windows | Platform::Other => Key::Control,
    }
}

/// A keyboard key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Alt / Option
    Alt,
    /// Control
    Control,
    /// Meta / Command
    Meta,
    /// Shift
    Shift,
    /// Enter / Return
    Enter,
    /// Escape
    Escape,
    /// Tab
    Tab,
    /// Backspace
    Backspace,
    /// Delete
    Delete,
    /// Space bar
    Space,
    /// Arrow up
    ArrowUp,
    /// Arrow down
    ArrowDown,
    /// Arrow left
    ArrowLeft,
    /// Arrow right
    ArrowRight,
    /// Home
    Home,
    /// End
    End,
    /// Page up
    PageUp,
    /// Page down
    PageDown,
    /// A printable character
    Char(char),
}

impl Key {
    /// Parse a key name (`Enter`, `Esc`, `Cmd`, `k`, ...)
    pub fn parse(name: &str) -> VigiaResult<Self> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return if c.is_whitespace() {
                Ok(Self::Space)
            } else {
                Ok(Self::Char(c))
            };
        }
        let key = match name.to_ascii_lowercase().as_str() {
            "alt" | "option" => Self::Alt,
            "control" | "ctrl" => Self::Control,
            "meta" | "cmd" | "command" | "super" => Self::Meta,
            "shift" => Self::Shift,
            "enter" | "return" => Self::Enter,
            "escape" | "esc" => Self::Escape,
            "tab" => Self::Tab,
            "backspace" => Self::Backspace,
            "delete" | "del" => Self::Delete,
            "space" => Self::Space,
            "arrowup" | "up" => Self::ArrowUp,
            "arrowdown" | "down" => Self::ArrowDown,
            "arrowleft" | "left" => Self::ArrowLeft,
            "arrowright" | "right" => Self::ArrowRight,
            "home" => Self::Home,
            "end" => Self::End,
            "pageup" => Self::PageUp,
            "pagedown" => Self::PageDown,
            _ => {
                return Err(VigiaError::InvalidKey {
                    key: name.to_string(),
                    message: "unknown key name".to_string(),
                })
            }
        };
        Ok(key)
    }

    /// Modifier keys
    pub const fn is_modifier(self) -> bool {
        matches!(self, Self::Alt | Self::Control | Self::Meta | Self::Shift)
    }

    /// DOM `KeyboardEvent.key`
    pub fn key(self) -> String {
        match self {
            Self::Char(c) => c.to_string(),
            Self::Space => " ".to_string(),
            other => other.name().to_string(),
        }
    }

    /// DOM `KeyboardEvent.code`
    pub fn code(self) -> String {
        match self {
            Self::Char(c) if c.is_ascii_alphabetic() => format!("Key{}", c.to_ascii_uppercase()),
            Self::Char(c) if c.is_ascii_digit() => format!("Digit{c}"),
            Self::Char(c) => match c {
                '/' => "Slash",
                '.' => "Period",
                ',' => "Comma",
                '-' => "Minus",
                '=' | '+' => "Equal",
                ';' => "Semicolon",
                '\'' => "Quote",
                '[' => "BracketLeft",
                ']' => "BracketRight",
                '\\' => "Backslash",
                '`' => "Backquote",
                _ => "",
            }
            .to_string(),
            Self::Alt => "AltLeft".to_string(),
            Self::Control => "ControlLeft".to_string(),
            Self::Meta => "MetaLeft".to_string(),
            Self::Shift => "ShiftLeft".to_string(),
            other => other.name().to_string(),
        }
    }

    /// Windows virtual key code
    pub fn virtual_key_code(self) -> i64 {
        match self {
            Self::Backspace => 8,
            Self::Tab => 9,
            Self::Enter => 13,
            Self::Shift => 16,
            Self::Control => 17,
            Self::Alt => 18,
            Self::Escape => 27,
            Self::Space => 32,
            Self::PageUp => 33,
            Self::PageDown => 34,
            Self::End => 35,
            Self::Home => 36,
            Self::ArrowLeft => 37,
            Self::ArrowUp => 38,
            Self::ArrowRight => 39,
            Self::ArrowDown => 40,
            Self::Delete => 46,
            Self::Meta => 91,
            Self::Char(c) if c.is_ascii_alphanumeric() => i64::from(u32::from(c.to_ascii_uppercase())),
            Self::Char(_) => 0,
        }
    }

    /// CDP modifier bit (Alt=1, Ctrl=2, Meta=4, Shift=8)
    pub const fn modifier_bit(self) -> i64 {
        match self {
            Self::Alt => 1,
            Self::Control => 2,
            Self::Meta => 4,
            Self::Shift => 8,
            _ => 0,
        }
    }

    /// Text produced when typed without a command modifier
    pub fn text(self) -> Option<String> {
        match self {
            Self::Char(c) => Some(c.to_string()),
            Self::Space => Some(" ".to_string()),
            Self::Enter => Some("\r".to_string()),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Alt => "Alt",
            Self::Control => "Control",
            Self::Meta => "Meta",
            Self::Shift => "Shift",
            Self::Enter => "Enter",
            Self::Escape => "Escape",
            Self::Tab => "Tab",
            Self::Backspace => "Backspace",
            Self::Delete => "Delete",
            Self::Space => "Space",
            Self::ArrowUp => "ArrowUp",
            Self::ArrowDown => "ArrowDown",
            Self::ArrowLeft => "ArrowLeft",
            Self::ArrowRight => "ArrowRight",
            Self::Home => "Home",
            Self::End => "End",
            Self::PageUp => "PageUp",
            Self::PageDown => "PageDown",
            Self::Char(_) => "",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{c}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Zero or more modifiers held while a key is pressed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    modifiers: Vec<Key>,
    key: Key,
}

impl KeyChord {
    /// A single key
    pub const fn new(key: Key) -> Self {
        Self {
            modifiers: Vec::new(),
            key,
        }
    }

    /// The platform's primary modifier plus `key`
    pub fn primary(key: Key, platform: Platform) -> Self {
        Self::new(key).with_modifier(modifier_key_for(platform))
    }

    /// Add a held modifier (duplicates are ignored)
    #[must_use]
    pub fn with_modifier(mut self, modifier: Key) -> Self {
        if !self.modifiers.contains(&modifier) {
            self.modifiers.push(modifier);
        }
        self
    }

    /// Parse `"Escape"`, `"Control+k"`, `"Shift+Meta+p"`, or
    /// `"ControlOrMeta+k"` (resolved for `platform`)
    pub fn parse(input: &str, platform: Platform) -> VigiaResult<Self> {
        let invalid = |message: &str| VigiaError::InvalidKey {
            key: input.to_string(),
            message: message.to_string(),
        };
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty key chord"));
        }
        // A trailing "+" names the plus key itself: "Control++"
        let (head, last) = if trimmed == "+" {
            ("", "+")
        } else if let Some(head) = trimmed.strip_suffix("++") {
            (head, "+")
        } else {
            match trimmed.rsplit_once('+') {
                Some((head, last)) => (head, last),
                None => ("", trimmed),
            }
        };
        if last.is_empty() {
            return Err(invalid("missing key after '+'"));
        }
        let mut chord = Self::new(Key::parse(last)?);
        if !head.is_empty() {
            for token in head.split('+') {
                let modifier = match token.trim().to_ascii_lowercase().as_str() {
                    "controlormeta" | "mod" | "primary" => modifier_key_for(platform),
                    _ => Key::parse(token.trim())?,
                };
                if !modifier.is_modifier() {
                    return Err(invalid(&format!("'{token}' is not a modifier")));
                }
                chord = chord.with_modifier(modifier);
            }
        }
        Ok(chord)
    }

    /// Held modifiers in press order
    pub fn modifiers(&self) -> &[Key] {
        &self.modifiers
    }

    /// Main key
    pub const fn key(&self) -> Key {
        self.key
    }

    /// Combined CDP modifier bits
    pub fn modifier_mask(&self) -> i64 {
        self.modifiers.iter().fold(0, |mask, m| mask | m.modifier_bit())
    }

    /// Holds Control, Alt, or Meta (text is not inserted)
    pub fn has_command_modifier(&self) -> bool {
        self.modifiers
            .iter()
            .any(|m| matches!(m, Key::Control | Key::Alt | Key::Meta))
    }
}

impl From<Key> for KeyChord {
    fn from(key: Key) -> Self {
        Self::new(key)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{modifier}+")?;
        }
        write!(f, "{}", self.key)
    }
}
