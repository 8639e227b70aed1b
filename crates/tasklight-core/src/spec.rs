use crate::error::{Error, Result};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A modifier key that can take part in a global hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Cmd,
}

impl Modifier {
    /// The OS-level modifier flag for this key
    pub fn flag(self) -> Modifiers {
        match self {
            Modifier::Ctrl => Modifiers::CONTROL,
            Modifier::Alt => Modifiers::ALT,
            Modifier::Shift => Modifiers::SHIFT,
            Modifier::Cmd => Modifiers::SUPER,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Modifier::Ctrl => "ctrl",
            Modifier::Alt => "alt",
            Modifier::Shift => "shift",
            Modifier::Cmd => "cmd",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "ctrl" | "control" => Some(Modifier::Ctrl),
            "alt" | "option" | "opt" => Some(Modifier::Alt),
            "shift" => Some(Modifier::Shift),
            "cmd" | "command" | "super" | "win" | "meta" => Some(Modifier::Cmd),
            _ => None,
        }
    }
}

/// Key codes a hotkey may end in. The first name is the one used for display.
const KEYS: &[(Code, &[&str])] = &[
    (Code::KeyA, &["a"]),
    (Code::KeyB, &["b"]),
    (Code::KeyC, &["c"]),
    (Code::KeyD, &["d"]),
    (Code::KeyE, &["e"]),
    (Code::KeyF, &["f"]),
    (Code::KeyG, &["g"]),
    (Code::KeyH, &["h"]),
    (Code::KeyI, &["i"]),
    (Code::KeyJ, &["j"]),
    (Code::KeyK, &["k"]),
    (Code::KeyL, &["l"]),
    (Code::KeyM, &["m"]),
    (Code::KeyN, &["n"]),
    (Code::KeyO, &["o"]),
    (Code::KeyP, &["p"]),
    (Code::KeyQ, &["q"]),
    (Code::KeyR, &["r"]),
    (Code::KeyS, &["s"]),
    (Code::KeyT, &["t"]),
    (Code::KeyU, &["u"]),
    (Code::KeyV, &["v"]),
    (Code::KeyW, &["w"]),
    (Code::KeyX, &["x"]),
    (Code::KeyY, &["y"]),
    (Code::KeyZ, &["z"]),
    (Code::Digit0, &["0"]),
    (Code::Digit1, &["1"]),
    (Code::Digit2, &["2"]),
    (Code::Digit3, &["3"]),
    (Code::Digit4, &["4"]),
    (Code::Digit5, &["5"]),
    (Code::Digit6, &["6"]),
    (Code::Digit7, &["7"]),
    (Code::Digit8, &["8"]),
    (Code::Digit9, &["9"]),
    (Code::F1, &["f1"]),
    (Code::F2, &["f2"]),
    (Code::F3, &["f3"]),
    (Code::F4, &["f4"]),
    (Code::F5, &["f5"]),
    (Code::F6, &["f6"]),
    (Code::F7, &["f7"]),
    (Code::F8, &["f8"]),
    (Code::F9, &["f9"]),
    (Code::F10, &["f10"]),
    (Code::F11, &["f11"]),
    (Code::F12, &["f12"]),
    (Code::Space, &["space"]),
    (Code::Enter, &["enter", "return"]),
    (Code::Tab, &["tab"]),
    (Code::Escape, &["escape", "esc"]),
    (Code::Backspace, &["backspace"]),
    (Code::Delete, &["delete", "del"]),
    (Code::Home, &["home"]),
    (Code::End, &["end"]),
    (Code::PageUp, &["pageup", "pgup"]),
    (Code::PageDown, &["pagedown", "pgdn"]),
    (Code::ArrowLeft, &["left"]),
    (Code::ArrowRight, &["right"]),
    (Code::ArrowUp, &["up"]),
    (Code::ArrowDown, &["down"]),
    (Code::Minus, &["minus", "-"]),
    (Code::Equal, &["equal", "="]),
    (Code::BracketLeft, &["bracketleft", "["]),
    (Code::BracketRight, &["bracketright", "]"]),
    (Code::Backslash, &["backslash", "\\"]),
    (Code::Semicolon, &["semicolon", ";"]),
    (Code::Quote, &["quote", "'"]),
    (Code::Comma, &["comma", ","]),
    (Code::Period, &["period", "."]),
    (Code::Slash, &["slash", "/"]),
    (Code::Backquote, &["backquote", "grave", "`"]),
];

fn code_from_name(name: &str) -> Option<Code> {
    KEYS.iter()
        .find(|(_, names)| names.contains(&name))
        .map(|(code, _)| *code)
}

fn code_name(code: Code) -> Option<&'static str> {
    KEYS.iter()
        .find(|(c, _)| *c == code)
        .map(|(_, names)| names[0])
}

/// A global hotkey: a set of modifiers plus one key.
///
/// Modifiers are deduplicated and keep the order they were given in, which is
/// only used when formatting. Two specs with the same modifiers in a different
/// order compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HotkeySpec {
    modifiers: Vec<Modifier>,
    code: Code,
}

impl HotkeySpec {
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, code: Code) -> Self {
        let mut deduped = Vec::new();
        for m in modifiers {
            if !deduped.contains(&m) {
                deduped.push(m);
            }
        }
        Self {
            modifiers: deduped,
            code,
        }
    }

    /// Parse the settings form, e.g. `"ctrl+space"` or `"cmd+shift+n"`.
    ///
    /// Parts are case-insensitive and may appear in any order, but exactly one
    /// of them must be a key.
    pub fn parse(s: &str) -> Result<Self> {
        let mut modifiers = Vec::new();
        let mut code = None;

        for part in s.split('+').map(|p| p.trim().to_lowercase()) {
            if part.is_empty() {
                return Err(Error::InvalidSpec(format!("Empty key in '{s}'")));
            }
            if let Some(m) = Modifier::from_name(&part) {
                modifiers.push(m);
            } else if let Some(c) = code_from_name(&part) {
                if code.replace(c).is_some() {
                    return Err(Error::InvalidSpec(format!("More than one key in '{s}'")));
                }
            } else {
                return Err(Error::InvalidSpec(format!("Unknown key: {part}")));
            }
        }

        let code = code.ok_or_else(|| Error::InvalidSpec(format!("No key in '{s}'")))?;
        Ok(Self::new(modifiers, code))
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn code(&self) -> Code {
        self.code
    }

    /// The modifiers as an order-independent flag set
    pub fn modifier_flags(&self) -> Modifiers {
        self.modifiers
            .iter()
            .fold(Modifiers::empty(), |acc, m| acc | m.flag())
    }

    /// Check that the key can be handed to the OS.
    pub fn validate(&self) -> Result<()> {
        match code_name(self.code) {
            Some(_) => Ok(()),
            None => Err(Error::InvalidSpec(format!(
                "Key {:?} cannot be used in a global hotkey",
                self.code
            ))),
        }
    }

    pub fn to_hotkey(&self) -> HotKey {
        let mods = self.modifier_flags();
        HotKey::new((!mods.is_empty()).then_some(mods), self.code)
    }
}

impl PartialEq for HotkeySpec {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.modifier_flags() == other.modifier_flags()
    }
}

impl Eq for HotkeySpec {}

impl Hash for HotkeySpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.modifier_flags().bits().hash(state);
        self.code.hash(state);
    }
}

impl fmt::Display for HotkeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m.name())?;
        }
        match code_name(self.code) {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{:?}", self.code),
        }
    }
}

impl FromStr for HotkeySpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        HotkeySpec::parse(s)
    }
}

impl TryFrom<String> for HotkeySpec {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        HotkeySpec::parse(&s)
    }
}

impl From<HotkeySpec> for String {
    fn from(spec: HotkeySpec) -> Self {
        spec.to_string()
    }
}
