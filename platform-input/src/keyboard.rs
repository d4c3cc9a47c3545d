//! Keysyms, modifiers and key combinations.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// X11 keysym values
#[allow(non_upper_case_globals)]
pub mod keysyms {
    // X11 keysym constants
    pub const XK_space: u32 = 0x0020;
    pub const XK_BackSpace: u32 = 0xff08;
    pub const XK_Tab: u32 = 0xff09;
    pub const XK_Return: u32 = 0xff0d;
    pub const XK_Escape: u32 = 0xff1b;
    pub const XK_Insert: u32 = 0xff63;
    pub const XK_Delete: u32 = 0xffff;
    pub const XK_Home: u32 = 0xff50;
    pub const XK_End: u32 = 0xff57;
    pub const XK_Page_Up: u32 = 0xff55;
    pub const XK_Page_Down: u32 = 0xff56;
    pub const XK_Left: u32 = 0xff51;
    pub const XK_Up: u32 = 0xff52;
    pub const XK_Right: u32 = 0xff53;
    pub const XK_Down: u32 = 0xff54;
    pub const XK_F1: u32 = 0xffbe;
    pub const XK_F2: u32 = 0xffbf;
    pub const XK_F3: u32 = 0xffc0;
    pub const XK_F4: u32 = 0xffc1;
    pub const XK_F5: u32 = 0xffc2;
    pub const XK_F6: u32 = 0xffc3;
    pub const XK_F7: u32 = 0xffc4;
    pub const XK_F8: u32 = 0xffc5;
    pub const XK_F9: u32 = 0xffc6;
    pub const XK_F10: u32 = 0xffc7;
    pub const XK_F11: u32 = 0xffc8;
    pub const XK_F12: u32 = 0xffc9;
    pub const XK_Shift_L: u32 = 0xffe1;
    pub const XK_Shift_R: u32 = 0xffe2;
    pub const XK_Control_L: u32 = 0xffe3;
    pub const XK_Control_R: u32 = 0xffe4;
    pub const XK_Caps_Lock: u32 = 0xffe5;
    pub const XK_Alt_L: u32 = 0xffe9;
    pub const XK_Alt_R: u32 = 0xffea;
    pub const XK_Super_L: u32 = 0xffeb; // Left Windows/Command key
    pub const XK_Super_R: u32 = 0xffec; // Right Windows/Command key
    pub const XK_Menu: u32 = 0xff67;
    pub const XK_Print: u32 = 0xff61;
}
use keysyms::*;

bitflags! {
    /// Modifier keys held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT   = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT     = 1 << 2;
        const SUPER   = 1 << 3; // Windows/Command key
    }
}

/// The modifier a keysym represents, if it is a modifier key.
pub fn modifier_for_keysym(keysym: u32) -> Option<Modifiers> {
    match keysym {
        XK_Shift_L | XK_Shift_R => Some(Modifiers::SHIFT),
        XK_Control_L | XK_Control_R => Some(Modifiers::CONTROL),
        XK_Alt_L | XK_Alt_R => Some(Modifiers::ALT),
        XK_Super_L | XK_Super_R => Some(Modifiers::SUPER),
        _ => None,
    }
}

/// Folds upper-case Latin letters onto their lower-case keysym.
///
/// Shortcuts match on the key, not on the character Shift produced.
pub fn normalize_keysym(keysym: u32) -> u32 {
    match char::from_u32(keysym) {
        Some(c) if c.is_ascii_uppercase() => c.to_ascii_lowercase() as u32,
        _ => keysym,
    }
}

const NAMED_KEYS: &[(&str, u32)] = &[
    ("Space", XK_space),
    ("BackSpace", XK_BackSpace),
    ("Tab", XK_Tab),
    ("Return", XK_Return),
    ("Enter", XK_Return),
    ("Escape", XK_Escape),
    ("Esc", XK_Escape),
    ("Insert", XK_Insert),
    ("Delete", XK_Delete),
    ("Home", XK_Home),
    ("End", XK_End),
    ("PageUp", XK_Page_Up),
    ("PageDown", XK_Page_Down),
    ("Left", XK_Left),
    ("Up", XK_Up),
    ("Right", XK_Right),
    ("Down", XK_Down),
    ("F1", XK_F1),
    ("F2", XK_F2),
    ("F3", XK_F3),
    ("F4", XK_F4),
    ("F5", XK_F5),
    ("F6", XK_F6),
    ("F7", XK_F7),
    ("F8", XK_F8),
    ("F9", XK_F9),
    ("F10", XK_F10),
    ("F11", XK_F11),
    ("F12", XK_F12),
    ("Menu", XK_Menu),
    ("Print", XK_Print),
];

/// Keysym for a key name such as `"F10"`, `"Escape"` or `"r"`.
pub fn keysym_from_name(name: &str) -> Option<u32> {
    if let Some(&(_, k)) = NAMED_KEYS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
    {
        return Some(k);
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_graphic() => Some(normalize_keysym(c as u32)),
        _ => None,
    }
}

/// Display name for a keysym.
pub fn keysym_name(keysym: u32) -> String {
    if let Some(&(n, _)) = NAMED_KEYS.iter().find(|(_, k)| *k == keysym) {
        return n.to_string();
    }
    match char::from_u32(keysym) {
        Some(c) if c.is_ascii_graphic() => c.to_ascii_uppercase().to_string(),
        _ => format!("0x{:04x}", keysym),
    }
}

/// Errors raised when a key combination string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyComboError {
    #[error("empty key combination")]
    Empty,

    #[error("unknown key {0:?}")]
    UnknownKey(String),

    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),
}

/// A key plus the modifiers that must be held with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    pub keysym: u32,
}

impl KeyCombo {
    pub fn new(modifiers: Modifiers, keysym: u32) -> Self {
        Self {
            modifiers,
            keysym: normalize_keysym(keysym),
        }
    }
}

impl FromStr for KeyCombo {
    type Err = KeyComboError;

    /// Parses `"Ctrl+Shift+F10"`, `"Alt+r"`, `"F8"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let (key, mods) = match parts.split_last() {
            Some((key, mods)) if !key.is_empty() => (*key, mods),
            _ => return Err(KeyComboError::Empty),
        };

        let mut modifiers = Modifiers::empty();
        for m in mods {
            modifiers |= match m.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => Modifiers::CONTROL,
                "shift" => Modifiers::SHIFT,
                "alt" | "option" => Modifiers::ALT,
                "super" | "win" | "cmd" | "meta" => Modifiers::SUPER,
                _ => return Err(KeyComboError::UnknownModifier(m.to_string())),
            };
        }

        let keysym =
            keysym_from_name(key).ok_or_else(|| KeyComboError::UnknownKey(key.to_string()))?;
        Ok(Self::new(modifiers, keysym))
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::SUPER, "Super"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", keysym_name(self.keysym))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_combinations() {
        let combo: KeyCombo = "Ctrl+Shift+F10".parse().unwrap();
        assert_eq!(combo.modifiers, Modifiers::CONTROL | Modifiers::SHIFT);
        assert_eq!(combo.keysym, XK_F10);

        let plain: KeyCombo = "F8".parse().unwrap();
        assert_eq!(plain, KeyCombo::new(Modifiers::empty(), XK_F8));

        let letter: KeyCombo = "alt + R".parse().unwrap();
        assert_eq!(letter, KeyCombo::new(Modifiers::ALT, 'r' as u32));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<KeyCombo>(), Err(KeyComboError::Empty));
        assert_eq!("Ctrl+".parse::<KeyCombo>(), Err(KeyComboError::Empty));
        assert_eq!(
            "Hyper+F1".parse::<KeyCombo>(),
            Err(KeyComboError::UnknownModifier("Hyper".to_string()))
        );
        assert_eq!(
            "Ctrl+Banana".parse::<KeyCombo>(),
            Err(KeyComboError::UnknownKey("Banana".to_string()))
        );
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["Ctrl+Shift+F10", "F8", "Alt+R", "Ctrl+Escape"] {
            let combo: KeyCombo = text.parse().unwrap();
            assert_eq!(combo.to_string(), text);
        }
    }

    #[test]
    fn test_normalize_and_modifiers() {
        assert_eq!(normalize_keysym('Q' as u32), 'q' as u32);
        assert_eq!(normalize_keysym(XK_F1), XK_F1);
        assert_eq!(modifier_for_keysym(XK_Control_R), Some(Modifiers::CONTROL));
        assert_eq!(modifier_for_keysym('a' as u32), None);
    }
}
