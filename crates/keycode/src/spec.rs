use crate::Key;

// Aliases that only apply to parsing specs (not emitted by `Key::to_spec`).
macro_rules! key_spec_aliases {
    ($m:ident, $arg:expr) => {
        $m! { $arg,
            // side-specific modifiers fold into the generic key
            Control => "control",
            Control => "ctrl_l",
            Control => "ctrl_r",
            Shift => "shift_l",
            Shift => "shift_r",
            Alt => "alt_l",
            Alt => "alt_r",
            Alt => "opt",
            Alt => "option",
            Command => "cmd_l",
            Command => "cmd_r",
            Command => "command",
            Command => "super",
            Command => "win",
            Function => "function",
            CapsLock => "caps",
            CapsLock => "capslock",

            // enter/return/delete variants
            Enter => "return",
            Enter => "ret",
            Escape => "escape",
            Delete => "del",
            Backspace => "bs",

            // navigation
            PageUp => "pgup",
            PageUp => "pageup",
            PageDown => "pgdn",
            PageDown => "pagedown",
            Up => "up_arrow",
            Down => "down_arrow",
            Left => "left_arrow",
            Right => "right_arrow",
            PrintScreen => "prtsc",
        }
    };
}

macro_rules! from_spec_match {
    ( $s:expr, $( $k:ident => $v:literal, )* ) => {{
        match $s {
            $( $v => Some(Key::$k), )*
            _ => None,
        }
    }}
}

/// Parses a key token from a binding specification.
///
/// Resolution order:
/// 1. A named key (`shift`, `f5`, `page_up`), case-insensitive.
/// 2. An alias word (`ctrl_l`, `opt`, `pgdn`), case-insensitive.
/// 3. A single printable character, lowercased.
///
/// Returns `None` for empty input and for multi-character words that are not
/// known names.
pub fn from_spec(s: &str) -> Option<Key> {
    if let Some(k) = Key::from_name(s) {
        return Some(k);
    }
    let lowered = s.to_ascii_lowercase();
    if let some @ Some(_) = key_spec_aliases!(from_spec_match, lowered.as_str()) {
        return some;
    }
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() => Some(Key::from_char(c)),
        _ => None,
    }
}

/// Returns the spec string for a key: the canonical name for named keys, the
/// character itself otherwise.
pub fn to_spec(key: Key) -> String {
    match key {
        Key::Char(c) => c.to_string(),
        named => named.name().unwrap_or_default().to_string(),
    }
}

impl Key {
    /// Parses a key specification token into a `Key`.
    ///
    /// Named keys and aliases win over characters, so `f5` is the function
    /// key and never the two-character sequence.
    pub fn from_spec(s: &str) -> Option<Self> {
        from_spec(s)
    }

    /// Returns the key specification string for this `Key`.
    pub fn to_spec(self) -> String {
        to_spec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_roundtrip(k: Key) {
        let spec = to_spec(k);
        assert_eq!(from_spec(&spec), Some(k), "roundtrip failed for {spec}");
    }

    #[test]
    fn named_roundtrip_and_alias() {
        assert_roundtrip(Key::F5);
        assert_roundtrip(Key::PageDown);
        assert_eq!(from_spec("ctrl_l"), Some(Key::Control));
        assert_eq!(from_spec("CTRL"), Some(Key::Control));
        assert_eq!(from_spec("opt"), Some(Key::Alt));
        assert_eq!(from_spec("return"), Some(Key::Enter));
        assert_eq!(from_spec("pgdn"), Some(Key::PageDown));
    }

    #[test]
    fn single_characters() {
        assert_roundtrip(Key::Char('s'));
        assert_eq!(from_spec("S"), Some(Key::Char('s')));
        assert_eq!(from_spec("1"), Some(Key::Char('1')));
        assert_eq!(from_spec(";"), Some(Key::Char(';')));
    }

    #[test]
    fn unknown_words_fail() {
        assert_eq!(from_spec(""), None);
        assert_eq!(from_spec("shfit"), None);
        assert_eq!(from_spec("f13"), None);
        assert_eq!(from_spec("\t"), None);
    }
}
