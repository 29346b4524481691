use std::fmt;

/// Declares the named `Key` variants together with their canonical names.
///
/// The canonical name is what `Key::name` returns and what
/// `Key::from_name` accepts (case-insensitively).
macro_rules! named_keys {
    ( $( $variant:ident => $name:literal, )* ) => {
        /// A key identifier: either a named modifier/function/navigation key,
        /// or a single printable character.
        ///
        /// Left/right variants of modifiers are folded into one identifier,
        /// so `ctrl` matches either physical control key.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub enum Key {
            $( $variant, )*
            /// A printable character, stored lowercased.
            Char(char),
        }

        impl Key {
            /// All named (non-character) keys, in declaration order.
            pub const NAMED: &'static [Key] = &[ $( Key::$variant, )* ];

            /// Returns the canonical name for named keys, or `None` for characters.
            pub fn name(self) -> Option<&'static str> {
                match self {
                    $( Key::$variant => Some($name), )*
                    Key::Char(_) => None,
                }
            }

            /// Case-insensitive lookup of a named key from its canonical name.
            pub fn from_name(name: &str) -> Option<Self> {
                let lowered = name.to_ascii_lowercase();
                match lowered.as_str() {
                    $( $name => Some(Key::$variant), )*
                    _ => None,
                }
            }
        }
    };
}

named_keys! {
    // Modifiers sort first so canonical chord strings read "ctrl+shift+a".
    Control => "ctrl",
    Shift => "shift",
    Alt => "alt",
    AltGr => "alt_gr",
    Command => "cmd",
    Function => "fn",
    CapsLock => "caps_lock",

    F1 => "f1",
    F2 => "f2",
    F3 => "f3",
    F4 => "f4",
    F5 => "f5",
    F6 => "f6",
    F7 => "f7",
    F8 => "f8",
    F9 => "f9",
    F10 => "f10",
    F11 => "f11",
    F12 => "f12",

    Escape => "esc",
    Tab => "tab",
    Space => "space",
    Enter => "enter",
    Backspace => "backspace",
    Delete => "delete",
    Insert => "insert",
    Home => "home",
    End => "end",
    PageUp => "page_up",
    PageDown => "page_down",
    Up => "up",
    Down => "down",
    Left => "left",
    Right => "right",
    PrintScreen => "print_screen",
    ScrollLock => "scroll_lock",
    Pause => "pause",
    NumLock => "num_lock",
}

impl Key {
    /// Build a character key. Letters are lowercased; whitespace maps to `Space`.
    pub fn from_char(c: char) -> Self {
        if c == ' ' {
            return Key::Space;
        }
        let mut lower = c.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) => Key::Char(l),
            _ => Key::Char(c),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            named => write!(f, "{}", named.name().unwrap_or("?")),
        }
    }
}
