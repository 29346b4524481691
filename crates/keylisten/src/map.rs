//! Translation from `rdev` key codes to [`keycode::Key`].
//!
//! Left and right variants of a modifier fold into one key, so a binding
//! written `ctrl+f9` matches either control key.

use keycode::Key;
use rdev::Key as RKey;

/// Map an `rdev` key to a [`Key`]. Keys with no binding name (keypad
/// operators, unknown scan codes) return `None` and are ignored.
pub fn from_rdev(key: RKey) -> Option<Key> {
    let k = match key {
        RKey::ControlLeft | RKey::ControlRight => Key::Control,
        RKey::ShiftLeft | RKey::ShiftRight => Key::Shift,
        RKey::Alt => Key::Alt,
        RKey::AltGr => Key::AltGr,
        RKey::MetaLeft | RKey::MetaRight => Key::Command,
        RKey::Function => Key::Function,
        RKey::CapsLock => Key::CapsLock,

        RKey::F1 => Key::F1,
        RKey::F2 => Key::F2,
        RKey::F3 => Key::F3,
        RKey::F4 => Key::F4,
        RKey::F5 => Key::F5,
        RKey::F6 => Key::F6,
        RKey::F7 => Key::F7,
        RKey::F8 => Key::F8,
        RKey::F9 => Key::F9,
        RKey::F10 => Key::F10,
        RKey::F11 => Key::F11,
        RKey::F12 => Key::F12,

        RKey::Escape => Key::Escape,
        RKey::Tab => Key::Tab,
        RKey::Space => Key::Space,
        RKey::Return | RKey::KpReturn => Key::Enter,
        RKey::Backspace => Key::Backspace,
        RKey::Delete => Key::Delete,
        RKey::Insert => Key::Insert,
        RKey::Home => Key::Home,
        RKey::End => Key::End,
        RKey::PageUp => Key::PageUp,
        RKey::PageDown => Key::PageDown,
        RKey::UpArrow => Key::Up,
        RKey::DownArrow => Key::Down,
        RKey::LeftArrow => Key::Left,
        RKey::RightArrow => Key::Right,
        RKey::PrintScreen => Key::PrintScreen,
        RKey::ScrollLock => Key::ScrollLock,
        RKey::Pause => Key::Pause,
        RKey::NumLock => Key::NumLock,

        other => return char_of(other).map(Key::Char),
    };
    Some(k)
}

/// Printable character produced by an unshifted key, US layout.
fn char_of(key: RKey) -> Option<char> {
    let c = match key {
        RKey::KeyA => 'a',
        RKey::KeyB => 'b',
        RKey::KeyC => 'c',
        RKey::KeyD => 'd',
        RKey::KeyE => 'e',
        RKey::KeyF => 'f',
        RKey::KeyG => 'g',
        RKey::KeyH => 'h',
        RKey::KeyI => 'i',
        RKey::KeyJ => 'j',
        RKey::KeyK => 'k',
        RKey::KeyL => 'l',
        RKey::KeyM => 'm',
        RKey::KeyN => 'n',
        RKey::KeyO => 'o',
        RKey::KeyP => 'p',
        RKey::KeyQ => 'q',
        RKey::KeyR => 'r',
        RKey::KeyS => 's',
        RKey::KeyT => 't',
        RKey::KeyU => 'u',
        RKey::KeyV => 'v',
        RKey::KeyW => 'w',
        RKey::KeyX => 'x',
        RKey::KeyY => 'y',
        RKey::KeyZ => 'z',
        RKey::Num0 | RKey::Kp0 => '0',
        RKey::Num1 | RKey::Kp1 => '1',
        RKey::Num2 | RKey::Kp2 => '2',
        RKey::Num3 | RKey::Kp3 => '3',
        RKey::Num4 | RKey::Kp4 => '4',
        RKey::Num5 | RKey::Kp5 => '5',
        RKey::Num6 | RKey::Kp6 => '6',
        RKey::Num7 | RKey::Kp7 => '7',
        RKey::Num8 | RKey::Kp8 => '8',
        RKey::Num9 | RKey::Kp9 => '9',
        RKey::BackQuote => '`',
        RKey::Minus => '-',
        RKey::Equal => '=',
        RKey::LeftBracket => '[',
        RKey::RightBracket => ']',
        RKey::SemiColon => ';',
        RKey::Quote => '\'',
        RKey::BackSlash | RKey::IntlBackslash => '\\',
        RKey::Comma => ',',
        RKey::Dot => '.',
        RKey::Slash => '/',
        _ => return None,
    };
    Some(c)
}
