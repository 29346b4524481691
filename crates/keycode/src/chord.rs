use std::{collections::BTreeSet, fmt};

use crate::Key;

/// A key chord: the exact set of keys that must be held together.
///
/// Order is irrelevant for matching, and a key appears at most once, so
/// `shift+ctrl+a` and `ctrl+shift+a` are the same chord.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Chord {
    keys: BTreeSet<Key>,
}

impl Chord {
    /// Build a chord from keys. Returns `None` when `keys` is empty.
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Option<Self> {
        let keys: BTreeSet<Key> = keys.into_iter().collect();
        if keys.is_empty() {
            return None;
        }
        Some(Self { keys })
    }

    /// Parses a chord specification of the form "ctrl+shift+f5".
    ///
    /// - Components are separated by "+" and trimmed.
    /// - Each component goes through `Key::from_spec`.
    /// - Any empty or unknown component fails the whole chord.
    pub fn parse(s: &str) -> Option<Self> {
        let mut keys = BTreeSet::new();
        for part in s.split('+') {
            let token = part.trim();
            if token.is_empty() {
                return None;
            }
            keys.insert(Key::from_spec(token)?);
        }
        Self::new(keys)
    }

    /// Keys in canonical order (modifiers first).
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys.iter().copied()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false: an empty chord cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the canonical string form of this chord.
    pub fn to_string_canonical(&self) -> String {
        self.keys
            .iter()
            .map(|k| k.to_spec())
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_canonical())
    }
}
