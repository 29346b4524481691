//! The bindings file: `action = chord1,chord2` lines mapped into a chord table.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use keycode::{Chord, Key};
use tracing::debug;

use crate::Error;

/// Immutable mapping from chords to the action names bound to them.
///
/// One chord may carry several actions (all of them fire, in file order) and
/// one action may be bound to several chords.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    /// Chords in first-seen order with their actions in file order.
    entries: Vec<(Chord, Vec<String>)>,
    /// Chord -> position in `entries`.
    index: HashMap<Chord, usize>,
    /// Every action named in the file, bound or not, in file order.
    declared: Vec<String>,
}

impl Bindings {
    /// Read and parse a bindings file from disk.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let source = fs::read_to_string(path).map_err(|e| Error::Read {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
        Self::parse(&source, Some(path))
    }

    /// Parse bindings from text.
    ///
    /// Each non-blank line has the form `action = chord[,chord...]` where a
    /// chord is `key[+key...]`. `#` starts a comment, either for the whole
    /// line or inline after the bindings. An action with nothing after `=`
    /// is declared but unbound.
    pub fn parse(source: &str, path: Option<&Path>) -> Result<Self, Error> {
        let mut out = Self::default();
        for (idx, raw) in source.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let err = |byte_off: usize, message: String| {
                Error::parse_at(source, path, line_no, column(raw, byte_off), message)
            };

            let Some(eq) = raw.find('=') else {
                let lead = raw.len() - raw.trim_start().len();
                return Err(err(
                    lead,
                    format!("expected 'action = bindings', found '{trimmed}'"),
                ));
            };
            let action = raw[..eq].trim();
            if action.is_empty() {
                return Err(err(eq, "missing action name before '='".to_string()));
            }
            if !out.declared.iter().any(|a| a == action) {
                out.declared.push(action.to_string());
            }

            let rest = &raw[eq + 1..];
            let rest = match rest.find('#') {
                Some(hash) => &rest[..hash],
                None => rest,
            };
            if rest.trim().is_empty() {
                debug!(action, "action_declared_unbound");
                continue;
            }

            let mut alt_off = eq + 1;
            for alt in rest.split(',') {
                let mut keys = Vec::new();
                let mut tok_off = alt_off;
                for part in alt.split('+') {
                    let token = part.trim();
                    let at = tok_off + (part.len() - part.trim_start().len());
                    if token.is_empty() {
                        return Err(err(
                            at,
                            format!("empty key in binding '{}' for '{action}'", alt.trim()),
                        ));
                    }
                    let Some(key) = Key::from_spec(token) else {
                        return Err(err(
                            at,
                            format!("unknown key '{token}' in binding for '{action}'"),
                        ));
                    };
                    keys.push(key);
                    tok_off += part.len() + 1;
                }
                let Some(chord) = Chord::new(keys) else {
                    return Err(err(alt_off, format!("empty binding for '{action}'")));
                };
                out.bind(chord, action);
                alt_off += alt.len() + 1;
            }
        }
        Ok(out)
    }

    fn bind(&mut self, chord: Chord, action: &str) {
        match self.index.get(&chord) {
            Some(&i) => {
                let actions = &mut self.entries[i].1;
                if !actions.iter().any(|a| a == action) {
                    actions.push(action.to_string());
                }
            }
            None => {
                self.index.insert(chord.clone(), self.entries.len());
                self.entries.push((chord, vec![action.to_string()]));
            }
        }
    }

    /// Actions bound to exactly this chord, in file order.
    pub fn actions_for(&self, chord: &Chord) -> &[String] {
        self.index
            .get(chord)
            .map(|&i| self.entries[i].1.as_slice())
            .unwrap_or(&[])
    }

    /// The chord whose key set equals `pressed`, with its actions.
    pub fn matching(&self, pressed: &HashSet<Key>) -> Option<(&Chord, &[String])> {
        let chord = Chord::new(pressed.iter().copied())?;
        let &i = self.index.get(&chord)?;
        let (chord, actions) = &self.entries[i];
        Some((chord, actions.as_slice()))
    }

    /// Iterate `(chord, actions)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&Chord, &[String])> {
        self.entries.iter().map(|(c, a)| (c, a.as_slice()))
    }

    /// Number of distinct chords.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no chord is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every action named in the file, including unbound ones.
    pub fn declared(&self) -> &[String] {
        &self.declared
    }

    /// Actions with at least one chord, deduplicated, in first-bound order.
    pub fn bound_actions(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (_, actions) in &self.entries {
            for a in actions {
                if seen.insert(a.as_str()) {
                    out.push(a.as_str());
                }
            }
        }
        out
    }
}

/// 1-based character column of a byte offset within `line`.
fn column(line: &str, byte_off: usize) -> usize {
    line.get(..byte_off)
        .map(|prefix| prefix.chars().count())
        .unwrap_or(0)
        + 1
}
