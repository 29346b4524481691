use std::collections::HashSet;

use config::Bindings;
use keycode::{Chord, Key};
use tracing::trace;

/// Tracks held keys and fires chords on the transition into a match.
///
/// The latch is global: once any chord fires, nothing fires again until some
/// key is released. Releasing any key re-arms, whether or not it belonged to
/// the chord that fired.
#[derive(Debug, Clone)]
pub struct ChordTracker {
    held: HashSet<Key>,
    armed: bool,
}

impl ChordTracker {
    /// Create a tracker with nothing held and the latch armed.
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            armed: true,
        }
    }

    /// Record a key down. Returns the matched chord and its actions when this
    /// press completes a bound chord and the latch is armed.
    ///
    /// OS auto-repeat of a held key is harmless: the key is already in the
    /// set, and the latch is already spent if it matched.
    pub fn on_key_press<'b>(
        &mut self,
        key: Key,
        bindings: &'b Bindings,
    ) -> Option<(&'b Chord, &'b [String])> {
        let first = self.held.insert(key);
        trace!(key = %key, first, held = self.held.len(), "key_down");
        if !self.armed {
            return None;
        }
        let (chord, actions) = bindings.matching(&self.held)?;
        self.armed = false;
        Some((chord, actions))
    }

    /// Record a key up. Always re-arms; releasing an untracked key is a no-op
    /// for the held set.
    pub fn on_key_release(&mut self, key: Key) {
        self.armed = true;
        let was_held = self.held.remove(&key);
        trace!(key = %key, was_held, held = self.held.len(), "key_up");
    }

    /// Return true if the key is currently considered down.
    pub fn is_down(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Return true if the next matching press will fire.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Number of keys currently held.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

impl Default for ChordTracker {
    fn default() -> Self {
        Self::new()
    }
}
