//! The closed table of bindable action names.

use std::sync::Arc;

use spotkeys_engine::{Action, ActionError, ActionProvider};

use crate::{Result, spotify::Spotify};

type ActionFn = fn(&Spotify) -> Result<()>;

/// Every action a binding may name.
const ACTIONS: &[(&str, ActionFn)] = &[
    ("next", Spotify::next),
    ("previous", Spotify::previous),
    ("restart", Spotify::restart),
    ("pause", Spotify::pause),
    ("play", Spotify::play),
    ("toggle_play", Spotify::toggle_play),
    ("save", Spotify::save),
    ("unsave", Spotify::unsave),
    ("toggle_save", Spotify::toggle_save),
    ("toggle_shuffle", Spotify::toggle_shuffle),
    ("toggle_repeat", Spotify::toggle_repeat),
    ("show_current_song", Spotify::show_current_song),
    ("play_on_current_device", Spotify::play_on_current_device),
    (
        "toggle_save_monthly_playlist",
        Spotify::toggle_save_monthly_playlist,
    ),
];

/// Names of every known action, sorted.
pub fn action_names() -> Vec<&'static str> {
    let mut names: Vec<&str> = ACTIONS.iter().map(|(n, _)| *n).collect();
    names.sort_unstable();
    names
}

/// True if `name` is a known action.
pub fn is_action(name: &str) -> bool {
    ACTIONS.iter().any(|(n, _)| *n == name)
}

/// Resolves action names to calls on a shared [`Spotify`].
pub struct ActionTable {
    spotify: Arc<Spotify>,
}

impl ActionTable {
    /// Wrap a player.
    pub fn new(spotify: Arc<Spotify>) -> Self {
        Self { spotify }
    }
}

impl ActionProvider for ActionTable {
    fn resolve(&self, name: &str) -> Option<Action> {
        let &(_, f) = ACTIONS.iter().find(|(n, _)| *n == name)?;
        let spotify = self.spotify.clone();
        Some(Arc::new(move || f(&spotify).map_err(ActionError::from)))
    }

    fn names(&self) -> Vec<String> {
        action_names().into_iter().map(str::to_string).collect()
    }

    fn contains(&self, name: &str) -> bool {
        is_action(name)
    }
}

/// Name-only provider for validating bindings without credentials.
///
/// Resolving yields nothing; use it with `contains` and `names` only.
#[derive(Debug, Default, Clone, Copy)]
pub struct KnownActions;

impl ActionProvider for KnownActions {
    fn resolve(&self, _name: &str) -> Option<Action> {
        None
    }

    fn names(&self) -> Vec<String> {
        action_names().into_iter().map(str::to_string).collect()
    }

    fn contains(&self, name: &str) -> bool {
        is_action(name)
    }
}
