//! Configuration for spotkeys: the bindings file, dispatch groups and settings.
#![warn(unsafe_op_in_unsafe_fn)]

use std::{
    env,
    path::{Path, PathBuf},
};

mod bindings;
mod error;
mod groups;
mod loader;
mod settings;

pub use bindings::Bindings;
pub use error::{Error, excerpt_at};
pub use groups::{Groups, INDEPENDENT, SELF_DEPENDENT};
pub use loader::{LoadedConfig, load_from_path};
pub use settings::{LocalControlSetting, Notify, Settings, Web, load_settings};

/// Determine the preferred user config path (`~/.spotkeys/config.toml`).
pub fn default_config_path() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".spotkeys");
    p.push("config.toml");
    p
}

/// Resolve the effective config path using the default policy.
///
/// Policy:
/// 1) Use `explicit` when provided.
/// 2) Else use `~/.spotkeys/config.toml` when it exists.
/// 3) Else return a clear "no config found" error.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let preferred = default_config_path();
    if preferred.exists() {
        return Ok(preferred);
    }

    Err(Error::Read {
        path: Some(preferred),
        message: "No config found. Create ~/.spotkeys/config.toml and a bindings.txt next to it"
            .to_string(),
    })
}
