//! Load the settings file together with the bindings file it points at.

use std::path::Path;

use tracing::debug;

use crate::{Bindings, Error, Settings, load_settings};

/// Everything the dispatch core needs from disk.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Parsed settings (groups, web options, notifications).
    pub settings: Settings,
    /// Parsed chord table.
    pub bindings: Bindings,
}

/// Load settings from `path`, then the bindings file it references.
pub fn load_from_path(path: &Path) -> Result<LoadedConfig, Error> {
    let settings = load_settings(path)?;
    let bindings_path = settings.bindings_path();
    let bindings = Bindings::load(&bindings_path)?;
    debug!(
        settings = %path.display(),
        bindings = %bindings_path.display(),
        chords = bindings.len(),
        "config_loaded"
    );
    Ok(LoadedConfig { settings, bindings })
}
