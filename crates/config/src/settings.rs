//! The TOML settings file.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{Error, Groups};

/// Which local control surface to try before the Web API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalControlSetting {
    /// Probe by platform.
    #[default]
    Auto,
    /// macOS AppleScript.
    Applescript,
    /// Linux MPRIS over D-Bus.
    Mpris,
    /// Windows media virtual keys.
    VirtualKey,
    /// Always use the Web API.
    None,
}

/// Remote API endpoints and request policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Web {
    /// Base URL for player endpoints, with trailing slash.
    pub api_url: String,
    /// Token refresh endpoint.
    pub refresh_url: String,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Extra attempts after a transport failure.
    pub retries: u32,
}

impl Default for Web {
    fn default() -> Self {
        Self {
            api_url: "https://api.spotify.com/v1/".to_string(),
            refresh_url: "https://accounts.spotify.com/api/token".to_string(),
            timeout_ms: 4000,
            retries: 1,
        }
    }
}

/// Desktop notification options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Notify {
    /// When false, notifications are only logged.
    pub enabled: bool,
    /// Display duration hint.
    pub duration_secs: u64,
}

impl Default for Notify {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_secs: 3,
        }
    }
}

/// Raw on-disk shape; `groups` is validated into [`Groups`] after parsing.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSettings {
    bindings: PathBuf,
    token_file: PathBuf,
    client_id: Option<String>,
    local_control: LocalControlSetting,
    groups: BTreeMap<String, Vec<String>>,
    player_errors: BTreeMap<String, String>,
    web: Web,
    notify: Notify,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            bindings: PathBuf::from("bindings.txt"),
            token_file: PathBuf::from("tokens.json"),
            client_id: None,
            local_control: LocalControlSetting::default(),
            groups: BTreeMap::new(),
            player_errors: BTreeMap::new(),
            web: Web::default(),
            notify: Notify::default(),
        }
    }
}

/// Fully loaded settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory relative paths resolve against.
    base_dir: PathBuf,
    bindings: PathBuf,
    token_file: PathBuf,
    /// OAuth client id passed along on token refresh.
    pub client_id: Option<String>,
    /// Local control selection.
    pub local_control: LocalControlSetting,
    /// Dispatch group membership.
    pub groups: Groups,
    /// Player error reason -> user-facing message.
    pub player_errors: BTreeMap<String, String>,
    /// Remote API options.
    pub web: Web,
    /// Notification options.
    pub notify: Notify,
}

impl Default for Settings {
    fn default() -> Self {
        let raw = RawSettings::default();
        Self {
            base_dir: PathBuf::new(),
            bindings: raw.bindings,
            token_file: raw.token_file,
            client_id: raw.client_id,
            local_control: raw.local_control,
            groups: Groups::default(),
            player_errors: raw.player_errors,
            web: raw.web,
            notify: raw.notify,
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings, base_dir: PathBuf, path: Option<&Path>) -> Result<Self, Error> {
        Ok(Self {
            base_dir,
            bindings: raw.bindings,
            token_file: raw.token_file,
            client_id: raw.client_id,
            local_control: raw.local_control,
            groups: Groups::from_map(raw.groups, path)?,
            player_errors: raw.player_errors,
            web: raw.web,
            notify: raw.notify,
        })
    }

    /// Parse settings from TOML text. Relative paths resolve against `path`'s directory.
    pub fn parse(source: &str, path: Option<&Path>) -> Result<Self, Error> {
        let raw: RawSettings = toml::from_str(source).map_err(|e| {
            let (line, col) = e
                .span()
                .map(|span| line_col(source, span.start))
                .unwrap_or((1, 1));
            Error::parse_at(source, path, line, col, e.message().to_string())
        })?;
        let base_dir = path
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_raw(raw, base_dir, path)
    }

    /// Path of the bindings file.
    pub fn bindings_path(&self) -> PathBuf {
        self.base_dir.join(&self.bindings)
    }

    /// Path of the stored OAuth tokens.
    pub fn token_path(&self) -> PathBuf {
        self.base_dir.join(&self.token_file)
    }
}

/// Read and parse a settings file.
pub fn load_settings(path: &Path) -> Result<Settings, Error> {
    let source = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    Settings::parse(&source, Some(path))
}

/// 1-based line and column of a byte offset.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let col = before
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0)
        + 1;
    (line, col)
}
