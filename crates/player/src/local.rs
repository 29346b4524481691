//! Local control surfaces: the desktop player driven directly, no network.
//!
//! Each backend supports a subset of [`LocalOp`]s. An unsupported op yields
//! `None` from [`LocalControl::run`] and the caller falls back to the Web API.

use std::{fmt, process::Command};

use config::LocalControlSetting;
use rdev::{EventType, Key as RKey};
use spotkeys_engine::NotificationDispatcher;
use tracing::{debug, warn};

use crate::{Error, Result};

const MPRIS_DEST: &str = "org.mpris.MediaPlayer2.spotify";
const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
const MPRIS_IFACE: &str = "org.mpris.MediaPlayer2.Player";

/// Windows media virtual-key codes.
const VK_MEDIA_PLAY_PAUSE: u32 = 179;
const VK_MEDIA_NEXT_TRACK: u32 = 176;
const VK_MEDIA_PREV_TRACK: u32 = 177;

/// An operation a local backend may be able to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalOp {
    /// Toggle between playing and paused.
    PlayPause,
    /// Skip to the next track.
    Next,
    /// Go back to the previous track.
    Previous,
    /// Pause.
    Pause,
    /// Resume.
    Play,
    /// Flip shuffle.
    ToggleShuffle,
    /// Flip repeat.
    ToggleRepeat,
}

/// How a local op is carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalCommand {
    /// Run an external program and require a zero exit status.
    Process {
        /// Executable name.
        program: &'static str,
        /// Arguments.
        args: Vec<String>,
    },
    /// Press and release a virtual key.
    VirtualKey(u32),
}

/// The selected local backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalControl {
    /// `osascript` against the Spotify app (macOS).
    AppleScript,
    /// MPRIS over the D-Bus session bus (Linux).
    Mpris,
    /// Media virtual keys (Windows).
    VirtualKey,
    /// No local control; everything goes to the Web API.
    None,
}

impl fmt::Display for LocalControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AppleScript => "applescript",
            Self::Mpris => "mpris",
            Self::VirtualKey => "virtual-key",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

impl LocalControl {
    /// Backend for the platform we were built for.
    pub fn probe() -> Self {
        if cfg!(target_os = "macos") {
            Self::AppleScript
        } else if cfg!(target_os = "linux") {
            Self::Mpris
        } else if cfg!(target_os = "windows") {
            Self::VirtualKey
        } else {
            Self::None
        }
    }

    /// Backend chosen by the settings file.
    pub fn from_setting(setting: LocalControlSetting) -> Self {
        match setting {
            LocalControlSetting::Auto => Self::probe(),
            LocalControlSetting::Applescript => Self::AppleScript,
            LocalControlSetting::Mpris => Self::Mpris,
            LocalControlSetting::VirtualKey => Self::VirtualKey,
            LocalControlSetting::None => Self::None,
        }
    }

    /// The command for `op`, or `None` if this backend cannot do it.
    pub fn command(self, op: LocalOp) -> Option<LocalCommand> {
        match self {
            Self::AppleScript => {
                let script = match op {
                    LocalOp::PlayPause => "playpause",
                    LocalOp::Next => "next track",
                    LocalOp::Previous => "previous track",
                    LocalOp::Pause => "pause",
                    LocalOp::Play => "play",
                    LocalOp::ToggleShuffle => "set shuffling to not shuffling",
                    LocalOp::ToggleRepeat => "set repeating to not repeating",
                };
                Some(LocalCommand::Process {
                    program: "osascript",
                    args: vec![
                        "-e".to_string(),
                        format!("tell application \"Spotify\" to {script}"),
                    ],
                })
            }
            Self::Mpris => {
                let method = match op {
                    LocalOp::PlayPause => "PlayPause",
                    LocalOp::Next => "Next",
                    LocalOp::Previous => "Previous",
                    LocalOp::Pause => "Pause",
                    LocalOp::Play => "Play",
                    LocalOp::ToggleShuffle | LocalOp::ToggleRepeat => return None,
                };
                Some(LocalCommand::Process {
                    program: "dbus-send",
                    args: vec![
                        "--print-reply".to_string(),
                        format!("--dest={MPRIS_DEST}"),
                        MPRIS_PATH.to_string(),
                        format!("{MPRIS_IFACE}.{method}"),
                    ],
                })
            }
            Self::VirtualKey => {
                let vk = match op {
                    LocalOp::PlayPause => VK_MEDIA_PLAY_PAUSE,
                    LocalOp::Next => VK_MEDIA_NEXT_TRACK,
                    LocalOp::Previous => VK_MEDIA_PREV_TRACK,
                    _ => return None,
                };
                Some(LocalCommand::VirtualKey(vk))
            }
            Self::None => None,
        }
    }

    /// Perform `op` locally. `None` means unsupported here.
    ///
    /// An MPRIS failure means the desktop player is not running; the user is
    /// told to open it and the result is [`Error::Notified`].
    pub fn run(self, op: LocalOp, notifier: &NotificationDispatcher) -> Option<Result<()>> {
        let cmd = self.command(op)?;
        debug!(backend = %self, ?op, "local_control");
        let result = execute(&cmd);
        Some(match result {
            Err(e) if self == Self::Mpris => {
                warn!(?op, "mpris_unavailable: {}", e);
                notifier.send_error("Spotify closed", "Open Spotify and try again.");
                Err(Error::Notified)
            }
            other => other,
        })
    }
}

fn execute(cmd: &LocalCommand) -> Result<()> {
    match cmd {
        LocalCommand::Process { program, args } => {
            let output = Command::new(program).args(args).output()?;
            if output.status.success() {
                Ok(())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(Error::Local(format!(
                    "{program} exited with {}: {}",
                    output.status,
                    stderr.trim()
                )))
            }
        }
        LocalCommand::VirtualKey(vk) => {
            let key = RKey::Unknown(*vk);
            for event in [EventType::KeyPress(key), EventType::KeyRelease(key)] {
                rdev::simulate(&event)
                    .map_err(|e| Error::Local(format!("virtual key {vk}: {e:?}")))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(cmd: Option<LocalCommand>) -> String {
        match cmd {
            Some(LocalCommand::Process { args, .. }) => args.join(" "),
            other => panic!("expected a process command, got {other:?}"),
        }
    }

    #[test]
    fn applescript_covers_every_op() {
        let c = LocalControl::AppleScript;
        assert_eq!(
            script(c.command(LocalOp::Next)),
            "-e tell application \"Spotify\" to next track"
        );
        assert!(script(c.command(LocalOp::ToggleRepeat)).ends_with("set repeating to not repeating"));
        assert!(script(c.command(LocalOp::PlayPause)).ends_with("to playpause"));
    }

    #[test]
    fn mpris_calls_player_interface() {
        let c = LocalControl::Mpris;
        assert_eq!(
            script(c.command(LocalOp::PlayPause)),
            "--print-reply --dest=org.mpris.MediaPlayer2.spotify /org/mpris/MediaPlayer2 \
             org.mpris.MediaPlayer2.Player.PlayPause"
        );
        assert_eq!(c.command(LocalOp::ToggleShuffle), None);
    }

    #[test]
    fn virtual_keys_only_cover_transport() {
        let c = LocalControl::VirtualKey;
        assert_eq!(c.command(LocalOp::PlayPause), Some(LocalCommand::VirtualKey(179)));
        assert_eq!(c.command(LocalOp::Next), Some(LocalCommand::VirtualKey(176)));
        assert_eq!(c.command(LocalOp::Previous), Some(LocalCommand::VirtualKey(177)));
        assert_eq!(c.command(LocalOp::Pause), None);
    }

    #[test]
    fn none_defers_everything() {
        let notes = NotificationDispatcher::new(std::sync::Arc::new(
            spotkeys_engine::test_support::RecordingNotifier::default(),
        ));
        assert!(LocalControl::None.run(LocalOp::Play, &notes).is_none());
    }

    #[test]
    fn settings_override_probe() {
        assert_eq!(
            LocalControl::from_setting(LocalControlSetting::None),
            LocalControl::None
        );
        assert_eq!(
            LocalControl::from_setting(LocalControlSetting::Mpris),
            LocalControl::Mpris
        );
        assert_eq!(
            LocalControl::from_setting(LocalControlSetting::Auto),
            LocalControl::probe()
        );
    }
}
