//! Desktop notifications through the platform's command-line notifier.

use std::{process::Command, thread};

use config::Notify;
use spotkeys_engine::{Notifier, NotifyKind};
use tracing::{debug, warn};

/// Which notification command to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `notify-send` (freedesktop).
    NotifySend,
    /// `osascript display notification` (macOS).
    Osascript,
    /// Log only.
    Log,
}

impl Backend {
    /// Backend for the platform we were built for.
    pub fn probe() -> Self {
        if cfg!(target_os = "macos") {
            Self::Osascript
        } else if cfg!(any(target_os = "linux", target_os = "freebsd")) {
            Self::NotifySend
        } else {
            Self::Log
        }
    }
}

/// Shows notifications on the desktop without waiting for them.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    backend: Backend,
    duration_ms: u64,
}

impl DesktopNotifier {
    /// Build from settings. Disabled notifications fall back to logging.
    pub fn new(settings: &Notify) -> Self {
        let backend = if settings.enabled {
            Backend::probe()
        } else {
            Backend::Log
        };
        Self {
            backend,
            duration_ms: settings.duration_secs.saturating_mul(1000),
        }
    }

    /// Program and arguments for one notification.
    pub fn command(&self, kind: NotifyKind, title: &str, body: &str) -> Option<(&'static str, Vec<String>)> {
        match self.backend {
            Backend::NotifySend => {
                let urgency = match kind {
                    NotifyKind::Error => "critical",
                    _ => "normal",
                };
                Some((
                    "notify-send",
                    vec![
                        "--app-name=spotkeys".to_string(),
                        format!("--expire-time={}", self.duration_ms),
                        format!("--urgency={urgency}"),
                        title.to_string(),
                        body.to_string(),
                    ],
                ))
            }
            Backend::Osascript => Some((
                "osascript",
                vec![
                    "-e".to_string(),
                    format!(
                        "display notification \"{}\" with title \"{}\"",
                        escape_applescript(body),
                        escape_applescript(title)
                    ),
                ],
            )),
            Backend::Log => None,
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, kind: NotifyKind, title: &str, body: &str) {
        let Some((program, args)) = self.command(kind, title, body) else {
            return;
        };
        // The notifier must not block the worker; reap the child elsewhere.
        let spawned = thread::Builder::new()
            .name("notify".into())
            .spawn(move || match Command::new(program).args(&args).status() {
                Ok(status) if status.success() => debug!(program, "notification_sent"),
                Ok(status) => warn!(program, %status, "notification_command_failed"),
                Err(e) => warn!(program, "notification_command_unavailable: {}", e),
            });
        if let Err(e) = spawned {
            warn!("notification_thread_failed: {}", e);
        }
    }
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier(backend: Backend) -> DesktopNotifier {
        DesktopNotifier {
            backend,
            duration_ms: 3000,
        }
    }

    #[test]
    fn notify_send_passes_duration_and_urgency() {
        let (program, args) = notifier(Backend::NotifySend)
            .command(NotifyKind::Error, "Connection Error", "Internet connection not available")
            .unwrap();
        assert_eq!(program, "notify-send");
        assert!(args.contains(&"--expire-time=3000".to_string()));
        assert!(args.contains(&"--urgency=critical".to_string()));
        assert_eq!(args[args.len() - 2..], ["Connection Error", "Internet connection not available"]);
    }

    #[test]
    fn osascript_escapes_quotes() {
        let (_, args) = notifier(Backend::Osascript)
            .command(NotifyKind::Info, "Say \"hi\"", "a\\b")
            .unwrap();
        assert_eq!(
            args[1],
            r#"display notification "a\\b" with title "Say \"hi\"""#
        );
    }

    #[test]
    fn disabled_notifications_only_log() {
        let n = DesktopNotifier::new(&Notify {
            enabled: false,
            duration_secs: 3,
        });
        assert!(n.command(NotifyKind::Info, "t", "b").is_none());
    }
}
