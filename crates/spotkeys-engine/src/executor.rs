//! Runs a single action and turns its failure into a notification or a log line.

use std::{
    any::Any,
    backtrace::{Backtrace, BacktraceStatus},
    cell::RefCell,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Once},
};

use tracing::{error, trace, warn};

use crate::{
    ActionError,
    deps::{Action, ActionProvider},
    notification::NotificationDispatcher,
};

/// Title and body shown when the network or remote service is unreachable.
pub const CONNECTION_ERROR: (&str, &str) = ("Connection Error", "Internet connection not available");
/// Title and body shown for any unclassified failure.
pub const GENERIC_ERROR: (&str, &str) = ("Error", "Something went wrong");

/// What happened to one execution. Used by tests and the `run` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The action completed.
    Ok,
    /// No such action; nothing ran.
    Unknown,
    /// Connectivity failure; the user was notified.
    ConnectionError,
    /// The action reported its own problem; nothing more was done.
    AlreadyNotified,
    /// Unclassified failure (or panic); notified and logged.
    Failed,
}

/// Resolves action names and runs them synchronously on the calling thread.
#[derive(Clone)]
pub struct Executor {
    provider: Arc<dyn ActionProvider>,
    notifier: NotificationDispatcher,
}

impl Executor {
    /// Create an executor over an action provider and notification sink.
    pub fn new(provider: Arc<dyn ActionProvider>, notifier: NotificationDispatcher) -> Self {
        Self { provider, notifier }
    }

    /// Access the action provider.
    pub fn provider(&self) -> &Arc<dyn ActionProvider> {
        &self.provider
    }

    /// Run `name` to completion. Never panics and never returns an error:
    /// every failure is handled here.
    pub fn execute(&self, name: &str) -> Outcome {
        let Some(action) = self.provider.resolve(name) else {
            warn!(action = name, "unknown_action");
            return Outcome::Unknown;
        };
        trace!(action = name, "action_start");
        let result = run_guarded(&action);
        match result {
            Ok(()) => {
                trace!(action = name, "action_done");
                Outcome::Ok
            }
            Err(ActionError::Connectivity(detail)) => {
                warn!(action = name, detail = %detail, "action_connection_error");
                let (title, body) = CONNECTION_ERROR;
                self.notifier.send_error(title, body);
                Outcome::ConnectionError
            }
            Err(ActionError::AlreadyNotified) => Outcome::AlreadyNotified,
            Err(ActionError::Failed(e)) => {
                let (title, body) = GENERIC_ERROR;
                self.notifier.send_error(title, body);
                error!(action = name, "action_failed: {e}:\n{e:?}");
                Outcome::Failed
            }
        }
    }
}

thread_local! {
    /// Location and backtrace of the last panic raised on this thread.
    static PANIC_SITE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Wrap the process panic hook so a panic records where it happened before
/// the stack unwinds. The previous hook still runs.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let mut site = match info.location() {
                Some(loc) => format!("at {loc}"),
                None => "at an unknown location".to_string(),
            };
            let trace = Backtrace::capture();
            if trace.status() == BacktraceStatus::Captured {
                site.push_str(&format!("\n{trace}"));
            }
            PANIC_SITE.with(|s| *s.borrow_mut() = Some(site));
            previous(info);
        }));
    });
}

/// Call `action`, turning a panic into a failure that carries the panic's
/// message, location and (with `RUST_BACKTRACE` set) backtrace.
fn run_guarded(action: &Action) -> Result<(), ActionError> {
    install_panic_hook();
    PANIC_SITE.with(|s| s.borrow_mut().take());
    panic::catch_unwind(AssertUnwindSafe(|| action())).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        let detail = match PANIC_SITE.with(|s| s.borrow_mut().take()) {
            Some(site) => format!("{message} {site}"),
            None => message,
        };
        Err(ActionError::failed(detail))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("action panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("action panicked: {s}")
    } else {
        "action panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FnProvider, RecordingNotifier};

    fn executor(provider: FnProvider) -> (Executor, Arc<RecordingNotifier>) {
        let notes = Arc::new(RecordingNotifier::default());
        let exec = Executor::new(
            Arc::new(provider),
            NotificationDispatcher::new(notes.clone()),
        );
        (exec, notes)
    }

    #[test]
    fn success_is_silent() {
        let (exec, notes) = executor(FnProvider::new().with("next", || Ok(())));
        assert_eq!(exec.execute("next"), Outcome::Ok);
        assert!(notes.titles().is_empty());
    }

    #[test]
    fn connectivity_notifies_connection_error() {
        let (exec, notes) = executor(
            FnProvider::new().with("next", || Err(ActionError::connectivity("timed out"))),
        );
        assert_eq!(exec.execute("next"), Outcome::ConnectionError);
        assert_eq!(notes.titles(), vec!["Connection Error".to_string()]);
    }

    #[test]
    fn already_notified_is_swallowed() {
        let (exec, notes) =
            executor(FnProvider::new().with("save", || Err(ActionError::AlreadyNotified)));
        assert_eq!(exec.execute("save"), Outcome::AlreadyNotified);
        assert!(notes.titles().is_empty());
    }

    #[test]
    fn other_failures_notify_generic_error() {
        let (exec, notes) =
            executor(FnProvider::new().with("save", || Err(ActionError::failed("boom"))));
        assert_eq!(exec.execute("save"), Outcome::Failed);
        assert_eq!(notes.titles(), vec!["Error".to_string()]);
        assert_eq!(notes.bodies(), vec!["Something went wrong".to_string()]);
    }

    #[test]
    fn panics_are_contained() {
        let (exec, notes) = executor(FnProvider::new().with("save", || panic!("bad state")));
        assert_eq!(exec.execute("save"), Outcome::Failed);
        assert_eq!(notes.titles(), vec!["Error".to_string()]);
    }

    #[test]
    fn panic_failure_names_the_panic_site() {
        let action: Action = Arc::new(|| panic!("bad state"));
        let Err(ActionError::Failed(e)) = run_guarded(&action) else {
            panic!("expected a failure");
        };
        let text = e.to_string();
        assert!(text.contains("action panicked: bad state"), "{text}");
        assert!(text.contains("executor.rs"), "{text}");
    }

    #[test]
    fn unknown_action_runs_nothing() {
        let (exec, notes) = executor(FnProvider::new());
        assert_eq!(exec.execute("nope"), Outcome::Unknown);
        assert!(notes.titles().is_empty());
    }
}
