use std::sync::Arc;

use crate::{ActionError, NotifyKind};

// ---- Collaborator abstractions ----

/// A bound action, ready to run on a worker thread.
pub type Action = Arc<dyn Fn() -> Result<(), ActionError> + Send + Sync>;

/// Resolves action names to callables.
///
/// Implementations own a closed table of valid names; the engine rejects
/// bindings to names that do not resolve.
pub trait ActionProvider: Send + Sync {
    /// Look up the callable for `name`.
    fn resolve(&self, name: &str) -> Option<Action>;

    /// Every valid action name, sorted.
    fn names(&self) -> Vec<String>;

    /// True if `name` is a valid action.
    fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}

/// User-facing notification sink. Fire-and-forget: must not block for long
/// and never reports failure back to the caller.
pub trait Notifier: Send + Sync {
    /// Show a notification.
    fn notify(&self, kind: NotifyKind, title: &str, body: &str);
}
