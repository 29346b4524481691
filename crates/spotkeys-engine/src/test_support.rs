//! Test support utilities for spotkeys-engine unit and integration tests.
//! These helpers are public so the `tests/` suite and downstream crates can
//! drive the engine without a keyboard or a real player.

use std::{collections::HashMap, sync::Arc, time::Duration};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::{
    ActionError, NotifyKind,
    deps::{Action, ActionProvider, Notifier},
};

/// Action provider backed by a map of closures.
#[derive(Clone, Default)]
pub struct FnProvider {
    actions: HashMap<String, Action>,
}

impl FnProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with the given closure.
    pub fn with<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn() -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.actions.insert(name.to_string(), Arc::new(f));
        self
    }
}

impl ActionProvider for FnProvider {
    fn resolve(&self, name: &str) -> Option<Action> {
        self.actions.get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Notification sink that records everything it is given.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<(NotifyKind, String, String)>>,
}

impl RecordingNotifier {
    /// All recorded notifications, oldest first.
    pub fn all(&self) -> Vec<(NotifyKind, String, String)> {
        self.seen.lock().clone()
    }

    /// Recorded titles, oldest first.
    pub fn titles(&self) -> Vec<String> {
        self.seen.lock().iter().map(|(_, t, _)| t.clone()).collect()
    }

    /// Recorded bodies, oldest first.
    pub fn bodies(&self) -> Vec<String> {
        self.seen.lock().iter().map(|(_, _, b)| b.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotifyKind, title: &str, body: &str) {
        self.seen
            .lock()
            .push((kind, title.to_string(), body.to_string()));
    }
}

/// Receive `n` items from `rx`, failing if any takes longer than `timeout_ms`.
pub fn recv_n<T>(rx: &Receiver<T>, n: usize, timeout_ms: u64) -> Option<Vec<T>> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(rx.recv_timeout(Duration::from_millis(timeout_ms)).ok()?);
    }
    Some(out)
}
