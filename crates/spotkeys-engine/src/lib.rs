//! Spotkeys Engine
//!
//! The engine turns key events into action executions:
//! - tracks held keys and fires chords once per press (edge-triggered)
//! - classifies actions into execution groups
//! - runs each group on its own serial queue, independent actions in parallel
//! - maps action failures to user notifications
//!
//! It has no idea where key events come from or what actions do. Both sides
//! are injected: keys via [`Engine::on_key_press`] / [`Engine::on_key_release`],
//! actions via an [`ActionProvider`], notifications via a [`Notifier`].
use std::sync::Arc;

mod deps;
mod dispatch;
mod error;
mod executor;
mod key_state;
mod notification;
mod policy;
pub mod test_support;

use config::{Bindings, Groups};
use keycode::Key;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

pub use deps::{Action, ActionProvider, Notifier};
pub use dispatch::Dispatcher;
pub use error::{ActionError, Error, Result};
pub use executor::{CONNECTION_ERROR, Executor, GENERIC_ERROR, Outcome};
pub use key_state::ChordTracker;
pub use notification::{NotificationDispatcher, NotifyKind};
pub use policy::{GroupKind, GroupPolicy};

/// Engine ties chord tracking to queued action execution.
///
/// Cheap to clone; clones share the same tracker and queues.
#[derive(Clone)]
pub struct Engine {
    /// Loaded binding table.
    bindings: Arc<Bindings>,
    /// Held-key set and edge latch.
    tracker: Arc<Mutex<ChordTracker>>,
    /// Routes actions to queues.
    dispatcher: Arc<Dispatcher>,
    /// Used directly by [`Engine::execute_now`].
    executor: Executor,
}

impl Engine {
    /// Build an engine and start named group workers.
    ///
    /// Fails with [`Error::UnknownAction`] if any bound action is not known to
    /// `provider`. Bound actions that no group mentions run as independent and
    /// are reported once with a warning.
    pub fn new(
        bindings: Bindings,
        groups: &Groups,
        provider: Arc<dyn ActionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        for action in bindings.bound_actions() {
            if !provider.contains(action) {
                return Err(Error::UnknownAction(action.to_string()));
            }
        }
        for action in bindings.declared() {
            if !provider.contains(action) {
                warn!(action = %action, "declared_action_unknown");
            }
        }

        let policy = GroupPolicy::from_groups(groups);
        for action in policy.unclassified(&bindings) {
            warn!(action, "action_not_in_any_group; running as independent");
        }

        let executor = Executor::new(provider, NotificationDispatcher::new(notifier));
        let dispatcher = Dispatcher::new(policy, executor.clone())?;
        info!(
            chords = bindings.len(),
            queues = dispatcher.queue_count(),
            "engine_ready"
        );
        Ok(Self {
            bindings: Arc::new(bindings),
            tracker: Arc::new(Mutex::new(ChordTracker::new())),
            dispatcher: Arc::new(dispatcher),
            executor,
        })
    }

    /// Feed a key-down event. Enqueues the actions of a newly completed chord
    /// and returns how many were enqueued.
    pub fn on_key_press(&self, key: Key) -> usize {
        let fired: Option<Vec<String>> = {
            let mut tracker = self.tracker.lock();
            tracker
                .on_key_press(key, &self.bindings)
                .map(|(chord, actions)| {
                    debug!(chord = %chord, ?actions, "chord_fired");
                    actions.to_vec()
                })
        };
        let Some(actions) = fired else {
            return 0;
        };
        for action in &actions {
            self.dispatcher.enqueue(action);
        }
        actions.len()
    }

    /// Feed a key-up event.
    pub fn on_key_release(&self, key: Key) {
        self.tracker.lock().on_key_release(key);
    }

    /// Enqueue `action` exactly as if its chord had fired.
    pub fn trigger(&self, action: &str) -> Result<()> {
        if !self.executor.provider().contains(action) {
            return Err(Error::UnknownAction(action.to_string()));
        }
        self.dispatcher.enqueue(action);
        Ok(())
    }

    /// Run `action` on the calling thread, bypassing the queues.
    pub fn execute_now(&self, action: &str) -> Outcome {
        self.executor.execute(action)
    }

    /// The loaded binding table.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Whether `key` is currently held according to the tracker.
    pub fn is_down(&self, key: Key) -> bool {
        self.tracker.lock().is_down(key)
    }

    /// Close all queues and wait for queued and in-flight actions to finish.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }
}
