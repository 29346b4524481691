//! Dispatch queues: one serial worker per self-serial action and per named
//! group, plus one-shot workers for independent actions.
//!
//! Each persistent queue is an unbounded crossbeam channel consumed by exactly
//! one thread, so at most one action from a queue is ever in flight and items
//! run in enqueue order. Different queues run in parallel.

use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Sender, unbounded};
use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::{
    Result,
    executor::Executor,
    policy::{GroupKind, GroupPolicy},
};

/// Identity of a persistent queue. Action and group names live in separate
/// namespaces, so a group called `next` never shares a queue with the
/// self-serial action `next`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum QueueKey {
    Action(String),
    Group(String),
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(a) => write!(f, "action:{a}"),
            Self::Group(g) => write!(f, "group:{g}"),
        }
    }
}

struct Queue {
    tx: Sender<String>,
    worker: JoinHandle<()>,
}

/// Routes action names to the right worker.
pub struct Dispatcher {
    policy: GroupPolicy,
    executor: Executor,
    queues: Mutex<HashMap<QueueKey, Queue>>,
    oneshots: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Create a dispatcher and start one worker per named group.
    ///
    /// Self-serial queues start lazily on first use.
    pub fn new(policy: GroupPolicy, executor: Executor) -> Result<Self> {
        let dispatcher = Self {
            policy,
            executor,
            queues: Mutex::new(HashMap::new()),
            oneshots: Mutex::new(Vec::new()),
        };
        {
            let mut queues = dispatcher.queues.lock();
            for group in dispatcher.policy.named_groups() {
                let key = QueueKey::Group(group.to_string());
                let queue = spawn_queue(&key, dispatcher.executor.clone())?;
                queues.insert(key, queue);
            }
        }
        Ok(dispatcher)
    }

    /// Hand `action` to its worker. Returns immediately.
    pub fn enqueue(&self, action: &str) {
        match self.policy.group_of(action) {
            GroupKind::Independent => self.spawn_oneshot(action),
            GroupKind::SelfSerial => self.send(QueueKey::Action(action.to_string()), action),
            GroupKind::Named(group) => self.send(QueueKey::Group(group.to_string()), action),
        }
    }

    fn send(&self, key: QueueKey, action: &str) {
        let mut queues = self.queues.lock();
        if !queues.contains_key(&key) {
            match spawn_queue(&key, self.executor.clone()) {
                Ok(q) => {
                    queues.insert(key.clone(), q);
                }
                Err(e) => {
                    error!(queue = %key, action, "queue_start_failed: {}", e);
                    return;
                }
            }
        }
        let Some(queue) = queues.get(&key) else {
            return;
        };
        debug!(queue = %key, action, "enqueue");
        if queue.tx.send(action.to_string()).is_err() {
            // Worker is gone; drop the queue so the next enqueue restarts it.
            error!(queue = %key, action, "queue_worker_gone");
            queues.remove(&key);
        }
    }

    fn spawn_oneshot(&self, action: &str) {
        let exec = self.executor.clone();
        let name = action.to_string();
        debug!(action, "enqueue_independent");
        let spawned = thread::Builder::new()
            .name(format!("action-{action}"))
            .spawn(move || {
                exec.execute(&name);
            });
        match spawned {
            Ok(handle) => {
                let mut oneshots = self.oneshots.lock();
                oneshots.retain(|h| !h.is_finished());
                oneshots.push(handle);
            }
            Err(e) => error!(action, "oneshot_start_failed: {}", e),
        }
    }

    /// Number of persistent queues currently running.
    pub fn queue_count(&self) -> usize {
        self.queues.lock().len()
    }

    /// Close every queue and wait for all workers, including in-flight
    /// independent actions, to finish. Queued items still run first.
    pub fn shutdown(&self) {
        let queues: Vec<(QueueKey, Queue)> = self.queues.lock().drain().collect();
        for (key, queue) in queues {
            drop(queue.tx);
            if queue.worker.join().is_err() {
                error!(queue = %key, "queue_worker_panicked");
            }
        }
        let oneshots: Vec<JoinHandle<()>> = self.oneshots.lock().drain(..).collect();
        for handle in oneshots {
            let name = handle.thread().name().unwrap_or("action").to_string();
            if handle.join().is_err() {
                error!(thread = %name, "oneshot_worker_panicked");
            }
        }
        trace!("dispatcher_shutdown");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Dropping the senders ends each worker loop once its queue drains.
        self.queues.get_mut().clear();
    }
}

fn spawn_queue(key: &QueueKey, executor: Executor) -> Result<Queue> {
    let (tx, rx) = unbounded::<String>();
    let label = key.to_string();
    let worker = thread::Builder::new()
        .name(format!("queue-{label}"))
        .spawn(move || {
            trace!(queue = %label, "queue_worker_start");
            for action in rx {
                executor.execute(&action);
            }
            trace!(queue = %label, "queue_worker_exit");
        })?;
    debug!(queue = %key, "queue_started");
    Ok(Queue { tx, worker })
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, time::Duration};

    use config::Groups;
    use crossbeam_channel::unbounded;

    use super::*;
    use crate::{
        notification::NotificationDispatcher,
        test_support::{FnProvider, RecordingNotifier, recv_n},
    };

    fn groups(entries: &[(&str, &[&str])]) -> GroupPolicy {
        let raw: BTreeMap<String, Vec<String>> = entries
            .iter()
            .map(|(g, a)| (g.to_string(), a.iter().map(|s| s.to_string()).collect()))
            .collect();
        GroupPolicy::from_groups(&Groups::from_map(raw, None).expect("groups"))
    }

    fn dispatcher(policy: GroupPolicy, provider: FnProvider) -> Dispatcher {
        let exec = Executor::new(
            Arc::new(provider),
            NotificationDispatcher::new(Arc::new(RecordingNotifier::default())),
        );
        Dispatcher::new(policy, exec).expect("dispatcher")
    }

    #[test]
    fn named_groups_start_eagerly_self_serial_lazily() {
        let (tx, rx) = unbounded();
        let provider = FnProvider::new().with("save", move || {
            let _ = tx.send(());
            Ok(())
        });
        let d = dispatcher(
            groups(&[("playback", &["next"]), ("self_dependent", &["save"])]),
            provider,
        );
        assert_eq!(d.queue_count(), 1);
        d.enqueue("save");
        assert!(recv_n(&rx, 1, 1000).is_some());
        assert_eq!(d.queue_count(), 2);
        d.enqueue("save");
        assert!(recv_n(&rx, 1, 1000).is_some());
        assert_eq!(d.queue_count(), 2);
        d.shutdown();
        assert_eq!(d.queue_count(), 0);
    }

    #[test]
    fn independent_actions_use_no_persistent_queue() {
        let (tx, rx) = unbounded();
        let provider = FnProvider::new().with("show", move || {
            let _ = tx.send(());
            Ok(())
        });
        let d = dispatcher(groups(&[("independent", &["show"])]), provider);
        d.enqueue("show");
        d.enqueue("show");
        assert!(recv_n(&rx, 2, 1000).is_some());
        assert_eq!(d.queue_count(), 0);
        d.shutdown();
    }

    #[test]
    fn group_and_action_names_do_not_collide() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (l1, l2) = (log.clone(), log.clone());
        let provider = FnProvider::new()
            .with("next", move || {
                l1.lock().push("next");
                Ok(())
            })
            .with("skip", move || {
                l2.lock().push("skip");
                Ok(())
            });
        let d = dispatcher(
            groups(&[("next", &["skip"]), ("self_dependent", &["next"])]),
            provider,
        );
        d.enqueue("next");
        d.enqueue("skip");
        d.shutdown();
        let mut seen = log.lock().clone();
        seen.sort();
        assert_eq!(seen, vec!["next", "skip"]);
    }

    #[test]
    fn shutdown_drains_queued_items() {
        let count = Arc::new(Mutex::new(0usize));
        let c = count.clone();
        let provider = FnProvider::new().with("next", move || {
            *c.lock() += 1;
            Ok(())
        });
        let d = dispatcher(groups(&[("playback", &["next"])]), provider);
        for _ in 0..10 {
            d.enqueue("next");
        }
        d.shutdown();
        assert_eq!(*count.lock(), 10);
    }

    #[test]
    fn shutdown_joins_in_flight_independent_actions() {
        let done = Arc::new(Mutex::new(false));
        let flag = done.clone();
        let provider = FnProvider::new().with("show", move || {
            thread::sleep(Duration::from_millis(100));
            *flag.lock() = true;
            Ok(())
        });
        let d = dispatcher(groups(&[("independent", &["show"])]), provider);
        d.enqueue("show");
        d.shutdown();
        assert!(*done.lock());
    }
}
