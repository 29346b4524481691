//! keylisten: global keyboard listener.
//!
//! Runs `rdev::listen` on a dedicated OS thread and forwards every key press
//! and release, translated to [`keycode::Key`], to a [`KeyHandler`]. The
//! handler is called on the listener thread and should return quickly.
//!
//! `rdev::listen` cannot be interrupted. [`Listener::stop`] (or drop) sets a
//! flag so no further events are forwarded; the thread itself stays parked in
//! the OS hook until the process exits.
use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{RecvTimeoutError, bounded};
use keycode::Key;
use rdev::{EventType, Key as RKey};
use tracing::{debug, error, info, trace};

mod error;
mod map;

pub use error::{Error, Result};
pub use map::from_rdev;

/// Only one OS hook may be installed per process.
static STARTED: AtomicBool = AtomicBool::new(false);

/// How long `start` waits for the hook to fail before assuming it is live.
const STARTUP_GRACE: Duration = Duration::from_millis(250);

/// Receiver of translated key events.
pub trait KeyHandler: Send + Sync + 'static {
    /// A key went down (including OS auto-repeat).
    fn on_press(&self, key: Key);
    /// A key went up.
    fn on_release(&self, key: Key);
}

/// Folds raw events into [`Key`] events for a handler.
///
/// Several physical keys can map to one [`Key`] (both control keys, both
/// enter keys). A release is forwarded only when the last of them goes up,
/// so the handler sees the folded key as held while any side is down.
#[derive(Debug, Default)]
pub struct KeyRouter {
    down: HashSet<RKey>,
}

impl KeyRouter {
    /// Create a router with nothing held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward one raw event to `handler`. Returns true if it was delivered.
    pub fn deliver(&mut self, handler: &dyn KeyHandler, event: &EventType) -> bool {
        match *event {
            EventType::KeyPress(raw) => match from_rdev(raw) {
                Some(key) => {
                    self.down.insert(raw);
                    handler.on_press(key);
                    true
                }
                None => {
                    trace!(?raw, "unmapped_key_press");
                    false
                }
            },
            EventType::KeyRelease(raw) => {
                let Some(key) = from_rdev(raw) else {
                    return false;
                };
                self.down.remove(&raw);
                if self.down.iter().any(|&other| from_rdev(other) == Some(key)) {
                    trace!(?raw, key = %key, "release_held_by_other_side");
                    return false;
                }
                handler.on_release(key);
                true
            }
            _ => false,
        }
    }
}

/// Handle to the running listener thread.
pub struct Listener {
    stop: Arc<AtomicBool>,
    /// Never joined: `rdev::listen` does not return while the hook is live.
    _thread: JoinHandle<()>,
}

impl Listener {
    /// Install the global keyboard hook and start forwarding to `handler`.
    ///
    /// Fails if the hook cannot be installed (missing accessibility
    /// permission, no display server) or if a listener was already started.
    pub fn start<H: KeyHandler>(handler: H) -> Result<Self> {
        if STARTED.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let (fail_tx, fail_rx) = bounded::<String>(1);

        let spawned = thread::Builder::new()
            .name("keyboard-listener".into())
            .spawn(move || {
                debug!("keyboard_listener_start");
                let mut router = KeyRouter::new();
                let result = rdev::listen(move |event| {
                    if flag.load(Ordering::Relaxed) {
                        return;
                    }
                    router.deliver(&handler, &event.event_type);
                });
                if let Err(e) = result {
                    let msg = format!("{e:?}");
                    error!("keyboard_listener_failed: {}", msg);
                    let _ = fail_tx.send(msg);
                }
            });
        let thread = match spawned {
            Ok(t) => t,
            Err(e) => {
                STARTED.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        match fail_rx.recv_timeout(STARTUP_GRACE) {
            Ok(msg) => {
                STARTED.store(false, Ordering::SeqCst);
                Err(Error::Listen(msg))
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                info!("keyboard_listener_running");
                Ok(Self {
                    stop,
                    _thread: thread,
                })
            }
        }
    }

    /// Stop forwarding events.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(bool, Key)>>,
    }

    impl KeyHandler for Recorder {
        fn on_press(&self, key: Key) {
            self.events.lock().unwrap().push((true, key));
        }
        fn on_release(&self, key: Key) {
            self.events.lock().unwrap().push((false, key));
        }
    }

    #[test]
    fn delivers_press_and_release() {
        let r = Recorder::default();
        let mut router = KeyRouter::new();
        assert!(router.deliver(&r, &EventType::KeyPress(RKey::ControlLeft)));
        assert!(router.deliver(&r, &EventType::KeyPress(RKey::KeyS)));
        assert!(router.deliver(&r, &EventType::KeyRelease(RKey::KeyS)));
        assert_eq!(
            *r.events.lock().unwrap(),
            vec![
                (true, Key::Control),
                (true, Key::Char('s')),
                (false, Key::Char('s')),
            ]
        );
    }

    #[test]
    fn ignores_mouse_and_unmapped_keys() {
        let r = Recorder::default();
        let mut router = KeyRouter::new();
        assert!(!router.deliver(&r, &EventType::MouseMove { x: 1.0, y: 2.0 }));
        assert!(!router.deliver(&r, &EventType::KeyPress(RKey::Unknown(0xffff))));
        assert!(r.events.lock().unwrap().is_empty());
    }

    #[test]
    fn modifier_stays_down_while_other_side_is_held() {
        let r = Recorder::default();
        let mut router = KeyRouter::new();
        router.deliver(&r, &EventType::KeyPress(RKey::ControlLeft));
        router.deliver(&r, &EventType::KeyPress(RKey::ControlRight));
        assert!(!router.deliver(&r, &EventType::KeyRelease(RKey::ControlLeft)));
        assert_eq!(
            *r.events.lock().unwrap(),
            vec![(true, Key::Control), (true, Key::Control)]
        );

        assert!(router.deliver(&r, &EventType::KeyRelease(RKey::ControlRight)));
        assert_eq!(r.events.lock().unwrap().last(), Some(&(false, Key::Control)));
    }

    #[test]
    fn both_enter_keys_fold_into_one_hold() {
        let r = Recorder::default();
        let mut router = KeyRouter::new();
        router.deliver(&r, &EventType::KeyPress(RKey::Return));
        router.deliver(&r, &EventType::KeyPress(RKey::KpReturn));
        assert!(!router.deliver(&r, &EventType::KeyRelease(RKey::KpReturn)));
        assert!(router.deliver(&r, &EventType::KeyRelease(RKey::Return)));
        let releases = r.events.lock().unwrap().iter().filter(|(down, _)| !down).count();
        assert_eq!(releases, 1);
    }

    #[test]
    fn release_of_unseen_key_is_forwarded() {
        let r = Recorder::default();
        let mut router = KeyRouter::new();
        assert!(router.deliver(&r, &EventType::KeyRelease(RKey::ShiftRight)));
        assert_eq!(*r.events.lock().unwrap(), vec![(false, Key::Shift)]);
    }
}
