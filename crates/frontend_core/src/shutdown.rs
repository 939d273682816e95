//! Cooperative shutdown shared by a backend, its helper threads and signal
//! handlers.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use event_channel::{ChannelError, Outbox};
use shared::Action;

const EXIT_RETRY: Duration = Duration::from_millis(100);

struct Inner {
    requested: AtomicBool,
    claimed: AtomicBool,
    exit_sent: AtomicBool,
    actions: Mutex<Option<Outbox<Action>>>,
}

/// Clonable shutdown trigger. The first [`shutdown`](Self::shutdown) delivers
/// `ExitProgram` to the controller and then lets go of its action sender;
/// later calls only re-assert the stop flag, whichever clone they come from.
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<Inner>,
}

impl ShutdownHandle {
    pub fn new(actions: Outbox<Action>) -> Self {
        Self {
            inner: Arc::new(Inner {
                requested: AtomicBool::new(false),
                claimed: AtomicBool::new(false),
                exit_sent: AtomicBool::new(false),
                actions: Mutex::new(Some(actions)),
            }),
        }
    }

    /// Returns `true` for the call that performed the shutdown.
    ///
    /// That call waits while the action lane is full, until the controller
    /// makes room or goes away.
    pub fn shutdown(&self) -> bool {
        self.inner.requested.store(true, Ordering::Release);
        if self.inner.claimed.swap(true, Ordering::AcqRel) {
            return false;
        }

        let actions = self
            .inner
            .actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(actions) = actions {
            deliver_exit(&actions);
        }
        self.inner.exit_sent.store(true, Ordering::Release);
        true
    }

    /// Observed by run loops at each tick boundary.
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Set once `ExitProgram` has been queued or the controller is known gone.
    pub fn exit_sent(&self) -> bool {
        self.inner.exit_sent.load(Ordering::Acquire)
    }
}

fn deliver_exit(actions: &Outbox<Action>) {
    let mut waited = false;
    loop {
        match actions.send_timeout(Action::ExitProgram, EXIT_RETRY) {
            Ok(()) => {
                tracing::info!("exit_program sent to controller");
                return;
            }
            Err(ChannelError::Timeout) if !waited => {
                tracing::warn!("action lane full; waiting for the controller to take exit_program");
                waited = true;
            }
            Err(ChannelError::Timeout) => {}
            Err(err) => {
                tracing::debug!("exit_program not delivered: {err}");
                return;
            }
        }
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle")
            .field("requested", &self.is_requested())
            .field("exit_sent", &self.exit_sent())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use event_channel::{pair, Backlog, ChannelError};
    use shared::Frame;

    use super::*;

    #[test]
    fn exit_program_is_sent_once_across_clones_and_threads() {
        let (frontend, mut controller) = pair::<Action, Frame>(Backlog::Unbounded, Backlog::LatestWins);
        let (actions, _frames) = frontend.split();
        let handle = ShutdownHandle::new(actions);

        let performed: Vec<bool> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || handle.shutdown())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|t| t.join().expect("shutdown thread"))
            .collect();

        assert_eq!(performed.iter().filter(|p| **p).count(), 1);
        assert!(handle.is_requested());
        assert!(handle.exit_sent());
        assert_eq!(controller.receive(), Ok(Action::ExitProgram));
        // the handle held the only action sender and released it
        assert_eq!(controller.receive(), Err(ChannelError::Closed));
    }

    #[test]
    fn shutdown_with_controller_gone_still_stops() {
        let (frontend, controller) = pair::<Action, Frame>(Backlog::Unbounded, Backlog::LatestWins);
        drop(controller);
        let (actions, _frames) = frontend.split();
        let handle = ShutdownHandle::new(actions);

        assert!(handle.shutdown());
        assert!(handle.is_requested());
        assert!(!handle.shutdown());
        assert!(handle.exit_sent());
    }

    #[test]
    fn exit_program_waits_for_room_on_a_full_lane() {
        let (frontend, mut controller) = pair::<Action, Frame>(Backlog::Bounded(2), Backlog::LatestWins);
        let (actions, _frames) = frontend.split();
        actions.send(Action::Left).expect("room");
        actions.send(Action::Right).expect("room");
        let handle = ShutdownHandle::new(actions.clone());

        let first = {
            let handle = handle.clone();
            thread::spawn(move || handle.shutdown())
        };
        thread::sleep(Duration::from_millis(150));
        assert!(handle.is_requested());
        assert!(!handle.shutdown());

        let received: Vec<Action> = (0..3)
            .map(|_| controller.receive_timeout(Duration::from_secs(2)).expect("action"))
            .collect();
        assert!(first.join().expect("shutdown thread"));
        assert_eq!(received, vec![Action::Left, Action::Right, Action::ExitProgram]);
        assert!(handle.exit_sent());
    }
}
