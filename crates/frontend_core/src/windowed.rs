//! Toolkit-independent state of the windowed front-end. The GUI shell calls
//! `tick` on every repaint; frames are still polled at a fixed period.

use std::time::{Duration, Instant};

use event_channel::{ChannelError, Inbox, Outbox};
use shared::{Action, Frame};

use crate::{
    backend::{forward_action, BackendError},
    shutdown::ShutdownHandle,
    FrontendEndpoint,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowButton {
    B1,
    Left,
    Center,
    Right,
    B2,
}

impl WindowButton {
    pub const ROW: [WindowButton; 5] = [
        WindowButton::B1,
        WindowButton::Left,
        WindowButton::Center,
        WindowButton::Right,
        WindowButton::B2,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WindowButton::B1 => "B1",
            WindowButton::Left => "<",
            WindowButton::Center => "*",
            WindowButton::Right => ">",
            WindowButton::B2 => "B2",
        }
    }

    pub fn action(self) -> Action {
        match self {
            WindowButton::B1 => Action::AuxButtonLeft,
            WindowButton::Left => Action::Left,
            WindowButton::Center => Action::ActionPress,
            WindowButton::Right => Action::Right,
            WindowButton::B2 => Action::AuxButtonRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    NotDue,
    NewFrame,
    /// Shutdown requested or the controller is gone; the shell should close.
    Closed,
}

pub struct WindowedSession {
    actions: Outbox<Action>,
    frames: Inbox<Frame>,
    shutdown: ShutdownHandle,
    poll_interval: Duration,
    next_poll: Option<Instant>,
    current: Option<Frame>,
    generation: u64,
    close_requested: bool,
}

impl WindowedSession {
    pub fn new(endpoint: FrontendEndpoint, poll_interval: Duration) -> Self {
        let (actions, frames) = endpoint.split();
        let shutdown = ShutdownHandle::new(actions.clone());
        Self {
            actions,
            frames,
            shutdown,
            poll_interval,
            next_poll: None,
            current: None,
            generation: 0,
            close_requested: false,
        }
    }

    pub fn press(&self, button: WindowButton) -> Result<(), BackendError> {
        tracing::debug!(button = button.label(), "window button pressed");
        self.on_action(button.action())
    }

    pub fn on_action(&self, action: Action) -> Result<(), BackendError> {
        forward_action(&self.actions, &self.shutdown, action)
    }

    pub fn on_frame(&mut self, frame: Frame) {
        self.current = Some(frame);
        self.generation = self.generation.wrapping_add(1);
    }

    /// Poll the frame lane if the period has elapsed since the last poll.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.shutdown.is_requested() {
            return TickOutcome::Closed;
        }
        if let Some(due) = self.next_poll {
            if now < due {
                return TickOutcome::NotDue;
            }
        }
        self.next_poll = Some(now + self.poll_interval);

        match self.frames.drain_latest() {
            Ok(Some((frame, superseded))) => {
                if superseded > 0 {
                    tracing::trace!(superseded, "skipped stale frames");
                }
                self.on_frame(frame);
                TickOutcome::NewFrame
            }
            Ok(None) => TickOutcome::Idle,
            Err(ChannelError::Closed) => {
                tracing::info!("controller endpoint closed; closing window");
                self.shutdown.shutdown();
                TickOutcome::Closed
            }
            Err(err) => {
                tracing::warn!("frame poll failed: {err}");
                TickOutcome::Idle
            }
        }
    }

    pub fn until_next_poll(&self, now: Instant) -> Duration {
        self.next_poll
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
        self.shutdown.shutdown();
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_requested()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }
}

#[cfg(test)]
#[path = "tests/windowed_tests.rs"]
mod tests;
