use event_channel::{ChannelError, Outbox};
use shared::{Action, Frame};
use thiserror::Error;

use crate::{config::BackendVariant, shutdown::ShutdownHandle};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("controller endpoint closed")]
    PeerClosed,
    #[error("action lane full; dropped {0}")]
    ActionDropped(Action),
    #[error("display initialisation failed: {0:#}")]
    DisplayInit(anyhow::Error),
    #[error("GPIO setup failed: {0:#}")]
    GpioInit(anyhow::Error),
    #[error("display update failed: {0:#}")]
    Display(anyhow::Error),
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{variant} backend unavailable: {reason}")]
    Unavailable {
        variant: BackendVariant,
        reason: String,
    },
    #[error("window toolkit error: {0}")]
    Toolkit(String),
}

pub trait RenderBackend: Send {
    fn variant(&self) -> BackendVariant;

    fn on_action(&self, action: Action) -> Result<(), BackendError>;

    fn on_frame(&mut self, frame: Frame) -> Result<(), BackendError>;

    /// Enter the backend's loop; returns once shutdown has been requested or
    /// the controller went away.
    fn run(self: Box<Self>) -> Result<(), BackendError>;

    fn shutdown_handle(&self) -> ShutdownHandle;

    /// Idempotent: `ExitProgram` reaches the controller at most once.
    fn shutdown(&self) {
        self.shutdown_handle().shutdown();
    }

    /// Some toolkits insist on owning the process main thread.
    fn wants_main_thread(&self) -> bool {
        false
    }
}

/// Forward `action` on the action lane, routing `ExitProgram` through the
/// shutdown handle so it is only ever sent once.
pub fn forward_action(
    actions: &Outbox<Action>,
    shutdown: &ShutdownHandle,
    action: Action,
) -> Result<(), BackendError> {
    if action.is_exit() {
        shutdown.shutdown();
        return Ok(());
    }

    match actions.send(action) {
        Ok(()) => {
            tracing::debug!(%action, "action queued for controller");
            Ok(())
        }
        Err(ChannelError::Full) => {
            tracing::warn!(%action, "action lane full; dropping action");
            Err(BackendError::ActionDropped(action))
        }
        Err(_) => {
            tracing::info!(%action, "controller endpoint closed; shutting down front-end");
            shutdown.shutdown();
            Err(BackendError::PeerClosed)
        }
    }
}
