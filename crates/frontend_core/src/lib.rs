//! Front-end core: render backends, the frame/action channel wiring, and the
//! process orchestrator that ties a backend to a controller.

pub mod backend;
pub mod config;
pub mod controller;
pub mod hardware;
pub mod orchestrator;
pub mod shutdown;
pub mod windowed;

use event_channel::{pair, Endpoint};
use shared::{Action, Frame};

pub use backend::{BackendError, RenderBackend};
pub use config::{BackendConfig, BackendVariant, ConfigError};
pub use controller::Controller;
pub use shutdown::ShutdownHandle;

/// Front-end side: sends actions, receives frames.
pub type FrontendEndpoint = Endpoint<Action, Frame>;
/// Controller side: sends frames, receives actions.
pub type ControllerEndpoint = Endpoint<Frame, Action>;

pub fn event_channel(config: &config::ChannelConfig) -> (FrontendEndpoint, ControllerEndpoint) {
    pair::<Action, Frame>(config.action_backlog, config.frame_backlog)
}
