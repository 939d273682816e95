//! Values exchanged between the input/render front-end and the controller.

pub mod domain;
pub mod error;
pub mod frame;

pub use domain::Action;
pub use error::FrameError;
pub use frame::{Frame, PixelFormat};
