//! Rotary encoder and push-button decoding.

pub mod button;
pub mod decoder;
pub mod quadrature;
pub mod task;

pub use button::ButtonDebouncer;
pub use decoder::{DecoderConfig, Edge, EncoderDecoder, InputLine, LineEvent};
pub use quadrature::{EncoderState, QuadratureDecoder, QuadratureLine};
pub use task::spawn_decoder;
