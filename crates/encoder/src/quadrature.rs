//! Quadrature decoding with bounce suppression.

use shared::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuadratureLine {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderState {
    pub last_a: bool,
    pub last_b: bool,
}

impl Default for EncoderState {
    /// Pulled-up lines at rest on a detent read high.
    fn default() -> Self {
        Self {
            last_a: true,
            last_b: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct QuadratureDecoder {
    state: EncoderState,
}

impl QuadratureDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: EncoderState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    /// Classify one edge given the current levels of both lines.
    ///
    /// A reading identical to the stored one is bounce and is dropped without
    /// touching state. Any other reading becomes the new stable reading; only
    /// the detent `(high, high)` emits, with direction taken from the line
    /// that triggered: `B` turns right, `A` turns left.
    pub fn on_edge(&mut self, trigger: QuadratureLine, a: bool, b: bool) -> Option<Action> {
        if self.state.last_a == a && self.state.last_b == b {
            return None;
        }

        self.state = EncoderState {
            last_a: a,
            last_b: b,
        };

        if !(a && b) {
            return None;
        }

        Some(match trigger {
            QuadratureLine::B => Action::Right,
            QuadratureLine::A => Action::Left,
        })
    }
}

#[cfg(test)]
#[path = "tests/quadrature_tests.rs"]
mod tests;
