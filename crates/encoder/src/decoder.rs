use std::time::{Duration, Instant};

use shared::Action;

use crate::{
    button::ButtonDebouncer,
    quadrature::{QuadratureDecoder, QuadratureLine},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputLine {
    EncoderA,
    EncoderB,
    Button,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    pub fn level(self) -> bool {
        self == Edge::Rising
    }
}

/// One interrupt, as posted by a line watcher.
///
/// A `resync` event carries a level read back after the watcher had to drop
/// edges; it corrects the mirrored level and is never classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEvent {
    pub line: InputLine,
    pub edge: Edge,
    pub at: Instant,
    pub resync: bool,
}

impl LineEvent {
    pub fn now(line: InputLine, edge: Edge) -> Self {
        Self {
            line,
            edge,
            at: Instant::now(),
            resync: false,
        }
    }

    pub fn resync(line: InputLine, level: bool) -> Self {
        Self {
            line,
            edge: if level { Edge::Rising } else { Edge::Falling },
            at: Instant::now(),
            resync: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    // both lines are mirrored on every edge, classified on this one
    pub quadrature_trigger: Edge,
    pub button_trigger: Edge,
    pub button_debounce: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            quadrature_trigger: Edge::Rising,
            button_trigger: Edge::Falling,
            button_debounce: Duration::from_millis(30),
        }
    }
}

#[derive(Debug)]
pub struct EncoderDecoder {
    config: DecoderConfig,
    quadrature: QuadratureDecoder,
    button: ButtonDebouncer,
    level_a: bool,
    level_b: bool,
}

impl EncoderDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        let quadrature = QuadratureDecoder::new();
        let state = quadrature.state();
        Self {
            config,
            button: ButtonDebouncer::new(config.button_debounce),
            quadrature,
            level_a: state.last_a,
            level_b: state.last_b,
        }
    }

    pub fn on_event(&mut self, event: LineEvent) -> Option<Action> {
        if event.resync {
            match event.line {
                InputLine::EncoderA => self.level_a = event.edge.level(),
                InputLine::EncoderB => self.level_b = event.edge.level(),
                InputLine::Button => {}
            }
            tracing::debug!(line = ?event.line, level = event.edge.level(), "line level resynced");
            return None;
        }
        match event.line {
            InputLine::EncoderA => {
                self.level_a = event.edge.level();
                self.on_quadrature_edge(QuadratureLine::A, event.edge)
            }
            InputLine::EncoderB => {
                self.level_b = event.edge.level();
                self.on_quadrature_edge(QuadratureLine::B, event.edge)
            }
            InputLine::Button if event.edge == self.config.button_trigger => {
                self.button.on_falling_edge(event.at)
            }
            InputLine::Button => None,
        }
    }

    fn on_quadrature_edge(&mut self, line: QuadratureLine, edge: Edge) -> Option<Action> {
        if edge != self.config.quadrature_trigger {
            return None;
        }
        self.quadrature.on_edge(line, self.level_a, self.level_b)
    }

    pub fn levels(&self) -> (bool, bool) {
        (self.level_a, self.level_b)
    }
}

#[cfg(test)]
#[path = "tests/decoder_tests.rs"]
mod tests;
