use std::time::{Duration, Instant};

use shared::Action;

/// Turns falling edges on the push-button line into presses, ignoring edges
/// that follow an accepted press by less than `min_interval`.
#[derive(Debug)]
pub struct ButtonDebouncer {
    min_interval: Duration,
    last_press: Option<Instant>,
}

impl ButtonDebouncer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_press: None,
        }
    }

    pub fn on_falling_edge(&mut self, at: Instant) -> Option<Action> {
        if let Some(last) = self.last_press {
            if at.saturating_duration_since(last) < self.min_interval {
                return None;
            }
        }
        self.last_press = Some(at);
        Some(Action::ActionPress)
    }
}
