//! Stand-in controller: shows the last action it received.

use std::{thread, time::Duration};

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use event_channel::ChannelError;
use frontend_core::{config::DisplayGeometry, Controller, ControllerEndpoint};
use shared::{Action, Frame, PixelFormat};

pub struct EchoController {
    geometry: DisplayGeometry,
    idle_sleep: Duration,
}

impl EchoController {
    pub fn new(geometry: DisplayGeometry, idle_sleep: Duration) -> Self {
        Self {
            geometry,
            idle_sleep,
        }
    }

    pub fn render(&self, last: Option<Action>, count: u64) -> Frame {
        let mut frame = Frame::blank(self.geometry.width, self.geometry.height, PixelFormat::Mono1);
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

        let border = Rectangle::new(Point::zero(), frame.size())
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1));
        let last = last.map_or("waiting for input", Action::as_str);
        let lines = [
            "last action:".to_string(),
            last.to_string(),
            format!("events: {count}"),
        ];

        // Frame is an infallible draw target
        let _ = border.draw(&mut frame);
        for (row, line) in lines.iter().enumerate() {
            let origin = Point::new(4, 4 + row as i32 * 12);
            let _ = Text::with_baseline(line, origin, style, Baseline::Top).draw(&mut frame);
        }
        frame
    }
}

impl Controller for EchoController {
    fn run(self, mut endpoint: ControllerEndpoint) -> anyhow::Result<()> {
        let mut count = 0u64;
        if let Err(ChannelError::Closed) = endpoint.send(self.render(None, count)) {
            return Ok(());
        }

        loop {
            match endpoint.poll() {
                Ok(true) => {}
                Ok(false) => {
                    thread::sleep(self.idle_sleep);
                    continue;
                }
                Err(ChannelError::Closed) => {
                    tracing::info!("front-end closed; echo controller stopping");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            }

            let action = endpoint.receive()?;
            if action.is_exit() {
                tracing::info!("exit_program received; echo controller stopping");
                return Ok(());
            }

            count += 1;
            tracing::debug!(%action, count, "echoing action");
            match endpoint.send(self.render(Some(action), count)) {
                Ok(()) | Err(ChannelError::Full) => {}
                Err(ChannelError::Closed) => return Ok(()),
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use event_channel::Backlog;
    use frontend_core::{config::ChannelConfig, event_channel};

    use super::*;

    fn controller() -> EchoController {
        EchoController::new(DisplayGeometry::default(), Duration::from_millis(1))
    }

    fn lit_count(frame: &Frame) -> usize {
        (0..frame.height())
            .flat_map(|y| (0..frame.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.is_lit(x, y))
            .count()
    }

    #[test]
    fn render_draws_a_mono_frame_of_panel_size() {
        let frame = controller().render(Some(Action::Left), 1);
        assert!(frame.has_size(128, 64));
        assert_eq!(frame.format(), PixelFormat::Mono1);
        assert!(frame.is_lit(0, 0));
        assert!(lit_count(&frame) > 2 * (128 + 64));
    }

    #[test]
    fn different_actions_render_differently() {
        let c = controller();
        assert_ne!(
            c.render(Some(Action::Left), 1).pixels(),
            c.render(Some(Action::Right), 1).pixels()
        );
    }

    #[test]
    fn echoes_each_action_and_stops_on_exit() {
        let (mut frontend, controller_end) = event_channel(&ChannelConfig {
            frame_backlog: Backlog::Unbounded,
            ..ChannelConfig::default()
        });
        frontend.send(Action::ActionPress).unwrap();
        frontend.send(Action::AuxButtonRight).unwrap();
        frontend.send(Action::ExitProgram).unwrap();

        controller().run(controller_end).expect("controller stops cleanly");

        let mut frames = 0;
        while let Ok(frame) = frontend.receive() {
            assert!(frame.has_size(128, 64));
            frames += 1;
        }
        // greeting plus one per non-exit action
        assert_eq!(frames, 3);
    }

    #[test]
    fn stops_when_front_end_goes_away() {
        let (frontend, controller_end) = event_channel(&ChannelConfig::default());
        drop(frontend);
        controller().run(controller_end).expect("controller stops cleanly");
    }
}
