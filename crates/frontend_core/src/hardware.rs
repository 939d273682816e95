//! Headless backend driving a monochrome panel from encoder and button
//! interrupts.

use std::{thread, time::Duration};

use crossbeam_channel::Sender;
use encoder::{spawn_decoder, InputLine, LineEvent};
use event_channel::{ChannelError, Inbox, Outbox};
use shared::{Action, Frame};

use crate::{
    backend::{forward_action, BackendError, RenderBackend},
    config::{BackendConfig, BackendVariant, DisplayGeometry, HardwareConfig, Pull},
    shutdown::ShutdownHandle,
    FrontendEndpoint,
};

const EDGE_QUEUE_CAPACITY: usize = 64;

pub trait MonoDisplay: Send {
    fn begin(&mut self) -> anyhow::Result<()>;

    fn clear(&mut self) -> anyhow::Result<()>;

    fn display(&mut self, frame: &Frame) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDetect {
    Rising,
    Falling,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub pin: u32,
    pub line: InputLine,
    pub pull: Pull,
    pub edges: EdgeDetect,
}

pub trait GpioSubsystem: Send {
    fn watch(&mut self, request: LineRequest, events: Sender<LineEvent>) -> anyhow::Result<()>;

    /// Stop every watcher and drop their event senders. Safe to call twice.
    fn release(&mut self);
}

/// The quadrature lines report both edges so the decoder can track their
/// levels; it only classifies on rising edges. The button reports presses.
pub fn line_requests(config: &HardwareConfig) -> [LineRequest; 3] {
    [
        LineRequest {
            pin: config.encoder_a_pin,
            line: InputLine::EncoderA,
            pull: config.pull,
            edges: EdgeDetect::Both,
        },
        LineRequest {
            pin: config.encoder_b_pin,
            line: InputLine::EncoderB,
            pull: config.pull,
            edges: EdgeDetect::Both,
        },
        LineRequest {
            pin: config.button_pin,
            line: InputLine::Button,
            pull: config.pull,
            edges: EdgeDetect::Falling,
        },
    ]
}

pub struct HardwareBackend<D: MonoDisplay, G: GpioSubsystem> {
    display: D,
    gpio: G,
    actions: Outbox<Action>,
    frames: Inbox<Frame>,
    shutdown: ShutdownHandle,
    decoder: Option<thread::JoinHandle<()>>,
    poll_interval: Duration,
    geometry: DisplayGeometry,
}

impl<D: MonoDisplay, G: GpioSubsystem> HardwareBackend<D, G> {
    pub fn start(
        mut display: D,
        mut gpio: G,
        endpoint: FrontendEndpoint,
        config: &BackendConfig,
    ) -> Result<Self, BackendError> {
        let (actions, frames) = endpoint.split();
        let shutdown = ShutdownHandle::new(actions.clone());

        display.begin().map_err(BackendError::DisplayInit)?;
        display.clear().map_err(BackendError::DisplayInit)?;

        let (events_tx, events_rx) = crossbeam_channel::bounded(EDGE_QUEUE_CAPACITY);
        for request in line_requests(&config.hardware) {
            if let Err(err) = gpio.watch(request, events_tx.clone()) {
                gpio.release();
                return Err(BackendError::GpioInit(err.context(format!(
                    "watching GPIO line {} for {:?}",
                    request.pin, request.line
                ))));
            }
        }
        drop(events_tx);

        let on_peer_closed = {
            let shutdown = shutdown.clone();
            move || {
                shutdown.shutdown();
            }
        };
        let decoder = match spawn_decoder(
            events_rx,
            actions.clone(),
            config.hardware.decoder_config(),
            on_peer_closed,
        ) {
            Ok(handle) => handle,
            Err(source) => {
                gpio.release();
                return Err(BackendError::Spawn {
                    name: "encoder-decoder",
                    source,
                });
            }
        };

        tracing::info!(
            width = config.display.width,
            height = config.display.height,
            encoder_a = config.hardware.encoder_a_pin,
            encoder_b = config.hardware.encoder_b_pin,
            button = config.hardware.button_pin,
            "hardware display backend ready"
        );

        Ok(Self {
            display,
            gpio,
            actions,
            frames,
            shutdown,
            decoder: Some(decoder),
            poll_interval: config.poll_interval,
            geometry: config.display,
        })
    }
}

impl<D: MonoDisplay, G: GpioSubsystem> RenderBackend for HardwareBackend<D, G> {
    fn variant(&self) -> BackendVariant {
        BackendVariant::HardwareDisplay
    }

    fn on_action(&self, action: Action) -> Result<(), BackendError> {
        forward_action(&self.actions, &self.shutdown, action)
    }

    fn on_frame(&mut self, frame: Frame) -> Result<(), BackendError> {
        if !frame.has_size(self.geometry.width, self.geometry.height) {
            tracing::warn!(
                width = frame.width(),
                height = frame.height(),
                "frame size differs from panel geometry"
            );
        }
        self.display.display(&frame).map_err(BackendError::Display)
    }

    fn run(mut self: Box<Self>) -> Result<(), BackendError> {
        tracing::debug!(interval = ?self.poll_interval, "hardware render loop started");

        while !self.shutdown.is_requested() {
            match self.frames.drain_latest() {
                Ok(Some((frame, superseded))) => {
                    if superseded > 0 {
                        tracing::trace!(superseded, "skipped stale frames");
                    }
                    if let Err(err) = self.on_frame(frame) {
                        tracing::warn!("{err}");
                    }
                }
                Ok(None) => {}
                Err(ChannelError::Closed) => {
                    tracing::info!("controller endpoint closed; stopping render loop");
                    self.shutdown.shutdown();
                    break;
                }
                Err(err) => tracing::warn!("frame poll failed: {err}"),
            }
            thread::sleep(self.poll_interval);
        }

        tracing::info!("hardware render loop stopped");
        Ok(())
    }

    fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }
}

impl<D: MonoDisplay, G: GpioSubsystem> Drop for HardwareBackend<D, G> {
    fn drop(&mut self) {
        self.gpio.release();
        if let Some(decoder) = self.decoder.take() {
            if decoder.join().is_err() {
                tracing::warn!("encoder decoder thread panicked");
            }
        }
        if let Err(err) = self.display.clear() {
            tracing::warn!("failed to blank display on release: {err:#}");
        }
    }
}

#[cfg(test)]
#[path = "tests/hardware_tests.rs"]
mod tests;
