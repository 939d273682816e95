//! Linux GPIO character-device and spidev acquisition.

use std::{
    io,
    os::fd::AsRawFd,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::Context;
use crossbeam_channel::{Sender, TrySendError};
use encoder::{Edge, InputLine, LineEvent};
use frontend_core::{
    config::{HardwareConfig, Pull},
    hardware::{EdgeDetect, GpioSubsystem, LineRequest},
};
use linux_embedded_hal::{
    gpio_cdev::{Chip, EventRequestFlags, EventType, LineEventHandle, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
    CdevPin, Delay, SpidevDevice,
};

use crate::ssd1306::Ssd1306;

const CONSUMER: &str = "gadget";

/// How long a watcher may sleep in `poll(2)` before re-checking its stop flag.
pub const DEFAULT_WATCH_TICK: Duration = Duration::from_millis(100);

pub type SpiSsd1306 = Ssd1306<SpidevDevice, CdevPin, CdevPin, Delay>;

/// Edge watchers on one GPIO chip, one thread per requested line.
pub struct CdevGpio {
    chip: Chip,
    path: String,
    tick: Duration,
    stop: Arc<AtomicBool>,
    watchers: Vec<thread::JoinHandle<()>>,
}

impl CdevGpio {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let chip = Chip::new(path).with_context(|| format!("opening GPIO chip {path}"))?;
        Ok(Self {
            chip,
            path: path.to_string(),
            tick: DEFAULT_WATCH_TICK,
            stop: Arc::new(AtomicBool::new(false)),
            watchers: Vec::new(),
        })
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

impl GpioSubsystem for CdevGpio {
    fn watch(&mut self, request: LineRequest, events: Sender<LineEvent>) -> anyhow::Result<()> {
        if request.pull != Pull::None {
            // the v1 character-device ABI has no bias flags
            tracing::debug!(
                pin = request.pin,
                pull = ?request.pull,
                "bias must come from board configuration"
            );
        }

        let line = self
            .chip
            .get_line(request.pin)
            .with_context(|| format!("getting line {} on {}", request.pin, self.path))?;
        let edges = match request.edges {
            EdgeDetect::Rising => EventRequestFlags::RISING_EDGE,
            EdgeDetect::Falling => EventRequestFlags::FALLING_EDGE,
            EdgeDetect::Both => EventRequestFlags::BOTH_EDGES,
        };
        let handle = line
            .events(LineRequestFlags::INPUT, edges, CONSUMER)
            .with_context(|| format!("requesting edge events on line {}", request.pin))?;

        let stop = Arc::clone(&self.stop);
        let tick = self.tick;
        let watcher = thread::Builder::new()
            .name(format!("gpio-{}", request.pin))
            .spawn(move || watch_line(handle, request.line, events, stop, tick))
            .with_context(|| format!("spawning watcher for line {}", request.pin))?;
        self.watchers.push(watcher);

        tracing::debug!(pin = request.pin, line = ?request.line, edges = ?request.edges, "watching GPIO line");
        Ok(())
    }

    fn release(&mut self) {
        self.stop.store(true, Ordering::Release);
        for watcher in self.watchers.drain(..) {
            if watcher.join().is_err() {
                tracing::warn!("GPIO watcher thread panicked");
            }
        }
    }
}

impl Drop for CdevGpio {
    fn drop(&mut self) {
        self.release();
    }
}

fn watch_line(
    mut handle: LineEventHandle,
    line: InputLine,
    events: Sender<LineEvent>,
    stop: Arc<AtomicBool>,
    tick: Duration,
) {
    let timeout = libc::c_int::try_from(tick.as_millis()).unwrap_or(libc::c_int::MAX);
    // set when an edge was dropped; the level is re-read once the queue has room
    let mut resync = false;

    while !stop.load(Ordering::Acquire) {
        let mut fd = libc::pollfd {
            fd: handle.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        // SAFETY: `fd` is a single valid pollfd that outlives the call.
        let ready = unsafe { libc::poll(&mut fd, 1, timeout) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            tracing::warn!(?line, "poll on GPIO line failed: {err}");
            break;
        }

        if resync {
            match handle.get_value() {
                Ok(value) => match events.try_send(LineEvent::resync(line, value != 0)) {
                    Ok(()) => resync = false,
                    Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                },
                Err(err) => tracing::warn!(?line, "reading GPIO level failed: {err}"),
            }
        }
        if ready == 0 {
            continue;
        }

        let event = match handle.get_event() {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(?line, "reading GPIO event failed: {err}");
                break;
            }
        };
        let edge = match event.event_type() {
            EventType::RisingEdge => Edge::Rising,
            EventType::FallingEdge => Edge::Falling,
        };

        match events.try_send(LineEvent::now(line, edge)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(?line, ?edge, "edge queue full; dropping edge and re-reading level");
                resync = true;
            }
            Err(TrySendError::Disconnected(_)) => break,
        }
    }

    tracing::debug!(?line, "GPIO watcher stopped");
}

/// Open the SPI bus and claim the data/command and reset lines.
pub fn open_ssd1306(config: &HardwareConfig) -> anyhow::Result<SpiSsd1306> {
    let spi_path = config.spi_path();
    let mut spi = SpidevDevice::open(&spi_path).with_context(|| format!("opening {spi_path}"))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(config.spi_max_speed_hz)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options).context("configuring SPI")?;

    let mut chip = Chip::new(&config.gpio_chip)
        .with_context(|| format!("opening GPIO chip {}", config.gpio_chip))?;
    let dc = output_pin(&mut chip, config.dc_pin, "gadget-dc")?;
    let rst = output_pin(&mut chip, config.reset_pin, "gadget-rst")?;

    tracing::info!(
        spi = %spi_path,
        speed_hz = config.spi_max_speed_hz,
        dc = config.dc_pin,
        reset = config.reset_pin,
        "ssd1306 bus acquired"
    );
    Ok(Ssd1306::new(spi, dc, rst, Delay {}))
}

fn output_pin(chip: &mut Chip, pin: u32, consumer: &str) -> anyhow::Result<CdevPin> {
    let line = chip
        .get_line(pin)
        .with_context(|| format!("getting line {pin}"))?;
    let handle = line
        .request(LineRequestFlags::OUTPUT, 0, consumer)
        .with_context(|| format!("requesting line {pin} as output"))?;
    CdevPin::new(handle).with_context(|| format!("creating pin for line {pin}"))
}
