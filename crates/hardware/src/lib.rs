//! Physical devices behind the hardware display backend: the SSD1306 panel
//! driver and, on Linux, GPIO character-device edge watching.

#[cfg(target_os = "linux")]
pub mod cdev;
pub mod ssd1306;

pub use ssd1306::{Ssd1306, Ssd1306Error};

#[cfg(target_os = "linux")]
pub use cdev::{open_ssd1306, CdevGpio};

/// Acquire the panel and input lines named in `config` and start the
/// hardware backend on them.
#[cfg(target_os = "linux")]
pub fn start_backend(
    config: &frontend_core::BackendConfig,
    endpoint: frontend_core::FrontendEndpoint,
) -> Result<Box<dyn frontend_core::RenderBackend>, frontend_core::BackendError> {
    use frontend_core::{hardware::HardwareBackend, BackendError};

    let display = open_ssd1306(&config.hardware).map_err(BackendError::DisplayInit)?;
    let gpio = CdevGpio::open(&config.hardware.gpio_chip)
        .map_err(BackendError::GpioInit)?
        .with_tick(config.poll_interval);
    let backend = HardwareBackend::start(display, gpio, endpoint, config)?;
    Ok(Box::new(backend))
}
