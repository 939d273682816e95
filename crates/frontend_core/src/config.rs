//! Resolved backend configuration. Loading it from disk is the binary's job.

use std::{fmt, str::FromStr, time::Duration};

use encoder::DecoderConfig;
use event_channel::Backlog;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no frontend configured; set `frontend` to \"windowed\" or \"hardware-display\"")]
    MissingVariant,
    #[error("unknown frontend {0:?}; expected \"windowed\" or \"hardware-display\"")]
    UnknownVariant(String),
    #[error("unknown pull resistor {0:?}; expected \"up\", \"down\" or \"none\"")]
    UnknownPull(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendVariant {
    Windowed,
    HardwareDisplay,
}

impl BackendVariant {
    pub fn key(self) -> &'static str {
        match self {
            BackendVariant::Windowed => "windowed",
            BackendVariant::HardwareDisplay => "hardware-display",
        }
    }
}

impl fmt::Display for BackendVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BackendVariant {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" => Err(ConfigError::MissingVariant),
            "windowed" | "tkinter" => Ok(BackendVariant::Windowed),
            "hardware-display" | "hardware_display" | "ssd1306" => {
                Ok(BackendVariant::HardwareDisplay)
            }
            _ => Err(ConfigError::UnknownVariant(raw.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pull {
    #[default]
    Up,
    Down,
    None,
}

impl FromStr for Pull {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "up" | "pull-up" | "pullup" => Ok(Pull::Up),
            "down" | "pull-down" | "pulldown" => Ok(Pull::Down),
            "none" | "off" | "" => Ok(Pull::None),
            _ => Err(ConfigError::UnknownPull(raw.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
}

impl DisplayGeometry {
    /// The only resolution the SSD1306 panel accepts.
    pub const PANEL: DisplayGeometry = DisplayGeometry {
        width: 128,
        height: 64,
    };
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self::PANEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub action_backlog: Backlog,
    pub frame_backlog: Backlog,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            action_backlog: Backlog::Bounded(256),
            frame_backlog: Backlog::LatestWins,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowedConfig {
    pub title: String,
    /// On-screen pixels per frame pixel.
    pub scale: f32,
}

impl Default for WindowedConfig {
    fn default() -> Self {
        Self {
            title: "Weightloss Tracker".into(),
            scale: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareConfig {
    pub gpio_chip: String,
    pub spi_bus: u8,
    pub spi_device: u8,
    pub spi_max_speed_hz: u32,
    pub reset_pin: u32,
    pub dc_pin: u32,
    pub encoder_a_pin: u32,
    pub encoder_b_pin: u32,
    pub button_pin: u32,
    pub pull: Pull,
    pub button_debounce: Duration,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            gpio_chip: "/dev/gpiochip0".into(),
            spi_bus: 0,
            spi_device: 0,
            spi_max_speed_hz: 8_000_000,
            reset_pin: 24,
            dc_pin: 23,
            encoder_a_pin: 2,
            encoder_b_pin: 4,
            button_pin: 3,
            pull: Pull::Up,
            button_debounce: Duration::from_millis(30),
        }
    }
}

impl HardwareConfig {
    pub fn spi_path(&self) -> String {
        format!("/dev/spidev{}.{}", self.spi_bus, self.spi_device)
    }

    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            button_debounce: self.button_debounce,
            ..DecoderConfig::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let pins = [
            ("reset_pin", self.reset_pin),
            ("dc_pin", self.dc_pin),
            ("encoder_a_pin", self.encoder_a_pin),
            ("encoder_b_pin", self.encoder_b_pin),
            ("button_pin", self.button_pin),
        ];
        for (i, (name, pin)) in pins.iter().enumerate() {
            if let Some((other, _)) = pins[i + 1..].iter().find(|(_, p)| p == pin) {
                return Err(ConfigError::Invalid(format!(
                    "{name} and {other} both use GPIO line {pin}"
                )));
            }
        }
        if self.spi_max_speed_hz == 0 {
            return Err(ConfigError::Invalid("spi_max_speed_hz must be non-zero".into()));
        }
        Ok(())
    }
}

/// Backend selection plus its physical parameters, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub variant: BackendVariant,
    pub poll_interval: Duration,
    pub display: DisplayGeometry,
    pub channel: ChannelConfig,
    pub windowed: WindowedConfig,
    pub hardware: HardwareConfig,
}

impl BackendConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(variant: BackendVariant) -> Self {
        Self {
            variant,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            display: DisplayGeometry::default(),
            channel: ChannelConfig::default(),
            windowed: WindowedConfig::default(),
            hardware: HardwareConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("poll interval must be non-zero".into()));
        }
        if self.display.width == 0 || self.display.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "display geometry {}x{} is empty",
                self.display.width, self.display.height
            )));
        }
        if let Backlog::Bounded(0) = self.channel.action_backlog {
            return Err(ConfigError::Invalid("action capacity must be non-zero".into()));
        }
        match self.variant {
            BackendVariant::HardwareDisplay => {
                if self.display != DisplayGeometry::PANEL {
                    return Err(ConfigError::Invalid(format!(
                        "display geometry {}x{} does not match the {}x{} panel",
                        self.display.width,
                        self.display.height,
                        DisplayGeometry::PANEL.width,
                        DisplayGeometry::PANEL.height
                    )));
                }
                self.hardware.validate()
            }
            BackendVariant::Windowed => {
                if !(self.windowed.scale.is_finite() && self.windowed.scale > 0.0) {
                    return Err(ConfigError::Invalid(format!(
                        "window scale {} must be positive",
                        self.windowed.scale
                    )));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
