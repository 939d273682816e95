use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use event_channel::Backlog;
use frontend_core::{
    config::{ChannelConfig, DisplayGeometry, HardwareConfig, WindowedConfig},
    BackendConfig, ConfigError,
};
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "gadget.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_filter: String,
    pub frontend: Option<String>,
    pub poll_interval_ms: u64,
    pub display: DisplaySettings,
    pub channel: ChannelSettings,
    pub windowed: WindowedSettings,
    pub hardware: HardwareSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            frontend: None,
            poll_interval_ms: BackendConfig::DEFAULT_POLL_INTERVAL.as_millis() as u64,
            display: DisplaySettings::default(),
            channel: ChannelSettings::default(),
            windowed: WindowedSettings::default(),
            hardware: HardwareSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        let geometry = DisplayGeometry::default();
        Self {
            width: geometry.width,
            height: geometry.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FrameBacklog {
    Depth(usize),
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub action_capacity: usize,
    pub frame_backlog: FrameBacklog,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            action_capacity: 256,
            frame_backlog: FrameBacklog::Named("latest".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowedSettings {
    pub title: String,
    pub scale: f32,
}

impl Default for WindowedSettings {
    fn default() -> Self {
        let windowed = WindowedConfig::default();
        Self {
            title: windowed.title,
            scale: windowed.scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HardwareSettings {
    pub gpio_chip: String,
    pub spi_bus: u8,
    pub spi_device: u8,
    pub spi_max_speed_hz: u32,
    pub reset_pin: u32,
    pub dc_pin: u32,
    pub encoder_a_pin: u32,
    pub encoder_b_pin: u32,
    pub button_pin: u32,
    pub pull: String,
    pub button_debounce_ms: u64,
}

impl Default for HardwareSettings {
    fn default() -> Self {
        let hw = HardwareConfig::default();
        Self {
            gpio_chip: hw.gpio_chip,
            spi_bus: hw.spi_bus,
            spi_device: hw.spi_device,
            spi_max_speed_hz: hw.spi_max_speed_hz,
            reset_pin: hw.reset_pin,
            dc_pin: hw.dc_pin,
            encoder_a_pin: hw.encoder_a_pin,
            encoder_b_pin: hw.encoder_b_pin,
            button_pin: hw.button_pin,
            pull: "up".into(),
            button_debounce_ms: hw.button_debounce.as_millis() as u64,
        }
    }
}

impl Settings {
    /// Turn raw settings into the immutable backend configuration.
    pub fn resolve(&self) -> Result<BackendConfig, ConfigError> {
        let variant = self
            .frontend
            .as_deref()
            .ok_or(ConfigError::MissingVariant)?
            .parse()?;

        let mut config = BackendConfig::new(variant);
        config.poll_interval = Duration::from_millis(self.poll_interval_ms);
        config.display = DisplayGeometry {
            width: self.display.width,
            height: self.display.height,
        };
        config.channel = ChannelConfig {
            action_backlog: Backlog::Bounded(self.channel.action_capacity),
            frame_backlog: frame_backlog(&self.channel.frame_backlog)?,
        };
        config.windowed = WindowedConfig {
            title: self.windowed.title.clone(),
            scale: self.windowed.scale,
        };
        let hw = &self.hardware;
        config.hardware = HardwareConfig {
            gpio_chip: hw.gpio_chip.clone(),
            spi_bus: hw.spi_bus,
            spi_device: hw.spi_device,
            spi_max_speed_hz: hw.spi_max_speed_hz,
            reset_pin: hw.reset_pin,
            dc_pin: hw.dc_pin,
            encoder_a_pin: hw.encoder_a_pin,
            encoder_b_pin: hw.encoder_b_pin,
            button_pin: hw.button_pin,
            pull: hw.pull.parse()?,
            button_debounce: Duration::from_millis(hw.button_debounce_ms),
        };
        Ok(config)
    }
}

fn frame_backlog(raw: &FrameBacklog) -> Result<Backlog, ConfigError> {
    match raw {
        FrameBacklog::Depth(0) => Err(ConfigError::Invalid(
            "frame_backlog depth must be non-zero".into(),
        )),
        FrameBacklog::Depth(n) => Ok(Backlog::Bounded(*n)),
        FrameBacklog::Named(name) => match name.trim().to_ascii_lowercase().as_str() {
            "latest" | "latest-wins" | "latest_wins" => Ok(Backlog::LatestWins),
            "unbounded" => Ok(Backlog::Unbounded),
            other => Err(ConfigError::Invalid(format!(
                "frame_backlog {other:?}; expected \"latest\", \"unbounded\" or a depth"
            ))),
        },
    }
}

pub fn parse_settings(raw: &str) -> anyhow::Result<Settings> {
    toml::from_str(raw).context("parsing settings")
}

/// Settings file locations tried when none is given on the command line.
pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SETTINGS_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("gadget").join(SETTINGS_FILE));
    }
    paths
}

/// Read the settings file (explicit path, then the default locations), then
/// apply `GADGET__*` environment overrides. Returns the file used, if any.
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<(Settings, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                bail!("settings file '{}' does not exist", path.display());
            }
            Some(path.to_path_buf())
        }
        None => default_paths().into_iter().find(|p| p.is_file()),
    };

    let mut settings = match &path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading settings file '{}'", path.display()))?;
            parse_settings(&raw).with_context(|| format!("in '{}'", path.display()))?
        }
        None => Settings::default(),
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok((settings, path))
}

pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("GADGET__FRONTEND") {
        settings.frontend = Some(v);
    }
    if let Some(v) = lookup("GADGET__LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("GADGET__POLL_INTERVAL_MS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.poll_interval_ms = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
