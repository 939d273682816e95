use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

use frontend_core::{config::Pull, BackendVariant};

use super::*;

#[test]
fn defaults_need_a_frontend() {
    let settings = Settings::default();
    assert_eq!(settings.log_filter, "info");
    assert_eq!(settings.resolve(), Err(ConfigError::MissingVariant));
}

#[test]
fn full_file_resolves_every_key() {
    let settings = parse_settings(
        r#"
log_filter = "debug,encoder=trace"
frontend = "hardware-display"
poll_interval_ms = 50

[display]
width = 128
height = 32

[channel]
action_capacity = 16
frame_backlog = 4

[windowed]
title = "Bench"
scale = 2.5

[hardware]
gpio_chip = "/dev/gpiochip1"
spi_bus = 1
spi_device = 2
spi_max_speed_hz = 1000000
reset_pin = 17
dc_pin = 27
encoder_a_pin = 5
encoder_b_pin = 6
button_pin = 13
pull = "none"
button_debounce_ms = 10
"#,
    )
    .unwrap();

    let config = settings.resolve().unwrap();
    assert_eq!(config.variant, BackendVariant::HardwareDisplay);
    assert_eq!(config.poll_interval, Duration::from_millis(50));
    assert_eq!(config.display.height, 32);
    assert_eq!(config.channel.action_backlog, Backlog::Bounded(16));
    assert_eq!(config.channel.frame_backlog, Backlog::Bounded(4));
    assert_eq!(config.windowed.title, "Bench");
    assert_eq!(config.hardware.spi_path(), "/dev/spidev1.2");
    assert_eq!(config.hardware.gpio_chip, "/dev/gpiochip1");
    assert_eq!(
        (
            config.hardware.reset_pin,
            config.hardware.dc_pin,
            config.hardware.encoder_a_pin,
            config.hardware.encoder_b_pin,
            config.hardware.button_pin,
        ),
        (17, 27, 5, 6, 13)
    );
    assert_eq!(config.hardware.pull, Pull::None);
    assert_eq!(config.hardware.button_debounce, Duration::from_millis(10));
    // resolves, but a 128x32 screen cannot drive the 128x64 panel
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn partial_file_keeps_defaults() {
    let settings = parse_settings("frontend = \"TkInter\"\n[hardware]\nbutton_pin = 22\n").unwrap();
    let config = settings.resolve().unwrap();

    assert_eq!(config.variant, BackendVariant::Windowed);
    assert_eq!(config.poll_interval, BackendConfig::DEFAULT_POLL_INTERVAL);
    assert_eq!(config.channel.frame_backlog, Backlog::LatestWins);
    assert_eq!(config.windowed.title, "Weightloss Tracker");
    assert_eq!(config.hardware.button_pin, 22);
    assert_eq!(config.hardware.encoder_a_pin, 2);
}

#[test]
fn unknown_frontend_is_fatal() {
    let settings = parse_settings("frontend = \"framebuffer\"").unwrap();
    assert_eq!(
        settings.resolve(),
        Err(ConfigError::UnknownVariant("framebuffer".into()))
    );
}

#[test]
fn named_frame_backlogs() {
    let mut settings = parse_settings("frontend = \"windowed\"").unwrap();

    settings.channel.frame_backlog = FrameBacklog::Named("unbounded".into());
    assert_eq!(settings.resolve().unwrap().channel.frame_backlog, Backlog::Unbounded);

    settings.channel.frame_backlog = FrameBacklog::Named("forever".into());
    assert!(matches!(settings.resolve(), Err(ConfigError::Invalid(_))));

    settings.channel.frame_backlog = FrameBacklog::Depth(0);
    assert!(matches!(settings.resolve(), Err(ConfigError::Invalid(_))));
}

#[test]
fn bad_pull_is_rejected() {
    let settings = parse_settings("frontend = \"ssd1306\"\n[hardware]\npull = \"float\"\n").unwrap();
    assert_eq!(
        settings.resolve(),
        Err(ConfigError::UnknownPull("float".into()))
    );
}

#[test]
fn malformed_toml_is_an_error() {
    assert!(parse_settings("frontend = ").is_err());
    assert!(parse_settings("poll_interval_ms = \"soon\"").is_err());
}

#[test]
fn env_overrides_win_over_file_values() {
    let mut settings = parse_settings("frontend = \"windowed\"\npoll_interval_ms = 100").unwrap();
    let env: HashMap<&str, &str> = HashMap::from([
        ("GADGET__FRONTEND", "hardware-display"),
        ("GADGET__POLL_INTERVAL_MS", "25"),
        ("GADGET__LOG_FILTER", "trace"),
    ]);

    apply_env_overrides(&mut settings, |key| env.get(key).map(|v| v.to_string()));

    assert_eq!(settings.frontend.as_deref(), Some("hardware-display"));
    assert_eq!(settings.poll_interval_ms, 25);
    assert_eq!(settings.log_filter, "trace");
}

#[test]
fn unparsable_env_interval_is_ignored() {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings, |key| {
        (key == "GADGET__POLL_INTERVAL_MS").then(|| "fast".to_string())
    });
    assert_eq!(settings.poll_interval_ms, 100);
}

#[test]
fn explicit_settings_path_must_exist() {
    let err = load_settings(Some(Path::new("/nonexistent/gadget.toml"))).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn explicit_settings_path_is_read() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("gadget_settings_test_{suffix}.toml"));
    fs::write(&path, "frontend = \"windowed\"\n[windowed]\nscale = 3.0\n").expect("write settings");

    let (settings, used) = load_settings(Some(&path)).expect("load settings");
    assert_eq!(used.as_deref(), Some(path.as_path()));
    assert_eq!(settings.windowed.scale, 3.0);

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn default_paths_start_with_working_directory() {
    assert_eq!(default_paths()[0], PathBuf::from("gadget.toml"));
}
