use frontend_core::{BackendConfig, BackendError, BackendVariant, FrontendEndpoint, RenderBackend};

use crate::windowed::EguiBackend;

/// Construct the configured backend. Hardware failures are returned as-is;
/// there is no fallback to the window.
pub fn build_backend(
    config: &BackendConfig,
    endpoint: FrontendEndpoint,
) -> Result<Box<dyn RenderBackend>, BackendError> {
    tracing::info!(variant = %config.variant, "building front-end");
    match config.variant {
        BackendVariant::Windowed => Ok(Box::new(EguiBackend::new(config, endpoint))),
        BackendVariant::HardwareDisplay => hardware_backend(config, endpoint),
    }
}

#[cfg(target_os = "linux")]
fn hardware_backend(
    config: &BackendConfig,
    endpoint: FrontendEndpoint,
) -> Result<Box<dyn RenderBackend>, BackendError> {
    hardware::start_backend(config, endpoint)
}

#[cfg(not(target_os = "linux"))]
fn hardware_backend(
    _config: &BackendConfig,
    _endpoint: FrontendEndpoint,
) -> Result<Box<dyn RenderBackend>, BackendError> {
    Err(BackendError::Unavailable {
        variant: BackendVariant::HardwareDisplay,
        reason: "GPIO character devices are only available on Linux".into(),
    })
}
