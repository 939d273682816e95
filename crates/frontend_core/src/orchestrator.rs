//! Process orchestration: one channel, one backend, one controller.

use std::thread;

use thiserror::Error;

use crate::{
    backend::{BackendError, RenderBackend},
    config::{BackendConfig, BackendVariant, ConfigError},
    controller::Controller,
    event_channel,
    shutdown::ShutdownHandle,
    FrontendEndpoint,
};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start {variant} backend: {source}")]
    Backend {
        variant: BackendVariant,
        #[source]
        source: BackendError,
    },
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} thread panicked")]
    Panicked(&'static str),
    #[error("{variant} backend stopped with an error: {source}")]
    Run {
        variant: BackendVariant,
        #[source]
        source: BackendError,
    },
    #[error("controller failed: {0:#}")]
    Controller(anyhow::Error),
}

/// Run the backend from `build` against `controller` until both stop.
/// A `build` failure returns before the controller is started.
pub fn run<B, C, R>(
    config: &BackendConfig,
    build: B,
    controller: C,
    on_ready: R,
) -> Result<(), OrchestratorError>
where
    B: FnOnce(&BackendConfig, FrontendEndpoint) -> Result<Box<dyn RenderBackend>, BackendError>,
    C: Controller,
    R: FnOnce(ShutdownHandle),
{
    config.validate()?;

    let (frontend, controller_endpoint) = event_channel(&config.channel);
    let backend = build(config, frontend).map_err(|source| OrchestratorError::Backend {
        variant: config.variant,
        source,
    })?;
    let variant = backend.variant();
    if variant != config.variant {
        tracing::warn!(configured = %config.variant, built = %variant, "backend variant mismatch");
    }

    let shutdown = backend.shutdown_handle();
    on_ready(shutdown.clone());

    let controller_thread = thread::Builder::new()
        .name("controller".to_string())
        .spawn(move || controller.run(controller_endpoint))
        .map_err(|source| {
            shutdown.shutdown();
            OrchestratorError::Spawn {
                name: "controller",
                source,
            }
        })?;
    tracing::info!(%variant, "controller started");

    let backend_result = if backend.wants_main_thread() {
        tracing::info!(%variant, "running front-end on the main thread");
        backend
            .run()
            .map_err(|source| OrchestratorError::Run { variant, source })
    } else {
        run_on_own_thread(backend, variant)
    };

    // covers a backend that returned without being asked to stop
    shutdown.shutdown();
    drop(shutdown);

    let controller_result = match controller_thread.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(OrchestratorError::Controller(err)),
        Err(_) => Err(OrchestratorError::Panicked("controller")),
    };
    tracing::info!(%variant, "front-end and controller stopped");

    backend_result.and(controller_result)
}

fn run_on_own_thread(
    backend: Box<dyn RenderBackend>,
    variant: BackendVariant,
) -> Result<(), OrchestratorError> {
    let shutdown = backend.shutdown_handle();
    let handle = thread::Builder::new()
        .name("frontend".to_string())
        .spawn(move || backend.run())
        .map_err(|source| {
            shutdown.shutdown();
            OrchestratorError::Spawn {
                name: "frontend",
                source,
            }
        })?;
    tracing::info!(%variant, "front-end started");

    match handle.join() {
        Ok(result) => result.map_err(|source| OrchestratorError::Run { variant, source }),
        Err(_) => Err(OrchestratorError::Panicked("frontend")),
    }
}
