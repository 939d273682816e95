use crate::ControllerEndpoint;

/// Screen logic on the far side of the channel: consumes actions, produces
/// frames at its own cadence, and returns once it sees `ExitProgram` or the
/// front-end closes.
pub trait Controller: Send + 'static {
    fn run(self, endpoint: ControllerEndpoint) -> anyhow::Result<()>;
}

impl<F> Controller for F
where
    F: FnOnce(ControllerEndpoint) -> anyhow::Result<()> + Send + 'static,
{
    fn run(self, endpoint: ControllerEndpoint) -> anyhow::Result<()> {
        self(endpoint)
    }
}
