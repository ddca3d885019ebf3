//! Command handlers. Everything except `config` talks to the device.

pub mod config_cmd;
pub mod effects;
pub mod health;
pub mod run;
pub mod simulate;

use std::sync::Arc;

use blinker_config::Config;
use blinker_core::{Blinker, BlinkerConfig, InputLine, SimulatedLine};

use crate::error::CliError;

/// Build the controller and make one connection attempt.
///
/// One-shot commands report an unreachable device instead of waiting for
/// it the way `run` does.
pub(crate) async fn connect(cfg: &Config, input: Arc<dyn InputLine>) -> Result<Blinker, CliError> {
    let runtime = cfg.to_blinker_config()?;
    let url = runtime.device_url.to_string();
    let blinker = Blinker::from_config(runtime, input)?;

    if !blinker.device().connect().await {
        return Err(unreachable(&blinker, url));
    }
    Ok(blinker)
}

pub(crate) fn unreachable(blinker: &Blinker, url: String) -> CliError {
    CliError::DeviceUnreachable {
        url,
        reason: blinker
            .health()
            .last_error
            .unwrap_or_else(|| "no response".into()),
    }
}

/// The physical button when built for the Pi, otherwise a line that is
/// never pressed.
#[cfg(feature = "pi")]
pub(crate) fn button_line(config: &BlinkerConfig) -> Result<Arc<dyn InputLine>, CliError> {
    let line = blinker_core::GpioLine::open(config.gpio_pin)?;
    Ok(Arc::new(line))
}

#[cfg(not(feature = "pi"))]
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn button_line(config: &BlinkerConfig) -> Result<Arc<dyn InputLine>, CliError> {
    tracing::warn!(
        pin = config.gpio_pin,
        "built without the `pi` feature; the button is not read"
    );
    Ok(idle_line())
}

pub(crate) fn idle_line() -> Arc<dyn InputLine> {
    Arc::new(SimulatedLine::new())
}
