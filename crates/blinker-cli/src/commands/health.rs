//! `blinker health`: one connection attempt, reported as JSON.

use serde::Serialize;

use blinker_config::Config;
use blinker_core::{Blinker, HealthSnapshot};

use crate::commands::{idle_line, unreachable};
use crate::error::CliError;

#[derive(Serialize)]
struct HealthReport {
    device: String,
    connected: bool,
    name: String,
    firmware_version: String,
    led_count: u32,
    #[serde(flatten)]
    health: HealthSnapshot,
}

/// Prints the report even when the device is down, then fails so scripts
/// can check the exit code.
pub async fn handle(cfg: &Config) -> Result<(), CliError> {
    let runtime = cfg.to_blinker_config()?;
    let device = runtime.device_url.to_string();
    let blinker = Blinker::from_config(runtime, idle_line())?;

    let session = blinker.device();
    let connected = session.connect().await;
    let report = HealthReport {
        device: device.clone(),
        connected,
        name: session.name().await,
        firmware_version: session.firmware_version().await,
        led_count: session.led_count().await,
        health: blinker.health(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if connected {
        Ok(())
    } else {
        Err(unreachable(&blinker, device))
    }
}
