//! CLI-side config resolution: file path selection and flag overrides.

use std::path::PathBuf;

use blinker_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// `--config` / `BLINKER_CONFIG` when given, the platform default otherwise.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(blinker_config::config_path)
}

/// Load the layered config and apply command-line overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = blinker_config::load_config_from(&config_path(global))?;
    if let Some(ref device) = global.device {
        cfg.device.address.clone_from(device);
    }
    if let Some(ref file) = global.log_file {
        cfg.logging.file = Some(file.clone());
    }
    Ok(cfg)
}
