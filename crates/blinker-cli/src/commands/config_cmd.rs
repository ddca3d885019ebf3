//! Config subcommand handlers.

use serde_json::{Map, Value};

use blinker_config::Config;
use blinker_core::ConfigPatch;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let path = config::config_path(global);
    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }

        ConfigCommand::Show => {
            print!("{}", toml::to_string_pretty(cfg)?);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            blinker_config::save_config_to(&Config::default(), &path)?;
            eprintln!("Configuration written to {}", path.display());
            Ok(())
        }

        ConfigCommand::Set { pairs } => {
            let patch = parse_patch(&pairs)?;

            // Reload without command-line overrides so they are not persisted.
            let mut file_cfg = blinker_config::load_config_from(&path)?;
            let updated = patch.apply_to(&file_cfg.to_blinker_config()?)?;
            file_cfg.apply_runtime(&updated);
            blinker_config::save_config_to(&file_cfg, &path)?;

            if file_cfg.device.password.is_some() {
                eprintln!(
                    "Note: the plaintext device password was not written back; \
                     set BLINKER_PASSWORD instead."
                );
            }
            eprintln!("Updated {}", path.display());
            Ok(())
        }
    }
}

/// Turn `key=value` arguments into a runtime patch. Values are read as JSON
/// where possible (`128`, `0.25`) and as plain strings otherwise (`effect`).
fn parse_patch(pairs: &[String]) -> Result<ConfigPatch, CliError> {
    let mut fields = Map::new();
    for pair in pairs {
        let (key, raw) = pair.split_once('=').ok_or_else(|| CliError::Validation {
            field: pair.clone(),
            reason: "expected KEY=VALUE".into(),
        })?;
        let key = key.trim();
        let raw = raw.trim();
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        fields.insert(key.to_owned(), value);
    }

    serde_json::from_value(Value::Object(fields)).map_err(|e| CliError::Validation {
        field: "config set".into(),
        reason: e.to_string(),
    })
}
