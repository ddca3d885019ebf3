//! Configuration for the blinker controller.
//!
//! TOML file + `BLINKER_*` environment layering, password resolution, and
//! translation to and from `blinker_core::BlinkerConfig`. The password is
//! never written back to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use blinker_api::{BasicAuth, device_url};
use blinker_core::{BlinkerConfig, DefaultMode, EffectSettings};

/// Environment variable holding the device password.
pub const PASSWORD_ENV: &str = "BLINKER_PASSWORD";

/// Prefix for environment overrides, e.g. `BLINKER_BLINK__BRIGHTNESS=64`.
pub const ENV_PREFIX: &str = "BLINKER_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<blinker_core::ValidationError> for ConfigError {
    fn from(err: blinker_core::ValidationError) -> Self {
        Self::Validation {
            field: err.field.into(),
            reason: err.reason,
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration. Durations are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceSection,
    pub button: ButtonSection,
    pub blink: BlinkSection,
    pub default: DefaultSection,
    pub connection: ConnectionSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceSection {
    /// Host, IP or URL of the WLED controller.
    pub address: String,
    pub username: Option<String>,
    /// Plaintext password. Prefer `BLINKER_PASSWORD`. Never saved.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub request_timeout: f64,
    /// Strip has a dedicated white channel.
    pub rgbw: bool,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            address: "192.168.1.15".into(),
            username: None,
            password: None,
            request_timeout: 5.0,
            rgbw: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ButtonSection {
    /// BCM pin number.
    pub gpio_pin: u8,
    pub long_press_threshold: f64,
}

impl Default for ButtonSection {
    fn default() -> Self {
        Self {
            gpio_pin: 18,
            long_press_threshold: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BlinkSection {
    pub short_flash_duration: f64,
    pub flash_interval: f64,
    pub brightness: u8,
    pub transition: f64,
}

impl Default for BlinkSection {
    fn default() -> Self {
        Self {
            short_flash_duration: 5.0,
            flash_interval: 0.5,
            brightness: 255,
            transition: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultSection {
    pub mode: DefaultMode,
    pub effect: u16,
    pub speed: u8,
    pub intensity: u8,
}

impl Default for DefaultSection {
    fn default() -> Self {
        let effect = EffectSettings::default();
        Self {
            mode: DefaultMode::White,
            effect: effect.index,
            speed: effect.speed,
            intensity: effect.intensity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionSection {
    pub max_retries: u32,
    pub retry_delay: f64,
    pub reconnect_delay: f64,
    pub health_check_interval: f64,
    pub max_failed_attempts: u32,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: 1.0,
            reconnect_delay: 5.0,
            health_check_interval: 60.0,
            max_failed_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Also write logs to a daily-rotated file at this path.
    pub file: Option<PathBuf>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("tech", "hyperbliss", "blinker").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("blinker");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Layer defaults, the TOML file at `path` (if present) and `BLINKER_*`
/// environment overrides. Nested keys use `__`:
/// `BLINKER_DEVICE__ADDRESS=10.0.0.7`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize to TOML and write to `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Device password: `BLINKER_PASSWORD` first, then plaintext in config.
pub fn resolve_password(device: &DeviceSection) -> Option<SecretString> {
    choose_password(std::env::var(PASSWORD_ENV).ok(), device)
}

fn choose_password(from_env: Option<String>, device: &DeviceSection) -> Option<SecretString> {
    from_env
        .filter(|pw| !pw.is_empty())
        .or_else(|| device.password.clone())
        .map(SecretString::from)
}

fn resolve_auth(device: &DeviceSection) -> Option<BasicAuth> {
    let username = device.username.clone().filter(|u| !u.is_empty())?;
    let password = resolve_password(device).unwrap_or_else(|| SecretString::from(String::new()));
    Some(BasicAuth { username, password })
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Build and validate the runtime configuration.
    pub fn to_blinker_config(&self) -> Result<BlinkerConfig, ConfigError> {
        let url = device_url(&self.device.address).map_err(|e| ConfigError::Validation {
            field: "device.address".into(),
            reason: format!("'{}': {e}", self.device.address),
        })?;

        let mut config = BlinkerConfig::new(url);
        config.auth = resolve_auth(&self.device);
        config.request_timeout = seconds("device.request_timeout", self.device.request_timeout)?;
        config.rgbw = self.device.rgbw;

        config.gpio_pin = self.button.gpio_pin;
        config.long_press_threshold =
            seconds("button.long_press_threshold", self.button.long_press_threshold)?;

        config.short_flash_duration =
            seconds("blink.short_flash_duration", self.blink.short_flash_duration)?;
        config.flash_interval = seconds("blink.flash_interval", self.blink.flash_interval)?;
        config.brightness = self.blink.brightness;
        config.transition = seconds("blink.transition", self.blink.transition)?;

        config.default_mode = self.default.mode;
        config.effect = EffectSettings {
            index: self.default.effect,
            speed: self.default.speed,
            intensity: self.default.intensity,
        };

        config.max_retries = self.connection.max_retries;
        config.retry_delay = seconds("connection.retry_delay", self.connection.retry_delay)?;
        config.reconnect_delay =
            seconds("connection.reconnect_delay", self.connection.reconnect_delay)?;
        config.health_check_interval = seconds(
            "connection.health_check_interval",
            self.connection.health_check_interval,
        )?;
        config.max_failed_attempts = self.connection.max_failed_attempts;

        config.validate()?;
        Ok(config)
    }

    /// Copy runtime-adjustable settings back so they can be saved.
    /// Device address and credentials are left as they are.
    pub fn apply_runtime(&mut self, config: &BlinkerConfig) {
        self.device.request_timeout = config.request_timeout.as_secs_f64();
        self.button.long_press_threshold = config.long_press_threshold.as_secs_f64();
        self.blink.short_flash_duration = config.short_flash_duration.as_secs_f64();
        self.blink.flash_interval = config.flash_interval.as_secs_f64();
        self.blink.brightness = config.brightness;
        self.blink.transition = config.transition.as_secs_f64();
        self.default.mode = config.default_mode;
        self.default.effect = config.effect.index;
        self.default.speed = config.effect.speed;
        self.default.intensity = config.effect.intensity;
        self.connection.max_retries = config.max_retries;
        self.connection.retry_delay = config.retry_delay.as_secs_f64();
        self.connection.reconnect_delay = config.reconnect_delay.as_secs_f64();
        self.connection.health_check_interval = config.health_check_interval.as_secs_f64();
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("{value} is not a valid number of seconds"),
    })
}
