//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text.

use miette::Diagnostic;
use thiserror::Error;

use blinker_config::ConfigError;
use blinker_core::{CoreError, InputError, ValidationError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const HARDWARE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the light device at {url}")]
    #[diagnostic(
        code(blinker::connection_failed),
        help(
            "Check that the WLED controller is powered and on the network.\n\
             Last error: {reason}\n\
             Override the address with: blinker --device <ADDRESS> ..."
        )
    )]
    DeviceUnreachable { url: String, reason: String },

    #[error("Light device request timed out after {millis}ms")]
    #[diagnostic(
        code(blinker::timeout),
        help("Raise device.request_timeout in the config file.")
    )]
    Timeout { millis: u128 },

    #[error("Light device rejected the request: {message}")]
    #[diagnostic(code(blinker::device_error))]
    Device { message: String },

    // ── Hardware ─────────────────────────────────────────────────────
    #[error("Button input unavailable: {reason}")]
    #[diagnostic(
        code(blinker::input),
        help(
            "Check button.gpio_pin and that this user may access /dev/gpiomem.\n\
             Use `blinker run --no-button` to run without the button."
        )
    )]
    Input { reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(blinker::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(blinker::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(blinker::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    #[diagnostic(code(blinker::json))]
    Json(#[from] serde_json::Error),

    #[error("TOML encoding failed: {0}")]
    #[diagnostic(code(blinker::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DeviceUnreachable { .. } | Self::Device { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Input { .. } => exit_code::HARDWARE,
            Self::Validation { .. } | Self::ConfigExists { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            Self::Io(_) | Self::Json(_) | Self::Toml(_) => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Figment(e) => Self::Config(e),
            ConfigError::Io(e) => Self::Io(e),
            ConfigError::Serialization(e) => Self::Toml(e),
        }
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        Self::Validation {
            field: err.field.into(),
            reason: err.reason,
        }
    }
}

impl From<InputError> for CliError {
    fn from(err: InputError) -> Self {
        Self::Input {
            reason: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => Self::DeviceUnreachable {
                url: "(device)".into(),
                reason,
            },
            CoreError::Timeout { timeout_ms } => Self::Timeout { millis: timeout_ms },
            CoreError::Protocol { status } => Self::Device {
                message: format!("HTTP {status}"),
            },
            CoreError::Decode { message } => Self::Device { message },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}
