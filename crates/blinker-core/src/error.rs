// ── Core error types ──
//
// Errors from blinker-core. Device failures never escape the public
// `DeviceClient` operations; they are converted into `CoreError`, logged,
// and recorded in the health tracker. Validation and input errors are the
// only ones callers see directly.

use strum::Display;
use thiserror::Error;

/// Classification of a failed device interaction, as surfaced to health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FailureKind {
    /// The device could not be reached (refused, DNS, timeout).
    Transport,
    /// The device answered with a non-success status.
    Protocol,
    /// The device answered with a body we could not decode.
    Decode,
}

/// Unified error type for device interactions.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach light device: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Light device request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u128 },

    // ── Protocol errors ──────────────────────────────────────────────
    #[error("Light device returned HTTP {status}")]
    Protocol { status: u16 },

    #[error("Malformed response from light device: {message}")]
    Decode { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Where in the failure taxonomy this error falls.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::Config { .. } => {
                FailureKind::Transport
            }
            Self::Protocol { .. } => FailureKind::Protocol,
            Self::Decode { .. } => FailureKind::Decode,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<blinker_api::Error> for CoreError {
    fn from(err: blinker_api::Error) -> Self {
        match err {
            blinker_api::Error::Transport(e) => CoreError::ConnectionFailed {
                reason: e.to_string(),
            },
            blinker_api::Error::Status { status, .. } => CoreError::Protocol { status },
            blinker_api::Error::Deserialization { message, body: _ } => {
                CoreError::Decode { message }
            }
            blinker_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid device URL: {e}"),
            },
            blinker_api::Error::ClientBuild(message) => CoreError::Config { message },
        }
    }
}

/// A runtime configuration update was rejected. Nothing was applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// The button input line could not be opened or read.
///
/// Fatal to the button task only; the rest of the process keeps running.
#[derive(Debug, Error)]
pub enum InputError {
    #[cfg(feature = "pi")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("input line unavailable: {0}")]
    Unavailable(String),
}
