use thiserror::Error;

/// Top-level error type for the `blinker-api` crate.
///
/// Covers every way a request to the light device can fail: the request
/// never completed, the device answered with a non-success status, or the
/// body could not be decoded. `blinker-core` folds these into health records.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Protocol ────────────────────────────────────────────────────
    /// The device answered with something other than `200 OK`.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the device was reached but rejected the request.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Status { .. })
    }

    /// Returns `true` if the device answered with a body we could not parse.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }

    /// The HTTP status code, if the device answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
