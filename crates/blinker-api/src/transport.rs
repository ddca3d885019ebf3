// Shared transport configuration for building reqwest::Client instances.
//
// Request timeouts are not set here. The session layer bounds each call
// with the live `request_timeout`, which can change at runtime.

use secrecy::SecretString;

/// HTTP basic-auth credentials passed through to the device.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: SecretString,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// Credentials attached to every request, if the device requires them.
    pub auth: Option<BasicAuth>,
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// WLED controllers speak plain HTTP on the local network, so no TLS
    /// customisation happens here.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .user_agent(concat!("blinker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| crate::error::Error::ClientBuild(e.to_string()))
    }
}
