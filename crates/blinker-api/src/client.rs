// WLED JSON API HTTP client
//
// Wraps `reqwest::Client` with WLED URL construction, status checking and
// body decoding. Stateless: connectivity tracking, retries and caching live
// in `blinker-core`.

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{DeviceInfo, StatePayload, StatusResponse};
use crate::transport::{BasicAuth, TransportConfig};

/// Raw HTTP client for one WLED device.
///
/// Every method performs exactly one request. A response counts as a
/// success only when the device answers `200 OK`.
#[derive(Clone)]
pub struct WledClient {
    http: reqwest::Client,
    base_url: Url,
    auth: Option<BasicAuth>,
}

impl std::fmt::Debug for WledClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WledClient")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.auth.as_ref().map(|a| a.username.as_str()))
            .finish_non_exhaustive()
    }
}

/// Turn a configured device address into a base URL.
///
/// Accepts a bare host or IP (`192.168.1.15`, `wled.local:8080`) or a full
/// URL (`http://192.168.1.15/`). Bare hosts get an `http://` scheme.
pub fn device_url(address: &str) -> Result<Url, Error> {
    let address = address.trim();
    let raw = if address.contains("://") {
        address.to_owned()
    } else {
        format!("http://{address}")
    };
    let mut url = Url::parse(&raw)?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidUrl(url::ParseError::EmptyHost));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl WledClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            auth: transport.auth.clone(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, auth: Option<BasicAuth>) -> Self {
        Self {
            http,
            base_url,
            auth,
        }
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /json/info`: device name, firmware version and LED count.
    pub async fn info(&self) -> Result<DeviceInfo, Error> {
        self.get(self.url("json/info")?).await
    }

    /// `GET /json`: aggregate status, including the effect catalog.
    pub async fn status(&self) -> Result<StatusResponse, Error> {
        self.get(self.url("json")?).await
    }

    /// `POST /json/state`. The response body is not inspected.
    pub async fn set_state(&self, payload: &StatePayload) -> Result<(), Error> {
        let url = self.url("json/state")?;
        debug!("POST {}", url);

        let resp = self
            .authorize(self.http.post(url).json(payload))
            .send()
            .await
            .map_err(Error::Transport)?;

        check_status(&resp)?;
        Ok(())
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(auth) => req.basic_auth(&auth.username, Some(auth.password.expose_secret())),
            None => req,
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(Error::Transport)?;

        check_status(&resp)?;
        let body = resp.text().await.map_err(Error::Transport)?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

fn check_status(resp: &reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status == reqwest::StatusCode::OK {
        Ok(())
    } else {
        Err(Error::Status {
            status: status.as_u16(),
            url: resp.url().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_address_gets_http_scheme() {
        let url = device_url("192.168.1.15").map(|u| u.to_string());
        assert_eq!(url.ok().as_deref(), Some("http://192.168.1.15/"));
    }

    #[test]
    fn full_url_is_kept_and_slash_terminated() {
        let url = device_url("http://wled.local:8080/sub").map(|u| u.to_string());
        assert_eq!(url.ok().as_deref(), Some("http://wled.local:8080/sub/"));
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!(device_url("").is_err());
        assert!(device_url("http://").is_err());
    }
}
