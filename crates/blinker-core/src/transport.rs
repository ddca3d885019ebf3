// The seam between device session logic and the wire.
//
// `DeviceClient` is generic over this trait so sequencing and recovery can
// be driven against an in-memory device under a paused clock.

use std::future::Future;

use blinker_api::{DeviceInfo, Error, StatePayload, StatusResponse, WledClient};

/// One request per call against a light device.
pub trait DeviceTransport: Send + Sync + 'static {
    /// `GET /json/info`.
    fn info(&self) -> impl Future<Output = Result<DeviceInfo, Error>> + Send;

    /// `POST /json/state`.
    fn set_state(&self, payload: &StatePayload) -> impl Future<Output = Result<(), Error>> + Send;

    /// `GET /json`.
    fn status(&self) -> impl Future<Output = Result<StatusResponse, Error>> + Send;
}

impl DeviceTransport for WledClient {
    fn info(&self) -> impl Future<Output = Result<DeviceInfo, Error>> + Send {
        WledClient::info(self)
    }

    fn set_state(&self, payload: &StatePayload) -> impl Future<Output = Result<(), Error>> + Send {
        WledClient::set_state(self, payload)
    }

    fn status(&self) -> impl Future<Output = Result<StatusResponse, Error>> + Send {
        WledClient::status(self)
    }
}
