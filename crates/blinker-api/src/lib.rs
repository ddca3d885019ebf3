// blinker-api: Async Rust client for the WLED JSON API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{WledClient, device_url};
pub use error::Error;
pub use models::{Color, DeviceInfo, LedInfo, Segment, StatePayload, StatusResponse};
pub use transport::{BasicAuth, TransportConfig};
