// Background task that keeps the device session connected, independent of
// the button loop.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use blinker_api::WledClient;

use crate::config::SharedConfig;
use crate::device::DeviceClient;
use crate::transport::DeviceTransport;

pub struct ConnectionSupervisor<T = WledClient> {
    device: Arc<DeviceClient<T>>,
    config: SharedConfig,
    cancel: CancellationToken,
}

impl<T: DeviceTransport> ConnectionSupervisor<T> {
    pub fn new(device: Arc<DeviceClient<T>>, config: SharedConfig, cancel: CancellationToken) -> Self {
        Self {
            device,
            config,
            cancel,
        }
    }

    /// Reconnect whenever the session drops, then wait one health-check
    /// interval. Runs until cancelled. A reconnect already under way in
    /// another task is waited out rather than duplicated.
    pub async fn run(self) {
        info!("connection supervisor started");
        loop {
            if !self.device.is_connected().await {
                debug!("supervisor found device disconnected");
                self.device.ensure_connected().await;
            }

            let interval = self.config.load().health_check_interval;
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
        info!("connection supervisor stopped");
    }
}
