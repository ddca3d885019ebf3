// ── Application context ──
//
// Owns the device session, health tracker, sequencer and live config, and
// is the single handle a control surface talks to. Cheaply cloneable.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use blinker_api::{TransportConfig, WledClient};

use crate::blink::{BlinkSequencer, LongMode, SequenceOutcome};
use crate::button::ButtonLoop;
use crate::config::{BlinkerConfig, ConfigPatch, SharedConfig};
use crate::device::DeviceClient;
use crate::error::{CoreError, ValidationError};
use crate::health::{HealthSnapshot, HealthTracker};
use crate::input::InputLine;
use crate::supervisor::ConnectionSupervisor;
use crate::transport::DeviceTransport;

/// The running controller.
///
/// [`start`](Self::start) spawns the connection supervisor and the button
/// loop; the trigger methods run the same sequences a physical press
/// would.
pub struct Blinker<T = WledClient> {
    inner: Arc<BlinkerInner<T>>,
}

impl<T> Clone for Blinker<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct BlinkerInner<T> {
    config: SharedConfig,
    health: Arc<HealthTracker>,
    device: Arc<DeviceClient<T>>,
    sequencer: Arc<BlinkSequencer<T>>,
    input: Arc<dyn InputLine>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Blinker<WledClient> {
    /// Build a controller talking HTTP to the configured device.
    pub fn from_config(
        config: BlinkerConfig,
        input: Arc<dyn InputLine>,
    ) -> Result<Self, CoreError> {
        config.validate().map_err(|e| CoreError::Config {
            message: e.to_string(),
        })?;
        let transport = TransportConfig {
            auth: config.auth.clone(),
        };
        let client = WledClient::new(config.device_url.clone(), &transport)?;
        Ok(Self::new(config, client, input))
    }
}

impl<T: DeviceTransport> Blinker<T> {
    pub fn new(config: BlinkerConfig, transport: T, input: Arc<dyn InputLine>) -> Self {
        let health = Arc::new(HealthTracker::new(config.max_failed_attempts));
        let config = SharedConfig::new(config);
        let cancel = CancellationToken::new();
        let device = Arc::new(DeviceClient::new(
            transport,
            config.clone(),
            Arc::clone(&health),
            cancel.child_token(),
        ));
        let sequencer = Arc::new(BlinkSequencer::new(
            Arc::clone(&device),
            config.clone(),
            Arc::clone(&input),
        ));

        Self {
            inner: Arc::new(BlinkerInner {
                config,
                health,
                device,
                sequencer,
                input,
                cancel,
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn device(&self) -> &Arc<DeviceClient<T>> {
        &self.inner.device
    }

    pub fn sequencer(&self) -> &Arc<BlinkSequencer<T>> {
        &self.inner.sequencer
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<BlinkerConfig> {
        self.inner.config.load()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the connection supervisor and the button loop.
    pub async fn start(&self) {
        self.spawn_supervisor().await;
        self.spawn_button_loop().await;
    }

    pub async fn spawn_supervisor(&self) {
        let supervisor = ConnectionSupervisor::new(
            Arc::clone(&self.inner.device),
            self.inner.config.clone(),
            self.inner.cancel.clone(),
        );
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(supervisor.run()));
    }

    /// The button task stops on its own if the input line fails; nothing
    /// else is affected. It does not connect by itself and starts polling
    /// once the supervisor (or a direct `connect`) brings the session up.
    pub async fn spawn_button_loop(&self) {
        let button = ButtonLoop::new(
            Arc::clone(&self.inner.device),
            Arc::clone(&self.inner.sequencer),
            Arc::clone(&self.inner.health),
            self.inner.config.clone(),
            Arc::clone(&self.inner.input),
            self.inner.cancel.clone(),
        );
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(async move {
                if let Err(e) = button.run().await {
                    debug!(error = %e, "button task exited");
                }
            }));
    }

    /// Stop flashing, cancel background tasks and wait for them.
    pub async fn shutdown(&self) {
        info!("shutting down");
        self.inner.sequencer.cancel();
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("background tasks stopped");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Control surface ──────────────────────────────────────────────

    /// Same sequence a short button press runs.
    pub async fn trigger_short_press(&self) -> SequenceOutcome {
        self.inner.health.record_button_press();
        info!("simulated short press");
        self.inner.sequencer.run_short().await
    }

    /// The alert pattern for one long-press threshold.
    pub async fn trigger_long_press(&self) -> SequenceOutcome {
        self.inner.health.record_button_press();
        info!("simulated long press");
        let duration = self.inner.config.load().long_press_threshold;
        self.inner.sequencer.run_long(LongMode::Timed(duration)).await
    }

    /// Show the default appearance now instead of after the next blink.
    pub async fn apply_default_appearance(&self) -> bool {
        self.inner.device.revert_to_default().await
    }

    pub fn health(&self) -> HealthSnapshot {
        self.inner.health.snapshot()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<HealthSnapshot> {
        self.inner.health.subscribe()
    }

    pub async fn effects_catalog(&self) -> Vec<String> {
        self.inner.device.effects_catalog().await
    }

    /// Validate and apply a runtime update. All or nothing; applies from
    /// the next blink or revert on.
    pub fn update_runtime_config(&self, patch: &ConfigPatch) -> Result<(), ValidationError> {
        let updated = self.inner.config.update(patch)?;
        info!(
            mode = %updated.default_mode,
            brightness = updated.brightness,
            "runtime configuration updated"
        );
        Ok(())
    }
}
