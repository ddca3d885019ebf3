// ── Device session ──
//
// Stateful wrapper around one light device: connectivity, identity, the
// last state the device acknowledged, and a short-lived effect catalog.
// Every public operation reports success as a boolean; failures are logged
// and recorded in the health tracker instead of propagating.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use blinker_api::{Color, StatePayload, WledClient};

use crate::backoff::Backoff;
use crate::config::{DefaultMode, SharedConfig};
use crate::error::CoreError;
use crate::health::HealthTracker;
use crate::palette::Palette;
use crate::transport::DeviceTransport;

/// How long a fetched effect catalog is served from cache.
pub const EFFECTS_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Default)]
struct Session {
    connected: bool,
    led_count: u32,
    name: String,
    firmware_version: String,
    /// Overwritten only after the device confirmed a push. Never cleared.
    last_applied: Option<StatePayload>,
}

#[derive(Debug)]
struct EffectsCache {
    effects: Vec<String>,
    fetched_at: Instant,
}

/// One light device session.
pub struct DeviceClient<T = WledClient> {
    transport: T,
    config: SharedConfig,
    health: Arc<HealthTracker>,
    session: Mutex<Session>,
    effects: Mutex<Option<EffectsCache>>,
    /// Mirrors `Session::connected` for tasks that wait on the link.
    link: watch::Sender<bool>,
    /// Held for the whole of a reconnect so only one runs at a time.
    recovery: Arc<Mutex<()>>,
    cancel: CancellationToken,
}

impl<T> std::fmt::Debug for DeviceClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("device_url", &self.config.load().device_url.as_str())
            .finish_non_exhaustive()
    }
}

impl<T: DeviceTransport> DeviceClient<T> {
    /// Create a disconnected session. Call [`connect`](Self::connect) or
    /// [`wait_for_connection`](Self::wait_for_connection) before pushing.
    ///
    /// `cancel` aborts an in-progress `wait_for_connection`.
    pub fn new(
        transport: T,
        config: SharedConfig,
        health: Arc<HealthTracker>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            config,
            health,
            session: Mutex::new(Session::default()),
            effects: Mutex::new(None),
            link: watch::Sender::new(false),
            recovery: Arc::new(Mutex::new(())),
            cancel,
        }
    }

    // ── Identity ─────────────────────────────────────────────────────

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.connected
    }

    pub async fn led_count(&self) -> u32 {
        self.session.lock().await.led_count
    }

    pub async fn name(&self) -> String {
        self.session.lock().await.name.clone()
    }

    pub async fn firmware_version(&self) -> String {
        self.session.lock().await.firmware_version.clone()
    }

    /// The most recent payload the device acknowledged.
    pub async fn last_applied_state(&self) -> Option<StatePayload> {
        self.session.lock().await.last_applied.clone()
    }

    // ── Connection ───────────────────────────────────────────────────

    /// Fetch device info and mark the session connected.
    pub async fn connect(&self) -> bool {
        match self.call(self.transport.info()).await {
            Ok(info) => {
                {
                    let mut session = self.session.lock().await;
                    self.set_connected(&mut session, true);
                    session.led_count = info.leds.count;
                    session.name.clone_from(&info.name);
                    session.firmware_version.clone_from(&info.ver);
                }
                self.health.record_success();
                info!(
                    name = %info.name,
                    version = %info.ver,
                    leds = info.leds.count,
                    "connected to light device"
                );
                true
            }
            Err(e) => {
                self.mark_disconnected().await;
                self.health.record_failure(&e);
                warn!(error = %e, kind = %e.kind(), "failed to connect to light device");
                false
            }
        }
    }

    /// Retry [`connect`](Self::connect) with jittered exponential backoff
    /// until it succeeds. Returns `false` only when cancelled.
    pub async fn wait_for_connection(&self) -> bool {
        let mut attempt: u32 = 0;
        loop {
            debug!(attempt = attempt + 1, "connection attempt");
            if self.connect().await {
                return true;
            }

            let delay = Backoff::new(self.config.load().reconnect_delay).next_delay(attempt);
            info!(
                attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "light device unreachable, retrying"
            );
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!("connection wait cancelled");
                    return false;
                }
                () = tokio::time::sleep(delay) => {}
            }
            attempt = attempt.saturating_add(1);
        }
    }

    /// Wait until another task (usually the supervisor) has connected the
    /// session. `false` if cancelled first.
    pub async fn wait_until_connected(&self) -> bool {
        let mut link = self.link.subscribe();
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            up = link.wait_for(|up| *up) => up.is_ok(),
        }
    }

    /// Let any in-flight recovery finish, then reconnect if the session is
    /// still down. Nothing is resent. `false` only when cancelled.
    pub async fn ensure_connected(&self) -> bool {
        let _recovery = self.recovery.lock().await;
        self.is_connected().await || self.wait_for_connection().await
    }

    /// Reconnect and resend the last acknowledged state.
    ///
    /// No-op `false` when already connected, including when a concurrent
    /// recovery got there first.
    pub async fn auto_recover(&self) -> bool {
        let _recovery = self.recovery.lock().await;
        self.recover().await
    }

    async fn recover(&self) -> bool {
        if self.is_connected().await {
            return false;
        }
        info!("attempting to recover light device connection");
        if !self.wait_for_connection().await {
            return false;
        }
        if self.restore_last_state().await {
            info!("restored last applied state after reconnect");
            true
        } else {
            warn!("reconnected but could not restore last applied state");
            false
        }
    }

    /// Start [`auto_recover`](Self::auto_recover) on a background task
    /// unless one is already running.
    pub fn spawn_recovery(self: &Arc<Self>) {
        let Ok(guard) = Arc::clone(&self.recovery).try_lock_owned() else {
            return;
        };
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.recover().await;
            drop(guard);
        });
    }

    // ── State ────────────────────────────────────────────────────────

    /// Send `payload`, retrying with exponential delay.
    ///
    /// Not gated on connectivity: this is also the resend primitive used
    /// right after a reconnect.
    pub async fn push_state(&self, payload: &StatePayload) -> bool {
        let config = self.config.load();
        let attempts = config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match self.call(self.transport.set_state(payload)).await {
                Ok(()) => {
                    self.session.lock().await.last_applied = Some(payload.clone());
                    self.health.record_success();
                    return true;
                }
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max = attempts,
                        error = %e,
                        "state push failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt + 1 < attempts {
                let delay = config
                    .retry_delay
                    .saturating_mul(2u32.saturating_pow(attempt));
                tokio::time::sleep(delay).await;
            }
        }

        self.mark_disconnected().await;
        if let Some(e) = last_error {
            error!(error = %e, attempts, "giving up on state push");
            self.health.record_failure(&e);
        }
        false
    }

    /// Show a solid color. Refused while disconnected or when the device
    /// reported no LEDs.
    pub async fn set_color(&self, color: Color, brightness: u8) -> bool {
        {
            let session = self.session.lock().await;
            if !session.connected || session.led_count == 0 {
                debug!(
                    connected = session.connected,
                    leds = session.led_count,
                    "skipping color push"
                );
                return false;
            }
        }
        let payload = StatePayload::solid(color, brightness, self.config.load().transition_ms());
        self.push_state(&payload).await
    }

    /// Pure white at the configured brightness.
    pub async fn set_white(&self) -> bool {
        let config = self.config.load();
        let white = Palette::for_strip(config.rgbw).white;
        self.set_color(white, config.brightness).await
    }

    /// Select effect `index` with the configured speed, intensity and
    /// brightness. Single attempt; a failure marks the session
    /// disconnected immediately. An acknowledged effect becomes the last
    /// applied state, so a reconnect restores it.
    pub async fn apply_effect(&self, index: u16) -> bool {
        let config = self.config.load();
        let payload = StatePayload::effect(
            index,
            config.effect.speed,
            config.effect.intensity,
            config.brightness,
            config.transition_ms(),
        );

        match self.call(self.transport.set_state(&payload)).await {
            Ok(()) => {
                self.session.lock().await.last_applied = Some(payload);
                self.health.record_success();
                info!(effect = index, "applied effect");
                true
            }
            Err(e) => {
                self.mark_disconnected().await;
                self.health.record_failure(&e);
                error!(effect = index, error = %e, "failed to apply effect");
                false
            }
        }
    }

    /// Put the strip back into the configured default appearance.
    pub async fn revert_to_default(&self) -> bool {
        let config = self.config.load();
        debug!(mode = %config.default_mode, "reverting to default appearance");
        match config.default_mode {
            DefaultMode::White => self.set_white().await,
            DefaultMode::Effect => self.apply_effect(config.effect.index).await,
        }
    }

    /// Resend the last acknowledged payload. `false` if none exists.
    pub async fn restore_last_state(&self) -> bool {
        let Some(payload) = self.last_applied_state().await else {
            debug!("no state to restore");
            return false;
        };
        self.push_state(&payload).await
    }

    // ── Effects ──────────────────────────────────────────────────────

    /// Effect names, cached for [`EFFECTS_TTL`]. Falls back to the stale
    /// cache (or nothing) when the device cannot be asked.
    pub async fn effects_catalog(&self) -> Vec<String> {
        let mut cache = self.effects.lock().await;
        if let Some(fresh) = cache
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < EFFECTS_TTL)
        {
            return fresh.effects.clone();
        }

        match self.call(self.transport.status()).await {
            Ok(status) => {
                self.health.record_success();
                debug!(count = status.effects.len(), "fetched effect catalog");
                *cache = Some(EffectsCache {
                    effects: status.effects.clone(),
                    fetched_at: Instant::now(),
                });
                status.effects
            }
            Err(e) => {
                self.health.record_failure(&e);
                warn!(error = %e, "failed to fetch effect catalog");
                cache.as_ref().map(|c| c.effects.clone()).unwrap_or_default()
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn set_connected(&self, session: &mut Session, connected: bool) {
        session.connected = connected;
        self.link.send_replace(connected);
    }

    async fn mark_disconnected(&self) {
        let mut session = self.session.lock().await;
        self.set_connected(&mut session, false);
    }

    /// Run one transport call under the live request timeout.
    async fn call<R>(
        &self,
        request: impl Future<Output = Result<R, blinker_api::Error>>,
    ) -> Result<R, CoreError> {
        let timeout = self.config.load().request_timeout;
        match tokio::time::timeout(timeout, request).await {
            Ok(result) => result.map_err(CoreError::from),
            Err(_) => Err(CoreError::Timeout {
                timeout_ms: timeout.as_millis(),
            }),
        }
    }
}
