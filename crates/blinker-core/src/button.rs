// ── Button handling ──
//
// A pure press classifier plus the polling task that feeds it samples and
// turns its events into blink sequences.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use blinker_api::WledClient;

use crate::blink::{BlinkSequencer, HoldSession, LongMode, TICK};
use crate::config::SharedConfig;
use crate::device::DeviceClient;
use crate::error::InputError;
use crate::health::HealthTracker;
use crate::input::InputLine;
use crate::transport::DeviceTransport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonState {
    #[default]
    Idle,
    Pressed {
        since: Instant,
    },
    /// Held past the long-press threshold; the alert blinks until release.
    BlinkingLong {
        since: Instant,
    },
}

/// What a sample changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// The line went down. Any running sequence should stop.
    Pressed,
    /// Released before the long-press threshold.
    ShortPress { held: Duration },
    /// Released at or past the threshold without the hold ever being
    /// observed, e.g. when the poller was stalled by a reconnect.
    LongPress { held: Duration },
    /// Still held at the threshold.
    HoldStarted,
    HoldReleased { held: Duration },
}

/// Press/hold/release classifier. Feed it one sample per poll.
#[derive(Debug, Default)]
pub struct ButtonStateMachine {
    state: ButtonState,
}

impl ButtonStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn on_sample(
        &mut self,
        asserted: bool,
        now: Instant,
        long_press_threshold: Duration,
    ) -> Option<ButtonEvent> {
        match (self.state, asserted) {
            (ButtonState::Idle, true) => {
                self.state = ButtonState::Pressed { since: now };
                Some(ButtonEvent::Pressed)
            }
            (ButtonState::Pressed { since }, false) => {
                self.state = ButtonState::Idle;
                let held = now.duration_since(since);
                if held < long_press_threshold {
                    Some(ButtonEvent::ShortPress { held })
                } else {
                    Some(ButtonEvent::LongPress { held })
                }
            }
            (ButtonState::Pressed { since }, true)
                if now.duration_since(since) >= long_press_threshold =>
            {
                self.state = ButtonState::BlinkingLong { since };
                Some(ButtonEvent::HoldStarted)
            }
            (ButtonState::BlinkingLong { since }, false) => {
                self.state = ButtonState::Idle;
                Some(ButtonEvent::HoldReleased {
                    held: now.duration_since(since),
                })
            }
            (ButtonState::Idle, false)
            | (ButtonState::Pressed { .. } | ButtonState::BlinkingLong { .. }, true) => None,
        }
    }
}

// ── Polling task ─────────────────────────────────────────────────────

/// The button polling task.
pub struct ButtonLoop<T = WledClient> {
    device: Arc<DeviceClient<T>>,
    sequencer: Arc<BlinkSequencer<T>>,
    health: Arc<HealthTracker>,
    config: SharedConfig,
    input: Arc<dyn InputLine>,
    cancel: CancellationToken,
}

impl<T: DeviceTransport> ButtonLoop<T> {
    pub fn new(
        device: Arc<DeviceClient<T>>,
        sequencer: Arc<BlinkSequencer<T>>,
        health: Arc<HealthTracker>,
        config: SharedConfig,
        input: Arc<dyn InputLine>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            device,
            sequencer,
            health,
            config,
            input,
            cancel,
        }
    }

    /// Poll until cancelled. Returns an error only when the input line
    /// cannot be read.
    ///
    /// Connecting is left to the supervisor; the loop starts once the
    /// session is up.
    pub async fn run(self) -> Result<(), InputError> {
        if !self.device.wait_until_connected().await {
            return Ok(());
        }
        if !self.device.revert_to_default().await {
            warn!("could not apply default appearance at startup");
        }
        info!("button loop started");

        let mut machine = ButtonStateMachine::new();
        let mut hold: Option<HoldSession> = None;

        let result = self.poll(&mut machine, &mut hold).await;

        if let Some(session) = hold.take() {
            self.sequencer.end_hold(session).await;
        }
        match &result {
            Ok(()) => info!("button loop stopped"),
            Err(e) => error!(error = %e, "button input failed, stopping button loop"),
        }
        result
    }

    async fn poll(
        &self,
        machine: &mut ButtonStateMachine,
        hold: &mut Option<HoldSession>,
    ) -> Result<(), InputError> {
        while !self.cancel.is_cancelled() {
            if !self.device.is_connected().await {
                warn!("light device disconnected, recovering from button loop");
                if self.device.auto_recover().await {
                    info!("light device recovered");
                } else if !self.device.is_connected().await {
                    error!("recovery failed");
                    let delay = self.config.load().reconnect_delay;
                    if self.pause(delay).await {
                        break;
                    }
                    continue;
                }
            }

            let asserted = self.input.is_asserted()?;
            let config = self.config.load();
            match machine.on_sample(asserted, Instant::now(), config.long_press_threshold) {
                Some(ButtonEvent::Pressed) => {
                    debug!("button down");
                    self.sequencer.cancel();
                }
                Some(ButtonEvent::ShortPress { held }) => {
                    self.health.record_button_press();
                    info!(held_ms = millis(held), "short press");
                    self.sequencer.run_short().await;
                    if self.wait_for_release().await? {
                        break;
                    }
                }
                Some(ButtonEvent::LongPress { held }) => {
                    self.health.record_button_press();
                    info!(held_ms = millis(held), "long press released before alert started");
                    self.sequencer
                        .run_long(LongMode::Timed(config.short_flash_duration))
                        .await;
                    if self.wait_for_release().await? {
                        break;
                    }
                }
                Some(ButtonEvent::HoldStarted) => {
                    self.health.record_button_press();
                    info!("long press");
                    *hold = Some(self.sequencer.begin_hold().await);
                }
                Some(ButtonEvent::HoldReleased { held }) => {
                    info!(held_ms = millis(held), "long press released");
                    if let Some(session) = hold.take() {
                        self.sequencer.end_hold(session).await;
                    }
                }
                None => {}
            }

            if let Some(session) = hold.as_mut() {
                if !self.sequencer.hold_tick(session).await {
                    if let Some(session) = hold.take() {
                        self.sequencer.end_hold(session).await;
                    }
                }
            }

            if self.pause(TICK).await {
                break;
            }
        }
        Ok(())
    }

    /// A hold that began during a sequence belongs to that sequence. Wait
    /// for its release so it is not classified as a new press. `true` if
    /// cancelled meanwhile.
    async fn wait_for_release(&self) -> Result<bool, InputError> {
        if self.input.is_asserted()? {
            debug!("waiting for release of a hold consumed by the sequence");
        }
        while self.input.is_asserted()? {
            if self.pause(TICK).await {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Sleep for `duration`. `true` if cancelled meanwhile.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => true,
            () = sleep(duration) => false,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const THRESHOLD: Duration = Duration::from_secs(3);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn short_press() {
        let t0 = Instant::now();
        let mut machine = ButtonStateMachine::new();

        assert_eq!(machine.on_sample(false, t0, THRESHOLD), None);
        assert_eq!(
            machine.on_sample(true, t0 + ms(10), THRESHOLD),
            Some(ButtonEvent::Pressed)
        );
        assert_eq!(machine.on_sample(true, t0 + ms(500), THRESHOLD), None);
        assert_eq!(
            machine.on_sample(false, t0 + ms(1010), THRESHOLD),
            Some(ButtonEvent::ShortPress { held: ms(1000) })
        );
        assert_eq!(machine.state(), ButtonState::Idle);
    }

    #[test]
    fn hold_past_threshold_blinks_until_release() {
        let t0 = Instant::now();
        let mut machine = ButtonStateMachine::new();

        machine.on_sample(true, t0, THRESHOLD);
        assert_eq!(machine.on_sample(true, t0 + ms(2990), THRESHOLD), None);
        assert_eq!(
            machine.on_sample(true, t0 + ms(3000), THRESHOLD),
            Some(ButtonEvent::HoldStarted)
        );
        assert_eq!(
            machine.state(),
            ButtonState::BlinkingLong { since: t0 }
        );
        assert_eq!(machine.on_sample(true, t0 + ms(3500), THRESHOLD), None);
        assert_eq!(
            machine.on_sample(false, t0 + ms(4000), THRESHOLD),
            Some(ButtonEvent::HoldReleased { held: ms(4000) })
        );
        assert_eq!(machine.state(), ButtonState::Idle);
    }

    #[test]
    fn release_after_stalled_poll_is_long_press() {
        let t0 = Instant::now();
        let mut machine = ButtonStateMachine::new();

        machine.on_sample(true, t0, THRESHOLD);
        // No samples while the poller was busy reconnecting.
        assert_eq!(
            machine.on_sample(false, t0 + ms(5000), THRESHOLD),
            Some(ButtonEvent::LongPress { held: ms(5000) })
        );
    }

    #[test]
    fn threshold_is_read_per_sample() {
        let t0 = Instant::now();
        let mut machine = ButtonStateMachine::new();

        machine.on_sample(true, t0, THRESHOLD);
        assert_eq!(
            machine.on_sample(true, t0 + ms(1500), ms(1000)),
            Some(ButtonEvent::HoldStarted)
        );
    }
}
