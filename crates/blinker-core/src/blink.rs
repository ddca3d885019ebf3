// ── Blink sequencing ──
//
// Timed two-color blink loops. One sequence drives the strip at a time:
// starting a sequence clears `active` (stopping whoever is running) and
// then waits on the drive lock, so pushes from two patterns never
// interleave. Every sequence ends with exactly one revert to the default
// appearance, whatever the reason it stopped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use strum::Display;
use tokio::sync::OwnedMutexGuard;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use blinker_api::{Color, WledClient};

use crate::config::SharedConfig;
use crate::device::DeviceClient;
use crate::error::InputError;
use crate::input::InputLine;
use crate::palette::Palette;
use crate::transport::DeviceTransport;

/// Polling cadence of every blink loop.
pub const TICK: Duration = Duration::from_millis(10);

/// Which pattern is currently driving the strip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Pattern {
    #[default]
    None,
    Short,
    Long,
}

/// How long a long pattern runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongMode {
    Timed(Duration),
    /// Until the input line is released.
    WhileHeld,
}

/// How a sequence ended. The default appearance has been restored in
/// every case.
#[derive(Debug)]
pub enum SequenceOutcome {
    /// Ran for its full duration, or until release for hold-driven runs.
    Completed,
    /// A short run that turned into the long pattern and then finished.
    Escalated,
    /// Stopped early by `cancel` or by a newer sequence.
    Cancelled,
    /// A newer sequence was requested before this one got to run.
    Superseded,
    /// The input line failed mid-run.
    Failed(InputError),
}

#[derive(Debug, Default)]
struct SequenceState {
    active: bool,
    pattern: Pattern,
    generation: u64,
}

/// Exclusive right to drive the strip, held for one sequence.
#[derive(Debug)]
struct Claim {
    generation: u64,
    /// `false` when a newer sequence was requested while waiting.
    current: bool,
    _drive: OwnedMutexGuard<()>,
}

/// Alternates between two `(color, brightness)` steps.
#[derive(Debug, Clone)]
struct Toggle {
    steps: [(Color, u8); 2],
    second: bool,
    last: Option<Instant>,
}

impl Toggle {
    fn new(steps: [(Color, u8); 2]) -> Self {
        Self {
            steps,
            second: false,
            last: None,
        }
    }

    /// The next step if `interval` has passed since the last one. The
    /// first call is always due.
    fn due(&mut self, now: Instant, interval: Duration) -> Option<(Color, u8)> {
        if self
            .last
            .is_some_and(|last| now.duration_since(last) < interval)
        {
            return None;
        }
        let [first, second] = self.steps;
        let step = if self.second { second } else { first };
        self.second = !self.second;
        self.last = Some(now);
        Some(step)
    }
}

/// A long pattern driven tick by tick from the button loop while the
/// button stays held.
#[derive(Debug)]
pub struct HoldSession {
    claim: Claim,
    toggle: Toggle,
    interval: Duration,
}

/// Runs blink sequences against one device.
pub struct BlinkSequencer<T = WledClient> {
    device: Arc<DeviceClient<T>>,
    config: SharedConfig,
    input: Arc<dyn InputLine>,
    state: Mutex<SequenceState>,
    drive: Arc<tokio::sync::Mutex<()>>,
}

impl<T> std::fmt::Debug for BlinkSequencer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlinkSequencer")
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}

impl<T> BlinkSequencer<T> {
    fn state(&self) -> MutexGuard<'_, SequenceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    pub fn pattern(&self) -> Pattern {
        self.state().pattern
    }

    /// Stop the running sequence. It notices within one tick and reverts.
    pub fn cancel(&self) {
        let mut state = self.state();
        if state.active {
            debug!(pattern = %state.pattern, "stopping active sequence");
        }
        state.active = false;
    }

    fn owns(&self, claim: &Claim) -> bool {
        let state = self.state();
        claim.current && state.active && state.generation == claim.generation
    }

    fn set_pattern(&self, claim: &Claim, pattern: Pattern) {
        let mut state = self.state();
        if state.generation == claim.generation {
            state.pattern = pattern;
        }
    }
}

impl<T: DeviceTransport> BlinkSequencer<T> {
    pub fn new(device: Arc<DeviceClient<T>>, config: SharedConfig, input: Arc<dyn InputLine>) -> Self {
        Self {
            device,
            config,
            input,
            state: Mutex::new(SequenceState::default()),
            drive: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    // ── Entry points ─────────────────────────────────────────────────

    /// Blink blue/white for `short_flash_duration`, switching to the
    /// alert pattern if the button is held past the long-press threshold.
    pub async fn run_short(&self) -> SequenceOutcome {
        let claim = self.claim(Pattern::Short).await;
        let outcome = if claim.current {
            self.short_loop(&claim)
                .await
                .unwrap_or_else(SequenceOutcome::Failed)
        } else {
            SequenceOutcome::Superseded
        };
        self.finish(claim, outcome).await
    }

    /// Blink red/off for a fixed time or while the button is held.
    pub async fn run_long(&self, mode: LongMode) -> SequenceOutcome {
        let claim = self.claim(Pattern::Long).await;
        let outcome = if claim.current {
            self.long_loop(&claim, mode)
                .await
                .unwrap_or_else(SequenceOutcome::Failed)
        } else {
            SequenceOutcome::Superseded
        };
        self.finish(claim, outcome).await
    }

    /// Take over the strip for a hold-driven alert. Drive it with
    /// [`hold_tick`](Self::hold_tick) and end it with
    /// [`end_hold`](Self::end_hold).
    pub async fn begin_hold(&self) -> HoldSession {
        let claim = self.claim(Pattern::Long).await;
        let config = self.config.load();
        info!("blinking alert while button is held");
        HoldSession {
            claim,
            toggle: Toggle::new(Palette::for_strip(config.rgbw).long_pattern(config.brightness)),
            interval: config.toggle_interval(),
        }
    }

    /// Advance a hold session. `false` once another sequence has taken
    /// over; the caller should end the session.
    pub async fn hold_tick(&self, session: &mut HoldSession) -> bool {
        if !self.owns(&session.claim) {
            return false;
        }
        if let Some(step) = session.toggle.due(Instant::now(), session.interval) {
            self.show(step).await;
        }
        true
    }

    pub async fn end_hold(&self, session: HoldSession) -> SequenceOutcome {
        let outcome = if !session.claim.current {
            SequenceOutcome::Superseded
        } else if self.owns(&session.claim) {
            SequenceOutcome::Completed
        } else {
            SequenceOutcome::Cancelled
        };
        self.finish(session.claim, outcome).await
    }

    // ── Sequence lifecycle ───────────────────────────────────────────

    async fn claim(&self, pattern: Pattern) -> Claim {
        let generation = {
            let mut state = self.state();
            state.active = false;
            state.generation += 1;
            state.generation
        };

        let drive = Arc::clone(&self.drive).lock_owned().await;

        let mut state = self.state();
        let current = state.generation == generation;
        if current {
            state.active = true;
            state.pattern = pattern;
            debug!(%pattern, generation, "sequence started");
        }
        Claim {
            generation,
            current,
            _drive: drive,
        }
    }

    /// Revert, clear the active flag and release the drive lock.
    ///
    /// A failed revert waits out the reconnect, including one a blink step
    /// started in the background, and reverts again so the default lands
    /// after anything recovery resends.
    async fn finish(&self, claim: Claim, outcome: SequenceOutcome) -> SequenceOutcome {
        if !self.device.revert_to_default().await {
            warn!("could not revert to default appearance, waiting for the device");
            if !(self.device.ensure_connected().await && self.device.revert_to_default().await) {
                warn!("could not revert to default appearance");
            }
        }

        {
            let mut state = self.state();
            if state.generation == claim.generation {
                state.active = false;
                state.pattern = Pattern::None;
            }
        }

        match &outcome {
            SequenceOutcome::Failed(e) => warn!(error = %e, "blink sequence aborted"),
            other => debug!(outcome = ?other, "blink sequence finished"),
        }
        outcome
    }

    // ── Loops ────────────────────────────────────────────────────────

    async fn short_loop(&self, claim: &Claim) -> Result<SequenceOutcome, InputError> {
        let config = self.config.load();
        let palette = Palette::for_strip(config.rgbw);
        let interval = config.toggle_interval();
        let deadline = Instant::now() + config.short_flash_duration;
        let mut toggle = Toggle::new(palette.short_pattern(config.brightness));
        let mut held_since: Option<Instant> = None;

        info!(
            duration_ms = duration_ms(config.short_flash_duration),
            "short press blink"
        );

        while Instant::now() < deadline {
            if !self.owns(claim) {
                return Ok(SequenceOutcome::Cancelled);
            }

            let now = Instant::now();
            if self.input.is_asserted()? {
                let since = *held_since.get_or_insert(now);
                if now.duration_since(since) >= config.long_press_threshold {
                    info!("long press detected during short blink, switching to alert");
                    self.set_pattern(claim, Pattern::Long);
                    return self.escalate(claim, deadline).await;
                }
            } else {
                held_since = None;
            }

            if let Some(step) = toggle.due(now, interval) {
                self.show(step).await;
            }
            sleep(TICK).await;
        }
        Ok(SequenceOutcome::Completed)
    }

    /// Alert pattern inside a short run. Ends on release; if the short
    /// window runs out first, a full timed alert follows.
    async fn escalate(
        &self,
        claim: &Claim,
        deadline: Instant,
    ) -> Result<SequenceOutcome, InputError> {
        let config = self.config.load();
        let interval = config.toggle_interval();
        let mut toggle =
            Toggle::new(Palette::for_strip(config.rgbw).long_pattern(config.brightness));

        loop {
            if !self.owns(claim) {
                return Ok(SequenceOutcome::Cancelled);
            }
            if !self.input.is_asserted()? {
                info!("button released, ending alert");
                return Ok(SequenceOutcome::Escalated);
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if let Some(step) = toggle.due(now, interval) {
                self.show(step).await;
            }
            sleep(TICK).await;
        }

        info!("button still held after the blink window, running full alert");
        let outcome = self
            .long_loop(claim, LongMode::Timed(config.short_flash_duration))
            .await?;
        Ok(match outcome {
            SequenceOutcome::Completed => SequenceOutcome::Escalated,
            other => other,
        })
    }

    async fn long_loop(&self, claim: &Claim, mode: LongMode) -> Result<SequenceOutcome, InputError> {
        let config = self.config.load();
        let interval = config.toggle_interval();
        let mut toggle =
            Toggle::new(Palette::for_strip(config.rgbw).long_pattern(config.brightness));
        let start = Instant::now();

        match mode {
            LongMode::Timed(d) => info!(duration_ms = duration_ms(d), "long press alert"),
            LongMode::WhileHeld => info!("long press alert until release"),
        }

        loop {
            if !self.owns(claim) {
                return Ok(SequenceOutcome::Cancelled);
            }
            let now = Instant::now();
            let done = match mode {
                LongMode::Timed(duration) => now.duration_since(start) >= duration,
                LongMode::WhileHeld => !self.input.is_asserted()?,
            };
            if done {
                return Ok(SequenceOutcome::Completed);
            }
            if let Some(step) = toggle.due(now, interval) {
                self.show(step).await;
            }
            sleep(TICK).await;
        }
    }

    /// Push one blink step. A failed push starts background recovery so
    /// the loop keeps its cadence.
    async fn show(&self, (color, brightness): (Color, u8)) {
        if !self.device.set_color(color, brightness).await {
            self.device.spawn_recovery();
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
