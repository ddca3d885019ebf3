// ── Runtime configuration ──
//
// Typed, validated settings the running controller reads on every
// operation. Built by blinker-config (or tests) and handed in; core never
// reads files. Runtime updates arrive as a `ConfigPatch` and are swapped in
// atomically, so an update takes effect on the next blink or revert.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use blinker_api::BasicAuth;

use crate::error::ValidationError;

/// Highest BCM GPIO line on the 40-pin header.
pub const MAX_GPIO_PIN: u8 = 27;

/// Highest effect index accepted for the default appearance.
pub const MAX_EFFECT_INDEX: u16 = 200;

/// Lower bound for durations changed at runtime.
const MIN_RUNTIME_SECS: f64 = 0.1;

/// What the strip shows when no blink sequence is running.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DefaultMode {
    /// Solid white at the configured brightness.
    #[default]
    White,
    /// The configured WLED effect.
    Effect,
}

/// Effect parameters used by the `effect` default mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectSettings {
    pub index: u16,
    pub speed: u8,
    pub intensity: u8,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            index: 162,
            speed: 128,
            intensity: 128,
        }
    }
}

/// Everything the controller needs at runtime.
#[derive(Debug, Clone)]
pub struct BlinkerConfig {
    // ── Device ──
    /// Device base URL (`http://192.168.1.15/`).
    pub device_url: Url,
    pub auth: Option<BasicAuth>,
    pub request_timeout: Duration,
    /// Four-channel (RGBW) strip. Selects the palette.
    pub rgbw: bool,

    // ── Button ──
    /// BCM pin number of the button input.
    pub gpio_pin: u8,
    pub long_press_threshold: Duration,

    // ── Blink ──
    pub short_flash_duration: Duration,
    /// One full on/off period. Colors toggle every half interval.
    pub flash_interval: Duration,
    pub brightness: u8,
    pub transition: Duration,

    // ── Default appearance ──
    pub default_mode: DefaultMode,
    pub effect: EffectSettings,

    // ── Connection ──
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub reconnect_delay: Duration,
    pub health_check_interval: Duration,
    /// Consecutive failures before health turns critical.
    pub max_failed_attempts: u32,
}

impl BlinkerConfig {
    /// Defaults for a device at `device_url`.
    pub fn new(device_url: Url) -> Self {
        Self {
            device_url,
            auth: None,
            request_timeout: Duration::from_secs(5),
            rgbw: true,
            gpio_pin: 18,
            long_press_threshold: Duration::from_secs(3),
            short_flash_duration: Duration::from_secs(5),
            flash_interval: Duration::from_millis(500),
            brightness: 255,
            transition: Duration::ZERO,
            default_mode: DefaultMode::White,
            effect: EffectSettings::default(),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            reconnect_delay: Duration::from_secs(5),
            health_check_interval: Duration::from_secs(60),
            max_failed_attempts: 5,
        }
    }

    /// Transition time as WLED expects it, in milliseconds.
    pub fn transition_ms(&self) -> u32 {
        u32::try_from(self.transition.as_millis()).unwrap_or(u32::MAX)
    }

    /// Half of the flash interval: the time between color toggles.
    pub fn toggle_interval(&self) -> Duration {
        self.flash_interval / 2
    }

    /// Check a fully built configuration before the controller starts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.gpio_pin > MAX_GPIO_PIN {
            return Err(ValidationError::new(
                "gpio_pin",
                format!("{} is not a BCM pin (0-{MAX_GPIO_PIN})", self.gpio_pin),
            ));
        }
        if self.effect.index > MAX_EFFECT_INDEX {
            return Err(ValidationError::new(
                "effect_index",
                format!("{} is outside 0-{MAX_EFFECT_INDEX}", self.effect.index),
            ));
        }
        if self.max_retries == 0 {
            return Err(ValidationError::new("max_retries", "must be at least 1"));
        }
        if self.max_failed_attempts == 0 {
            return Err(ValidationError::new(
                "max_failed_attempts",
                "must be at least 1",
            ));
        }
        for (field, value) in [
            ("long_press_threshold", self.long_press_threshold),
            ("short_flash_duration", self.short_flash_duration),
            ("flash_interval", self.flash_interval),
            ("retry_delay", self.retry_delay),
            ("reconnect_delay", self.reconnect_delay),
            ("request_timeout", self.request_timeout),
            ("health_check_interval", self.health_check_interval),
        ] {
            if value.is_zero() {
                return Err(ValidationError::new(field, "must be greater than zero"));
            }
        }
        Ok(())
    }
}

// ── Runtime updates ─────────────────────────────────────────────────

/// A partial runtime update, as submitted by a control surface.
///
/// Numbers arrive untyped (`i64` / seconds as `f64`) so out-of-range input
/// can be reported instead of failing to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigPatch {
    pub long_press_threshold: Option<f64>,
    pub short_flash_duration: Option<f64>,
    pub flash_interval: Option<f64>,
    pub brightness: Option<i64>,
    pub transition: Option<f64>,
    pub max_retries: Option<i64>,
    pub retry_delay: Option<f64>,
    pub reconnect_delay: Option<f64>,
    pub request_timeout: Option<f64>,
    pub health_check_interval: Option<f64>,
    pub default_mode: Option<DefaultMode>,
    pub effect_index: Option<i64>,
    pub effect_speed: Option<i64>,
    pub effect_intensity: Option<i64>,
}

impl ConfigPatch {
    /// Validate every field and produce the updated configuration.
    ///
    /// Either every field is valid and a new config is returned, or the
    /// first invalid field is reported and `base` is untouched.
    pub fn apply_to(&self, base: &BlinkerConfig) -> Result<BlinkerConfig, ValidationError> {
        let mut next = base.clone();

        if let Some(v) = self.long_press_threshold {
            next.long_press_threshold = seconds("long_press_threshold", v, MIN_RUNTIME_SECS)?;
        }
        if let Some(v) = self.short_flash_duration {
            next.short_flash_duration = seconds("short_flash_duration", v, MIN_RUNTIME_SECS)?;
        }
        if let Some(v) = self.flash_interval {
            next.flash_interval = seconds("flash_interval", v, MIN_RUNTIME_SECS)?;
        }
        if let Some(v) = self.brightness {
            next.brightness = byte("brightness", v)?;
        }
        if let Some(v) = self.transition {
            next.transition = seconds("transition", v, 0.0)?;
        }
        if let Some(v) = self.max_retries {
            next.max_retries = u32::try_from(v)
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| ValidationError::new("max_retries", format!("{v} is below 1")))?;
        }
        if let Some(v) = self.retry_delay {
            next.retry_delay = seconds("retry_delay", v, MIN_RUNTIME_SECS)?;
        }
        if let Some(v) = self.reconnect_delay {
            next.reconnect_delay = seconds("reconnect_delay", v, MIN_RUNTIME_SECS)?;
        }
        if let Some(v) = self.request_timeout {
            next.request_timeout = seconds("request_timeout", v, MIN_RUNTIME_SECS)?;
        }
        if let Some(v) = self.health_check_interval {
            next.health_check_interval = seconds("health_check_interval", v, MIN_RUNTIME_SECS)?;
        }
        if let Some(mode) = self.default_mode {
            next.default_mode = mode;
        }
        if let Some(v) = self.effect_index {
            next.effect.index = u16::try_from(v)
                .ok()
                .filter(|i| *i <= MAX_EFFECT_INDEX)
                .ok_or_else(|| {
                    ValidationError::new(
                        "effect_index",
                        format!("{v} is outside 0-{MAX_EFFECT_INDEX}"),
                    )
                })?;
        }
        if let Some(v) = self.effect_speed {
            next.effect.speed = byte("effect_speed", v)?;
        }
        if let Some(v) = self.effect_intensity {
            next.effect.intensity = byte("effect_intensity", v)?;
        }

        Ok(next)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn seconds(field: &'static str, value: f64, min: f64) -> Result<Duration, ValidationError> {
    if !value.is_finite() || value < min {
        return Err(ValidationError::new(
            field,
            format!("{value} must be at least {min} seconds"),
        ));
    }
    Duration::try_from_secs_f64(value)
        .map_err(|e| ValidationError::new(field, format!("{value}: {e}")))
}

fn byte(field: &'static str, value: i64) -> Result<u8, ValidationError> {
    u8::try_from(value)
        .map_err(|_| ValidationError::new(field, format!("{value} is outside 0-255")))
}

// ── Shared handle ───────────────────────────────────────────────────

/// Lock-free shared view of the live configuration.
///
/// Readers call [`load`](Self::load) per operation, so a swapped-in
/// config is picked up without restarting any task.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<ArcSwap<BlinkerConfig>>,
}

impl SharedConfig {
    pub fn new(config: BlinkerConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Current configuration snapshot.
    pub fn load(&self) -> Arc<BlinkerConfig> {
        self.inner.load_full()
    }

    /// Validate `patch` against the current config and swap it in.
    pub fn update(&self, patch: &ConfigPatch) -> Result<Arc<BlinkerConfig>, ValidationError> {
        loop {
            let current = self.inner.load_full();
            let next = Arc::new(patch.apply_to(&current)?);
            let previous = self.inner.compare_and_swap(&current, Arc::clone(&next));
            if Arc::ptr_eq(&previous, &current) {
                return Ok(next);
            }
        }
    }
}
