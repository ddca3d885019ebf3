// blinker-core: Button-driven blink sequencing on top of blinker-api.

pub mod backoff;
pub mod blink;
pub mod blinker;
pub mod button;
pub mod config;
pub mod device;
pub mod error;
pub mod health;
pub mod input;
pub mod palette;
pub mod supervisor;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backoff::Backoff;
pub use blink::{BlinkSequencer, HoldSession, LongMode, Pattern, SequenceOutcome};
pub use blinker::Blinker;
pub use button::{ButtonEvent, ButtonLoop, ButtonState, ButtonStateMachine};
pub use config::{BlinkerConfig, ConfigPatch, DefaultMode, EffectSettings, SharedConfig};
pub use device::DeviceClient;
pub use error::{CoreError, FailureKind, InputError, ValidationError};
pub use health::{HealthSnapshot, HealthStatus, HealthTracker};
pub use input::{InputLine, SimulatedLine};
pub use palette::Palette;
pub use supervisor::ConnectionSupervisor;
pub use transport::DeviceTransport;

#[cfg(feature = "pi")]
pub use input::GpioLine;

// Wire types consumers need without depending on blinker-api directly.
pub use blinker_api::{BasicAuth, Color, StatePayload, WledClient};
