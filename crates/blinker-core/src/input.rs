// Button input lines.
//
// The button is wired between a GPIO line and ground with the internal
// pull-up enabled, so a low level means "pressed". Lines are polled;
// nothing here relies on edge interrupts.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::InputError;

/// A polled digital input.
pub trait InputLine: Send + Sync {
    /// `true` while the button is held down.
    fn is_asserted(&self) -> Result<bool, InputError>;
}

/// In-memory line for tests, simulations and non-Pi hosts.
#[derive(Debug, Default)]
pub struct SimulatedLine {
    asserted: AtomicBool,
}

impl SimulatedLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        self.asserted.store(true, Ordering::Release);
    }

    pub fn release(&self) {
        self.asserted.store(false, Ordering::Release);
    }
}

impl InputLine for SimulatedLine {
    fn is_asserted(&self) -> Result<bool, InputError> {
        Ok(self.asserted.load(Ordering::Acquire))
    }
}

#[cfg(feature = "pi")]
pub use gpio::GpioLine;

#[cfg(feature = "pi")]
mod gpio {
    use std::sync::Mutex;

    use rppal::gpio::{Gpio, InputPin};
    use tracing::info;

    use super::InputLine;
    use crate::error::InputError;

    /// A Raspberry Pi GPIO line with the internal pull-up enabled.
    #[derive(Debug)]
    pub struct GpioLine {
        pin: Mutex<InputPin>,
    }

    impl GpioLine {
        /// Claim BCM pin `bcm` as a pulled-up input.
        pub fn open(bcm: u8) -> Result<Self, InputError> {
            let pin = Gpio::new()?.get(bcm)?.into_input_pullup();
            info!(pin = bcm, "button input ready");
            Ok(Self {
                pin: Mutex::new(pin),
            })
        }
    }

    impl InputLine for GpioLine {
        fn is_asserted(&self) -> Result<bool, InputError> {
            let pin = self
                .pin
                .lock()
                .map_err(|_| InputError::Unavailable("GPIO line lock poisoned".into()))?;
            Ok(pin.is_low())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_line_follows_press_and_release() {
        let line = SimulatedLine::new();
        assert!(!line.is_asserted().unwrap_or(true));
        line.press();
        assert!(line.is_asserted().unwrap_or(false));
        line.release();
        assert!(!line.is_asserted().unwrap_or(true));
    }
}
