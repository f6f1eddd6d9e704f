//! GPIO lines for the PIR input and the status LED.
//!
//! The Raspberry Pi backend is feature-gated (`gpio`) so the crate builds on
//! machines without the peripheral. The simulated backend is always
//! available and keeps pin levels, write history and release counts in
//! memory so callers can script inputs and inspect outputs.

use crate::error::{Result, SentryError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Input bias resistor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    /// No bias
    Off,
    /// Pull to ground
    Down,
    /// Pull to 3.3V
    Up,
}

/// A digital input line exclusively owned by one component.
pub trait InputLine: Send {
    /// BCM pin number of the line.
    fn pin(&self) -> u8;

    /// Read the current level; `true` is high.
    fn is_high(&self) -> Result<bool>;

    /// Give the line back to the system. Reads fail afterwards.
    fn release(&mut self) -> Result<()>;
}

/// A digital output line exclusively owned by one component.
pub trait OutputLine: Send {
    /// BCM pin number of the line.
    fn pin(&self) -> u8;

    /// Drive the line high (`true`) or low (`false`).
    fn write(&mut self, high: bool) -> Result<()>;

    /// Give the line back to the system. Writes fail afterwards.
    fn release(&mut self) -> Result<()>;
}

/// Trait for opening GPIO lines.
pub trait GpioProvider {
    /// Claim `pin` as an input with the given bias.
    fn input(&self, pin: u8, pull: Pull) -> Result<Box<dyn InputLine>>;

    /// Claim `pin` as an output, initially low.
    fn output(&self, pin: u8) -> Result<Box<dyn OutputLine>>;
}

#[cfg(feature = "gpio")]
mod raspberry_pi {
    use super::*;
    use rppal::gpio::{Gpio, InputPin, Level, OutputPin};

    /// Raspberry Pi GPIO provider using rppal.
    pub struct RaspberryPiGpio {
        gpio: Gpio,
    }

    impl RaspberryPiGpio {
        /// Create a new Raspberry Pi GPIO provider.
        pub fn new() -> Result<Self> {
            let gpio = Gpio::new().map_err(|e| {
                SentryError::gpio_error(format!("Failed to initialize GPIO: {}", e))
            })?;

            Ok(Self { gpio })
        }
    }

    impl GpioProvider for RaspberryPiGpio {
        fn input(&self, pin: u8, pull: Pull) -> Result<Box<dyn InputLine>> {
            let gpio_pin = self.gpio.get(pin).map_err(|e| {
                SentryError::gpio_error(format!("Failed to access pin {}: {}", pin, e))
            })?;

            let line = match pull {
                Pull::Off => gpio_pin.into_input(),
                Pull::Down => gpio_pin.into_input_pulldown(),
                Pull::Up => gpio_pin.into_input_pullup(),
            };

            Ok(Box::new(RppalInput {
                pin,
                line: Some(line),
            }))
        }

        fn output(&self, pin: u8) -> Result<Box<dyn OutputLine>> {
            let gpio_pin = self.gpio.get(pin).map_err(|e| {
                SentryError::gpio_error(format!("Failed to access pin {}: {}", pin, e))
            })?;

            Ok(Box::new(RppalOutput {
                pin,
                line: Some(gpio_pin.into_output_low()),
            }))
        }
    }

    // rppal resets the pin to its previous mode when the handle drops, so
    // releasing a line is just dropping it.
    struct RppalInput {
        pin: u8,
        line: Option<InputPin>,
    }

    impl InputLine for RppalInput {
        fn pin(&self) -> u8 {
            self.pin
        }

        fn is_high(&self) -> Result<bool> {
            let line = self.line.as_ref().ok_or_else(|| {
                SentryError::gpio_error(format!("GPIO {} already released", self.pin))
            })?;
            Ok(line.read() == Level::High)
        }

        fn release(&mut self) -> Result<()> {
            self.line.take();
            Ok(())
        }
    }

    struct RppalOutput {
        pin: u8,
        line: Option<OutputPin>,
    }

    impl OutputLine for RppalOutput {
        fn pin(&self) -> u8 {
            self.pin
        }

        fn write(&mut self, high: bool) -> Result<()> {
            let line = self.line.as_mut().ok_or_else(|| {
                SentryError::gpio_error(format!("GPIO {} already released", self.pin))
            })?;
            if high {
                line.set_high();
            } else {
                line.set_low();
            }
            Ok(())
        }

        fn release(&mut self) -> Result<()> {
            if let Some(mut line) = self.line.take() {
                line.set_low();
            }
            Ok(())
        }
    }
}

#[cfg(feature = "gpio")]
pub use raspberry_pi::RaspberryPiGpio;

/// Recorded state of one simulated pin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedPin {
    /// Current level
    pub level: bool,
    /// Every level written to the pin, oldest first
    pub writes: Vec<bool>,
    /// Number of times a line on this pin was released
    pub releases: usize,
}

/// In-memory GPIO used in mock mode and in tests.
///
/// Clones share the same pin table.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGpio {
    pins: Arc<Mutex<HashMap<u8, SimulatedPin>>>,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive a simulated input pin.
    pub fn set_level(&self, pin: u8, high: bool) {
        self.with_pin(pin, |state| state.level = high);
    }

    /// Snapshot of a pin's recorded state.
    pub fn pin(&self, pin: u8) -> SimulatedPin {
        self.with_pin(pin, |state| state.clone())
    }

    fn with_pin<T>(&self, pin: u8, f: impl FnOnce(&mut SimulatedPin) -> T) -> T {
        let mut pins = self.pins.lock().unwrap_or_else(PoisonError::into_inner);
        f(pins.entry(pin).or_default())
    }
}

impl GpioProvider for SimulatedGpio {
    fn input(&self, pin: u8, pull: Pull) -> Result<Box<dyn InputLine>> {
        debug!(pin, ?pull, "Simulated input line");
        Ok(Box::new(SimulatedLine {
            pin,
            gpio: self.clone(),
            released: false,
        }))
    }

    fn output(&self, pin: u8) -> Result<Box<dyn OutputLine>> {
        debug!(pin, "Simulated output line");
        self.set_level(pin, false);
        Ok(Box::new(SimulatedLine {
            pin,
            gpio: self.clone(),
            released: false,
        }))
    }
}

struct SimulatedLine {
    pin: u8,
    gpio: SimulatedGpio,
    released: bool,
}

impl SimulatedLine {
    fn ensure_claimed(&self) -> Result<()> {
        if self.released {
            return Err(SentryError::gpio_error(format!(
                "GPIO {} already released",
                self.pin
            )));
        }
        Ok(())
    }
}

impl InputLine for SimulatedLine {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn is_high(&self) -> Result<bool> {
        self.ensure_claimed()?;
        Ok(self.gpio.pin(self.pin).level)
    }

    fn release(&mut self) -> Result<()> {
        self.ensure_claimed()?;
        self.released = true;
        self.gpio.with_pin(self.pin, |state| state.releases += 1);
        Ok(())
    }
}

impl OutputLine for SimulatedLine {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn write(&mut self, high: bool) -> Result<()> {
        self.ensure_claimed()?;
        self.gpio.with_pin(self.pin, |state| {
            state.level = high;
            state.writes.push(high);
        });
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.ensure_claimed()?;
        self.released = true;
        self.gpio.with_pin(self.pin, |state| {
            state.level = false;
            state.releases += 1;
        });
        Ok(())
    }
}
