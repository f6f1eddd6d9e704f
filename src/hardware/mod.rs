//! Hardware capabilities and their real/simulated backends.
//!
//! Every device the appliance touches sits behind a trait: GPIO lines,
//! the motion source and the still camera. The backend is picked once,
//! when [`Hardware`] is assembled, and the components never look at the
//! mock flag themselves.

pub mod camera;
pub mod gpio;
pub mod pir;

// Re-export commonly used items
pub use camera::{CameraDevice, CameraLog, RpicamCamera, SimulatedCamera};
pub use gpio::{GpioProvider, InputLine, OutputLine, Pull, SimulatedGpio, SimulatedPin};
pub use pir::{MotionSource, PirInput, SimulatedPir, POLL_INTERVAL};

#[cfg(feature = "gpio")]
pub use gpio::RaspberryPiGpio;

use crate::config::SentryConfig;
use crate::error::Result;

/// The set of devices one sentry loop owns.
pub struct Hardware {
    /// PIR sensor
    pub motion: Box<dyn MotionSource>,
    /// Still camera
    pub camera: Box<dyn CameraDevice>,
    /// Status LED line
    pub led: Box<dyn OutputLine>,
}

impl Hardware {
    /// Assemble the backend the configuration asks for.
    pub fn from_config(config: &SentryConfig) -> Result<Self> {
        if config.mock_hardware {
            Self::simulated(config)
        } else {
            Self::raspberry_pi(config)
        }
    }

    /// Software stand-ins for every device.
    pub fn simulated(config: &SentryConfig) -> Result<Self> {
        let gpio = SimulatedGpio::new();
        Ok(Self {
            motion: Box::new(SimulatedPir::new(config.simulated_motion_delay)),
            camera: Box::new(SimulatedCamera::new()),
            led: gpio.output(config.led_pin)?,
        })
    }

    /// Real PIR and LED through rppal, camera through `rpicam-still`.
    #[cfg(feature = "gpio")]
    pub fn raspberry_pi(config: &SentryConfig) -> Result<Self> {
        let gpio = RaspberryPiGpio::new()?;
        Ok(Self {
            motion: Box::new(PirInput::new(gpio.input(config.pir_pin, Pull::Down)?)),
            camera: Box::new(RpicamCamera::new(config.camera_command.clone())),
            led: gpio.output(config.led_pin)?,
        })
    }

    #[cfg(not(feature = "gpio"))]
    pub fn raspberry_pi(_config: &SentryConfig) -> Result<Self> {
        Err(gpio_unavailable())
    }

    /// Open only the status LED, e.g. for the startup pattern.
    pub fn status_led(config: &SentryConfig) -> Result<Box<dyn OutputLine>> {
        if config.mock_hardware {
            return SimulatedGpio::new().output(config.led_pin);
        }

        #[cfg(feature = "gpio")]
        {
            RaspberryPiGpio::new()?.output(config.led_pin)
        }

        #[cfg(not(feature = "gpio"))]
        {
            Err(gpio_unavailable())
        }
    }
}

#[cfg(not(feature = "gpio"))]
fn gpio_unavailable() -> crate::error::SentryError {
    crate::error::SentryError::gpio_error(
        "GPIO support not compiled in; rebuild with --features gpio or set MOCK_HARDWARE=1",
    )
}
