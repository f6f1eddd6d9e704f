//! Motion sources: a polled PIR input line, or a simulated sensor.

use crate::error::Result;
use crate::hardware::gpio::InputLine;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::debug;

/// Interval between reads while waiting for motion.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Presence capability consumed by the motion detector.
#[async_trait]
pub trait MotionSource: Send + Sync {
    /// Human-readable location of the sensor, for logs.
    fn describe(&self) -> String;

    /// Single instantaneous read.
    fn is_active(&self) -> Result<bool>;

    /// Wait until the sensor is active or `timeout` elapses (`None` waits
    /// forever). Returns whether motion was observed.
    async fn wait_active(&self, timeout: Option<Duration>) -> Result<bool>;

    /// Give the underlying resource back.
    fn release(&mut self) -> Result<()>;
}

/// PIR sensor on a GPIO input, polled at a fixed interval.
///
/// Debounce is left to the sensor module itself; a single high read counts
/// as motion.
pub struct PirInput {
    pin: u8,
    line: Mutex<Box<dyn InputLine>>,
    poll_interval: Duration,
}

impl PirInput {
    pub fn new(line: Box<dyn InputLine>) -> Self {
        Self {
            pin: line.pin(),
            line: Mutex::new(line),
            poll_interval: POLL_INTERVAL,
        }
    }
}

#[async_trait]
impl MotionSource for PirInput {
    fn describe(&self) -> String {
        format!("GPIO {}", self.pin)
    }

    fn is_active(&self) -> Result<bool> {
        self.line
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_high()
    }

    async fn wait_active(&self, timeout: Option<Duration>) -> Result<bool> {
        let start = Instant::now();
        loop {
            if self.is_active()? {
                return Ok(true);
            }
            if let Some(timeout) = timeout {
                if start.elapsed() >= timeout {
                    return Ok(false);
                }
            }
            time::sleep(self.poll_interval).await;
        }
    }

    fn release(&mut self) -> Result<()> {
        self.line
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .release()
    }
}

/// Sensor stand-in for mock mode.
///
/// Never reads active, but every wait reports motion after a fixed delay
/// (ignoring the timeout) so the whole capture path can run without
/// hardware. Clones share the release counter.
#[derive(Debug, Clone)]
pub struct SimulatedPir {
    delay: Duration,
    releases: Arc<AtomicUsize>,
}

impl SimulatedPir {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times the sensor was released.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MotionSource for SimulatedPir {
    fn describe(&self) -> String {
        "simulated sensor".to_string()
    }

    fn is_active(&self) -> Result<bool> {
        Ok(false)
    }

    async fn wait_active(&self, _timeout: Option<Duration>) -> Result<bool> {
        debug!("Simulating motion detection");
        time::sleep(self.delay).await;
        Ok(true)
    }

    fn release(&mut self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::gpio::{GpioProvider, Pull, SimulatedGpio};

    fn pir(gpio: &SimulatedGpio) -> PirInput {
        PirInput::new(gpio.input(17, Pull::Down).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_within_one_poll() {
        let gpio = SimulatedGpio::new();
        let sensor = pir(&gpio);
        let timeout = Duration::from_secs(1);

        let start = Instant::now();
        let detected = sensor.wait_active(Some(timeout)).await.unwrap();
        let elapsed = start.elapsed();

        assert!(!detected);
        assert!(elapsed >= timeout);
        assert!(elapsed <= timeout + POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_immediately_when_active() {
        let gpio = SimulatedGpio::new();
        gpio.set_level(17, true);
        let sensor = pir(&gpio);

        let start = Instant::now();
        assert!(sensor.wait_active(Some(Duration::from_secs(5))).await.unwrap());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sees_motion_raised_mid_wait() {
        let gpio = SimulatedGpio::new();
        let sensor = pir(&gpio);

        let trigger = gpio.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(350)).await;
            trigger.set_level(17, true);
        });

        let start = Instant::now();
        assert!(sensor.wait_active(None).await.unwrap());
        assert!(start.elapsed() >= Duration::from_millis(350));
        assert!(start.elapsed() <= Duration::from_millis(350) + POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_pir_ignores_timeout() {
        let sensor = SimulatedPir::new(Duration::from_secs(2));
        assert!(!sensor.is_active().unwrap());

        let start = Instant::now();
        assert!(sensor.wait_active(Some(Duration::from_secs(1))).await.unwrap());
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn test_release_reaches_line() {
        let gpio = SimulatedGpio::new();
        let mut sensor = pir(&gpio);
        sensor.release().unwrap();
        assert_eq!(gpio.pin(17).releases, 1);
        assert!(sensor.is_active().is_err());
    }
}
