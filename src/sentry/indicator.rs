//! Status LED control.

use crate::error::{Result, SentryError};
use crate::hardware::OutputLine;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time;
use tracing::{debug, warn};

/// Default on-time and gap of a single blink.
pub const BLINK_DURATION: Duration = Duration::from_millis(100);

/// Binary status indicator on one output line.
///
/// Level changes go through an internal mutex so the indicator can be
/// shared with other tasks.
pub struct StatusIndicator {
    line: Mutex<Option<Box<dyn OutputLine>>>,
}

impl StatusIndicator {
    /// Take ownership of `line` and drive it low.
    pub fn new(mut line: Box<dyn OutputLine>) -> Result<Self> {
        line.write(false)?;
        Ok(Self {
            line: Mutex::new(Some(line)),
        })
    }

    /// Turn the LED on.
    pub fn on(&self) -> Result<()> {
        self.set(true)
    }

    /// Turn the LED off.
    pub fn off(&self) -> Result<()> {
        self.set(false)
    }

    /// Blink `count` times: on for `duration`, off, then `gap` before the
    /// next blink. There is no gap after the last blink.
    pub async fn blink(&self, duration: Duration, count: u32, gap: Duration) -> Result<()> {
        for i in 0..count {
            self.on()?;
            time::sleep(duration).await;
            self.off()?;
            if i + 1 < count {
                time::sleep(gap).await;
            }
        }
        Ok(())
    }

    /// Force the LED off and release the line. Safe to call more than once.
    pub fn cleanup(&self) -> Result<()> {
        let mut guard = self.lock();
        if let Some(mut line) = guard.take() {
            let off = line.write(false);
            let released = line.release();
            off.and(released)?;
        }
        Ok(())
    }

    fn set(&self, high: bool) -> Result<()> {
        let mut guard = self.lock();
        let line = guard
            .as_mut()
            .ok_or_else(|| SentryError::gpio_error("Status LED already released"))?;
        debug!("LED {}", if high { "on" } else { "off" });
        line.write(high)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn OutputLine>>> {
        self.line.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StatusIndicator {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Failed to release status LED: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{GpioProvider, SimulatedGpio};
    use tokio::time::Instant;

    fn indicator(gpio: &SimulatedGpio) -> StatusIndicator {
        StatusIndicator::new(gpio.output(22).unwrap()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_blink_cycles_and_timing() {
        let gpio = SimulatedGpio::new();
        let led = indicator(&gpio);
        let duration = Duration::from_millis(200);
        let gap = Duration::from_millis(300);

        let start = Instant::now();
        led.blink(duration, 3, gap).await.unwrap();

        assert_eq!(start.elapsed(), duration * 3 + gap * 2);
        // initial low, then on/off per blink
        assert_eq!(
            gpio.pin(22).writes,
            vec![false, true, false, true, false, true, false]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_count_blink_is_a_no_op() {
        let gpio = SimulatedGpio::new();
        let led = indicator(&gpio);

        let start = Instant::now();
        led.blink(BLINK_DURATION, 0, BLINK_DURATION).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(gpio.pin(22).writes, vec![false]);
    }

    #[test]
    fn test_cleanup_forces_off_once() {
        let gpio = SimulatedGpio::new();
        let led = indicator(&gpio);

        led.on().unwrap();
        led.cleanup().unwrap();
        led.cleanup().unwrap();
        drop(led);

        let pin = gpio.pin(22);
        assert_eq!(pin.releases, 1);
        assert!(!pin.level);
        assert_eq!(pin.writes.last(), Some(&false));
    }

    #[test]
    fn test_on_after_cleanup_fails() {
        let gpio = SimulatedGpio::new();
        let led = indicator(&gpio);
        led.cleanup().unwrap();
        assert!(matches!(led.on(), Err(SentryError::Gpio(_))));
    }

    #[test]
    fn test_drop_releases_line() {
        let gpio = SimulatedGpio::new();
        drop(indicator(&gpio));
        assert_eq!(gpio.pin(22).releases, 1);
    }
}
