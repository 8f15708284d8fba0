//! HC-SR04 ultrasonic ranger.
//!
//! A 10 µs trigger pulse starts a burst; the echo pin then stays high for
//! the round-trip time.  Sound covers one centimetre and back in ~57 µs.
//!
//! The echo is timed by busy-polling against a microsecond clock supplied
//! by the caller (`esp_timer_get_time` on target), so the driver works with
//! any `embedded-hal` pin types.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::debug;

use crate::app::ports::RangerPort;
use crate::error::DriverError;

/// Round-trip microseconds per centimetre.
pub const US_PER_CM: u64 = 57;

/// Longest wait for either echo edge.  30 ms is ~5 m, past the sensor's range.
pub const ECHO_TIMEOUT_US: u64 = 30_000;

/// Echo pulse width to distance.
pub fn echo_to_cm(echo_us: u64) -> f32 {
    echo_us as f32 / US_PER_CM as f32
}

pub struct HcSr04<T, E, D, C> {
    trig: T,
    echo: E,
    delay: D,
    clock_us: C,
}

impl<T, E, D, C> HcSr04<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: FnMut() -> u64,
{
    pub fn new(trig: T, echo: E, delay: D, clock_us: C) -> Self {
        Self {
            trig,
            echo,
            delay,
            clock_us,
        }
    }

    /// Fire one ping and return the echo width in µs.
    pub fn ping(&mut self) -> Result<u64, DriverError> {
        self.trig.set_low().map_err(|_| DriverError::Gpio)?;
        self.delay.delay_us(2);
        self.trig.set_high().map_err(|_| DriverError::Gpio)?;
        self.delay.delay_us(10);
        self.trig.set_low().map_err(|_| DriverError::Gpio)?;

        let sent = (self.clock_us)();
        while !self.echo.is_high().map_err(|_| DriverError::Gpio)? {
            if (self.clock_us)().saturating_sub(sent) > ECHO_TIMEOUT_US {
                return Err(DriverError::Timeout);
            }
        }

        let rise = (self.clock_us)();
        while self.echo.is_high().map_err(|_| DriverError::Gpio)? {
            if (self.clock_us)().saturating_sub(rise) > ECHO_TIMEOUT_US {
                return Err(DriverError::Timeout);
            }
        }
        Ok((self.clock_us)().saturating_sub(rise))
    }
}

impl<T, E, D, C> RangerPort for HcSr04<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: FnMut() -> u64,
{
    fn measure_cm(&mut self) -> f32 {
        match self.ping() {
            Ok(us) => echo_to_cm(us),
            Err(e) => {
                debug!("HC-SR04: {}", e);
                0.0
            }
        }
    }
}
