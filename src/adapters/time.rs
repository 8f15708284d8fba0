//! Monotonic clock adapter.
//!
//! Implements [`ClockPort`] for the controller loop and exposes a
//! microsecond reading for echo timing in the ultrasonic driver.
//!
//! - **`target_os = "espidf"`** wraps `esp_timer_get_time()` (64-bit
//!   microseconds since boot).
//! - **other targets** measure from construction with `std::time::Instant`.

use crate::app::ports::ClockPort;

/// Uptime clock.  Cheap to copy; copies share the same epoch.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot.
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: esp_timer is started by the IDF before app_main.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since the clock was created.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl ClockPort for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }
}
