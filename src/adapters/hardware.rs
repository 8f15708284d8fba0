//! Hardware adapter: bridges the board drivers to the domain ports.
//!
//! Owns the RFID reader, the ultrasonic ranger, the LCD, the LED/buzzer
//! bank and the RNG, and exposes all of them as one [`DevicePort`] so the
//! controller takes a single `&mut hw`.  Each part is generic, so host
//! tests can drop in mocks for any subset.
//!
//! [`DevicePort`]: crate::app::ports::DevicePort

use crate::access::RfidCode;
use crate::app::ports::{CardReaderPort, DisplayPort, EntropyPort, IndicatorPort, RangerPort};
use crate::indicator::{LedState, Tone};

/// Concrete adapter that combines all board I/O behind the port traits.
pub struct HardwareAdapter<C, R, D, I, E> {
    reader: C,
    ranger: R,
    display: D,
    indicators: I,
    rng: E,
}

impl<C, R, D, I, E> HardwareAdapter<C, R, D, I, E>
where
    C: CardReaderPort,
    R: RangerPort,
    D: DisplayPort,
    I: IndicatorPort,
    E: EntropyPort,
{
    pub fn new(reader: C, ranger: R, display: D, indicators: I, rng: E) -> Self {
        Self {
            reader,
            ranger,
            display,
            indicators,
            rng,
        }
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }
}

// ── CardReaderPort / RangerPort ───────────────────────────────

impl<C: CardReaderPort, R, D, I, E> CardReaderPort for HardwareAdapter<C, R, D, I, E> {
    fn poll_card(&mut self) -> Option<RfidCode> {
        self.reader.poll_card()
    }
}

impl<C, R: RangerPort, D, I, E> RangerPort for HardwareAdapter<C, R, D, I, E> {
    fn measure_cm(&mut self) -> f32 {
        self.ranger.measure_cm()
    }
}

// ── DisplayPort / IndicatorPort ───────────────────────────────

impl<C, R, D: DisplayPort, I, E> DisplayPort for HardwareAdapter<C, R, D, I, E> {
    fn show(&mut self, line1: &str, line2: &str) {
        self.display.show(line1, line2);
    }
}

impl<C, R, D, I: IndicatorPort, E> IndicatorPort for HardwareAdapter<C, R, D, I, E> {
    fn set_led(&mut self, led: LedState) {
        self.indicators.set_led(led);
    }

    fn beep(&mut self, tone: Tone, now_ms: u64) {
        self.indicators.beep(tone, now_ms);
    }

    fn service(&mut self, now_ms: u64) {
        self.indicators.service(now_ms);
    }
}

// ── EntropyPort ───────────────────────────────────────────────

impl<C, R, D, I, E: EntropyPort> EntropyPort for HardwareAdapter<C, R, D, I, E> {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }
}
