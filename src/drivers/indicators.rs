//! Green/red status LEDs and piezo buzzer.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: LEDs are plain GPIO outputs and the buzzer is an LEDC
//! channel, both via hw_init.
//! On host/test: the pin writes are no-ops and state is tracked in memory.
//!
//! Tones never block.  `beep()` starts the square wave and records a
//! deadline; `service()` silences it once the deadline passes.

use crate::app::ports::IndicatorPort;
use crate::drivers::hw_init;
use crate::indicator::{LedState, Tone};
use crate::pins;

pub struct Indicators {
    led: LedState,
    /// Frequency and stop time of the tone currently sounding.
    tone: Option<(u32, u64)>,
}

impl Indicators {
    pub fn new() -> Self {
        hw_init::gpio_write(pins::LED_GREEN_GPIO, false);
        hw_init::gpio_write(pins::LED_RED_GPIO, false);
        hw_init::buzzer_off();
        Self { led: LedState::Off, tone: None }
    }

    pub fn led(&self) -> LedState {
        self.led
    }

    /// Frequency of the tone currently sounding.
    pub fn sounding(&self) -> Option<u32> {
        self.tone.map(|(hz, _)| hz)
    }
}

impl Default for Indicators {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorPort for Indicators {
    fn set_led(&mut self, led: LedState) {
        hw_init::gpio_write(pins::LED_GREEN_GPIO, led == LedState::Green);
        hw_init::gpio_write(pins::LED_RED_GPIO, led == LedState::Red);
        self.led = led;
    }

    fn beep(&mut self, tone: Tone, now_ms: u64) {
        if tone.hz == 0 || tone.duration_ms == 0 {
            return;
        }
        hw_init::buzzer_on(tone.hz);
        self.tone = Some((tone.hz, now_ms + u64::from(tone.duration_ms)));
    }

    fn service(&mut self, now_ms: u64) {
        match self.tone {
            Some((_, until)) if now_ms >= until => {
                hw_init::buzzer_off();
                self.tone = None;
            }
            _ => {}
        }
    }
}
