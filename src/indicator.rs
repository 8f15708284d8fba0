//! Timed indicator holds.
//!
//! The locker answers a scan with a short show: a message, an LED colour, a
//! beep, then a pause before the idle screen comes back.  Instead of blocking
//! the loop for those pauses, a [`HoldSequencer`] steps through a static
//! program, one [`HoldStep`] at a time, checking its deadline each tick.
//!
//! ```text
//!   arm(ACCESS_GRANTED)
//!     │
//!     ▼
//!   ┌──────────────┐ 2000 ms ┌──────────────────┐ 5000 ms ┌──────┐
//!   │ Processing...│────────▶│ Access Granted   │────────▶│ idle │
//!   │ LED off      │         │ green · 2000 Hz  │         │ LEDs │
//!   └──────────────┘         └──────────────────┘         │ off  │
//!                                                         └──────┘
//! ```
//!
//! While a hold is armed the periodic capacity screen stays away from the
//! LCD.  Opening a session cancels any hold.

use log::debug;

use crate::app::ports::{DisplayPort, IndicatorPort};
use crate::display::fit_line;

/// State of the green/red LED pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    Off,
    Green,
    Red,
}

/// A buzzer tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub hz: u32,
    pub duration_ms: u32,
}

impl Tone {
    pub const fn new(hz: u32, duration_ms: u32) -> Self {
        Self { hz, duration_ms }
    }
}

/// One screen of a hold program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldStep {
    pub line1: &'static str,
    pub line2: &'static str,
    pub led: LedState,
    pub tone: Option<Tone>,
    pub hold_ms: u32,
}

// ───────────────────────────────────────────────────────────────
// Programs
// ───────────────────────────────────────────────────────────────

const PROCESSING: HoldStep = HoldStep {
    line1: "Processing...",
    line2: "Please wait",
    led: LedState::Off,
    tone: None,
    hold_ms: 2_000,
};

/// Package-access scan accepted.
pub const ACCESS_GRANTED: &[HoldStep] = &[
    PROCESSING,
    HoldStep {
        line1: "Access Granted",
        line2: "Take your package",
        led: LedState::Green,
        tone: Some(Tone::new(2_000, 1_000)),
        hold_ms: 5_000,
    },
];

/// Package-access scan refused.
pub const ACCESS_DENIED: &[HoldStep] = &[
    PROCESSING,
    HoldStep {
        line1: "Access Denied",
        line2: "Invalid RFID",
        led: LedState::Red,
        tone: Some(Tone::new(500, 1_000)),
        hold_ms: 3_000,
    },
];

/// Self-service scan at the idle screen, code accepted.
pub const SELF_ACCESS_OK: &[HoldStep] = &[
    HoldStep {
        line1: "Welcome!",
        line2: "Checking packages",
        led: LedState::Off,
        tone: None,
        hold_ms: 2_000,
    },
    HoldStep {
        line1: "Package Found",
        line2: "Opening box...",
        led: LedState::Green,
        tone: Some(Tone::new(1_800, 500)),
        hold_ms: 3_000,
    },
];

/// Self-service scan at the idle screen, code rejected.
pub const SELF_ACCESS_REJECTED: &[HoldStep] = &[HoldStep {
    line1: "Invalid RFID",
    line2: "Try again",
    led: LedState::Red,
    tone: Some(Tone::new(400, 500)),
    hold_ms: 2_000,
}];

/// Shown once after boot.
pub const SYSTEM_READY: &[HoldStep] = &[HoldStep {
    line1: "System Ready",
    line2: "Waiting...",
    led: LedState::Off,
    tone: Some(Tone::new(1_000, 200)),
    hold_ms: 2_000,
}];

// ───────────────────────────────────────────────────────────────
// Sequencer
// ───────────────────────────────────────────────────────────────

/// Steps through a hold program without blocking.
pub struct HoldSequencer {
    program: &'static [HoldStep],
    step: usize,
    /// Deadline of the current step; `None` until the step is shown.
    deadline_ms: Option<u64>,
}

impl Default for HoldSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl HoldSequencer {
    pub const fn new() -> Self {
        Self {
            program: &[],
            step: 0,
            deadline_ms: None,
        }
    }

    /// Start `program` from its first step.  Replaces any running program.
    pub fn arm(&mut self, program: &'static [HoldStep]) {
        self.program = program;
        self.step = 0;
        self.deadline_ms = None;
    }

    /// Drop the running program.  Returns `true` if one was running.
    /// Outputs are left as they are; the caller owns what comes next.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.program = &[];
        self.step = 0;
        self.deadline_ms = None;
        was_active
    }

    pub fn is_active(&self) -> bool {
        self.step < self.program.len()
    }

    /// Show the next step when the current one has expired.  Clears the
    /// LEDs once the last step ends.
    pub fn advance<H>(&mut self, now_ms: u64, hw: &mut H)
    where
        H: DisplayPort + IndicatorPort,
    {
        while let Some(step) = self.program.get(self.step) {
            match self.deadline_ms {
                None => {
                    hw.show(&fit_line(step.line1), &fit_line(step.line2));
                    hw.set_led(step.led);
                    if let Some(tone) = step.tone {
                        hw.beep(tone, now_ms);
                    }
                    self.deadline_ms = Some(now_ms + u64::from(step.hold_ms));
                    return;
                }
                Some(deadline) if now_ms >= deadline => {
                    self.step += 1;
                    self.deadline_ms = None;
                    if !self.is_active() {
                        debug!("Hold: program finished");
                        hw.set_led(LedState::Off);
                        self.program = &[];
                        self.step = 0;
                        return;
                    }
                }
                Some(_) => return,
            }
        }
    }
}
