//! Shared mutable context threaded through every FSM handler.
//!
//! `SessionContext` is the single struct that state handlers read from and
//! write to: the inputs gathered this tick, the two session records, and an
//! outbox of [`Effect`]s.  Handlers never perform I/O themselves; the
//! controller drains the outbox and applies it through the ports.

use crate::access::RfidCode;
use crate::app::events::AppEvent;
use crate::backend::BackendOp;
use crate::backend::records::{AccessRequest, PairingRequest};
use crate::config::SystemConfig;
use crate::display::{Line, fit_line};
use crate::indicator::{HoldStep, LedState, Tone};

// ---------------------------------------------------------------------------
// Inputs (written by the controller before each FSM tick)
// ---------------------------------------------------------------------------

/// Everything observed since the previous FSM tick.  Cleared after the tick.
#[derive(Debug, Clone, Default)]
pub struct SessionInputs {
    /// Set by a status poll that found an active pairing document.
    pub pairing_request: Option<PairingRequest>,
    /// Set by a status poll that found a package-access request.
    pub access_request: Option<AccessRequest>,
    /// A card presented to the reader this tick.
    pub card: Option<RfidCode>,
    /// Fresh random word, used when a pairing code is generated.
    pub entropy: u32,
}

// ---------------------------------------------------------------------------
// Session records
// ---------------------------------------------------------------------------

/// The open pairing session, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairingSession {
    pub is_active: bool,
    pub user_id: String,
    /// Non-empty exactly while `is_active`.
    pub generated_code: RfidCode,
    pub start_ms: u64,
    pub timeout_ms: u32,
}

impl PairingSession {
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms)
    }

    /// Strictly past the timeout.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.is_active && self.elapsed_ms(now_ms) > u64::from(self.timeout_ms)
    }
}

/// The open package-access session, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageAccess {
    pub is_processing: bool,
    pub scanned_code: RfidCode,
    /// Card named by the access request.
    pub user_rfid: String,
    pub access_ms: u64,
}

// ---------------------------------------------------------------------------
// Effects (written by state handlers; applied by the controller)
// ---------------------------------------------------------------------------

/// One side effect requested by a state handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Backend(BackendOp),
    Show { line1: Line, line2: Line },
    Led(LedState),
    Beep(Tone),
    /// Arm a timed hold program, replacing any running one.
    Hold(&'static [HoldStep]),
    /// Drop the running hold program.
    CancelHold,
    Emit(AppEvent),
}

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct SessionContext {
    /// Clock reading for the current tick.
    pub now_ms: u64,
    pub config: SystemConfig,
    /// Resolved device identity (configured or MAC-derived).
    pub device_id: String,

    pub inputs: SessionInputs,
    pub pairing: PairingSession,
    pub access: PackageAccess,

    /// Outbox, drained by the controller after every FSM call.
    pub effects: Vec<Effect>,
}

impl SessionContext {
    pub fn new(config: SystemConfig, device_id: String) -> Self {
        Self {
            now_ms: 0,
            config,
            device_id,
            inputs: SessionInputs::default(),
            pairing: PairingSession::default(),
            access: PackageAccess::default(),
            effects: Vec::new(),
        }
    }

    pub fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn backend(&mut self, op: BackendOp) {
        self.effects.push(Effect::Backend(op));
    }

    pub fn show(&mut self, line1: &str, line2: &str) {
        self.effects.push(Effect::Show {
            line1: fit_line(line1),
            line2: fit_line(line2),
        });
    }

    pub fn emit(&mut self, event: AppEvent) {
        self.effects.push(Effect::Emit(event));
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        core::mem::take(&mut self.effects)
    }
}
