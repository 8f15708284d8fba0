//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SessionController (domain)
//! ```
//!
//! Driven adapters (backend, card reader, ranger, LCD, LEDs/buzzer, event
//! sinks, config storage) implement these traits.  The
//! [`SessionController`](super::service::SessionController) consumes them
//! via generics, so the domain core never touches hardware or the network
//! directly.
//!
//! ## Notes
//!
//! - **BackendPort** calls are fire-and-forget from the controller's point
//!   of view: failures are typed so the controller can react to link loss,
//!   but no write is retried.
//! - **ConfigPort** implementations MUST validate before persisting.

use serde_json::Value;

use crate::access::RfidCode;
use crate::config::SystemConfig;
use crate::error::BackendError;
use crate::indicator::{LedState, Tone};
use crate::scheduler::TimerId;

// ───────────────────────────────────────────────────────────────
// Backend port (driven adapter: domain ↔ cloud database)
// ───────────────────────────────────────────────────────────────

/// Key-path record store (RTDB) plus document store (Firestore).
///
/// Record paths start with `/` (e.g. `/systemStatus/hardware`); document
/// paths are `collection/document` (e.g. `rfid_pairing/current_session`).
/// Values are plain JSON; adapters own any wire encoding.
pub trait BackendPort {
    /// `true` once the client is initialised and believed reachable.
    fn is_ready(&self) -> bool;

    /// Tear down and re-initialise the client.
    fn reconnect(&mut self) -> Result<(), BackendError>;

    /// Read the record at `path`.
    fn get_record(&mut self, path: &str) -> Result<Value, BackendError>;

    /// Replace the record at `path`.
    fn set_record(&mut self, path: &str, value: &Value) -> Result<(), BackendError>;

    /// Merge the top-level keys of `fields` into the record at `path`.
    fn update_record(&mut self, path: &str, fields: &Value) -> Result<(), BackendError>;

    /// Read the fields of the document at `path`.
    fn get_document(&mut self, path: &str) -> Result<Value, BackendError>;

    /// Merge `fields` into the document at `path`, creating it if absent.
    fn patch_document(&mut self, path: &str, fields: &Value) -> Result<(), BackendError>;

    /// Create a new document at `path`.
    fn create_document(&mut self, path: &str, fields: &Value) -> Result<(), BackendError>;
}

// ───────────────────────────────────────────────────────────────
// Device ports (driven adapters: hardware ↔ domain)
// ───────────────────────────────────────────────────────────────

/// RFID reader.
pub trait CardReaderPort {
    /// Non-blocking poll.  Returns the card code once per presentation.
    fn poll_card(&mut self) -> Option<RfidCode>;
}

/// Downward-facing ultrasonic ranger.
pub trait RangerPort {
    /// Distance to the nearest echo in cm.  `0.0` means no echo.
    fn measure_cm(&mut self) -> f32;
}

/// Two-line character display.
pub trait DisplayPort {
    /// Overwrite both rows.  Callers pass rows already fitted to the width.
    fn show(&mut self, line1: &str, line2: &str);
}

/// Status LEDs and buzzer.
pub trait IndicatorPort {
    /// Drive the green/red LED pair.
    fn set_led(&mut self, led: LedState);

    /// Start a tone; it stops on its own once `tone.duration_ms` elapses.
    fn beep(&mut self, tone: Tone, now_ms: u64);

    /// Advance time-based outputs (tone shut-off).  Called every tick.
    fn service(&mut self, now_ms: u64);
}

/// Random source for pairing codes.
pub trait EntropyPort {
    fn next_u32(&mut self) -> u32;
}

/// Everything the controller needs from the board, as one bound.
pub trait DevicePort: CardReaderPort + RangerPort + DisplayPort + IndicatorPort + EntropyPort {}

impl<T> DevicePort for T where T: CardReaderPort + RangerPort + DisplayPort + IndicatorPort + EntropyPort
{}

/// Monotonic millisecond clock.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST call [`SystemConfig::validate`] before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the controller)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a timer fires.
pub trait SchedulerDelegate {
    fn on_schedule_fired(&mut self, id: TimerId, kind: ScheduleFiredKind);
}

/// Discriminant passed to [`SchedulerDelegate::on_schedule_fired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleFiredKind {
    /// A recurring periodic timer fired.
    Periodic,
    /// A one-shot timer fired (auto-disables after).
    OneShot,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
