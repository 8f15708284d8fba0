//! Outbound application events.
//!
//! The [`SessionController`](super::service::SessionController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them.

use crate::access::RfidCode;
use crate::capacity::CapacityStatus;
use crate::error::BackendError;
use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller finished its boot sequence.
    Started { device_id: String },

    /// The session state machine moved.
    SessionChanged { from: StateId, to: StateId },

    /// A pairing code was generated and published.
    PairingCodeIssued { user_id: String, code: RfidCode },

    /// A pairing session closed.
    PairingClosed { code: RfidCode, elapsed_ms: u64 },

    /// A card was read and handed to the session logic.
    CardScanned { code: RfidCode, state: StateId },

    /// A card scan was judged (`granted`, `denied`, `self_access`, `rejected`).
    AccessDecided { code: RfidCode, access_type: &'static str },

    /// A capacity reading was accepted.
    CapacityUpdated { percentage: f32, status: CapacityStatus },

    /// WiFi or backend reachability changed.
    ConnectivityChanged { wifi: bool, backend: bool },

    /// A backend call failed.
    BackendFault { path: String, error: BackendError },
}
