//! Backend data layout and write operations.
//!
//! | Path                                    | Store    | Written by              |
//! |-----------------------------------------|----------|-------------------------|
//! | `/systemStatus/hardware`                | record   | device + mobile app     |
//! | `/systemStatus/devices/{deviceId}`      | record   | device heartbeat        |
//! | `rfid_pairing/current_session`          | document | mobile app + device     |
//! | `capacity/box_sensor`                   | document | device                  |
//! | `globalActivities/activity_{ms}_{code}` | document | device (create only)    |
//!
//! State handlers never call the backend.  They queue [`BackendOp`]s which
//! the controller applies through the [`BackendPort`] after the FSM step.

pub mod firestore;
pub mod records;

use serde_json::Value;

use crate::app::ports::BackendPort;
use crate::error::BackendError;

pub const HARDWARE_PATH: &str = "/systemStatus/hardware";
pub const PAIRING_DOC: &str = "rfid_pairing/current_session";
pub const CAPACITY_DOC: &str = "capacity/box_sensor";
pub const ACTIVITY_COLLECTION: &str = "globalActivities";

/// Heartbeat record for one device.
pub fn device_status_path(device_id: &str) -> String {
    format!("/systemStatus/devices/{device_id}")
}

/// Activity document name: unique per scan.
pub fn activity_doc_path(now_ms: u64, code: &str) -> String {
    format!("{ACTIVITY_COLLECTION}/activity_{now_ms}_{code}")
}

/// Timestamps written by the device: uptime milliseconds as decimal text.
pub fn timestamp(now_ms: u64) -> String {
    now_ms.to_string()
}

// ───────────────────────────────────────────────────────────────
// Session type tag
// ───────────────────────────────────────────────────────────────

/// Closed set of `sessionType` tags found in `/systemStatus/hardware`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    /// `""`: no session.
    None,
    /// `"rfid"`: a pairing session issued a code.
    Rfid,
    /// `"package_access"`: the app asked the box to open.
    PackageAccess,
    /// Anything else.  Never starts a session.
    Unknown,
}

impl SessionType {
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            "" => Self::None,
            "rfid" => Self::Rfid,
            "package_access" => Self::PackageAccess,
            _ => Self::Unknown,
        }
    }

    /// Wire tag.  `Unknown` is never written; it maps to `""`.
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::None | Self::Unknown => "",
            Self::Rfid => "rfid",
            Self::PackageAccess => "package_access",
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Queued operations
// ───────────────────────────────────────────────────────────────

/// One backend write, queued by a state handler.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOp {
    SetRecord { path: String, value: Value },
    UpdateRecord { path: String, fields: Value },
    PatchDocument { path: String, fields: Value },
    CreateDocument { path: String, fields: Value },
}

impl BackendOp {
    pub fn path(&self) -> &str {
        match self {
            Self::SetRecord { path, .. }
            | Self::UpdateRecord { path, .. }
            | Self::PatchDocument { path, .. }
            | Self::CreateDocument { path, .. } => path,
        }
    }

    /// Fold a later write to the same path into this one.  A partial update
    /// merges its fields over a queued update or full write, later values
    /// winning; anything else replaces.
    pub fn merge(&mut self, later: Self) {
        let merged = match (&mut *self, &later) {
            (Self::UpdateRecord { fields: dst, .. }, Self::UpdateRecord { fields: src, .. })
            | (Self::SetRecord { value: dst, .. }, Self::UpdateRecord { fields: src, .. })
            | (Self::PatchDocument { fields: dst, .. }, Self::PatchDocument { fields: src, .. }) => {
                match (dst.as_object_mut(), src.as_object()) {
                    (Some(dst), Some(src)) => {
                        for (k, v) in src {
                            dst.insert(k.clone(), v.clone());
                        }
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        };
        if !merged {
            *self = later;
        }
    }

    pub fn apply(&self, backend: &mut impl BackendPort) -> Result<(), BackendError> {
        match self {
            Self::SetRecord { path, value } => backend.set_record(path, value),
            Self::UpdateRecord { path, fields } => backend.update_record(path, fields),
            Self::PatchDocument { path, fields } => backend.patch_document(path, fields),
            Self::CreateDocument { path, fields } => backend.create_document(path, fields),
        }
    }
}
