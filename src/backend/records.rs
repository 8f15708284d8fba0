//! Wire records exchanged with the backend.
//!
//! Incoming records are lenient: every field defaults, so a half-written
//! record from the app reads as "no request" instead of an error.  Outgoing
//! records serialise with the camelCase field names the app expects.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SessionType;
use crate::error::BackendError;

/// Serialise a record to a JSON object.  `Value::Null` on failure (logged).
pub fn encode<T: Serialize>(record: &T) -> Value {
    serde_json::to_value(record).unwrap_or_else(|e| {
        warn!("Backend: record encode failed: {}", e);
        Value::Null
    })
}

/// Decode a record read from the backend.  A missing record (`null`)
/// decodes to the all-default value.
pub fn decode<T: DeserializeOwned + Default>(value: Value) -> Result<T, BackendError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|_| BackendError::Malformed)
}

// ───────────────────────────────────────────────────────────────
// Incoming
// ───────────────────────────────────────────────────────────────

/// `/systemStatus/hardware` as read back from the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HardwareStatus {
    pub is_in_use: bool,
    pub session_type: String,
    pub user_rfid: String,
    pub rfid: String,
    pub device_id: String,
}

/// A package-access request made through the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub user_rfid: String,
}

impl HardwareStatus {
    pub fn session_type(&self) -> SessionType {
        SessionType::from_wire(&self.session_type)
    }

    /// `Some` when the record asks the box to open for a user's card.
    pub fn access_request(&self) -> Option<AccessRequest> {
        let wanted = self.is_in_use
            && self.session_type() == SessionType::PackageAccess
            && !self.user_rfid.trim().is_empty();
        wanted.then(|| AccessRequest {
            user_rfid: self.user_rfid.trim().to_string(),
        })
    }
}

/// `rfid_pairing/current_session` as read back from the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PairingDocument {
    pub is_active: bool,
    pub user_id: String,
    pub status: String,
}

/// A user asked the app to pair a new card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingRequest {
    pub user_id: String,
}

impl PairingDocument {
    /// `Some` when the document asks for a pairing code.
    pub fn pairing_request(&self) -> Option<PairingRequest> {
        (self.is_active && !self.user_id.is_empty()).then(|| PairingRequest {
            user_id: self.user_id.clone(),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Outgoing
// ───────────────────────────────────────────────────────────────

/// Full `/systemStatus/hardware` reset written at boot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareReset<'a> {
    pub is_in_use: bool,
    pub session_type: &'static str,
    pub device_id: &'a str,
    pub last_activity: String,
    pub rfid: &'static str,
    pub user_rfid: &'static str,
    pub weight: u32,
    pub height: u32,
    pub measurement_complete: bool,
}

impl<'a> HardwareReset<'a> {
    pub fn new(device_id: &'a str, now_ms: u64) -> Self {
        Self {
            is_in_use: false,
            session_type: SessionType::None.as_wire(),
            device_id,
            last_activity: super::timestamp(now_ms),
            rfid: "",
            user_rfid: "",
            weight: 0,
            height: 0,
            measurement_complete: false,
        }
    }
}

/// Partial `/systemStatus/hardware` update.  Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwarePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_in_use: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_rfid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

/// Pairing document patch once a code is on the LCD.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingCodeIssued<'a> {
    pub rfid_code: &'a str,
    pub status: &'static str,
    pub received_time: String,
}

/// Pairing document patch when the session closes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingCancelled {
    pub is_active: bool,
    pub status: &'static str,
    pub cancelled_time: String,
}

/// `/systemStatus/devices/{deviceId}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat<'a> {
    pub device_id: &'a str,
    pub last_heartbeat: String,
    pub wifi_connected: bool,
    pub firebase_connected: bool,
    pub current_session: &'static str,
    pub uptime: u64,
}

/// `capacity/box_sensor`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityReport<'a> {
    pub height: f32,
    pub max_height: f32,
    pub last_updated: String,
    pub device_id: &'a str,
}

/// `globalActivities/activity_{ms}_{code}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    pub created_at: String,
    pub metadata: ActivityMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMetadata {
    pub rfid_code: String,
    pub access_type: &'static str,
    pub device_id: String,
}

impl ActivityLog {
    /// A package-access activity.  The user behind a raw card is not known
    /// on the device, so `userId` is `"unknown"`.
    pub fn package_access(code: &str, access_type: &'static str, device_id: &str, now_ms: u64) -> Self {
        Self {
            user_id: String::from("unknown"),
            kind: "package_access",
            message: format!("Package access via RFID: {access_type}"),
            created_at: super::timestamp(now_ms),
            metadata: ActivityMetadata {
                rfid_code: code.to_string(),
                access_type,
                device_id: device_id.to_string(),
            },
        }
    }
}
