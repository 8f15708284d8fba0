//! System configuration parameters
//!
//! All tunable parameters for the ParcelBox locker.
//! Values can be overridden via NVS (non-volatile storage); connection
//! secrets are baked in at build time.

use serde::{Deserialize, Serialize};

use crate::access::AccessPolicy;
use crate::app::ports::ConfigError;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Identity ---
    /// Device identifier reported to the backend.  Empty means "derive
    /// from the factory MAC" (see `adapters::device_id`).
    pub device_id: String,

    // --- Poll intervals ---
    /// Heartbeat write interval (milliseconds)
    pub heartbeat_interval_ms: u32,
    /// Ultrasonic capacity sample interval (milliseconds)
    pub capacity_check_interval_ms: u32,
    /// Backend status poll interval (milliseconds)
    pub status_check_interval_ms: u32,
    /// Idle capacity screen refresh interval (milliseconds)
    pub display_update_interval_ms: u32,
    /// Main loop period (milliseconds)
    pub loop_interval_ms: u32,

    // --- Sessions ---
    /// How long a pairing session stays open (milliseconds)
    pub pairing_timeout_ms: u32,
    /// Decision rule for package-access scans
    pub access_policy: AccessPolicy,

    // --- Capacity ---
    /// Interior height of the box, sensor face to floor (cm)
    pub max_height_cm: f32,
    /// Minimum spacing between capacity document pushes (milliseconds)
    pub capacity_push_interval_ms: u32,

    // --- Connectivity ---
    /// Fixed delay before re-initialising the backend client (milliseconds)
    pub backend_retry_ms: u32,
    /// Fixed delay between WiFi reconnect attempts (milliseconds)
    pub wifi_retry_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            device_id: String::from("ESP32_001"),

            heartbeat_interval_ms: 10_000,
            capacity_check_interval_ms: 5_000,
            status_check_interval_ms: 2_000,
            display_update_interval_ms: 1_000,
            loop_interval_ms: 100,

            pairing_timeout_ms: 30_000,
            access_policy: AccessPolicy::GrantAll,

            max_height_cm: 30.0,
            capacity_push_interval_ms: 10_000,

            backend_retry_ms: 5_000,
            wifi_retry_ms: 5_000,
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.len() > 32 || !self.device_id.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(ConfigError::ValidationFailed(
                "device_id must be at most 32 visible ASCII characters",
            ));
        }
        if !(500..=600_000).contains(&self.heartbeat_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "heartbeat_interval_ms must be 500–600000",
            ));
        }
        if !(100..=600_000).contains(&self.capacity_check_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "capacity_check_interval_ms must be 100–600000",
            ));
        }
        if !(100..=60_000).contains(&self.status_check_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "status_check_interval_ms must be 100–60000",
            ));
        }
        if !(100..=60_000).contains(&self.display_update_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "display_update_interval_ms must be 100–60000",
            ));
        }
        if !(10..=1_000).contains(&self.loop_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "loop_interval_ms must be 10–1000",
            ));
        }
        if !(5_000..=600_000).contains(&self.pairing_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "pairing_timeout_ms must be 5000–600000",
            ));
        }
        if !(5.0..=200.0).contains(&self.max_height_cm) {
            return Err(ConfigError::ValidationFailed(
                "max_height_cm must be 5.0–200.0",
            ));
        }
        if self.capacity_push_interval_ms > 3_600_000 {
            return Err(ConfigError::ValidationFailed(
                "capacity_push_interval_ms must be at most 3600000",
            ));
        }
        if !(1_000..=300_000).contains(&self.backend_retry_ms) {
            return Err(ConfigError::ValidationFailed(
                "backend_retry_ms must be 1000–300000",
            ));
        }
        if !(1_000..=300_000).contains(&self.wifi_retry_ms) {
            return Err(ConfigError::ValidationFailed(
                "wifi_retry_ms must be 1000–300000",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Build-time secrets
// ---------------------------------------------------------------------------

const fn env_or_empty(value: Option<&'static str>) -> &'static str {
    match value {
        Some(v) => v,
        None => "",
    }
}

/// Credentials injected through `PARCELBOX_*` environment variables at
/// build time.  Empty strings when unset.
#[derive(Debug, Clone, Copy)]
pub struct Secrets {
    pub wifi_ssid: &'static str,
    pub wifi_password: &'static str,
    /// RTDB host, e.g. `my-box-default-rtdb.firebaseio.com`.
    pub firebase_host: &'static str,
    /// RTDB `auth` query token.
    pub firebase_auth: &'static str,
    /// Web API key appended to Firestore REST calls.
    pub firebase_api_key: &'static str,
    pub firebase_project: &'static str,
}

pub const SECRETS: Secrets = Secrets {
    wifi_ssid: env_or_empty(option_env!("PARCELBOX_WIFI_SSID")),
    wifi_password: env_or_empty(option_env!("PARCELBOX_WIFI_PASSWORD")),
    firebase_host: env_or_empty(option_env!("PARCELBOX_FIREBASE_HOST")),
    firebase_auth: env_or_empty(option_env!("PARCELBOX_FIREBASE_AUTH")),
    firebase_api_key: env_or_empty(option_env!("PARCELBOX_FIREBASE_API_KEY")),
    firebase_project: env_or_empty(option_env!("PARCELBOX_FIREBASE_PROJECT")),
};
