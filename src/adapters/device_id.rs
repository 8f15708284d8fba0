//! Device identity.
//!
//! The backend knows a box by its `deviceId`.  A configured id wins; when
//! the config leaves it empty, a stable id `BOX-XXYYZZ` is derived from the
//! last three bytes of the factory MAC (eFuse), so it survives reboots and
//! reflashing.

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0x24, 0x6F, 0x28, 0x1A, 0x2B, 0x3C]
}

/// `BOX-XXYYZZ` from the last 3 MAC bytes.
pub fn mac_device_id(mac: &MacAddress) -> heapless::String<16> {
    let mut id = heapless::String::new();
    let _ = write!(id, "BOX-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// The id reported to the backend: `configured` when set, else MAC-derived.
pub fn resolve(configured: &str) -> String {
    let configured = configured.trim();
    if configured.is_empty() {
        mac_device_id(&read_mac()).to_string()
    } else {
        configured.to_string()
    }
}
