//! Fuzz target: request records read back from the backend.
//!
//! `/systemStatus/hardware` and the pairing document are written by the
//! app, so the device must cope with anything in them.  Decoding may fail
//! but must not panic, and a decoded request always names a card or user.
//!
//! cargo fuzz run fuzz_backend_records

#![no_main]

use libfuzzer_sys::fuzz_target;
use parcelbox::backend::records::{decode, HardwareStatus, PairingDocument};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    if let Ok(status) = decode::<HardwareStatus>(value.clone()) {
        if let Some(request) = status.access_request() {
            assert!(!request.user_rfid.is_empty());
            assert_eq!(request.user_rfid.trim(), request.user_rfid);
        }
    }

    if let Ok(doc) = decode::<PairingDocument>(value) {
        if let Some(request) = doc.pairing_request() {
            assert!(!request.user_id.is_empty());
        }
    }
});
