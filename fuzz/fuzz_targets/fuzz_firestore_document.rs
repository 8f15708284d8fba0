//! Fuzz target: `firestore::from_document`
//!
//! Feeds arbitrary JSON, as a Firestore REST response might carry it, into
//! the typed-value decoder.  It must never panic, and whatever it accepts
//! must survive a re-encode.
//!
//! cargo fuzz run fuzz_firestore_document

#![no_main]

use libfuzzer_sys::fuzz_target;
use parcelbox::backend::firestore::{from_document, to_document};

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(fields) = from_document(&doc) {
        let again = to_document(&fields).expect("decoded fields re-encode");
        assert_eq!(from_document(&again).ok(), Some(fields));
    }
});
