//! Random source for pairing codes.
//!
//! - **`target_os = "espidf"`** reads `esp_random()`, which is backed by
//!   the RF subsystem's true RNG while WiFi is running.
//! - **other targets** hash a counter with a randomly keyed SipHash.

use crate::app::ports::EntropyPort;

#[cfg(not(target_os = "espidf"))]
use std::hash::{BuildHasher, RandomState};

pub struct HardwareRng {
    #[cfg(not(target_os = "espidf"))]
    keys: RandomState,
    #[cfg(not(target_os = "espidf"))]
    counter: u64,
}

impl Default for HardwareRng {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareRng {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            keys: RandomState::new(),
            #[cfg(not(target_os = "espidf"))]
            counter: 0,
        }
    }
}

impl EntropyPort for HardwareRng {
    #[cfg(target_os = "espidf")]
    fn next_u32(&mut self) -> u32 {
        // SAFETY: esp_random has no preconditions.
        unsafe { esp_idf_svc::sys::esp_random() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn next_u32(&mut self) -> u32 {
        self.counter = self.counter.wrapping_add(1);
        (self.keys.hash_one(self.counter) >> 16) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_words_differ() {
        let mut rng = HardwareRng::new();
        let words: Vec<u32> = (0..16).map(|_| rng.next_u32()).collect();
        let mut unique = words.clone();
        unique.sort_unstable();
        unique.dedup();
        assert!(unique.len() > 12, "{words:?}");
    }
}
