//! Peripheral drivers and one-shot hardware initialisation.
//!
//! The bus drivers (`lcd`, `mfrc522`, `ultrasonic`) are generic over the
//! `embedded-hal` 1.0 traits and are tested on the host against mocks.
//! `hw_init` and `indicators` drive raw ESP-IDF GPIO/LEDC and compile to
//! no-ops off target.

pub mod hw_init;
pub mod indicators;
pub mod lcd;
pub mod mfrc522;
pub mod ultrasonic;
