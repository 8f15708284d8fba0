//! ParcelBox firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host
//! simulation.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod access;
pub mod app;
pub mod backend;
pub mod capacity;
pub mod config;
pub mod display;
pub mod error;
pub mod fsm;
pub mod indicator;
pub mod scheduler;

pub mod adapters;
pub mod drivers;
pub mod pins;
