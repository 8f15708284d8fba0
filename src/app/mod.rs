//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the ParcelBox locker: the
//! session controller, its poll cadence, and the events it reports.
//! All interaction with hardware and the backend happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals or a network.

pub mod events;
pub mod ports;
pub mod service;
