//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific flow through
//! `SessionController` against the mock board and the in-memory Firebase
//! backend.  All tests run on the host with no real hardware required.

mod capacity_flow_tests;
mod connectivity_tests;
mod mock_hw;
mod package_access_tests;
mod pairing_flow_tests;
