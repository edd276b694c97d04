//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem against
//! mock adapters.  Everything runs on the host with no panel attached.

#![cfg(not(target_os = "espidf"))]

mod bus_tests;
mod mock_hw;
mod power_tests;
mod scheduler_tests;
