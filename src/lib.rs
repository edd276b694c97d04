//! InkPanel firmware library.
//!
//! Exposes the refresh-scheduling and power-state engine for integration
//! testing and for the device binary.  All ESP-IDF-specific code is guarded
//! by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod anomaly;
pub mod app;
pub mod bus;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod pins;
pub mod power;
pub mod render;
pub mod scheduler;

// Hardware-facing modules; host builds fall back to simulation stubs.
pub mod adapters;
pub mod drivers;
