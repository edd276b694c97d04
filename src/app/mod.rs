//! Application core: orchestration with zero I/O.
//!
//! Ties the bus, the power state machine, the refresh scheduler and render
//! dispatch into one per-tick cycle.  All interaction with hardware goes
//! through the **port traits** in [`ports`], so the whole layer runs on the
//! host against mocks.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
