//! Peripheral drivers and one-shot hardware initialisation.

pub mod battery;
pub mod hw_init;
pub mod light;
pub mod pir;
