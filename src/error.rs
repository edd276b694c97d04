//! Unified error types for the InkPanel firmware.
//!
//! A single `Error` enum every subsystem can convert into.  All variants are
//! `Copy` so they pass through the power machine and render path without
//! allocation.  None of these ever escape the core as a panic: callers log
//! them, fall back to a safe default, or surface them on the operator channel.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A presence, light or battery sensor could not be read.
    Sensor(SensorError),
    /// The panel driver rejected a draw or update.
    Render(RenderError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Render(e) => write!(f, "render: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// GPIO read returned an error.
    GpioReadFailed,
    /// The sensor is not fitted on this board.
    NotPresent,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
            Self::NotPresent => write!(f, "sensor not present"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Render errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// SPI transfer to the panel controller failed.
    BusFault,
    /// The controller stayed BUSY past its deadline.
    Timeout,
    /// The controller has not been initialised (or lost its state).
    NotInitialised,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFault => write!(f, "panel bus fault"),
            Self::Timeout => write!(f, "panel busy timeout"),
            Self::NotInitialised => write!(f, "panel not initialised"),
        }
    }
}

impl From<RenderError> for Error {
    fn from(e: RenderError) -> Self {
        Self::Render(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
