//! Port traits: the hexagonal boundary between panel logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PanelService (domain)
//! ```
//!
//! Driven adapters (sensors, power control, panel driver, storage, operator
//! console) implement these traits.  [`PanelService`](super::service::PanelService)
//! consumes them via generics, so the domain core never touches hardware.
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::clock::Instant;
use crate::config::PanelConfig;
use crate::error::{RenderError, SensorError};
use crate::fsm::context::{SamplingMode, WifiMode};
use crate::scheduler::plan::RefreshPlan;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
pub trait ClockPort {
    fn now(&self) -> Instant;
}

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// PIR presence and ambient light.
pub trait PresenceSensorPort {
    fn read_motion(&mut self) -> Result<bool, SensorError>;

    /// Raw light level; higher is brighter.
    fn read_light(&mut self) -> Result<u16, SensorError>;
}

/// Battery gauge.
pub trait BatteryPort {
    /// Cell voltage in volts (after the divider is undone).
    fn read_voltage(&mut self) -> Result<f32, SensorError>;

    fn read_charging(&mut self) -> Result<bool, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Hardware power control (driven adapter: domain → SoC)
// ───────────────────────────────────────────────────────────────

/// Knobs the power state machine turns on every mode change.
pub trait HardwarePowerControl {
    fn set_cpu_frequency_mhz(&mut self, mhz: u32);

    fn set_wifi(&mut self, mode: WifiMode);

    fn set_bluetooth(&mut self, enabled: bool);

    /// Latch the listed GPIOs at their current level.
    fn hold_pins(&mut self, pins: &[i32]);

    fn release_pins(&mut self, pins: &[i32]);

    fn set_sampling_mode(&mut self, mode: SamplingMode);
}

// ───────────────────────────────────────────────────────────────
// Render port (driven adapter: domain → e-ink driver)
// ───────────────────────────────────────────────────────────────

/// The pixel-drawing side.  Only the decision of *what* to redraw lives in
/// the core; everything below this trait is the display driver's business.
pub trait RenderPort {
    fn render(&mut self, plan: &RefreshPlan) -> Result<(), RenderError>;

    /// Re-run the controller init sequence.
    fn reinitialize(&mut self) -> Result<(), RenderError>;

    /// Blank the whole panel.
    fn clear(&mut self) -> Result<(), RenderError>;
}

// ───────────────────────────────────────────────────────────────
// Operator sink (driven adapter: domain → console / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits [`OperatorEvent`](super::events::OperatorEvent)s
/// through this port.  Adapters decide where they go.
pub trait OperatorSink {
    fn emit(&mut self, event: &super::events::OperatorEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists panel configuration.
///
/// Implementations MUST call [`PanelConfig::validate`] before persisting
/// and reject with [`ConfigError::ValidationFailed`] instead of clamping.
pub trait ConfigPort {
    /// Returns [`PanelConfig::default()`] if nothing is stored yet.
    fn load(&self) -> Result<PanelConfig, ConfigError>;

    fn save(&self, config: &PanelConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations and config parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored or received config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::StorageFull => Self::Config("storage full"),
            ConfigError::IoError => Self::Config("I/O error"),
        }
    }
}
