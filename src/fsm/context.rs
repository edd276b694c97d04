//! Shared mutable context threaded through every power FSM handler.
//!
//! `PowerContext` is the blackboard the mode handlers read from and write
//! to: the latest presence sample, battery status, timing and the
//! [`PowerDirectives`] the service applies to hardware after each tick.

use crate::clock::Instant;
use crate::config::PowerConfig;

// ---------------------------------------------------------------------------
// Presence sample (written by the power service before each tick)
// ---------------------------------------------------------------------------

/// One presence/ambient reading, already passed through fail-safe defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceSample {
    /// PIR output.  A failed read is recorded as `true`.
    pub motion: bool,
    /// Raw light level, `None` when the read failed.
    pub light_level: Option<u16>,
}

impl Default for PresenceSample {
    fn default() -> Self {
        Self {
            motion: true,
            light_level: None,
        }
    }
}

impl PresenceSample {
    /// Night only when a light reading exists and is below `threshold`.
    pub fn is_night(&self, threshold: u16) -> bool {
        self.light_level.is_some_and(|level| level < threshold)
    }
}

// ---------------------------------------------------------------------------
// Power directives (written by mode handlers; applied by the service)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    Off,
    Station,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Every peripheral is sampled at its normal rate.
    Continuous,
    /// Only gas, flame, motion and light keep sampling.
    AlarmSensorsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerDirectives {
    pub cpu_mhz: u32,
    pub wifi: WifiMode,
    pub bluetooth: bool,
    pub hold_unused_pins: bool,
    pub sampling: SamplingMode,
}

impl PowerDirectives {
    pub const FULL_SPEED: Self = Self {
        cpu_mhz: 240,
        wifi: WifiMode::Station,
        bluetooth: true,
        hold_unused_pins: false,
        sampling: SamplingMode::Continuous,
    };

    pub const REDUCED: Self = Self {
        cpu_mhz: 80,
        wifi: WifiMode::Off,
        bluetooth: false,
        hold_unused_pins: true,
        sampling: SamplingMode::AlarmSensorsOnly,
    };
}

// ---------------------------------------------------------------------------
// PowerContext
// ---------------------------------------------------------------------------

pub struct PowerContext {
    /// Time of the tick being evaluated.
    pub now: Instant,
    pub is_low_power: bool,
    /// Refreshed on every positive motion sample, in either mode.
    pub last_motion_at: Instant,
    pub last_display_update_at: Instant,
    /// 0–100.
    pub battery_pct: u8,
    pub is_charging: bool,

    pub sample: PresenceSample,
    pub directives: PowerDirectives,
    pub config: PowerConfig,
}

impl PowerContext {
    /// Boot counts as the most recent motion so the no-motion timeout
    /// starts from `now`.
    pub fn new(config: PowerConfig, now: Instant) -> Self {
        Self {
            now,
            is_low_power: false,
            last_motion_at: now,
            last_display_update_at: now,
            battery_pct: 100,
            is_charging: false,
            sample: PresenceSample::default(),
            directives: PowerDirectives::FULL_SPEED,
            config,
        }
    }

    /// Milliseconds since the last positive motion sample.
    pub fn since_motion(&self) -> u32 {
        self.now.elapsed_since(self.last_motion_at)
    }

    pub fn is_night(&self) -> bool {
        self.sample.is_night(self.config.night_light_threshold)
    }
}
