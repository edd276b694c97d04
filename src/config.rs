//! Panel configuration parameters
//!
//! All tunable parameters for the InkPanel firmware.  Values can be
//! overridden from NVS or pushed as JSON by the web configuration server;
//! both paths go through [`PanelConfig::validate`] before taking effect.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::clock::Millis;

/// Power state machine and battery gauge parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    /// Master switch for ACTIVE → LOW_POWER transitions.
    pub low_power_enabled: bool,
    /// No motion for this long drops the panel into low power.
    pub no_motion_timeout_ms: Millis,
    /// Light readings below this count as night.
    pub night_light_threshold: u16,
    /// Battery percentage under which `BatteryLow` fires.
    pub critical_battery_pct: u8,
    /// Interval stretch while in LOW_POWER.
    pub low_power_refresh_multiplier: u32,
    /// Interval stretch while the battery is critical and not charging.
    pub critical_refresh_multiplier: u32,
    /// How often the battery gauge is sampled.
    pub battery_sample_interval_ms: Millis,
    /// Cell voltage reported as 0 %.
    pub empty_voltage: f32,
    /// Cell voltage reported as 100 %.
    pub full_voltage: f32,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            low_power_enabled: true,
            no_motion_timeout_ms: 30_000,
            night_light_threshold: 100,
            critical_battery_pct: 10,
            low_power_refresh_multiplier: 6,
            critical_refresh_multiplier: 10,
            battery_sample_interval_ms: 300_000, // 5 min
            empty_voltage: 3.0,
            full_voltage: 4.2,
        }
    }
}

/// Per-channel cadences and value-delta triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub clock_interval_ms: Millis,
    /// Clock cadence while seconds are displayed.
    pub clock_seconds_interval_ms: Millis,
    pub show_seconds: bool,
    pub date_interval_ms: Millis,
    pub weather_interval_ms: Millis,
    pub sensor_interval_ms: Millis,
    pub battery_interval_ms: Millis,
    pub message_interval_ms: Millis,

    // --- Right-panel pages ---
    pub calendar_page_interval_ms: Millis,
    pub stock_page_interval_ms: Millis,
    pub message_page_interval_ms: Millis,
    /// Plugin, plugin management and settings pages.
    pub other_page_interval_ms: Millis,

    pub full_refresh_interval_ms: Millis,

    // --- Value-delta triggers ---
    pub sensor_temperature_delta: f32,
    pub sensor_humidity_delta: f32,
    /// Battery percentage change that forces a redraw (strictly greater).
    pub battery_pct_delta: u8,

    // --- New-message animation ---
    pub animation_duration_ms: Millis,
    pub animation_frame_ms: Millis,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            clock_interval_ms: 60_000,
            clock_seconds_interval_ms: 100,
            show_seconds: false,
            date_interval_ms: 3_600_000,
            weather_interval_ms: 7_200_000, // 2 h
            sensor_interval_ms: 300_000,
            battery_interval_ms: 300_000,
            message_interval_ms: 10_000,

            calendar_page_interval_ms: 3_600_000,
            stock_page_interval_ms: 600_000,
            message_page_interval_ms: 10_000,
            other_page_interval_ms: 3_600_000,

            full_refresh_interval_ms: 86_400_000, // 1 day

            sensor_temperature_delta: 2.0,
            sensor_humidity_delta: 2.0,
            battery_pct_delta: 5,

            animation_duration_ms: 10_000,
            animation_frame_ms: 50,
        }
    }
}

/// Full-screen alarm overlay timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub timeout_ms: Millis,
    pub blink_interval_ms: Millis,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            blink_interval_ms: 500,
        }
    }
}

/// Indoor sensor anomaly bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub enabled: bool,
    pub temperature_min_c: f32,
    pub temperature_max_c: f32,
    pub humidity_min_pct: f32,
    pub humidity_max_pct: f32,
    /// Largest plausible temperature step between consecutive samples.
    pub temperature_spike_c: f32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            temperature_min_c: 0.0,
            temperature_max_c: 40.0,
            humidity_min_pct: 20.0,
            humidity_max_pct: 80.0,
            temperature_spike_c: 5.0,
        }
    }
}

/// Panel geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u16,
    pub height: u16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        // 7.5" GDEY075T7
        Self {
            width: 800,
            height: 480,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub power: PowerConfig,
    pub refresh: RefreshConfig,
    pub alarm: AlarmConfig,
    pub anomaly: AnomalyConfig,
    pub display: DisplayConfig,
}

impl PanelConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    /// Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string(self).map_err(|_| ConfigError::IoError)
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.power;
        if !(1..=50).contains(&p.critical_battery_pct) {
            return Err(ConfigError::ValidationFailed(
                "critical_battery_pct must be 1..=50",
            ));
        }
        if !(1..=100).contains(&p.low_power_refresh_multiplier) {
            return Err(ConfigError::ValidationFailed(
                "low_power_refresh_multiplier must be 1..=100",
            ));
        }
        if !(1..=100).contains(&p.critical_refresh_multiplier) {
            return Err(ConfigError::ValidationFailed(
                "critical_refresh_multiplier must be 1..=100",
            ));
        }
        if p.no_motion_timeout_ms < 1_000 {
            return Err(ConfigError::ValidationFailed(
                "no_motion_timeout_ms must be at least 1000",
            ));
        }
        if p.battery_sample_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "battery_sample_interval_ms must be non-zero",
            ));
        }
        if !(p.empty_voltage > 0.0 && p.full_voltage > p.empty_voltage) {
            return Err(ConfigError::ValidationFailed(
                "full_voltage must exceed empty_voltage",
            ));
        }

        let r = &self.refresh;
        let intervals = [
            r.clock_interval_ms,
            r.clock_seconds_interval_ms,
            r.date_interval_ms,
            r.weather_interval_ms,
            r.sensor_interval_ms,
            r.battery_interval_ms,
            r.message_interval_ms,
            r.calendar_page_interval_ms,
            r.stock_page_interval_ms,
            r.message_page_interval_ms,
            r.other_page_interval_ms,
            r.full_refresh_interval_ms,
            r.animation_duration_ms,
            r.animation_frame_ms,
        ];
        if intervals.contains(&0) {
            return Err(ConfigError::ValidationFailed(
                "refresh intervals must be non-zero",
            ));
        }
        if !(r.sensor_temperature_delta > 0.0 && r.sensor_humidity_delta > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "sensor deltas must be positive",
            ));
        }

        let a = &self.alarm;
        if a.blink_interval_ms == 0 || a.blink_interval_ms >= a.timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "alarm blink interval must be non-zero and below the timeout",
            ));
        }

        let n = &self.anomaly;
        if n.temperature_min_c >= n.temperature_max_c || n.humidity_min_pct >= n.humidity_max_pct {
            return Err(ConfigError::ValidationFailed(
                "anomaly band minimum must be below maximum",
            ));
        }
        if n.temperature_spike_c <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "temperature_spike_c must be positive",
            ));
        }

        if self.display.width == 0 || self.display.height == 0 {
            return Err(ConfigError::ValidationFailed("display size must be non-zero"));
        }
        Ok(())
    }
}
