//! Indoor sensor anomaly supervisor.
//!
//! Evaluates every valid sensor sample against absolute bands and a spike
//! check against the previous sample, accumulating a latched bitmask.
//!
//! ## Flag lifecycle
//!
//! 1. A sample violates a check: the bit is set and reported as *new*.
//! 2. While the condition persists the bit stays set and nothing new is
//!    reported, so one excursion raises one alarm.
//! 3. The first sample back within bounds clears the bit.

use core::fmt;

use log::{error, info};

use crate::config::AnomalyConfig;
use crate::events::SensorData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorAnomaly {
    TemperatureOutOfRange = 0b0000_0001,
    HumidityOutOfRange = 0b0000_0010,
    TemperatureSpike = 0b0000_0100,
}

impl SensorAnomaly {
    pub const ALL: [SensorAnomaly; 3] = [
        Self::TemperatureOutOfRange,
        Self::HumidityOutOfRange,
        Self::TemperatureSpike,
    ];

    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SensorAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemperatureOutOfRange => write!(f, "temperature out of range"),
            Self::HumidityOutOfRange => write!(f, "humidity out of range"),
            Self::TemperatureSpike => write!(f, "temperature spike"),
        }
    }
}

pub struct AnomalySupervisor {
    config: AnomalyConfig,
    flags: u8,
    previous: Option<SensorData>,
}

impl AnomalySupervisor {
    pub fn new(config: AnomalyConfig) -> Self {
        Self {
            config,
            flags: 0,
            previous: None,
        }
    }

    pub fn set_config(&mut self, config: AnomalyConfig) {
        self.config = config;
    }

    /// Evaluate one sample.  Returns the bits that were newly set.
    /// Invalid samples are ignored and do not become the spike baseline.
    pub fn evaluate(&mut self, sample: &SensorData) -> u8 {
        if !self.config.enabled || !sample.valid {
            return 0;
        }
        let before = self.flags;
        let c = &self.config;

        let temp_bad = !(c.temperature_min_c..=c.temperature_max_c).contains(&sample.temperature_c);
        let hum_bad = !(c.humidity_min_pct..=c.humidity_max_pct).contains(&sample.humidity_pct);
        let spike_limit = c.temperature_spike_c;
        let spike = self
            .previous
            .is_some_and(|prev| (sample.temperature_c - prev.temperature_c).abs() > spike_limit);

        self.eval_flag(SensorAnomaly::TemperatureOutOfRange, temp_bad);
        self.eval_flag(SensorAnomaly::HumidityOutOfRange, hum_bad);
        self.eval_flag(SensorAnomaly::TemperatureSpike, spike);

        self.previous = Some(*sample);
        self.flags & !before
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn has_anomaly(&self) -> bool {
        self.flags != 0
    }

    pub fn has(&self, anomaly: SensorAnomaly) -> bool {
        self.flags & anomaly.mask() != 0
    }

    fn eval_flag(&mut self, anomaly: SensorAnomaly, condition: bool) {
        if condition {
            if self.flags & anomaly.mask() == 0 {
                error!("ANOMALY SET: {anomaly}");
            }
            self.flags |= anomaly.mask();
        } else {
            if self.flags & anomaly.mask() != 0 {
                info!("ANOMALY CLEARED: {anomaly}");
            }
            self.flags &= !anomaly.mask();
        }
    }
}

/// Human-readable description of the first anomaly set in `mask`.
pub fn describe(mask: u8) -> &'static str {
    SensorAnomaly::ALL
        .into_iter()
        .find(|a| mask & a.mask() != 0)
        .map_or("sensor anomaly", |a| match a {
            SensorAnomaly::TemperatureOutOfRange => "Temperature out of range",
            SensorAnomaly::HumidityOutOfRange => "Humidity out of range",
            SensorAnomaly::TemperatureSpike => "Sudden temperature change",
        })
}
