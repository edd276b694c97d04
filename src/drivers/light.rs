//! Photoresistor ambient light sensor.
//!
//! Raw 12-bit ADC counts, darker is lower.  The power state machine
//! compares them against `night_light_threshold` directly.
//!
//! On ESP-IDF the reading comes from ADC1 CH6; on the host from a static
//! `AtomicU16` for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::error::SensorError;

#[cfg(not(target_os = "espidf"))]
static SIM_LIGHT_ADC: AtomicU16 = AtomicU16::new(2048);
#[cfg(not(target_os = "espidf"))]
static SIM_LIGHT_FAULT: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_light_adc(raw: u16) {
    SIM_LIGHT_ADC.store(raw, Ordering::Relaxed);
}

/// Make the next host reads fail (or succeed again).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_light_fault(fault: bool) {
    SIM_LIGHT_FAULT.store(fault, Ordering::Relaxed);
}

#[derive(Debug, Default)]
pub struct LightSensor {
    last: Option<u16>,
}

impl LightSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&mut self) -> Result<u16, SensorError> {
        let raw = read_adc().ok_or(SensorError::AdcReadFailed)?;
        self.last = Some(raw);
        Ok(raw)
    }

    pub fn last(&self) -> Option<u16> {
        self.last
    }
}

#[cfg(target_os = "espidf")]
fn read_adc() -> Option<u16> {
    super::hw_init::adc1_read(super::hw_init::ADC1_CH_LIGHT)
}

#[cfg(not(target_os = "espidf"))]
fn read_adc() -> Option<u16> {
    if SIM_LIGHT_FAULT.load(Ordering::Relaxed) {
        return None;
    }
    Some(SIM_LIGHT_ADC.load(Ordering::Relaxed))
}
