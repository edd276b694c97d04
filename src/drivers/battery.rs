//! Li-ion cell gauge and TP4056 charge status.
//!
//! The cell is read through a 1:2 resistor divider on ADC1 CH3, so
//! `V = raw / 4095 × 3.3 × 2`.  The charger's CHRG pin is open-drain and
//! pulled LOW while charging.
//!
//! Host builds read from static atomics instead.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use super::hw_init::ADC_MAX;
use crate::error::SensorError;

const ADC_REF_V: f32 = 3.3;
const DIVIDER_RATIO: f32 = 2.0;

#[cfg(not(target_os = "espidf"))]
/// About 3.9 V at the cell.
static SIM_BATTERY_ADC: AtomicU16 = AtomicU16::new(2420);
#[cfg(not(target_os = "espidf"))]
static SIM_CHARGING: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_battery_adc(raw: u16) {
    SIM_BATTERY_ADC.store(raw, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_charging(charging: bool) {
    SIM_CHARGING.store(charging, Ordering::Relaxed);
}

/// Cell voltage for a raw divider reading.
pub fn raw_to_voltage(raw: u16) -> f32 {
    f32::from(raw.min(ADC_MAX)) / f32::from(ADC_MAX) * ADC_REF_V * DIVIDER_RATIO
}

#[derive(Debug, Default)]
pub struct BatteryMonitor {
    last_voltage: Option<f32>,
}

impl BatteryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_voltage(&mut self) -> Result<f32, SensorError> {
        let raw = read_adc().ok_or(SensorError::AdcReadFailed)?;
        let v = raw_to_voltage(raw);
        self.last_voltage = Some(v);
        Ok(v)
    }

    pub fn read_charging(&mut self) -> Result<bool, SensorError> {
        Ok(read_charge_pin_low())
    }

    pub fn last_voltage(&self) -> Option<f32> {
        self.last_voltage
    }
}

#[cfg(target_os = "espidf")]
fn read_adc() -> Option<u16> {
    super::hw_init::adc1_read(super::hw_init::ADC1_CH_BATTERY)
}

#[cfg(not(target_os = "espidf"))]
fn read_adc() -> Option<u16> {
    Some(SIM_BATTERY_ADC.load(Ordering::Relaxed))
}

#[cfg(target_os = "espidf")]
fn read_charge_pin_low() -> bool {
    !super::hw_init::gpio_read(crate::pins::CHARGE_STATUS_GPIO)
}

#[cfg(not(target_os = "espidf"))]
fn read_charge_pin_low() -> bool {
    SIM_CHARGING.load(Ordering::Relaxed)
}
