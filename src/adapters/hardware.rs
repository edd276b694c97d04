//! Hardware adapter: bridges the board's peripherals to the domain ports.
//!
//! Owns the presence, light and battery drivers plus the power-control
//! adapter, exposing them through [`PresenceSensorPort`], [`BatteryPort`]
//! and [`HardwarePowerControl`] at once so the service can borrow a single
//! `&mut` per tick.  On non-espidf targets the drivers read their
//! simulation atomics.

use embedded_hal::digital::InputPin;

use crate::app::ports::{BatteryPort, HardwarePowerControl, PresenceSensorPort};
use crate::drivers::battery::BatteryMonitor;
use crate::drivers::light::LightSensor;
use crate::drivers::pir::PirSensor;
use crate::error::SensorError;
use crate::fsm::context::{SamplingMode, WifiMode};

use super::power_control::EspPowerControl;

pub struct HardwareAdapter<P> {
    pir: PirSensor<P>,
    light: LightSensor,
    battery: BatteryMonitor,
    power: EspPowerControl,
}

impl<P: InputPin> HardwareAdapter<P> {
    pub fn new(
        pir: PirSensor<P>,
        light: LightSensor,
        battery: BatteryMonitor,
        power: EspPowerControl,
    ) -> Self {
        Self {
            pir,
            light,
            battery,
            power,
        }
    }

    pub fn power_control(&self) -> &EspPowerControl {
        &self.power
    }
}

// ── PresenceSensorPort ────────────────────────────────────────

impl<P: InputPin> PresenceSensorPort for HardwareAdapter<P> {
    fn read_motion(&mut self) -> Result<bool, SensorError> {
        self.pir.read()
    }

    fn read_light(&mut self) -> Result<u16, SensorError> {
        self.light.read()
    }
}

// ── BatteryPort ───────────────────────────────────────────────

impl<P> BatteryPort for HardwareAdapter<P> {
    fn read_voltage(&mut self) -> Result<f32, SensorError> {
        self.battery.read_voltage()
    }

    fn read_charging(&mut self) -> Result<bool, SensorError> {
        self.battery.read_charging()
    }
}

// ── HardwarePowerControl ──────────────────────────────────────

impl<P> HardwarePowerControl for HardwareAdapter<P> {
    fn set_cpu_frequency_mhz(&mut self, mhz: u32) {
        self.power.set_cpu_frequency_mhz(mhz);
    }

    fn set_wifi(&mut self, mode: WifiMode) {
        self.power.set_wifi(mode);
    }

    fn set_bluetooth(&mut self, enabled: bool) {
        self.power.set_bluetooth(enabled);
    }

    fn hold_pins(&mut self, pins: &[i32]) {
        self.power.hold_pins(pins);
    }

    fn release_pins(&mut self, pins: &[i32]) {
        self.power.release_pins(pins);
    }

    fn set_sampling_mode(&mut self, mode: SamplingMode) {
        self.power.set_sampling_mode(mode);
    }
}
