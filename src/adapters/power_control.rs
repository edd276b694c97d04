//! SoC power knobs behind [`HardwarePowerControl`].
//!
//! On ESP-IDF every call goes straight to the sys layer and a failure is
//! logged, never propagated: a mode change must not stall the main loop.
//! The adapter also records what it last applied so the main loop can
//! pick its sensor cadence from [`EspPowerControl::sampling`].

use log::{debug, info, warn};

use crate::app::ports::HardwarePowerControl;
use crate::fsm::context::{SamplingMode, WifiMode};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Upper bound on simultaneously held GPIOs.
const MAX_HELD: usize = 8;

#[derive(Debug)]
pub struct EspPowerControl {
    cpu_mhz: u32,
    wifi: WifiMode,
    bluetooth: bool,
    held: heapless::Vec<i32, MAX_HELD>,
    sampling: SamplingMode,
}

impl Default for EspPowerControl {
    fn default() -> Self {
        Self::new()
    }
}

impl EspPowerControl {
    pub fn new() -> Self {
        Self {
            cpu_mhz: 240,
            wifi: WifiMode::Station,
            bluetooth: true,
            held: heapless::Vec::new(),
            sampling: SamplingMode::Continuous,
        }
    }

    pub fn cpu_mhz(&self) -> u32 {
        self.cpu_mhz
    }

    pub fn wifi(&self) -> WifiMode {
        self.wifi
    }

    pub fn bluetooth(&self) -> bool {
        self.bluetooth
    }

    pub fn held_pins(&self) -> &[i32] {
        &self.held
    }

    pub fn sampling(&self) -> SamplingMode {
        self.sampling
    }
}

#[cfg(target_os = "espidf")]
fn check(what: &str, ret: esp_err_t) {
    if ret != ESP_OK {
        warn!("power: {what} failed (rc={ret})");
    }
}

impl HardwarePowerControl for EspPowerControl {
    fn set_cpu_frequency_mhz(&mut self, mhz: u32) {
        if self.cpu_mhz == mhz {
            return;
        }
        #[cfg(target_os = "espidf")]
        {
            let cfg = esp_pm_config_t {
                max_freq_mhz: mhz as i32,
                min_freq_mhz: mhz.min(80) as i32,
                light_sleep_enable: false,
            };
            // SAFETY: cfg outlives the call; esp_pm copies it.
            check("esp_pm_configure", unsafe {
                esp_pm_configure(core::ptr::from_ref(&cfg).cast())
            });
        }
        info!("power: CPU {} -> {mhz} MHz", self.cpu_mhz);
        self.cpu_mhz = mhz;
    }

    fn set_wifi(&mut self, mode: WifiMode) {
        if self.wifi == mode {
            return;
        }
        #[cfg(target_os = "espidf")]
        {
            let raw = match mode {
                WifiMode::Off => wifi_mode_t_WIFI_MODE_NULL,
                WifiMode::Station => wifi_mode_t_WIFI_MODE_STA,
            };
            // SAFETY: Wi-Fi driver was initialised by the network task.
            check("esp_wifi_set_mode", unsafe { esp_wifi_set_mode(raw) });
        }
        info!("power: Wi-Fi {mode:?}");
        self.wifi = mode;
    }

    fn set_bluetooth(&mut self, enabled: bool) {
        if self.bluetooth == enabled {
            return;
        }
        #[cfg(all(target_os = "espidf", esp_idf_bt_enabled))]
        {
            // SAFETY: controller state transitions are serialised on this task.
            let ret = unsafe {
                if enabled {
                    esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE)
                } else {
                    esp_bt_controller_disable()
                }
            };
            check("bt controller", ret);
        }
        info!("power: Bluetooth {}", if enabled { "on" } else { "off" });
        self.bluetooth = enabled;
    }

    fn hold_pins(&mut self, pins: &[i32]) {
        for &pin in pins {
            if self.held.contains(&pin) {
                continue;
            }
            #[cfg(target_os = "espidf")]
            // SAFETY: holding a pin only latches its current pad state.
            check("gpio_hold_en", unsafe { gpio_hold_en(pin) });
            if self.held.push(pin).is_err() {
                warn!("power: hold table full, GPIO {pin} not tracked");
            }
        }
        debug!("power: holding {:?}", self.held);
    }

    fn release_pins(&mut self, pins: &[i32]) {
        for &pin in pins {
            #[cfg(target_os = "espidf")]
            // SAFETY: releasing an unheld pin is a no-op in the driver.
            check("gpio_hold_dis", unsafe { gpio_hold_dis(pin) });
            self.held.retain(|p| *p != pin);
        }
    }

    fn set_sampling_mode(&mut self, mode: SamplingMode) {
        if self.sampling != mode {
            info!("power: sampling {mode:?}");
        }
        self.sampling = mode;
    }
}
