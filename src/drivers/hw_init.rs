//! One-shot peripheral initialisation.
//!
//! Configures the ADC1 oneshot unit (light, battery) and the GPIO inputs
//! (PIR, charge status, flame) using raw ESP-IDF sys calls.  Called once
//! from `main()` before the main loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

/// ADC1 channel of [`pins::BATTERY_ADC_GPIO`](crate::pins::BATTERY_ADC_GPIO).
pub const ADC1_CH_BATTERY: u32 = 3;
/// ADC1 channel of [`pins::LIGHT_ADC_GPIO`](crate::pins::LIGHT_ADC_GPIO).
pub const ADC1_CH_LIGHT: u32 = 6;

/// Full-scale reading of the 12-bit ADC.
pub const ADC_MAX: u16 = 4095;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={rc})"),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(_: HwInitError) -> Self {
        Self::Init("peripheral initialisation failed")
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before the loop; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio_inputs()?;
    }
    info!("hw_init: peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: only called from the init path or the main-loop read path,
/// which never run concurrently.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    for channel in [ADC1_CH_BATTERY, ADC1_CH_LIGHT] {
        let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg) };
        if ret != ESP_OK {
            return Err(HwInitError::AdcInitFailed(ret));
        }
    }
    info!("hw_init: ADC1 configured (CH3=battery, CH6=light)");
    Ok(())
}

/// One raw conversion, `None` on a driver error.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Option<u16> {
    let mut raw: i32 = 0;
    // SAFETY: see adc1_handle().
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    (ret == ESP_OK).then(|| raw.clamp(0, i32::from(ADC_MAX)) as u16)
}

// ── GPIO inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: (1u64 << pins::PIR_GPIO)
            | (1u64 << pins::CHARGE_STATUS_GPIO)
            | (1u64 << pins::FLAME_GPIO),
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    // CHRG is open-drain: pull it up so "not charging" reads HIGH.
    let ret = unsafe { gpio_pullup_en(pins::CHARGE_STATUS_GPIO) };
    if ret != ESP_OK {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: pin was configured as input in init_gpio_inputs().
    unsafe { gpio_get_level(pin) != 0 }
}
