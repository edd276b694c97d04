//! GPIO / peripheral pin assignments for the InkPanel ESP32-S3 board.
//!
//! Single source of truth: drivers and the low-power pin-hold logic
//! reference this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// E-ink panel (SPI2)
// ---------------------------------------------------------------------------

pub const EINK_SCK_GPIO: i32 = 12;
pub const EINK_MOSI_GPIO: i32 = 11;
pub const EINK_CS_GPIO: i32 = 10;
pub const EINK_DC_GPIO: i32 = 13;
pub const EINK_RST_GPIO: i32 = 14;
pub const EINK_BUSY_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Presence / ambient sensors
// ---------------------------------------------------------------------------

/// HC-SR505 PIR output, HIGH while motion is detected.
pub const PIR_GPIO: i32 = 6;

/// Photoresistor divider.  ADC1 channel 6 (GPIO 7).
pub const LIGHT_ADC_GPIO: i32 = 7;

/// MQ-2 gas sensor analog output.
pub const GAS_ADC_GPIO: i32 = 8;

/// Flame sensor digital output.
pub const FLAME_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

/// Cell voltage through a 1:2 divider.  ADC1 channel 3 (GPIO 4).
pub const BATTERY_ADC_GPIO: i32 = 4;

/// TP4056 CHRG output, LOW while charging.
pub const CHARGE_STATUS_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Low-power pin groups
// ---------------------------------------------------------------------------

/// Front-panel buttons; held in their current level while in LOW_POWER.
pub const HOLD_IN_LOW_POWER: [i32; 4] = [0, 1, 2, 3];

/// Alarm-relevant inputs that must keep sampling in LOW_POWER.
pub const ALWAYS_SAMPLED: [i32; 4] = [GAS_ADC_GPIO, FLAME_GPIO, PIR_GPIO, LIGHT_ADC_GPIO];
