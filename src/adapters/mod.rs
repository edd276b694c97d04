//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements             | Connects to               |
//! |-----------------|------------------------|---------------------------|
//! | `config_store`  | ConfigPort             | NVS / in-memory store     |
//! | `hardware`      | PresenceSensorPort     | PIR GPIO, light ADC       |
//! |                 | BatteryPort            | battery ADC, CHRG GPIO    |
//! |                 | HardwarePowerControl   | via `power_control`       |
//! | `log_sink`      | OperatorSink           | Serial log output         |
//! | `power_control` | HardwarePowerControl   | esp_pm, Wi-Fi, BT, GPIO   |
//! | `time`          | ClockPort              | ESP32 system timer        |

pub mod config_store;
pub mod hardware;
pub mod log_sink;
pub mod power_control;
pub mod time;
