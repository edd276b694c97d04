//! InkPanel firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter        LogOperatorSink   ConfigStore          │
//! │  (Presence+Battery+     (OperatorSink)    (ConfigPort)         │
//! │   PowerControl)         LogRenderer       Esp32Clock           │
//! │                         (RenderPort)      (ClockPort)          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             PanelService (pure logic)                  │    │
//! │  │  EventBus · PowerStateMachine · RefreshScheduler       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::rc::Rc;

use anyhow::{Result, anyhow};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use log::info;

use inkpanel::adapters::config_store::ConfigStore;
use inkpanel::adapters::hardware::HardwareAdapter;
use inkpanel::adapters::log_sink::{LogOperatorSink, LogRenderer};
use inkpanel::adapters::power_control::EspPowerControl;
use inkpanel::adapters::time::Esp32Clock;
use inkpanel::app::commands::PanelCommand;
use inkpanel::app::ports::ClockPort;
use inkpanel::app::service::PanelService;
use inkpanel::bus::EventBus;
use inkpanel::clock::{Instant, Millis};
use inkpanel::drivers::battery::BatteryMonitor;
use inkpanel::drivers::light::LightSensor;
use inkpanel::drivers::pir::PirSensor;
use inkpanel::events::{EventKind, EventPayload};
use inkpanel::fsm::context::SamplingMode;

/// Loop cadence while an alarm blinks or the message animation runs.
const FAST_TICK_MS: u32 = 50;
/// Loop cadence for the seconds clock.
const SECONDS_TICK_MS: u32 = 100;
const ACTIVE_TICK_MS: u32 = 250;
const LOW_POWER_TICK_MS: u32 = 1_000;

const STATUS_INTERVAL_MS: Millis = 60_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  InkPanel v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    inkpanel::drivers::hw_init::init_peripherals().map_err(|e| anyhow!("HAL init failed: {e}"))?;
    let peripherals = Peripherals::take()?;
    let pir_pin = PinDriver::input(peripherals.pins.gpio6)?;

    // ── 3. Config ─────────────────────────────────────────────
    let store = ConfigStore::new().map_err(|e| anyhow!("NVS init failed: {e}"))?;
    let config = store.load_or_default();

    // ── 4. Adapters ───────────────────────────────────────────
    let clock = Rc::new(Esp32Clock::new());
    let mut hw = HardwareAdapter::new(
        PirSensor::new(pir_pin),
        LightSensor::new(),
        BatteryMonitor::new(),
        EspPowerControl::new(),
    );
    let mut sink = LogOperatorSink::new();
    let mut renderer = LogRenderer::new();

    // ── 5. Core ───────────────────────────────────────────────
    let bus = Rc::new(EventBus::new(clock.clone()));
    let mut service = PanelService::new(config, Rc::clone(&bus), clock.now());
    service.start(&mut hw, &mut sink);

    info!("System ready. Entering main loop.");

    // ── 6. Main loop ──────────────────────────────────────────
    let mut last_time_key: Option<(u8, u8, u8)> = None;
    let mut last_status = clock.now();

    loop {
        let now = clock.now();
        let show_seconds = service.config().refresh.show_seconds;

        // Wall-clock producer: one TimeUpdated per displayed change.
        if let Some(t) = clock.wall_time() {
            let key = (t.hour, t.minute, if show_seconds { t.second } else { 0 });
            if last_time_key != Some(key) {
                last_time_key = Some(key);
                bus.publish(EventKind::TimeUpdated, EventPayload::Time(t));
            }
        }

        service.tick(now, &mut hw, &mut renderer, &mut sink);
        service.auto_save_if_needed(now, &store);

        if now.has_elapsed(last_status, STATUS_INTERVAL_MS) {
            last_status = now;
            service.handle_command(PanelCommand::RequestStatus, now, &mut sink);
        }

        FreeRtos::delay_ms(loop_delay_ms(&service, hw.power_control().sampling(), now));
    }
}

fn loop_delay_ms(service: &PanelService, sampling: SamplingMode, now: Instant) -> u32 {
    if service.is_alarming(now) || service.is_animating(now) {
        FAST_TICK_MS
    } else if service.config().refresh.show_seconds {
        SECONDS_TICK_MS
    } else if sampling == SamplingMode::AlarmSensorsOnly {
        LOW_POWER_TICK_MS
    } else {
        ACTIVE_TICK_MS
    }
}
