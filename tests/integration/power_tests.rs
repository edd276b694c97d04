//! Power state machine against mock presence, battery and power-control
//! adapters.

use crate::mock_hw::{PowerCall, count, manual_bus, record_all};
use crate::mock_hw::MockHardware;

use inkpanel::clock::Instant;
use inkpanel::config::PowerConfig;
use inkpanel::error::SensorError;
use inkpanel::events::EventKind;
use inkpanel::fsm::PowerMode;
use inkpanel::fsm::context::{SamplingMode, WifiMode};
use inkpanel::pins;
use inkpanel::power::PowerStateMachine;

fn t(ms: u32) -> Instant {
    Instant::from_millis(ms)
}

fn started(hw: &mut MockHardware) -> PowerStateMachine {
    let mut power = PowerStateMachine::new(PowerConfig::default(), Instant::ZERO);
    power.start(hw);
    power
}

// ── Start-up ──────────────────────────────────────────────────

#[test]
fn start_applies_full_speed_directives() {
    let mut hw = MockHardware::new();
    let power = started(&mut hw);

    assert_eq!(power.mode(), PowerMode::Active);
    assert_eq!(hw.last_cpu_mhz(), Some(240));
    assert_eq!(hw.last_wifi(), Some(WifiMode::Station));
    assert_eq!(hw.last_sampling(), Some(SamplingMode::Continuous));
    assert!(hw.calls.contains(&PowerCall::Bluetooth(true)));
    assert!(!hw.calls.iter().any(|c| matches!(c, PowerCall::Hold(_))));
}

// ── ACTIVE → LOW_POWER ────────────────────────────────────────

#[test]
fn no_motion_timeout_enters_low_power() {
    let (_clock, bus) = manual_bus();
    let seen = record_all(&bus);
    let mut hw = MockHardware::new();
    let mut power = started(&mut hw);

    assert!(power.poll(t(29_999), &mut hw, &bus).is_none());
    let tr = power.poll(t(30_000), &mut hw, &bus).expect("transition");

    assert_eq!((tr.from, tr.to), (PowerMode::Active, PowerMode::LowPower));
    assert_eq!(tr.at, t(30_000));
    assert!(power.is_low_power());
    assert_eq!(count(&seen, EventKind::LowPowerEnter), 1);

    assert_eq!(hw.last_cpu_mhz(), Some(80));
    assert_eq!(hw.last_wifi(), Some(WifiMode::Off));
    assert_eq!(hw.last_sampling(), Some(SamplingMode::AlarmSensorsOnly));
    assert!(
        hw.calls
            .contains(&PowerCall::Hold(pins::HOLD_IN_LOW_POWER.to_vec()))
    );
}

#[test]
fn dark_and_still_skips_timeout() {
    let (_clock, bus) = manual_bus();
    let mut hw = MockHardware::new();
    hw.light = Ok(40);
    let mut power = started(&mut hw);

    let tr = power.poll(t(1_000), &mut hw, &bus).expect("transition");
    assert_eq!(tr.to, PowerMode::LowPower);
}

#[test]
fn dark_with_motion_stays_active() {
    let (_clock, bus) = manual_bus();
    let mut hw = MockHardware::new();
    hw.light = Ok(40);
    hw.motion = Ok(true);
    let mut power = started(&mut hw);

    assert!(power.poll(t(1_000), &mut hw, &bus).is_none());
    assert_eq!(power.mode(), PowerMode::Active);
}

#[test]
fn motion_resets_the_timeout() {
    let (_clock, bus) = manual_bus();
    let mut hw = MockHardware::new();
    let mut power = started(&mut hw);

    hw.motion = Ok(true);
    power.poll(t(20_000), &mut hw, &bus);
    hw.motion = Ok(false);

    assert!(power.poll(t(49_999), &mut hw, &bus).is_none());
    assert!(power.poll(t(50_000), &mut hw, &bus).is_some());
}

// ── Fail-safe sensor reads ────────────────────────────────────

#[test]
fn failed_motion_read_counts_as_presence() {
    let (_clock, bus) = manual_bus();
    let mut hw = MockHardware::new();
    hw.motion = Err(SensorError::GpioReadFailed);
    let mut power = started(&mut hw);

    assert!(power.poll(t(60_000), &mut hw, &bus).is_none());
    assert_eq!(power.last_motion_at(), t(60_000));
}

#[test]
fn failed_light_read_counts_as_daylight() {
    let (_clock, bus) = manual_bus();
    let mut hw = MockHardware::new();
    hw.light = Err(SensorError::AdcReadFailed);
    let mut power = started(&mut hw);

    // No night shortcut; only the timeout applies.
    assert!(power.poll(t(1_000), &mut hw, &bus).is_none());
    assert!(power.poll(t(30_000), &mut hw, &bus).is_some());
}

// ── LOW_POWER → ACTIVE ────────────────────────────────────────

#[test]
fn motion_wakes_and_restores_peripherals() {
    let (_clock, bus) = manual_bus();
    let seen = record_all(&bus);
    let mut hw = MockHardware::new();
    let mut power = started(&mut hw);
    power.poll(t(30_000), &mut hw, &bus);

    hw.motion = Ok(true);
    let tr = power.poll(t(31_000), &mut hw, &bus).expect("wake");

    assert_eq!((tr.from, tr.to), (PowerMode::LowPower, PowerMode::Active));
    assert_eq!(count(&seen, EventKind::LowPowerExit), 1);
    assert_eq!(hw.last_cpu_mhz(), Some(240));
    assert_eq!(hw.last_sampling(), Some(SamplingMode::Continuous));
    assert_eq!(
        hw.calls.iter().rev().find(|c| matches!(c, PowerCall::Hold(_) | PowerCall::Release(_))),
        Some(&PowerCall::Release(pins::ALWAYS_SAMPLED.to_vec()))
    );
}

#[test]
fn disabled_feature_never_sleeps() {
    let (_clock, bus) = manual_bus();
    let mut hw = MockHardware::new();
    hw.light = Ok(0);
    let mut power = started(&mut hw);
    power.set_low_power_enabled(false);

    for s in 1..=10 {
        assert!(power.poll(t(s * 60_000), &mut hw, &bus).is_none());
    }
    assert_eq!(power.mode(), PowerMode::Active);
}

#[test]
fn disabling_while_asleep_returns_to_active() {
    let (_clock, bus) = manual_bus();
    let mut hw = MockHardware::new();
    let mut power = started(&mut hw);
    power.poll(t(30_000), &mut hw, &bus);
    assert_eq!(power.mode(), PowerMode::LowPower);

    power.set_low_power_enabled(false);
    let tr = power.poll(t(31_000), &mut hw, &bus).expect("transition");
    assert_eq!(tr.to, PowerMode::Active);
}

// ── Battery sampling ──────────────────────────────────────────

#[test]
fn battery_is_sampled_on_first_poll_then_per_interval() {
    let (_clock, bus) = manual_bus();
    let seen = record_all(&bus);
    let mut hw = MockHardware::new();
    hw.motion = Ok(true);
    hw.voltage = Ok(3.6);
    let mut power = started(&mut hw);

    power.poll(t(0), &mut hw, &bus);
    assert_eq!(power.battery_pct(), 50);
    assert_eq!(count(&seen, EventKind::PowerStateChanged), 1);

    power.poll(t(299_999), &mut hw, &bus);
    assert_eq!(count(&seen, EventKind::PowerStateChanged), 1);

    hw.voltage = Ok(4.2);
    power.poll(t(300_000), &mut hw, &bus);
    assert_eq!(power.battery_pct(), 100);
    assert_eq!(count(&seen, EventKind::PowerStateChanged), 2);
}

#[test]
fn failed_voltage_read_keeps_previous_percentage() {
    let (_clock, bus) = manual_bus();
    let seen = record_all(&bus);
    let mut hw = MockHardware::new();
    hw.voltage = Err(SensorError::AdcReadFailed);
    let mut power = started(&mut hw);

    power.poll(t(0), &mut hw, &bus);
    assert_eq!(power.battery_pct(), 100);
    assert_eq!(count(&seen, EventKind::PowerStateChanged), 0);
}

#[test]
fn charging_edges_are_published_once() {
    let (_clock, bus) = manual_bus();
    let seen = record_all(&bus);
    let mut power = PowerStateMachine::new(PowerConfig::default(), Instant::ZERO);

    power.observe_battery(60, true, &bus);
    power.observe_battery(61, true, &bus);
    power.observe_battery(62, false, &bus);

    assert_eq!(count(&seen, EventKind::ChargingStarted), 1);
    assert_eq!(count(&seen, EventKind::ChargingStopped), 1);
    assert_eq!(count(&seen, EventKind::PowerStateChanged), 3);
}

#[test]
fn battery_low_hysteresis() {
    let (_clock, bus) = manual_bus();
    let seen = record_all(&bus);
    let mut power = PowerStateMachine::new(PowerConfig::default(), Instant::ZERO);

    power.observe_battery(9, false, &bus);
    assert!(power.is_battery_low());
    // Inside the dead band: no BatteryOk yet.
    power.observe_battery(12, false, &bus);
    assert_eq!(count(&seen, EventKind::BatteryOk), 0);
    power.observe_battery(13, false, &bus);
    assert_eq!(count(&seen, EventKind::BatteryOk), 1);
    assert!(!power.is_battery_low());

    power.observe_battery(9, false, &bus);
    assert_eq!(count(&seen, EventKind::BatteryLow), 2);
}

#[test]
fn charging_suppresses_battery_low() {
    let (_clock, bus) = manual_bus();
    let seen = record_all(&bus);
    let mut power = PowerStateMachine::new(PowerConfig::default(), Instant::ZERO);

    power.observe_battery(5, true, &bus);
    assert_eq!(count(&seen, EventKind::BatteryLow), 0);
    assert!(!power.is_battery_low());
}
