//! Mock adapters for integration tests.
//!
//! Records every power-control call and every rendered plan so tests can
//! assert on the full history without real GPIO, ADC or SPI.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use inkpanel::adapters::time::ManualClock;
use inkpanel::app::events::OperatorEvent;
use inkpanel::app::ports::{
    BatteryPort, ConfigError, ConfigPort, HardwarePowerControl, OperatorSink, PresenceSensorPort,
    RenderPort,
};
use inkpanel::bus::EventBus;
use inkpanel::config::PanelConfig;
use inkpanel::error::{RenderError, SensorError};
use inkpanel::events::{EventEnvelope, EventKind};
use inkpanel::fsm::context::{SamplingMode, WifiMode};
use inkpanel::scheduler::plan::RefreshPlan;

// ── Power-control call record ─────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PowerCall {
    Cpu(u32),
    Wifi(WifiMode),
    Bluetooth(bool),
    Hold(Vec<i32>),
    Release(Vec<i32>),
    Sampling(SamplingMode),
}

// ── MockHardware ──────────────────────────────────────────────

/// Presence sensors, battery gauge and power knobs in one bundle.
pub struct MockHardware {
    pub motion: Result<bool, SensorError>,
    pub light: Result<u16, SensorError>,
    pub voltage: Result<f32, SensorError>,
    pub charging: Result<bool, SensorError>,
    /// Queued voltages consumed one per read before falling back to `voltage`.
    pub voltage_script: VecDeque<f32>,
    pub calls: Vec<PowerCall>,
}

#[allow(dead_code)]
impl MockHardware {
    /// Daylight, nobody around, full battery.
    pub fn new() -> Self {
        Self {
            motion: Ok(false),
            light: Ok(2_000),
            voltage: Ok(4.2),
            charging: Ok(false),
            voltage_script: VecDeque::new(),
            calls: Vec::new(),
        }
    }

    pub fn last_cpu_mhz(&self) -> Option<u32> {
        self.calls.iter().rev().find_map(|c| match c {
            PowerCall::Cpu(mhz) => Some(*mhz),
            _ => None,
        })
    }

    pub fn last_sampling(&self) -> Option<SamplingMode> {
        self.calls.iter().rev().find_map(|c| match c {
            PowerCall::Sampling(mode) => Some(*mode),
            _ => None,
        })
    }

    pub fn last_wifi(&self) -> Option<WifiMode> {
        self.calls.iter().rev().find_map(|c| match c {
            PowerCall::Wifi(mode) => Some(*mode),
            _ => None,
        })
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceSensorPort for MockHardware {
    fn read_motion(&mut self) -> Result<bool, SensorError> {
        self.motion
    }

    fn read_light(&mut self) -> Result<u16, SensorError> {
        self.light
    }
}

impl BatteryPort for MockHardware {
    fn read_voltage(&mut self) -> Result<f32, SensorError> {
        match self.voltage_script.pop_front() {
            Some(v) => Ok(v),
            None => self.voltage,
        }
    }

    fn read_charging(&mut self) -> Result<bool, SensorError> {
        self.charging
    }
}

impl HardwarePowerControl for MockHardware {
    fn set_cpu_frequency_mhz(&mut self, mhz: u32) {
        self.calls.push(PowerCall::Cpu(mhz));
    }

    fn set_wifi(&mut self, mode: WifiMode) {
        self.calls.push(PowerCall::Wifi(mode));
    }

    fn set_bluetooth(&mut self, enabled: bool) {
        self.calls.push(PowerCall::Bluetooth(enabled));
    }

    fn hold_pins(&mut self, pins: &[i32]) {
        self.calls.push(PowerCall::Hold(pins.to_vec()));
    }

    fn release_pins(&mut self, pins: &[i32]) {
        self.calls.push(PowerCall::Release(pins.to_vec()));
    }

    fn set_sampling_mode(&mut self, mode: SamplingMode) {
        self.calls.push(PowerCall::Sampling(mode));
    }
}

// ── MockPanel ─────────────────────────────────────────────────

/// Render port that keeps every plan it was handed.
#[derive(Default)]
pub struct MockPanel {
    pub plans: Vec<RefreshPlan>,
    /// Number of upcoming `render` calls that fail.
    pub fail_next: u32,
    pub reinits: u32,
    pub clears: u32,
}

#[allow(dead_code)]
impl MockPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full_refreshes(&self) -> usize {
        self.plans.iter().filter(|p| p.full_refresh).count()
    }
}

impl RenderPort for MockPanel {
    fn render(&mut self, plan: &RefreshPlan) -> Result<(), RenderError> {
        self.plans.push(plan.clone());
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(RenderError::BusFault);
        }
        Ok(())
    }

    fn reinitialize(&mut self) -> Result<(), RenderError> {
        self.reinits += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.clears += 1;
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<OperatorEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode_changes(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, OperatorEvent::PowerModeChanged { .. }))
            .count()
    }
}

impl OperatorSink for RecordingSink {
    fn emit(&mut self, event: &OperatorEvent) {
        self.events.push(event.clone());
    }
}

// ── MemConfigStore ────────────────────────────────────────────

/// In-memory [`ConfigPort`] that validates like the NVS store.
#[derive(Default)]
pub struct MemConfigStore {
    pub stored: RefCell<Option<PanelConfig>>,
    pub saves: RefCell<u32>,
}

#[allow(dead_code)]
impl MemConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> u32 {
        *self.saves.borrow()
    }
}

impl ConfigPort for MemConfigStore {
    fn load(&self) -> Result<PanelConfig, ConfigError> {
        Ok(self.stored.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &PanelConfig) -> Result<(), ConfigError> {
        config.validate()?;
        *self.stored.borrow_mut() = Some(config.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

// ── Bus helpers ───────────────────────────────────────────────

/// A bus on a manual clock the test advances.
#[allow(dead_code)]
pub fn manual_bus() -> (Rc<ManualClock>, Rc<EventBus>) {
    let clock = Rc::new(ManualClock::new());
    let bus = Rc::new(EventBus::new(clock.clone()));
    (clock, bus)
}

/// Subscribe a recorder to every kind; returns the shared log of envelopes.
#[allow(dead_code)]
pub fn record_all(bus: &EventBus) -> Rc<RefCell<Vec<EventEnvelope>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    for kind in EventKind::ALL {
        let log = Rc::clone(&seen);
        bus.subscribe_fn(kind, "recorder", move |env: &EventEnvelope, _: &EventBus| {
            log.borrow_mut().push(env.clone());
            Ok(())
        });
    }
    seen
}

/// Number of recorded envelopes of `kind`.
#[allow(dead_code)]
pub fn count(seen: &Rc<RefCell<Vec<EventEnvelope>>>, kind: EventKind) -> usize {
    seen.borrow().iter().filter(|e| e.kind == kind).count()
}
