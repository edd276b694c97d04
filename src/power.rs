//! Power state machine service.
//!
//! Wraps the table-driven [`Fsm`] with everything that touches the outside
//! world: reading presence sensors with fail-safe defaults, publishing
//! transition and battery events on the bus, and applying the mode's
//! [`PowerDirectives`] through [`HardwarePowerControl`].
//!
//! ## Battery hysteresis
//!
//! ```text
//!   pct ──────────────────────────────────────────────────────▶
//!        │◀── BatteryLow ──│        dead band         │── BatteryOk ──▶
//!                       critical               critical × 1.2
//! ```
//!
//! `BatteryLow` is published once when the percentage drops below
//! `critical_battery_pct` while not charging, and not again until
//! `BatteryOk` has fired above `critical × 1.2`.

use log::{debug, info, warn};

use crate::app::ports::{BatteryPort, HardwarePowerControl, PresenceSensorPort};
use crate::bus::EventBus;
use crate::clock::Instant;
use crate::config::PowerConfig;
use crate::events::{EventKind, EventPayload, PowerState};
use crate::fsm::context::{PowerContext, PowerDirectives, PresenceSample};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, PowerMode, Transition};
use crate::pins;

/// Linear cell gauge, clamped to 0..=100.
pub fn voltage_to_percent(voltage: f32, empty: f32, full: f32) -> u8 {
    if !voltage.is_finite() || full <= empty {
        return 0;
    }
    let pct = (voltage - empty) / (full - empty) * 100.0;
    pct.clamp(0.0, 100.0).round() as u8
}

pub struct PowerStateMachine {
    fsm: Fsm,
    ctx: PowerContext,
    battery_low_latched: bool,
    last_battery_sample: Option<Instant>,
}

impl PowerStateMachine {
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: PowerConfig, now: Instant) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), PowerMode::Active),
            ctx: PowerContext::new(config, now),
            battery_low_latched: false,
            last_battery_sample: None,
        }
    }

    /// Enter the initial mode and push its directives to hardware.
    pub fn start(&mut self, hw: &mut impl HardwarePowerControl) {
        self.fsm.start(&mut self.ctx);
        apply_directives(&self.ctx.directives, hw);
    }

    // ── Per-tick ──────────────────────────────────────────────

    /// Sample presence, evaluate the mode, and sample the battery when due.
    pub fn poll(
        &mut self,
        now: Instant,
        hw: &mut (impl PresenceSensorPort + BatteryPort + HardwarePowerControl),
        bus: &EventBus,
    ) -> Option<Transition> {
        let sample = read_presence(hw);
        let transition = self.evaluate(now, sample, hw, bus);

        let due = self.last_battery_sample.is_none_or(|last| {
            now.has_elapsed(last, self.ctx.config.battery_sample_interval_ms)
        });
        if due {
            self.sample_battery(now, hw, bus);
        }
        transition
    }

    /// Evaluate one presence sample.  Publishes `LowPowerEnter` /
    /// `LowPowerExit` and applies directives on a transition.
    pub fn evaluate(
        &mut self,
        now: Instant,
        sample: PresenceSample,
        hw: &mut impl HardwarePowerControl,
        bus: &EventBus,
    ) -> Option<Transition> {
        self.ctx.now = now;
        self.ctx.sample = sample;
        if sample.motion {
            self.ctx.last_motion_at = now;
        }

        let transition = self.fsm.tick(&mut self.ctx)?;
        self.announce(transition, hw, bus);
        Some(transition)
    }

    /// Read the gauge and feed [`observe_battery`](Self::observe_battery).
    /// A failed read keeps the previous values.
    pub fn sample_battery(&mut self, now: Instant, battery: &mut impl BatteryPort, bus: &EventBus) {
        self.last_battery_sample = Some(now);
        let voltage = match battery.read_voltage() {
            Ok(v) => v,
            Err(e) => {
                warn!("power: battery voltage read failed ({e}), keeping {}%", self.ctx.battery_pct);
                return;
            }
        };
        let charging = battery.read_charging().unwrap_or_else(|e| {
            warn!("power: charge status read failed ({e})");
            self.ctx.is_charging
        });
        let pct = voltage_to_percent(
            voltage,
            self.ctx.config.empty_voltage,
            self.ctx.config.full_voltage,
        );
        debug!("power: battery {voltage:.2} V -> {pct}%, charging={charging}");
        self.observe_battery(pct, charging, bus);
    }

    /// Apply one battery observation: charging edges, hysteresis, and a
    /// `PowerStateChanged` snapshot, in that order.
    pub fn observe_battery(&mut self, pct: u8, charging: bool, bus: &EventBus) {
        let pct = pct.min(100);
        let was_charging = self.ctx.is_charging;
        self.ctx.battery_pct = pct;
        self.ctx.is_charging = charging;

        if charging != was_charging {
            let kind = if charging {
                EventKind::ChargingStarted
            } else {
                EventKind::ChargingStopped
            };
            info!("power: {kind}");
            bus.publish(kind, EventPayload::None);
        }

        let critical = self.ctx.config.critical_battery_pct;
        if !self.battery_low_latched && !charging && pct < critical {
            self.battery_low_latched = true;
            warn!("power: battery low ({pct}% < {critical}%)");
            bus.publish(EventKind::BatteryLow, EventPayload::None);
        } else if self.battery_low_latched && u32::from(pct) * 10 > u32::from(critical) * 12 {
            self.battery_low_latched = false;
            info!("power: battery recovered ({pct}%)");
            bus.publish(EventKind::BatteryOk, EventPayload::None);
        }

        bus.publish(
            EventKind::PowerStateChanged,
            EventPayload::Power(self.power_state()),
        );
    }

    // ── Configuration ─────────────────────────────────────────

    pub fn set_config(&mut self, config: PowerConfig) {
        self.ctx.config = config;
    }

    pub fn set_low_power_enabled(&mut self, enabled: bool) {
        self.ctx.config.low_power_enabled = enabled;
    }

    pub fn mark_display_updated(&mut self, now: Instant) {
        self.ctx.last_display_update_at = now;
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> PowerMode {
        self.fsm.current_mode()
    }

    pub fn is_low_power(&self) -> bool {
        self.ctx.is_low_power
    }

    pub fn battery_pct(&self) -> u8 {
        self.ctx.battery_pct
    }

    pub fn is_charging(&self) -> bool {
        self.ctx.is_charging
    }

    pub fn is_battery_low(&self) -> bool {
        self.battery_low_latched
    }

    /// When the current mode was entered.
    pub fn mode_entered_at(&self) -> Instant {
        self.fsm.entered_at()
    }

    pub fn last_motion_at(&self) -> Instant {
        self.ctx.last_motion_at
    }

    pub fn last_display_update_at(&self) -> Instant {
        self.ctx.last_display_update_at
    }

    pub fn directives(&self) -> PowerDirectives {
        self.ctx.directives
    }

    pub fn config(&self) -> &PowerConfig {
        &self.ctx.config
    }

    pub fn power_state(&self) -> PowerState {
        PowerState {
            battery_pct: self.ctx.battery_pct,
            is_charging: self.ctx.is_charging,
            is_low_power: self.ctx.is_low_power,
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn announce(&self, t: Transition, hw: &mut impl HardwarePowerControl, bus: &EventBus) {
        apply_directives(&self.ctx.directives, hw);
        let kind = match t.to {
            PowerMode::LowPower => EventKind::LowPowerEnter,
            PowerMode::Active => EventKind::LowPowerExit,
        };
        bus.publish_at(kind, EventPayload::None, t.at);
    }
}

/// Read presence sensors, substituting fail-safe values on error.
fn read_presence(sensors: &mut impl PresenceSensorPort) -> PresenceSample {
    let motion = sensors.read_motion().unwrap_or_else(|e| {
        warn!("power: motion read failed ({e}), assuming presence");
        true
    });
    let light_level = match sensors.read_light() {
        Ok(level) => Some(level),
        Err(e) => {
            warn!("power: light read failed ({e}), assuming daylight");
            None
        }
    };
    PresenceSample {
        motion,
        light_level,
    }
}

fn apply_directives(d: &PowerDirectives, hw: &mut impl HardwarePowerControl) {
    hw.set_cpu_frequency_mhz(d.cpu_mhz);
    hw.set_wifi(d.wifi);
    hw.set_bluetooth(d.bluetooth);
    if d.hold_unused_pins {
        hw.hold_pins(&pins::HOLD_IN_LOW_POWER);
    } else {
        hw.release_pins(&pins::HOLD_IN_LOW_POWER);
    }
    hw.release_pins(&pins::ALWAYS_SAMPLED);
    hw.set_sampling_mode(d.sampling);
}
