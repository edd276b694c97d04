//! Panel service: the hexagonal core.
//!
//! [`PanelService`] owns the power state machine and the refresh scheduler
//! and shares the event bus with producers.  One [`tick`](PanelService::tick)
//! runs the power check strictly before the scheduler's dirty computation.
//!
//! ```text
//!  producers ──publish──▶ EventBus ──▶ RefreshScheduler ──plan──▶ RenderPort
//!                            ▲                                      │
//!  PresenceSensorPort ──▶ PowerStateMachine ──▶ HardwarePowerControl│
//!  BatteryPort ─────────▶        │                                  ▼
//!                                └──────── OperatorSink ◀──── render dispatch
//! ```

use core::cell::RefCell;
use std::rc::Rc;

use log::{info, warn};

use crate::bus::{EventBus, SharedHandler};
use crate::clock::Instant;
use crate::config::PanelConfig;
use crate::fsm::PowerMode;
use crate::power::PowerStateMachine;
use crate::render::{self, DispatchOutcome};
use crate::scheduler::plan::RefreshPlan;
use crate::scheduler::{RefreshScheduler, SUBSCRIBED_KINDS, SUBSCRIBER_LABEL};

use super::commands::PanelCommand;
use super::events::{OperatorEvent, PanelStatus};
use super::ports::{
    BatteryPort, ConfigPort, HardwarePowerControl, OperatorSink, PresenceSensorPort, RenderPort,
};

/// Quiet period after the last config change before it is persisted.
pub const CONFIG_AUTO_SAVE_DELAY_MS: u32 = 5_000;

pub struct PanelService {
    bus: Rc<EventBus>,
    power: PowerStateMachine,
    scheduler: Rc<RefCell<RefreshScheduler>>,
    config: PanelConfig,
    tick_count: u64,
    config_dirty: bool,
    dirty_since: Instant,
    save_requested: bool,
}

impl PanelService {
    /// Build the components and subscribe the scheduler to the bus.
    ///
    /// Does **not** start the power FSM; call [`start`](Self::start) next.
    pub fn new(config: PanelConfig, bus: Rc<EventBus>, now: Instant) -> Self {
        let power = PowerStateMachine::new(config.power.clone(), now);
        let scheduler = Rc::new(RefCell::new(RefreshScheduler::new(&config, now)));
        for kind in SUBSCRIBED_KINDS {
            let handler: SharedHandler = scheduler.clone();
            bus.subscribe(kind, SUBSCRIBER_LABEL, handler);
        }
        Self {
            bus,
            power,
            scheduler,
            config,
            tick_count: 0,
            config_dirty: false,
            dirty_since: now,
            save_requested: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, hw: &mut impl HardwarePowerControl, sink: &mut impl OperatorSink) {
        self.power.start(hw);
        let mode = self.power.mode();
        sink.emit(&OperatorEvent::Started(mode));
        info!("PanelService started in {mode}");
    }

    /// Unsubscribe the scheduler.  The service is inert afterwards.
    pub fn shutdown(&mut self) {
        let removed = self.bus.unsubscribe_all(SUBSCRIBER_LABEL);
        info!("PanelService shut down ({removed} subscriptions released)");
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One cycle: power check → refresh plan → render.  Returns the plan
    /// that was dispatched (possibly empty).
    ///
    /// `hw` satisfies the presence, battery and power-control ports at once,
    /// which avoids a double mutable borrow of one peripheral bundle.
    pub fn tick(
        &mut self,
        now: Instant,
        hw: &mut (impl PresenceSensorPort + BatteryPort + HardwarePowerControl),
        renderer: &mut impl RenderPort,
        sink: &mut impl OperatorSink,
    ) -> RefreshPlan {
        self.tick_count += 1;

        if let Some(t) = self.power.poll(now, hw, &self.bus) {
            sink.emit(&OperatorEvent::PowerModeChanged {
                from: t.from,
                to: t.to,
            });
        }

        let mut sched = self.scheduler.borrow_mut();
        let plan = sched.compute_refresh_plan(now);
        let outcome = render::dispatch(&plan, sched.layout(), renderer, sink);
        if let DispatchOutcome::Recovered(_) = outcome {
            sched.note_full_redraw(now);
        }
        drop(sched);
        if outcome.drew() {
            self.power.mark_display_updated(now);
        }
        if let DispatchOutcome::Failed(e) = outcome {
            warn!("tick {}: panel not updated ({e})", self.tick_count);
        }
        plan
    }

    // ── Command handling ──────────────────────────────────────

    pub fn handle_command(&mut self, cmd: PanelCommand, now: Instant, sink: &mut impl OperatorSink) {
        match cmd {
            PanelCommand::SwitchRightPage(page) => {
                self.scheduler.borrow_mut().switch_right_page(page);
            }
            PanelCommand::SetShowSeconds(on) => {
                self.scheduler.borrow_mut().set_show_seconds(on);
                if self.config.refresh.show_seconds != on {
                    self.config.refresh.show_seconds = on;
                    self.mark_config_dirty(now);
                }
            }
            PanelCommand::HideAlarm => {
                self.scheduler.borrow_mut().hide_alarm();
            }
            PanelCommand::ForceFullRefresh => {
                self.scheduler.borrow_mut().force_full_refresh();
            }
            PanelCommand::SetLowPowerEnabled(on) => {
                self.power.set_low_power_enabled(on);
                if self.config.power.low_power_enabled != on {
                    self.config.power.low_power_enabled = on;
                    self.mark_config_dirty(now);
                }
            }
            PanelCommand::UpdateConfig(new_config) => match new_config.validate() {
                Ok(()) => {
                    self.power.set_config(new_config.power.clone());
                    self.scheduler.borrow_mut().apply_config(&new_config);
                    self.config = new_config;
                    self.mark_config_dirty(now);
                    info!("Configuration updated at runtime");
                }
                Err(e) => {
                    warn!("Configuration rejected: {e}");
                    sink.emit(&OperatorEvent::ConfigRejected(e));
                }
            },
            PanelCommand::SaveConfig => {
                self.config_dirty = true;
                self.save_requested = true;
                info!("Explicit config save requested (flushes on next auto-save check)");
            }
            PanelCommand::RequestStatus => {
                sink.emit(&OperatorEvent::Status(self.build_status(now)));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn build_status(&self, now: Instant) -> PanelStatus {
        let sched = self.scheduler.borrow();
        PanelStatus {
            at: now,
            mode: self.power.mode(),
            time_in_mode_ms: now.elapsed_since(self.power.mode_entered_at()),
            battery_pct: self.power.battery_pct(),
            is_charging: self.power.is_charging(),
            battery_low: self.power.is_battery_low(),
            right_page: sched.right_page(),
            refresh_multiplier: sched.multiplier(),
            alarming: sched.is_alarming(now),
            animating: sched.is_animating(now),
            anomaly_flags: sched.anomaly_flags(),
            last_full_refresh_at: sched.last_full_refresh_at(),
            bus: self.bus.stats(),
        }
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn power(&self) -> &PowerStateMachine {
        &self.power
    }

    pub fn power_mut(&mut self) -> &mut PowerStateMachine {
        &mut self.power
    }

    /// Shared handle on the scheduler.  Do not hold a borrow across a
    /// publish: the bus would defer the scheduler's delivery.
    pub fn scheduler(&self) -> &Rc<RefCell<RefreshScheduler>> {
        &self.scheduler
    }

    pub fn mode(&self) -> PowerMode {
        self.power.mode()
    }

    pub fn is_alarming(&self, now: Instant) -> bool {
        self.scheduler.borrow().is_alarming(now)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn current_config(&self) -> PanelConfig {
        self.config.clone()
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.scheduler.borrow().is_animating(now)
    }

    // ── Config dirty-flag management ──────────────────────────

    fn mark_config_dirty(&mut self, now: Instant) {
        self.config_dirty = true;
        self.dirty_since = now;
    }

    /// Persist once the config has been quiet for
    /// [`CONFIG_AUTO_SAVE_DELAY_MS`], or at once after `SaveConfig`.
    /// Returns `true` if it was saved.
    pub fn auto_save_if_needed(&mut self, now: Instant, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        if !self.save_requested && !now.has_elapsed(self.dirty_since, CONFIG_AUTO_SAVE_DELAY_MS) {
            return false;
        }
        self.save(storage, "auto-saved")
    }

    /// Save now if dirty (before a reboot).
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if self.config_dirty {
            self.save(storage, "force-saved");
        }
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    fn save(&mut self, storage: &impl ConfigPort, what: &str) -> bool {
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                self.save_requested = false;
                info!("Config {what}");
                true
            }
            Err(e) => {
                warn!("Config save failed: {e}");
                false
            }
        }
    }
}
