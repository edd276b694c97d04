//! Adaptive refresh scheduler.
//!
//! Decides, once per rendering tick, which panel regions are stale enough
//! to redraw and whether the accumulated staleness warrants a full refresh.
//!
//! ```text
//!   bus events ──▶ value-delta triggers ─┐
//!                                        ├─▶ dirty channels ─▶ RefreshPlan
//!   tick(now)  ──▶ interval triggers ────┘        │
//!                  (nominal × multiplier)         ├─ left+right → full
//!                                                 └─ 1 day      → full
//!
//!   AlarmTriggered ──▶ ALARMING (pre-empts planning) ──timeout/hide──▶ IDLE
//!                                                          └─▶ full restore
//! ```
//!
//! The scheduler never reads power state directly: it subscribes to the
//! events the power state machine publishes and keeps its own view.
//! Value deltas compare against what was last *rendered*, so a slow drift
//! still redraws once it accumulates past the threshold.

pub mod channel;
pub mod layout;
pub mod overlay;
pub mod plan;

use log::{debug, info};

use crate::anomaly::{self, AnomalySupervisor};
use crate::bus::{EventBus, EventHandler, HandlerError};
use crate::clock::{Instant, Millis};
use crate::config::{AlarmConfig, PanelConfig, RefreshConfig};
use crate::events::{
    AlarmEvent, CONDITION_CAP, EventEnvelope, EventKind, EventPayload, MessageEvent, PowerState,
    SensorData, TimeData, WeatherData,
};

use channel::{ChannelId, ContentChannel, PanelSide, RightPage, TriggerReason, nominal_interval};
use layout::Layout;
use overlay::{AlarmOverlay, MessageAnimation};
use plan::{AlarmFrame, AnimationFrame, DirtyRegion, PlanReason, RefreshPlan};

/// Bus owner label for the scheduler's subscriptions.
pub const SUBSCRIBER_LABEL: &str = "refresh-scheduler";

/// Every kind the scheduler listens to.
pub const SUBSCRIBED_KINDS: [EventKind; 13] = EventKind::ALL;

#[derive(Debug, Clone, PartialEq)]
struct WeatherSummary {
    /// Tenths of a degree, so float noise below display precision is ignored.
    temp_tenths: i32,
    condition: heapless::String<CONDITION_CAP>,
}

impl From<&WeatherData> for WeatherSummary {
    fn from(w: &WeatherData) -> Self {
        Self {
            temp_tenths: (w.temperature_c * 10.0).round() as i32,
            condition: w.condition.clone(),
        }
    }
}

/// Values as last seen on the bus, and as last drawn.
#[derive(Debug, Clone, Default, PartialEq)]
struct DisplayedValues {
    clock: Option<(u8, u8, u8)>,
    date: Option<(u16, u8, u8)>,
    weather: Option<WeatherSummary>,
    sensor: Option<(f32, f32)>,
    battery: Option<(u8, bool)>,
    unread: Option<u16>,
}

pub struct RefreshScheduler {
    config: RefreshConfig,
    alarm_config: AlarmConfig,
    low_power_multiplier: u32,
    critical_multiplier: u32,
    layout: Layout,
    channels: [ContentChannel; ChannelId::COUNT],
    page: RightPage,

    // Power view, fed by bus events.
    is_low_power: bool,
    battery_low: bool,
    is_charging: bool,

    latest: DisplayedValues,
    rendered: DisplayedValues,

    last_full_refresh_at: Instant,
    pending_full: Option<PlanReason>,
    alarm: AlarmOverlay,
    animation: MessageAnimation,
    anomaly: AnomalySupervisor,
}

impl RefreshScheduler {
    /// Every channel starts dirty and the first plan is a full refresh.
    pub fn new(config: &PanelConfig, now: Instant) -> Self {
        let page = RightPage::default();
        let channels = ChannelId::ALL
            .map(|id| ContentChannel::new(id, nominal_interval(id, &config.refresh, page), now));
        Self {
            config: config.refresh.clone(),
            alarm_config: config.alarm.clone(),
            low_power_multiplier: config.power.low_power_refresh_multiplier,
            critical_multiplier: config.power.critical_refresh_multiplier,
            layout: Layout::new(config.display.width, config.display.height),
            channels,
            page,
            is_low_power: false,
            battery_low: false,
            is_charging: false,
            latest: DisplayedValues::default(),
            rendered: DisplayedValues::default(),
            last_full_refresh_at: now,
            pending_full: Some(PlanReason::Forced),
            alarm: AlarmOverlay::default(),
            animation: MessageAnimation::default(),
            anomaly: AnomalySupervisor::new(config.anomaly.clone()),
        }
    }

    // ── Planning ──────────────────────────────────────────────

    /// Compute this tick's plan and mark the planned channels rendered.
    pub fn compute_refresh_plan(&mut self, now: Instant) -> RefreshPlan {
        if let Some(plan) = self.alarm_plan(now) {
            return plan;
        }

        let multiplier = self.multiplier();
        for ch in &mut self.channels {
            ch.check_interval(now, multiplier);
        }

        let dirty_on = |side: PanelSide| {
            self.channels
                .iter()
                .any(|c| c.is_dirty() && c.id.side() == side)
        };
        let spans = dirty_on(PanelSide::Left) && dirty_on(PanelSide::Right);
        let scheduled = now.has_elapsed(self.last_full_refresh_at, self.config.full_refresh_interval_ms);

        let full_reason = if let Some(reason) = self.pending_full.take() {
            Some(reason)
        } else if spans {
            Some(PlanReason::SpansPanels)
        } else if scheduled {
            Some(PlanReason::Scheduled)
        } else {
            None
        };

        let mut plan = RefreshPlan::idle();
        match full_reason {
            Some(reason) => {
                info!("scheduler: full refresh ({reason:?}) at {now}");
                plan.full_refresh = true;
                plan.reason = reason;
                for id in ChannelId::ALL {
                    let ch = &mut self.channels[id as usize];
                    let region = DirtyRegion {
                        channel: id,
                        rect: self.layout.region(id),
                        reason: ch.trigger_reason.unwrap_or(TriggerReason::Forced),
                    };
                    let _ = plan.dirty_channels.push(region);
                    ch.mark_rendered(now);
                }
                self.rendered = self.latest.clone();
                self.last_full_refresh_at = now;
            }
            None => {
                for id in ChannelId::ALL {
                    let Some(reason) = self.channels[id as usize].trigger_reason else {
                        continue;
                    };
                    let region = DirtyRegion {
                        channel: id,
                        rect: self.layout.region(id),
                        reason,
                    };
                    let _ = plan.dirty_channels.push(region);
                    self.channels[id as usize].mark_rendered(now);
                    self.commit(id);
                }
                if !plan.dirty_channels.is_empty() {
                    plan.reason = PlanReason::Partial;
                }
            }
        }

        plan.animation = self
            .animation
            .next_frame(now, self.config.animation_duration_ms, self.config.animation_frame_ms)
            .map(|index| AnimationFrame {
                index,
                rect: self.layout.animation_region(),
            });

        if !plan.is_empty() {
            debug!(
                "scheduler: plan full={} dirty={} reason={:?} x{multiplier}",
                plan.full_refresh,
                plan.dirty_channels.len(),
                plan.reason
            );
        }
        plan
    }

    /// While alarming, the overlay owns the screen.  When it ends the next
    /// normal plan is a full restore.
    fn alarm_plan(&mut self, now: Instant) -> Option<RefreshPlan> {
        self.alarm.current()?;
        if !self.alarm.is_active(now, self.alarm_config.timeout_ms) {
            info!("alarm: timed out at {now}");
            self.alarm.hide();
            self.pending_full = Some(PlanReason::AlarmRestore);
            return None;
        }
        let mut plan = RefreshPlan::idle();
        plan.reason = PlanReason::Alarm;
        plan.alarm = self
            .alarm
            .next_frame(now, self.alarm_config.blink_interval_ms)
            .map(|(ev, inverted)| AlarmFrame {
                kind: ev.kind.clone(),
                message: ev.message.clone(),
                inverted,
            });
        Some(plan)
    }

    /// Record a full redraw done outside [`compute_refresh_plan`]
    /// (render recovery): every channel and value is now on screen.
    pub fn note_full_redraw(&mut self, now: Instant) {
        for ch in &mut self.channels {
            ch.mark_rendered(now);
        }
        self.rendered = self.latest.clone();
        self.last_full_refresh_at = now;
    }

    fn commit(&mut self, id: ChannelId) {
        let (r, l) = (&mut self.rendered, &self.latest);
        match id {
            ChannelId::Clock => r.clock = l.clock,
            ChannelId::Date => r.date = l.date,
            ChannelId::Weather => r.weather.clone_from(&l.weather),
            ChannelId::Sensor => r.sensor = l.sensor,
            ChannelId::Battery => r.battery = l.battery,
            ChannelId::Message => r.unread = l.unread,
            ChannelId::RightPage => {}
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// `true` on `[alarm start, alarm start + timeout)` unless hidden.
    pub fn is_alarming(&self, now: Instant) -> bool {
        self.alarm.is_active(now, self.alarm_config.timeout_ms)
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.animation
            .is_active(now, self.config.animation_duration_ms)
    }

    /// Current interval stretch: the larger of the low-power multiplier
    /// (in LOW_POWER) and the critical multiplier (battery low, not
    /// charging), or 1.
    pub fn multiplier(&self) -> u32 {
        let mut m = 1;
        if self.is_low_power {
            m = m.max(self.low_power_multiplier);
        }
        if self.battery_low && !self.is_charging {
            m = m.max(self.critical_multiplier);
        }
        m
    }

    pub fn effective_interval(&self, id: ChannelId) -> Millis {
        self.channels[id as usize].effective_interval(self.multiplier())
    }

    pub fn channel(&self, id: ChannelId) -> &ContentChannel {
        &self.channels[id as usize]
    }

    pub fn is_dirty(&self, id: ChannelId) -> bool {
        self.channels[id as usize].is_dirty()
    }

    pub fn right_page(&self) -> RightPage {
        self.page
    }

    pub fn is_low_power(&self) -> bool {
        self.is_low_power
    }

    pub fn is_battery_critical(&self) -> bool {
        self.battery_low && !self.is_charging
    }

    pub fn last_full_refresh_at(&self) -> Instant {
        self.last_full_refresh_at
    }

    pub fn anomaly_flags(&self) -> u8 {
        self.anomaly.flags()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    // ── Commands ──────────────────────────────────────────────

    pub fn switch_right_page(&mut self, page: RightPage) {
        if page == self.page {
            return;
        }
        info!("scheduler: right page {:?} -> {:?}", self.page, page);
        self.page = page;
        let ch = &mut self.channels[ChannelId::RightPage as usize];
        ch.nominal_interval = page.interval(&self.config);
        ch.mark_dirty(TriggerReason::PageSwitched);
    }

    pub fn set_show_seconds(&mut self, on: bool) {
        if self.config.show_seconds == on {
            return;
        }
        self.config.show_seconds = on;
        let ch = &mut self.channels[ChannelId::Clock as usize];
        ch.nominal_interval = nominal_interval(ChannelId::Clock, &self.config, self.page);
        ch.mark_dirty(TriggerReason::ModeChanged);
    }

    /// Dismiss the alarm.  Returns whether one was showing.
    pub fn hide_alarm(&mut self) -> bool {
        let was = self.alarm.hide();
        if was {
            info!("alarm: hidden");
            self.pending_full = Some(PlanReason::AlarmRestore);
        }
        was
    }

    pub fn force_full_refresh(&mut self) {
        self.pending_full = Some(PlanReason::Forced);
    }

    /// Take new cadences, multipliers, alarm timing and geometry.
    pub fn apply_config(&mut self, config: &PanelConfig) {
        self.config = config.refresh.clone();
        self.alarm_config = config.alarm.clone();
        self.low_power_multiplier = config.power.low_power_refresh_multiplier;
        self.critical_multiplier = config.power.critical_refresh_multiplier;
        self.anomaly.set_config(config.anomaly.clone());
        for ch in &mut self.channels {
            ch.nominal_interval = nominal_interval(ch.id, &self.config, self.page);
        }
        let layout = Layout::new(config.display.width, config.display.height);
        if layout != self.layout {
            self.layout = layout;
            self.pending_full = Some(PlanReason::Forced);
        }
    }

    // ── Event intake ──────────────────────────────────────────

    fn on_time(&mut self, t: &TimeData) {
        let clock = (t.hour, t.minute, t.second);
        let date = (t.year, t.month, t.day);
        self.latest.clock = Some(clock);
        self.latest.date = Some(date);

        let shown = self.rendered.clock;
        let minute_moved = shown.is_none_or(|(h, m, _)| (h, m) != (t.hour, t.minute));
        let second_moved = self.config.show_seconds && shown.is_none_or(|(_, _, s)| s != t.second);
        if minute_moved || second_moved {
            self.mark(ChannelId::Clock, TriggerReason::ValueChanged);
        }
        if self.rendered.date != Some(date) {
            self.mark(ChannelId::Date, TriggerReason::DayChanged);
            if self.page == RightPage::Calendar {
                self.mark(ChannelId::RightPage, TriggerReason::DayChanged);
            }
        }
    }

    fn on_weather(&mut self, w: &WeatherData) {
        let summary = WeatherSummary::from(w);
        if self.rendered.weather.as_ref() != Some(&summary) {
            self.mark(ChannelId::Weather, TriggerReason::ValueChanged);
        }
        self.latest.weather = Some(summary);
    }

    fn on_sensor(&mut self, s: &SensorData, at: Instant, bus: &EventBus) {
        if !s.valid {
            debug!("scheduler: ignoring invalid sensor sample");
            return;
        }
        self.latest.sensor = Some((s.temperature_c, s.humidity_pct));
        let moved = self.rendered.sensor.is_none_or(|(t, h)| {
            (s.temperature_c - t).abs() >= self.config.sensor_temperature_delta
                || (s.humidity_pct - h).abs() >= self.config.sensor_humidity_delta
        });
        if moved {
            self.mark(ChannelId::Sensor, TriggerReason::ValueChanged);
        }

        let new_flags = self.anomaly.evaluate(s);
        if new_flags != 0 {
            let alarm = AlarmEvent::new("Sensor", anomaly::describe(new_flags));
            bus.publish_at(EventKind::AlarmTriggered, EventPayload::Alarm(alarm), at);
        }
    }

    fn on_power_state(&mut self, p: &PowerState) {
        self.is_low_power = p.is_low_power;
        self.is_charging = p.is_charging;
        self.latest.battery = Some((p.battery_pct, p.is_charging));
        let moved = self.rendered.battery.is_none_or(|(pct, charging)| {
            pct.abs_diff(p.battery_pct) > self.config.battery_pct_delta || charging != p.is_charging
        });
        if moved {
            self.mark(ChannelId::Battery, TriggerReason::ValueChanged);
        }
    }

    fn on_message(&mut self, kind: EventKind, m: &MessageEvent, at: Instant) {
        let previous = self.latest.unread.unwrap_or(0);
        self.latest.unread = Some(m.unread);
        if self.rendered.unread != Some(m.unread) {
            self.mark(ChannelId::Message, TriggerReason::ValueChanged);
            if self.page == RightPage::Message {
                self.mark(ChannelId::RightPage, TriggerReason::ValueChanged);
            }
        }
        if kind == EventKind::MessageReceived
            && m.unread > previous
            && self.animation.start(at, self.config.animation_duration_ms)
        {
            debug!("scheduler: message animation started at {at}");
        }
    }

    fn mark(&mut self, id: ChannelId, reason: TriggerReason) {
        self.channels[id as usize].mark_dirty(reason);
    }
}

impl EventHandler for RefreshScheduler {
    fn handle(&mut self, env: &EventEnvelope, bus: &EventBus) -> Result<(), HandlerError> {
        let mismatch = || HandlerError::PayloadMismatch;
        match env.kind {
            EventKind::TimeUpdated => self.on_time(env.time().ok_or_else(mismatch)?),
            EventKind::WeatherUpdated => self.on_weather(env.weather().ok_or_else(mismatch)?),
            EventKind::SensorDataUpdated => {
                let s = *env.sensor().ok_or_else(mismatch)?;
                self.on_sensor(&s, env.emitted_at, bus);
            }
            EventKind::PowerStateChanged => self.on_power_state(env.power().ok_or_else(mismatch)?),
            EventKind::BatteryLow => self.battery_low = true,
            EventKind::BatteryOk => self.battery_low = false,
            EventKind::ChargingStarted => self.is_charging = true,
            EventKind::ChargingStopped => self.is_charging = false,
            EventKind::LowPowerEnter => self.is_low_power = true,
            EventKind::LowPowerExit => self.is_low_power = false,
            EventKind::MessageReceived | EventKind::MessageRead => {
                let m = *env.message().ok_or_else(mismatch)?;
                self.on_message(env.kind, &m, env.emitted_at);
            }
            EventKind::AlarmTriggered => {
                let alarm = env.alarm().ok_or_else(mismatch)?.clone();
                self.alarm.trigger(alarm, env.emitted_at);
            }
        }
        Ok(())
    }
}
