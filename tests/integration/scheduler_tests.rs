//! Refresh scheduler driven through the bus, the way the firmware feeds it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::mock_hw::manual_bus;

use inkpanel::adapters::time::ManualClock;
use inkpanel::bus::{EventBus, SharedHandler};
use inkpanel::clock::Instant;
use inkpanel::config::PanelConfig;
use inkpanel::events::{
    AlarmEvent, EventKind, EventPayload, MessageEvent, PowerState, SensorData, TimeData,
    WeatherData, truncated,
};
use inkpanel::scheduler::channel::{ChannelId, RightPage, TriggerReason};
use inkpanel::scheduler::plan::{PlanReason, RefreshPlan};
use inkpanel::scheduler::{RefreshScheduler, SUBSCRIBED_KINDS, SUBSCRIBER_LABEL};

struct Rig {
    clock: Rc<ManualClock>,
    bus: Rc<EventBus>,
    sched: Rc<RefCell<RefreshScheduler>>,
}

impl Rig {
    /// Subscribed scheduler with the boot refresh already drawn at t=0.
    fn new(config: PanelConfig) -> Self {
        let (clock, bus) = manual_bus();
        let sched = Rc::new(RefCell::new(RefreshScheduler::new(&config, Instant::ZERO)));
        for kind in SUBSCRIBED_KINDS {
            let handler: SharedHandler = sched.clone();
            bus.subscribe(kind, SUBSCRIBER_LABEL, handler);
        }
        let rig = Self { clock, bus, sched };
        let boot = rig.plan(0);
        assert!(boot.full_refresh);
        assert_eq!(boot.reason, PlanReason::Forced);
        rig
    }

    fn publish(&self, at: u32, kind: EventKind, payload: EventPayload) {
        self.clock.set(at);
        self.bus.publish(kind, payload);
    }

    fn plan(&self, at: u32) -> RefreshPlan {
        self.sched
            .borrow_mut()
            .compute_refresh_plan(Instant::from_millis(at))
    }

    fn time(&self, at: u32, day: u8, hour: u8, minute: u8, second: u8) {
        let t = TimeData {
            year: 2026,
            month: 10,
            day,
            hour,
            minute,
            second,
            weekday: 0,
        };
        self.publish(at, EventKind::TimeUpdated, EventPayload::Time(t));
    }

    fn sensor(&self, at: u32, temp: f32, hum: f32) {
        let s = SensorData {
            temperature_c: temp,
            humidity_pct: hum,
            valid: true,
        };
        self.publish(at, EventKind::SensorDataUpdated, EventPayload::Sensor(s));
    }

    fn battery(&self, at: u32, pct: u8, charging: bool) {
        let p = PowerState {
            battery_pct: pct,
            is_charging: charging,
            is_low_power: false,
        };
        self.publish(at, EventKind::PowerStateChanged, EventPayload::Power(p));
    }
}

fn channels(plan: &RefreshPlan) -> Vec<ChannelId> {
    plan.dirty_channels.iter().map(|d| d.channel).collect()
}

/// Every cadence pushed out to ten days so only the event under test matters.
fn quiet_config() -> PanelConfig {
    let mut cfg = PanelConfig::default();
    let r = &mut cfg.refresh;
    for interval in [
        &mut r.clock_interval_ms,
        &mut r.date_interval_ms,
        &mut r.weather_interval_ms,
        &mut r.sensor_interval_ms,
        &mut r.battery_interval_ms,
        &mut r.message_interval_ms,
        &mut r.calendar_page_interval_ms,
        &mut r.stock_page_interval_ms,
        &mut r.message_page_interval_ms,
        &mut r.other_page_interval_ms,
    ] {
        *interval = 864_000_000;
    }
    cfg
}

// ── Idle and partial plans ────────────────────────────────────

#[test]
fn nothing_changes_nothing_drawn() {
    let rig = Rig::new(PanelConfig::default());
    let plan = rig.plan(5_000);
    assert!(plan.is_empty());
    assert_eq!(plan.reason, PlanReason::Idle);
}

#[test]
fn minute_change_redraws_clock_only() {
    let rig = Rig::new(PanelConfig::default());
    rig.time(1_000, 18, 13, 45, 0);
    assert!(rig.plan(1_000).full_refresh);

    // Second moved, minute did not: seconds are hidden.
    rig.time(2_000, 18, 13, 45, 30);
    assert!(rig.plan(2_000).is_empty());

    rig.time(3_000, 18, 13, 46, 0);
    let plan = rig.plan(3_000);
    assert!(!plan.full_refresh);
    assert_eq!(plan.reason, PlanReason::Partial);
    assert_eq!(channels(&plan), vec![ChannelId::Clock]);
    assert_eq!(plan.dirty_channels[0].reason, TriggerReason::ValueChanged);
    assert_eq!(
        plan.dirty_channels[0].rect,
        rig.sched.borrow().layout().region(ChannelId::Clock)
    );
}

#[test]
fn seconds_mode_redraws_every_second() {
    let rig = Rig::new(quiet_config());
    rig.time(1_000, 18, 13, 45, 0);
    rig.plan(1_000);

    rig.sched.borrow_mut().set_show_seconds(true);
    let plan = rig.plan(1_050);
    assert_eq!(plan.dirty_channels[0].reason, TriggerReason::ModeChanged);

    rig.time(2_000, 18, 13, 45, 1);
    assert_eq!(channels(&rig.plan(2_000)), vec![ChannelId::Clock]);
}

// ── Full-refresh escalation ───────────────────────────────────

#[test]
fn day_change_on_calendar_spans_both_panels() {
    let rig = Rig::new(PanelConfig::default());
    rig.time(1_000, 18, 23, 59, 0);
    rig.plan(1_000);

    rig.time(2_000, 19, 0, 0, 0);
    let plan = rig.plan(2_000);
    assert!(plan.full_refresh);
    assert_eq!(plan.reason, PlanReason::SpansPanels);
    assert_eq!(plan.dirty_channels.len(), ChannelId::COUNT);
    assert_eq!(rig.sched.borrow().last_full_refresh_at(), Instant::from_millis(2_000));
}

#[test]
fn day_change_off_calendar_stays_partial() {
    let rig = Rig::new(PanelConfig::default());
    rig.sched.borrow_mut().switch_right_page(RightPage::Stock);
    rig.time(1_000, 18, 23, 59, 0);
    rig.plan(1_000);

    rig.time(2_000, 19, 0, 0, 0);
    let plan = rig.plan(2_000);
    assert!(!plan.full_refresh);
    assert_eq!(channels(&plan), vec![ChannelId::Clock, ChannelId::Date]);
    assert_eq!(plan.dirty_channels[1].reason, TriggerReason::DayChanged);
}

#[test]
fn daily_full_refresh_is_scheduled() {
    let rig = Rig::new(quiet_config());
    assert!(rig.plan(86_399_999).is_empty());

    let plan = rig.plan(86_400_000);
    assert!(plan.full_refresh);
    assert_eq!(plan.reason, PlanReason::Scheduled);
    assert!(rig.plan(86_400_001).is_empty());
}

#[test]
fn forced_refresh_wins_over_partial() {
    let rig = Rig::new(PanelConfig::default());
    rig.sched.borrow_mut().force_full_refresh();
    let plan = rig.plan(1_000);
    assert!(plan.full_refresh);
    assert_eq!(plan.reason, PlanReason::Forced);
}

// ── Value-delta triggers ──────────────────────────────────────

#[test]
fn sensor_redraws_only_past_delta() {
    let rig = Rig::new(PanelConfig::default());
    rig.sensor(1_000, 21.0, 45.0);
    assert_eq!(channels(&rig.plan(1_000)), vec![ChannelId::Sensor]);

    rig.sensor(2_000, 22.9, 46.0);
    assert!(rig.plan(2_000).is_empty());

    rig.sensor(3_000, 23.0, 46.0);
    assert_eq!(channels(&rig.plan(3_000)), vec![ChannelId::Sensor]);
}

#[test]
fn invalid_sensor_sample_is_ignored() {
    let rig = Rig::new(PanelConfig::default());
    let s = SensorData {
        temperature_c: 99.0,
        humidity_pct: 0.0,
        valid: false,
    };
    rig.publish(1_000, EventKind::SensorDataUpdated, EventPayload::Sensor(s));
    assert!(rig.plan(1_000).is_empty());
    assert_eq!(rig.sched.borrow().anomaly_flags(), 0);
}

#[test]
fn battery_redraws_past_delta_or_on_charging_change() {
    let rig = Rig::new(PanelConfig::default());
    rig.battery(1_000, 80, false);
    assert_eq!(channels(&rig.plan(1_000)), vec![ChannelId::Battery]);

    rig.battery(2_000, 75, false);
    assert!(rig.plan(2_000).is_empty());

    rig.battery(3_000, 74, false);
    assert_eq!(channels(&rig.plan(3_000)), vec![ChannelId::Battery]);

    rig.battery(4_000, 74, true);
    assert_eq!(channels(&rig.plan(4_000)), vec![ChannelId::Battery]);
}

#[test]
fn weather_redraws_on_displayed_change() {
    let rig = Rig::new(PanelConfig::default());
    let weather = |temp: f32, cond: &str| {
        EventPayload::Weather(WeatherData {
            temperature_c: temp,
            humidity_pct: 60,
            condition: truncated(cond),
        })
    };
    rig.publish(1_000, EventKind::WeatherUpdated, weather(14.0, "Cloudy"));
    assert_eq!(channels(&rig.plan(1_000)), vec![ChannelId::Weather]);

    rig.publish(2_000, EventKind::WeatherUpdated, weather(14.01, "Cloudy"));
    assert!(rig.plan(2_000).is_empty());

    rig.publish(3_000, EventKind::WeatherUpdated, weather(14.0, "Rain"));
    assert_eq!(channels(&rig.plan(3_000)), vec![ChannelId::Weather]);
}

// ── Interval triggers and multipliers ─────────────────────────

#[test]
fn low_power_stretches_clock_interval() {
    let rig = Rig::new(PanelConfig::default());
    rig.publish(0, EventKind::LowPowerEnter, EventPayload::None);
    assert_eq!(rig.sched.borrow().effective_interval(ChannelId::Clock), 360_000);

    assert!(!rig.plan(60_000).contains(ChannelId::Clock));
    let plan = rig.plan(360_000);
    assert!(plan.contains(ChannelId::Clock));

    rig.publish(360_000, EventKind::LowPowerExit, EventPayload::None);
    assert_eq!(rig.sched.borrow().effective_interval(ChannelId::Clock), 60_000);
}

#[test]
fn page_switch_dirties_right_page_with_new_cadence() {
    let rig = Rig::new(PanelConfig::default());
    rig.sched.borrow_mut().switch_right_page(RightPage::Stock);

    let plan = rig.plan(1_000);
    assert_eq!(channels(&plan), vec![ChannelId::RightPage]);
    assert_eq!(plan.dirty_channels[0].reason, TriggerReason::PageSwitched);
    assert_eq!(
        rig.sched.borrow().channel(ChannelId::RightPage).nominal_interval,
        600_000
    );
}

// ── Alarm overlay ─────────────────────────────────────────────

#[test]
fn alarm_blinks_then_restores_with_full_refresh() {
    let rig = Rig::new(PanelConfig::default());
    let alarm = AlarmEvent::new("Gas", "Gas detected!");
    rig.publish(2_000, EventKind::AlarmTriggered, EventPayload::Alarm(alarm));

    let first = rig.plan(2_000);
    assert_eq!(first.reason, PlanReason::Alarm);
    assert!(!first.full_refresh);
    let frame = first.alarm.expect("alarm frame");
    assert_eq!(frame.kind.as_str(), "Gas");
    assert!(frame.inverted);

    // Same blink phase: nothing new to draw.
    assert!(rig.plan(2_100).alarm.is_none());
    let second = rig.plan(2_500).alarm.expect("blink");
    assert!(!second.inverted);

    // Channel updates wait behind the overlay.
    rig.sensor(3_000, 21.0, 45.0);
    assert!(rig.plan(3_000).dirty_channels.is_empty());

    assert!(rig.sched.borrow().is_alarming(Instant::from_millis(31_999)));
    assert!(!rig.sched.borrow().is_alarming(Instant::from_millis(32_000)));

    let restore = rig.plan(32_000);
    assert!(restore.full_refresh);
    assert_eq!(restore.reason, PlanReason::AlarmRestore);
    assert!(restore.alarm.is_none());
}

#[test]
fn hidden_alarm_restores_immediately() {
    let rig = Rig::new(PanelConfig::default());
    rig.publish(
        1_000,
        EventKind::AlarmTriggered,
        EventPayload::Alarm(AlarmEvent::new("Flame", "Fire!")),
    );
    rig.plan(1_000);

    assert!(rig.sched.borrow_mut().hide_alarm());
    assert!(!rig.sched.borrow_mut().hide_alarm());
    let plan = rig.plan(1_200);
    assert_eq!(plan.reason, PlanReason::AlarmRestore);
}

#[test]
fn alarm_stamped_after_tick_start_still_shows() {
    let rig = Rig::new(PanelConfig::default());
    // The tick captured now=1_000; the alarm arrives a millisecond later.
    rig.publish(
        1_001,
        EventKind::AlarmTriggered,
        EventPayload::Alarm(AlarmEvent::new("Gas", "Gas detected!")),
    );

    let plan = rig.plan(1_000);
    assert_eq!(plan.reason, PlanReason::Alarm);
    assert!(plan.alarm.is_some());
    let s = rig.sched.borrow();
    assert!(s.is_alarming(Instant::from_millis(1_000)));
    assert!(s.is_alarming(Instant::from_millis(2_000)));
    assert!(!s.is_alarming(Instant::from_millis(31_001)));
}

// ── New-message animation ─────────────────────────────────────

#[test]
fn new_message_animates_for_ten_seconds() {
    let rig = Rig::new(quiet_config());
    let msg = |unread: u16| EventPayload::Message(MessageEvent { id: 7, unread });
    rig.publish(1_000, EventKind::MessageReceived, msg(1));

    let plan = rig.plan(1_000);
    assert_eq!(channels(&plan), vec![ChannelId::Message]);
    assert_eq!(plan.animation.map(|f| f.index), Some(0));

    assert!(rig.plan(1_025).is_empty());
    assert_eq!(rig.plan(1_050).animation.map(|f| f.index), Some(1));

    let s = rig.sched.borrow();
    assert!(s.is_animating(Instant::from_millis(10_999)));
    assert!(!s.is_animating(Instant::from_millis(11_000)));
}

#[test]
fn message_stamped_after_tick_start_still_animates() {
    let rig = Rig::new(quiet_config());
    rig.publish(
        1_001,
        EventKind::MessageReceived,
        EventPayload::Message(MessageEvent { id: 7, unread: 1 }),
    );

    let plan = rig.plan(1_000);
    assert_eq!(plan.animation.map(|f| f.index), Some(0));
    assert!(rig.sched.borrow().is_animating(Instant::from_millis(2_000)));
    assert!(rig.plan(2_000).animation.is_some());
}

#[test]
fn reading_a_message_does_not_animate() {
    let rig = Rig::new(quiet_config());
    let msg = |unread: u16| EventPayload::Message(MessageEvent { id: 7, unread });
    rig.publish(1_000, EventKind::MessageRead, msg(0));
    assert!(!rig.sched.borrow().is_animating(Instant::from_millis(1_000)));
}
