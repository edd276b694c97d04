//! Bus wiring across components: the scheduler, the power state machine
//! and extra observers sharing one bus.

use std::cell::RefCell;
use std::rc::Rc;

use crate::mock_hw::{count, manual_bus, record_all};

use inkpanel::bus::{EventBus, HandlerError, SharedHandler};
use inkpanel::clock::Instant;
use inkpanel::config::PanelConfig;
use inkpanel::events::{EventEnvelope, EventKind, EventPayload, SensorData};
use inkpanel::power::PowerStateMachine;
use inkpanel::scheduler::{RefreshScheduler, SUBSCRIBED_KINDS, SUBSCRIBER_LABEL};

fn subscribed_scheduler(bus: &EventBus) -> Rc<RefCell<RefreshScheduler>> {
    let sched = Rc::new(RefCell::new(RefreshScheduler::new(
        &PanelConfig::default(),
        Instant::ZERO,
    )));
    for kind in SUBSCRIBED_KINDS {
        let handler: SharedHandler = sched.clone();
        bus.subscribe(kind, SUBSCRIBER_LABEL, handler);
    }
    sched
}

fn sample(temp: f32, hum: f32) -> EventPayload {
    EventPayload::Sensor(SensorData {
        temperature_c: temp,
        humidity_pct: hum,
        valid: true,
    })
}

// ── Anomaly alarm published from inside a handler ─────────────

#[test]
fn anomaly_alarm_reaches_scheduler_and_observers() {
    let (clock, bus) = manual_bus();
    let sched = subscribed_scheduler(&bus);
    let seen = record_all(&bus);

    clock.set(1_000);
    bus.publish(EventKind::SensorDataUpdated, sample(55.0, 50.0));

    // The scheduler was mid-dispatch when it raised the alarm, so its own
    // copy is deferred, then drained before publish returns.
    assert_eq!(count(&seen, EventKind::AlarmTriggered), 1);
    assert!(bus.stats().deferred >= 1);
    assert!(sched.borrow().is_alarming(Instant::from_millis(1_000)));

    let alarm = seen
        .borrow()
        .iter()
        .find(|e| e.kind == EventKind::AlarmTriggered)
        .and_then(|e| e.alarm().cloned())
        .expect("alarm payload");
    assert_eq!(alarm.kind.as_str(), "Sensor");
    assert_eq!(alarm.message.as_str(), "Temperature out of range");
}

#[test]
fn persisting_anomaly_raises_one_alarm() {
    let (_clock, bus) = manual_bus();
    let _sched = subscribed_scheduler(&bus);
    let seen = record_all(&bus);

    bus.publish(EventKind::SensorDataUpdated, sample(22.0, 90.0));
    bus.publish(EventKind::SensorDataUpdated, sample(22.0, 91.0));
    bus.publish(EventKind::SensorDataUpdated, sample(22.0, 92.0));
    assert_eq!(count(&seen, EventKind::AlarmTriggered), 1);

    // Back in range, then out again: a second excursion.
    bus.publish(EventKind::SensorDataUpdated, sample(22.0, 50.0));
    bus.publish(EventKind::SensorDataUpdated, sample(22.0, 95.0));
    assert_eq!(count(&seen, EventKind::AlarmTriggered), 2);
}

// ── Power state machine feeding the scheduler ─────────────────

#[test]
fn battery_events_stretch_scheduler_intervals() {
    let (_clock, bus) = manual_bus();
    let sched = subscribed_scheduler(&bus);
    let mut power = PowerStateMachine::new(PanelConfig::default().power, Instant::ZERO);

    power.observe_battery(8, false, &bus);
    assert!(sched.borrow().is_battery_critical());
    assert_eq!(sched.borrow().multiplier(), 10);

    power.observe_battery(8, true, &bus);
    assert!(!sched.borrow().is_battery_critical());
    assert_eq!(sched.borrow().multiplier(), 1);
}

// ── Subscription management ───────────────────────────────────

#[test]
fn removing_scheduler_leaves_other_owners() {
    let (_clock, bus) = manual_bus();
    let _sched = subscribed_scheduler(&bus);
    let seen = record_all(&bus);

    assert_eq!(bus.total_subscriptions(), 2 * EventKind::ALL.len());
    assert_eq!(bus.unsubscribe_all(SUBSCRIBER_LABEL), EventKind::ALL.len());
    assert_eq!(bus.unsubscribe_all(SUBSCRIBER_LABEL), 0);

    bus.publish(EventKind::LowPowerEnter, EventPayload::None);
    assert_eq!(count(&seen, EventKind::LowPowerEnter), 1);
    assert_eq!(bus.stats().dispatched, 1);
}

#[test]
fn malformed_payload_is_skipped_by_scheduler_only() {
    let (_clock, bus) = manual_bus();
    let sched = subscribed_scheduler(&bus);
    let seen = record_all(&bus);

    // Wrong shape for the kind: the recorder accepts anything, the
    // scheduler declines.
    bus.publish(EventKind::PowerStateChanged, sample(20.0, 40.0));

    let stats = bus.stats();
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.dispatched, 1);
    assert_eq!(count(&seen, EventKind::PowerStateChanged), 1);
    assert!(!sched.borrow().is_low_power());
}

#[test]
fn failing_observer_does_not_block_scheduler() {
    let (_clock, bus) = manual_bus();
    bus.subscribe_fn(
        EventKind::LowPowerEnter,
        "broken",
        |_: &EventEnvelope, _: &EventBus| -> Result<(), HandlerError> {
            Err(HandlerError::Failed("display driver gone"))
        },
    );
    let sched = subscribed_scheduler(&bus);

    bus.publish(EventKind::LowPowerEnter, EventPayload::None);

    assert_eq!(bus.stats().failed, 1);
    assert!(sched.borrow().is_low_power());
}
