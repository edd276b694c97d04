//! Typed event vocabulary shared by every producer and subscriber.
//!
//! Events are produced by:
//! - Network producers (NTP sync, weather poll, message arrival)
//! - Sampling producers (indoor sensor, battery gauge)
//! - The power state machine (transitions, battery hysteresis)
//! - The refresh scheduler itself (sensor anomaly → alarm)
//!
//! Each [`EventKind`] has exactly one expected [`EventPayload`] shape.
//! Payload access goes through the typed accessors on [`EventEnvelope`],
//! which return `None` on a shape mismatch instead of failing at runtime.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ NTP / HTTP  │────▶│              │────▶│ RefreshScheduler │
//! │ Sensor ADC  │────▶│   EventBus   │     │                  │
//! │ PowerSM     │────▶│ (synchronous)│────▶│ other handlers   │
//! │ Scheduler   │────▶│              │     │                  │
//! └─────────────┘     └──────────────┘     └──────────────────┘
//! ```

use core::fmt;

use crate::clock::Instant;

/// Maximum length of an alarm category label (e.g. "Gas").
pub const ALARM_KIND_CAP: usize = 32;
/// Maximum length of an alarm message body.
pub const ALARM_MESSAGE_CAP: usize = 64;
/// Maximum length of a weather condition label.
pub const CONDITION_CAP: usize = 24;

// ═══════════════════════════════════════════════════════════════
//  Event kinds
// ═══════════════════════════════════════════════════════════════

/// Every event the bus can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    // ── Data producers ────────────────────────────────────
    TimeUpdated = 0,
    WeatherUpdated = 1,
    SensorDataUpdated = 2,

    // ── Power ─────────────────────────────────────────────
    PowerStateChanged = 10,
    BatteryLow = 11,
    BatteryOk = 12,
    ChargingStarted = 13,
    ChargingStopped = 14,
    LowPowerEnter = 15,
    LowPowerExit = 16,

    // ── Messages ──────────────────────────────────────────
    MessageReceived = 20,
    MessageRead = 21,

    // ── Alarms ────────────────────────────────────────────
    AlarmTriggered = 30,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [EventKind; 13] = [
        Self::TimeUpdated,
        Self::WeatherUpdated,
        Self::SensorDataUpdated,
        Self::PowerStateChanged,
        Self::BatteryLow,
        Self::BatteryOk,
        Self::ChargingStarted,
        Self::ChargingStopped,
        Self::LowPowerEnter,
        Self::LowPowerExit,
        Self::MessageReceived,
        Self::MessageRead,
        Self::AlarmTriggered,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::TimeUpdated => "TimeUpdated",
            Self::WeatherUpdated => "WeatherUpdated",
            Self::SensorDataUpdated => "SensorDataUpdated",
            Self::PowerStateChanged => "PowerStateChanged",
            Self::BatteryLow => "BatteryLow",
            Self::BatteryOk => "BatteryOk",
            Self::ChargingStarted => "ChargingStarted",
            Self::ChargingStopped => "ChargingStopped",
            Self::LowPowerEnter => "LowPowerEnter",
            Self::LowPowerExit => "LowPowerExit",
            Self::MessageReceived => "MessageReceived",
            Self::MessageRead => "MessageRead",
            Self::AlarmTriggered => "AlarmTriggered",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Payload shapes
// ═══════════════════════════════════════════════════════════════

/// Wall-clock time as delivered by NTP sync / the RTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeData {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 0 = Sunday.
    pub weekday: u8,
}

/// Summary of the latest weather fetch (only the fields the panel shows).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherData {
    pub temperature_c: f32,
    pub humidity_pct: u8,
    pub condition: heapless::String<CONDITION_CAP>,
}

/// Indoor environment sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorData {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    /// `false` when the driver could not produce a reading this cycle.
    pub valid: bool,
}

/// Battery / power snapshot carried by `PowerStateChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerState {
    pub battery_pct: u8,
    pub is_charging: bool,
    pub is_low_power: bool,
}

/// Message inbox change.  `unread` is the inbox total *after* the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageEvent {
    pub id: u32,
    pub unread: u16,
}

/// Alarm raised by a gas/flame sensor, the anomaly detector, etc.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlarmEvent {
    pub kind: heapless::String<ALARM_KIND_CAP>,
    pub message: heapless::String<ALARM_MESSAGE_CAP>,
}

impl AlarmEvent {
    /// Build an alarm, truncating either field at a char boundary if needed.
    pub fn new(kind: &str, message: &str) -> Self {
        Self {
            kind: truncated(kind),
            message: truncated(message),
        }
    }
}

/// Copy `s` into a fixed-capacity string, dropping whatever does not fit.
pub fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// Closed set of payload shapes.  One variant per data-carrying kind.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    None,
    Time(TimeData),
    Weather(WeatherData),
    Sensor(SensorData),
    Power(PowerState),
    Message(MessageEvent),
    Alarm(AlarmEvent),
}

impl EventPayload {
    /// Whether this payload is the shape `kind` is expected to carry.
    pub fn matches(&self, kind: EventKind) -> bool {
        matches!(
            (kind, self),
            (EventKind::TimeUpdated, Self::Time(_))
                | (EventKind::WeatherUpdated, Self::Weather(_))
                | (EventKind::SensorDataUpdated, Self::Sensor(_))
                | (EventKind::PowerStateChanged, Self::Power(_))
                | (EventKind::MessageReceived | EventKind::MessageRead, Self::Message(_))
                | (EventKind::AlarmTriggered, Self::Alarm(_))
                | (
                    EventKind::BatteryLow
                        | EventKind::BatteryOk
                        | EventKind::ChargingStarted
                        | EventKind::ChargingStopped
                        | EventKind::LowPowerEnter
                        | EventKind::LowPowerExit,
                    Self::None
                )
        )
    }
}

// ═══════════════════════════════════════════════════════════════
//  Envelope
// ═══════════════════════════════════════════════════════════════

/// The unit of dispatch.  Lives only for the duration of one `publish`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub kind: EventKind,
    pub payload: EventPayload,
    pub emitted_at: Instant,
}

impl EventEnvelope {
    pub fn new(kind: EventKind, payload: EventPayload, emitted_at: Instant) -> Self {
        Self {
            kind,
            payload,
            emitted_at,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.payload.matches(self.kind)
    }

    pub fn time(&self) -> Option<&TimeData> {
        match &self.payload {
            EventPayload::Time(t) => Some(t),
            _ => None,
        }
    }

    pub fn weather(&self) -> Option<&WeatherData> {
        match &self.payload {
            EventPayload::Weather(w) => Some(w),
            _ => None,
        }
    }

    pub fn sensor(&self) -> Option<&SensorData> {
        match &self.payload {
            EventPayload::Sensor(s) => Some(s),
            _ => None,
        }
    }

    pub fn power(&self) -> Option<&PowerState> {
        match &self.payload {
            EventPayload::Power(p) => Some(p),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&MessageEvent> {
        match &self.payload {
            EventPayload::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn alarm(&self) -> Option<&AlarmEvent> {
        match &self.payload {
            EventPayload::Alarm(a) => Some(a),
            _ => None,
        }
    }
}
