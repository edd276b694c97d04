//! Content channels, one per visually distinct panel region.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::{Instant, Millis, scale_interval};
use crate::config::RefreshConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelId {
    Clock = 0,
    Date = 1,
    Weather = 2,
    Sensor = 3,
    Battery = 4,
    Message = 5,
    RightPage = 6,
}

impl ChannelId {
    pub const COUNT: usize = 7;

    pub const ALL: [ChannelId; Self::COUNT] = [
        Self::Clock,
        Self::Date,
        Self::Weather,
        Self::Sensor,
        Self::Battery,
        Self::Message,
        Self::RightPage,
    ];

    pub const fn side(self) -> PanelSide {
        match self {
            Self::RightPage => PanelSide::Right,
            _ => PanelSide::Left,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Clock => "clock",
            Self::Date => "date",
            Self::Weather => "weather",
            Self::Sensor => "sensor",
            Self::Battery => "battery",
            Self::Message => "message",
            Self::RightPage => "right-page",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelSide {
    Left,
    Right,
}

/// What made a channel dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Never drawn since boot.
    Initial,
    /// The effective interval elapsed.
    Interval,
    /// A displayed value moved past its delta threshold.
    ValueChanged,
    /// The calendar day rolled over.
    DayChanged,
    /// The right panel switched page.
    PageSwitched,
    /// A display mode (e.g. seconds) was toggled.
    ModeChanged,
    /// Explicit invalidation.
    Forced,
}

/// Right-panel page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RightPage {
    #[default]
    Calendar,
    Stock,
    Message,
    Plugin,
    PluginManage,
    Setting,
}

impl RightPage {
    pub fn interval(self, cfg: &RefreshConfig) -> Millis {
        match self {
            Self::Calendar => cfg.calendar_page_interval_ms,
            Self::Stock => cfg.stock_page_interval_ms,
            Self::Message => cfg.message_page_interval_ms,
            Self::Plugin | Self::PluginManage | Self::Setting => cfg.other_page_interval_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentChannel {
    pub id: ChannelId,
    pub nominal_interval: Millis,
    pub last_rendered_at: Instant,
    pub trigger_reason: Option<TriggerReason>,
}

impl ContentChannel {
    /// New channels start dirty so the first plan draws everything.
    pub fn new(id: ChannelId, nominal_interval: Millis, now: Instant) -> Self {
        Self {
            id,
            nominal_interval,
            last_rendered_at: now,
            trigger_reason: Some(TriggerReason::Initial),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.trigger_reason.is_some()
    }

    pub fn effective_interval(&self, multiplier: u32) -> Millis {
        scale_interval(self.nominal_interval, multiplier)
    }

    /// Keeps the first reason when already dirty.
    pub fn mark_dirty(&mut self, reason: TriggerReason) {
        if self.trigger_reason.is_none() {
            self.trigger_reason = Some(reason);
        }
    }

    /// Dirty the channel if its effective interval has elapsed.
    pub fn check_interval(&mut self, now: Instant, multiplier: u32) -> bool {
        if now.has_elapsed(self.last_rendered_at, self.effective_interval(multiplier)) {
            self.mark_dirty(TriggerReason::Interval);
        }
        self.is_dirty()
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_rendered_at = now;
        self.trigger_reason = None;
    }
}

/// Nominal interval for `id` under the current display settings.
pub fn nominal_interval(id: ChannelId, cfg: &RefreshConfig, page: RightPage) -> Millis {
    match id {
        ChannelId::Clock if cfg.show_seconds => cfg.clock_seconds_interval_ms,
        ChannelId::Clock => cfg.clock_interval_ms,
        ChannelId::Date => cfg.date_interval_ms,
        ChannelId::Weather => cfg.weather_interval_ms,
        ChannelId::Sensor => cfg.sensor_interval_ms,
        ChannelId::Battery => cfg.battery_interval_ms,
        ChannelId::Message => cfg.message_interval_ms,
        ChannelId::RightPage => page.interval(cfg),
    }
}
