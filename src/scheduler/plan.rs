//! The per-tick output of the scheduler.

use super::channel::{ChannelId, TriggerReason};
use super::layout::{Layout, Rect};
use crate::events::{ALARM_KIND_CAP, ALARM_MESSAGE_CAP};

/// Why a plan looks the way it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanReason {
    /// Nothing to draw.
    Idle,
    /// Dirty regions confined to one panel.
    Partial,
    /// Dirty regions on both panels in the same tick.
    SpansPanels,
    /// The full-refresh interval elapsed.
    Scheduled,
    /// Requested by an operator command or startup.
    Forced,
    /// First frame after an alarm overlay ended.
    AlarmRestore,
    /// An alarm overlay owns the screen.
    Alarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    pub channel: ChannelId,
    pub rect: Rect,
    pub reason: TriggerReason,
}

/// Full-screen alarm frame.  `inverted` alternates at the blink interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmFrame {
    pub kind: heapless::String<ALARM_KIND_CAP>,
    pub message: heapless::String<ALARM_MESSAGE_CAP>,
    pub inverted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    /// 0..=10, ping-pong.
    pub index: u8,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPlan {
    pub full_refresh: bool,
    pub dirty_channels: heapless::Vec<DirtyRegion, { ChannelId::COUNT }>,
    pub reason: PlanReason,
    pub alarm: Option<AlarmFrame>,
    pub animation: Option<AnimationFrame>,
}

impl RefreshPlan {
    pub fn idle() -> Self {
        Self {
            full_refresh: false,
            dirty_channels: heapless::Vec::new(),
            reason: PlanReason::Idle,
            alarm: None,
            animation: None,
        }
    }

    /// `true` when the renderer has nothing to do.
    pub fn is_empty(&self) -> bool {
        !self.full_refresh
            && self.dirty_channels.is_empty()
            && self.alarm.is_none()
            && self.animation.is_none()
    }

    pub fn contains(&self, channel: ChannelId) -> bool {
        self.dirty_channels.iter().any(|d| d.channel == channel)
    }

    /// Upgrade to a full refresh listing every channel of `layout`.
    /// Regions already in the plan keep their trigger reason.
    pub fn escalate_to_full(&mut self, layout: &Layout) {
        self.full_refresh = true;
        for id in ChannelId::ALL {
            if !self.contains(id) {
                let _ = self.dirty_channels.push(DirtyRegion {
                    channel: id,
                    rect: layout.region(id),
                    reason: TriggerReason::Forced,
                });
            }
        }
        self.dirty_channels.sort_unstable_by_key(|d| d.channel as usize);
    }
}
