//! Transient overlays that pre-empt or decorate the normal plan.
//!
//! Both are polled against a stored start instant; stopping early just
//! clears the state.  The start is the triggering event's stamp, which may
//! be a few ms later than the `now` of the tick that polls it, so elapsed
//! time goes through [`Instant::elapsed_since_stamp`].

use log::info;

use crate::clock::{Instant, Millis};
use crate::events::AlarmEvent;

// ── Alarm overlay ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAlarm {
    pub alarm: AlarmEvent,
    pub started_at: Instant,
    /// Blink phase of the last frame handed out, `None` before the first.
    drawn_phase: Option<bool>,
}

/// `Idle` ⇄ `Alarming`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AlarmOverlay {
    #[default]
    Idle,
    Alarming(ActiveAlarm),
}

impl AlarmOverlay {
    /// Enter (or restart) the alarming state.
    pub fn trigger(&mut self, alarm: AlarmEvent, now: Instant) {
        info!("alarm: {}: {} (at {now})", alarm.kind, alarm.message);
        *self = Self::Alarming(ActiveAlarm {
            alarm,
            started_at: now,
            drawn_phase: None,
        });
    }

    /// Alarming on `[started_at, started_at + timeout)`.
    pub fn is_active(&self, now: Instant, timeout: Millis) -> bool {
        match self {
            Self::Idle => false,
            Self::Alarming(a) => now.elapsed_since_stamp(a.started_at) < timeout,
        }
    }

    /// Drop back to `Idle`.  Returns whether an alarm was showing.
    pub fn hide(&mut self) -> bool {
        let was = matches!(self, Self::Alarming(_));
        *self = Self::Idle;
        was
    }

    /// The blink phase due at `now` if it differs from what was last drawn.
    pub fn next_frame(&mut self, now: Instant, blink: Millis) -> Option<(&AlarmEvent, bool)> {
        let Self::Alarming(a) = self else {
            return None;
        };
        let phase = (now.elapsed_since_stamp(a.started_at) / blink.max(1)) % 2 == 0;
        if a.drawn_phase == Some(phase) {
            return None;
        }
        a.drawn_phase = Some(phase);
        Some((&a.alarm, phase))
    }

    pub fn current(&self) -> Option<&ActiveAlarm> {
        match self {
            Self::Idle => None,
            Self::Alarming(a) => Some(a),
        }
    }
}

// ── Message animation ─────────────────────────────────────────

/// Highest frame index; frames run 0 → 10 → 0 → ...
pub const ANIMATION_LAST_FRAME: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageAnimation {
    started_at: Option<Instant>,
    drawn_step: Option<u32>,
}

impl MessageAnimation {
    /// Start unless already running.  A running animation is never extended.
    pub fn start(&mut self, now: Instant, duration: Millis) -> bool {
        if self.is_active(now, duration) {
            return false;
        }
        self.started_at = Some(now);
        self.drawn_step = None;
        true
    }

    pub fn is_active(&self, now: Instant, duration: Millis) -> bool {
        self.started_at
            .is_some_and(|start| now.elapsed_since_stamp(start) < duration)
    }

    pub fn stop(&mut self) {
        self.started_at = None;
        self.drawn_step = None;
    }

    /// Frame index due at `now` if a new frame step has begun.
    pub fn next_frame(&mut self, now: Instant, duration: Millis, frame: Millis) -> Option<u8> {
        let start = self.started_at?;
        let elapsed = now.elapsed_since_stamp(start);
        if elapsed >= duration {
            self.stop();
            return None;
        }
        let step = elapsed / frame.max(1);
        if self.drawn_step == Some(step) {
            return None;
        }
        self.drawn_step = Some(step);
        Some(ping_pong(step))
    }
}

fn ping_pong(step: u32) -> u8 {
    let period = ANIMATION_LAST_FRAME * 2;
    let pos = step % period;
    let idx = if pos <= ANIMATION_LAST_FRAME { pos } else { period - pos };
    idx as u8
}
