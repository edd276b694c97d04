//! Log-based operator sink and render stand-in.
//!
//! [`LogOperatorSink`] writes every [`OperatorEvent`] to the ESP-IDF logger
//! (UART / USB-CDC in production, stderr on the host).  [`LogRenderer`]
//! narrates refresh plans in the same place and is what the binary drives
//! until a pixel driver is plugged in behind [`RenderPort`].

use log::{debug, error, info, warn};

use crate::app::events::OperatorEvent;
use crate::app::ports::{OperatorSink, RenderPort};
use crate::error::RenderError;
use crate::scheduler::plan::RefreshPlan;

#[derive(Debug, Default)]
pub struct LogOperatorSink;

impl LogOperatorSink {
    pub fn new() -> Self {
        Self
    }
}

impl OperatorSink for LogOperatorSink {
    fn emit(&mut self, event: &OperatorEvent) {
        match event {
            OperatorEvent::Started(mode) => info!("START | mode={mode}"),
            OperatorEvent::PowerModeChanged { from, to } => info!("POWER | {from} -> {to}"),
            OperatorEvent::RenderRecovered(e) => warn!("RENDER | recovered after {e}"),
            OperatorEvent::RenderFailed(e) => error!("RENDER | failed after retry: {e}"),
            OperatorEvent::ConfigRejected(e) => warn!("CONFIG | rejected: {e}"),
            OperatorEvent::Status(s) => {
                info!(
                    "STATUS | {} | mode={} ({}s) | battery={}%{}{} | page={:?} | x{} | \
                     alarm={} anim={} | anomalies=0b{:03b} | last_full={} | \
                     bus pub={} ok={} skip={} fail={} defer={}",
                    s.at,
                    s.mode,
                    s.time_in_mode_ms / 1_000,
                    s.battery_pct,
                    if s.is_charging { " (charging)" } else { "" },
                    if s.battery_low { " LOW" } else { "" },
                    s.right_page,
                    s.refresh_multiplier,
                    s.alarming,
                    s.animating,
                    s.anomaly_flags,
                    s.last_full_refresh_at,
                    s.bus.published,
                    s.bus.dispatched,
                    s.bus.skipped,
                    s.bus.failed,
                    s.bus.deferred,
                );
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
    full_refreshes: u64,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn full_refreshes(&self) -> u64 {
        self.full_refreshes
    }
}

impl RenderPort for LogRenderer {
    fn render(&mut self, plan: &RefreshPlan) -> Result<(), RenderError> {
        self.frames += 1;
        if let Some(alarm) = &plan.alarm {
            info!(
                "PANEL | alarm {}: {}{}",
                alarm.kind,
                alarm.message,
                if alarm.inverted { " (inverted)" } else { "" }
            );
        }
        if plan.full_refresh {
            self.full_refreshes += 1;
            info!("PANEL | full refresh ({:?})", plan.reason);
        }
        for region in &plan.dirty_channels {
            debug!(
                "PANEL | {} @ {},{} {}x{} ({:?})",
                region.channel, region.rect.x, region.rect.y, region.rect.w, region.rect.h, region.reason
            );
        }
        if let Some(frame) = plan.animation {
            debug!("PANEL | message animation frame {}", frame.index);
        }
        Ok(())
    }

    fn reinitialize(&mut self) -> Result<(), RenderError> {
        info!("PANEL | reinitialise");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        info!("PANEL | clear");
        Ok(())
    }
}
