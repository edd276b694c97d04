//! Outbound operator events.
//!
//! The [`PanelService`](super::service::PanelService) and render dispatch
//! emit these through the [`OperatorSink`](super::ports::OperatorSink)
//! port.  They are for humans and consoles, unlike the in-process bus
//! events in [`crate::events`].

use crate::bus::BusStats;
use crate::clock::{Instant, Millis};
use crate::error::RenderError;
use crate::fsm::PowerMode;
use crate::scheduler::channel::RightPage;

use super::ports::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorEvent {
    /// The service has started (carries the initial mode).
    Started(PowerMode),

    PowerModeChanged { from: PowerMode, to: PowerMode },

    /// A render failed once and the re-init/clear/retry succeeded.
    RenderRecovered(RenderError),

    /// The retry failed too.  The loop continues.
    RenderFailed(RenderError),

    /// An `UpdateConfig` command was refused; the running config is unchanged.
    ConfigRejected(ConfigError),

    Status(PanelStatus),
}

/// Point-in-time snapshot for the console.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelStatus {
    pub at: Instant,
    pub mode: PowerMode,
    /// Milliseconds spent in `mode` so far.
    pub time_in_mode_ms: Millis,
    pub battery_pct: u8,
    pub is_charging: bool,
    pub battery_low: bool,
    pub right_page: RightPage,
    pub refresh_multiplier: u32,
    pub alarming: bool,
    pub animating: bool,
    pub anomaly_flags: u8,
    pub last_full_refresh_at: Instant,
    pub bus: BusStats,
}
