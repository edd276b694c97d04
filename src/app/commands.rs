//! Inbound commands to the panel service.
//!
//! These come from the outside world (buttons, the web configuration
//! server, the serial console) and are interpreted by
//! [`PanelService::handle_command`](super::service::PanelService::handle_command).

use crate::config::PanelConfig;
use crate::scheduler::channel::RightPage;

#[derive(Debug, Clone, PartialEq)]
pub enum PanelCommand {
    SwitchRightPage(RightPage),

    /// Toggle the seconds display (100 ms vs 60 s clock cadence).
    SetShowSeconds(bool),

    /// Dismiss a showing alarm before its timeout.
    HideAlarm,

    ForceFullRefresh,

    SetLowPowerEnabled(bool),

    /// Hot-reload configuration.  Validated before it is applied.
    UpdateConfig(PanelConfig),

    /// Persist the running config on the next auto-save check.
    SaveConfig,

    /// Emit an [`OperatorEvent::Status`](super::events::OperatorEvent::Status).
    RequestStatus,
}
