//! Render dispatch.
//!
//! Hands a [`RefreshPlan`] to the display driver.  A failed render gets
//! one recovery attempt: re-initialise the controller, clear the panel and
//! redraw every channel of the current layout.  A second failure is reported to the operator and the
//! main loop carries on; the next plan tries again.

use log::{error, info, warn};

use crate::app::events::OperatorEvent;
use crate::app::ports::{OperatorSink, RenderPort};
use crate::error::RenderError;
use crate::scheduler::layout::Layout;
use crate::scheduler::plan::RefreshPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Plan was empty; the driver was not touched.
    Skipped,
    Rendered,
    /// First attempt failed with the carried error; the full retry
    /// succeeded, so the whole screen is now current.
    Recovered(RenderError),
    Failed(RenderError),
}

impl DispatchOutcome {
    /// Whether the panel now shows the plan.
    pub fn drew(self) -> bool {
        matches!(self, Self::Rendered | Self::Recovered(_))
    }
}

pub fn dispatch(
    plan: &RefreshPlan,
    layout: &Layout,
    port: &mut impl RenderPort,
    sink: &mut impl OperatorSink,
) -> DispatchOutcome {
    if plan.is_empty() {
        return DispatchOutcome::Skipped;
    }
    let first = match port.render(plan) {
        Ok(()) => return DispatchOutcome::Rendered,
        Err(e) => e,
    };

    warn!("render: {first}, re-initialising panel");
    match recover(plan, layout, port) {
        Ok(()) => {
            info!("render: recovered after {first}");
            sink.emit(&OperatorEvent::RenderRecovered(first));
            DispatchOutcome::Recovered(first)
        }
        Err(e) => {
            error!("render: retry failed ({e})");
            sink.emit(&OperatorEvent::RenderFailed(e));
            DispatchOutcome::Failed(e)
        }
    }
}

fn recover(plan: &RefreshPlan, layout: &Layout, port: &mut impl RenderPort) -> Result<(), RenderError> {
    port.reinitialize()?;
    port.clear()?;
    let mut retry = plan.clone();
    retry.escalate_to_full(layout);
    port.render(&retry)
}
