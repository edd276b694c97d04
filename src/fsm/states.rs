//! Mode handler functions and table builder.
//!
//! ```text
//!            ┌─[feature off]──┐
//!            ▼                │
//!  ACTIVE ───┴─[night ∧ still]────────────▶ LOW_POWER
//!    ▲       └─[no motion ≥ timeout]─────▶     │
//!    │                                         │
//!    └─────────────[motion]────────────────────┘
//! ```

use super::context::{PowerContext, PowerDirectives};
use super::{PowerMode, StateDescriptor};
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; PowerMode::COUNT] {
    [
        // Index 0: Active
        StateDescriptor {
            id: PowerMode::Active,
            name: "ACTIVE",
            on_enter: Some(active_enter),
            on_exit: None,
            on_update: active_update,
        },
        // Index 1: LowPower
        StateDescriptor {
            id: PowerMode::LowPower,
            name: "LOW_POWER",
            on_enter: Some(low_power_enter),
            on_exit: Some(low_power_exit),
            on_update: low_power_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut PowerContext) {
    ctx.is_low_power = false;
    ctx.directives = PowerDirectives::FULL_SPEED;
    info!("ACTIVE: CPU {} MHz, radios on", ctx.directives.cpu_mhz);
}

fn active_update(ctx: &mut PowerContext) -> Option<PowerMode> {
    if !ctx.config.low_power_enabled {
        return None;
    }

    // Dark room and nobody there: skip the timeout.
    if ctx.is_night() && !ctx.sample.motion {
        info!(
            "ACTIVE: light {:?} below {} with no motion -> low power",
            ctx.sample.light_level, ctx.config.night_light_threshold
        );
        return Some(PowerMode::LowPower);
    }

    if ctx.since_motion() >= ctx.config.no_motion_timeout_ms {
        info!(
            "ACTIVE: no motion for {} ms -> low power",
            ctx.since_motion()
        );
        return Some(PowerMode::LowPower);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  LOW_POWER
// ═══════════════════════════════════════════════════════════════════════════

fn low_power_enter(ctx: &mut PowerContext) {
    ctx.is_low_power = true;
    ctx.directives = PowerDirectives::REDUCED;
    info!(
        "LOW_POWER: CPU {} MHz, radios off, alarm sensors still sampled",
        ctx.directives.cpu_mhz
    );
}

fn low_power_exit(ctx: &mut PowerContext) {
    ctx.is_low_power = false;
    info!("LOW_POWER: leaving, restoring peripherals");
}

fn low_power_update(ctx: &mut PowerContext) -> Option<PowerMode> {
    if ctx.sample.motion {
        return Some(PowerMode::Active);
    }
    // Feature switched off at runtime while asleep.
    if !ctx.config.low_power_enabled {
        return Some(PowerMode::Active);
    }
    None
}
