//! Function-pointer finite state machine engine for the power mode.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌───────────┬──────────┬──────────┬───────────────────┐ │
//! │  │ PowerMode │ on_enter │ on_exit  │ on_update         │ │
//! │  ├───────────┼──────────┼──────────┼───────────────────┤ │
//! │  │ Active    │ fn(ctx)  │ none     │ fn(ctx)->Option<> │ │
//! │  │ LowPower  │ fn(ctx)  │ fn(ctx)  │ fn(ctx)->Option<> │ │
//! │  └───────────┴──────────┴──────────┴───────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** mode.  If it
//! returns `Some(next)`, the engine runs `on_exit` for the current mode,
//! then `on_enter` for the next.  Handlers only write to the
//! [`PowerContext`](context::PowerContext) blackboard; the
//! [`PowerStateMachine`](crate::power::PowerStateMachine) service turns
//! the resulting directives into hardware calls and bus events.

pub mod context;
pub mod states;

use context::PowerContext;
use log::info;

use crate::clock::Instant;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PowerMode {
    Active = 0,
    LowPower = 1,
}

impl PowerMode {
    /// Total number of modes, used to size the table array.
    pub const COUNT: usize = 2;

    /// Convert an index back to `PowerMode`.  Out-of-range falls back to
    /// `Active`, the mode that never hides information from the user.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            1 => Self::LowPower,
            0 => Self::Active,
            _ => {
                debug_assert!(false, "invalid power mode index: {idx}");
                Self::Active
            }
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::LowPower => "LOW_POWER",
        }
    }
}

impl core::fmt::Display for PowerMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut PowerContext);

/// Per-tick update.  Returns `Some(next)` to trigger a transition.
pub type StateUpdateFn = fn(&mut PowerContext) -> Option<PowerMode>;

/// One row of the state table.
pub struct StateDescriptor {
    pub id: PowerMode,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

/// A completed mode change, reported to the caller of [`Fsm::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PowerMode,
    pub to: PowerMode,
    pub at: Instant,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    table: [StateDescriptor; PowerMode::COUNT],
    current: usize,
    entered_at: Instant,
}

impl Fsm {
    /// Row `i` of `table` must describe `PowerMode::from_index(i)`.
    pub fn new(table: [StateDescriptor; PowerMode::COUNT], initial: PowerMode) -> Self {
        for (idx, row) in table.iter().enumerate() {
            debug_assert_eq!(row.id as usize, idx, "state table row {} out of order", row.name);
        }
        Self {
            table,
            current: initial as usize,
            entered_at: Instant::ZERO,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut PowerContext) {
        info!("power FSM starting in {}", self.table[self.current].name);
        self.entered_at = ctx.now;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance by one tick using `ctx.now` and the sample already stored
    /// in the context.
    pub fn tick(&mut self, ctx: &mut PowerContext) -> Option<Transition> {
        let next = (self.table[self.current].on_update)(ctx)?;
        let from = self.current_mode();
        if next == from {
            return None;
        }
        self.transition(next, ctx);
        Some(Transition {
            from,
            to: next,
            at: ctx.now,
        })
    }

    pub fn current_mode(&self) -> PowerMode {
        PowerMode::from_index(self.current)
    }

    /// When the current mode was entered.
    pub fn entered_at(&self) -> Instant {
        self.entered_at
    }

    fn transition(&mut self, next: PowerMode, ctx: &mut PowerContext) {
        let next_idx = next as usize;
        info!(
            "power FSM: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }
        self.current = next_idx;
        self.entered_at = ctx.now;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
