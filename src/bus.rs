//! Synchronous, re-entrant publish/subscribe bus.
//!
//! ```text
//!   publish(kind, payload)
//!        │
//!        ▼
//!   snapshot matching subscriptions (registration order)
//!        │
//!        ├──▶ handler 1 ── Ok            → dispatched
//!        ├──▶ handler 2 ── PayloadMismatch → skipped
//!        ├──▶ handler 3 ── panic          → failed (isolated)
//!        └──▶ handler 4 ── busy (already
//!                          dispatching)   → deferred until the
//!                                           outermost publish drains
//! ```
//!
//! The bus is single-threaded and uses interior mutability so handlers
//! may publish, subscribe and unsubscribe through the `&EventBus` they
//! are handed.  Subscription changes made during a dispatch take effect
//! on the **next** publish; the in-flight snapshot is never edited.

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use log::{debug, error, warn};

use crate::app::ports::ClockPort;
use crate::clock::Instant;
use crate::events::{EventEnvelope, EventKind, EventPayload, truncated};

/// Maximum stored length of an owner label.
pub const OWNER_LABEL_CAP: usize = 32;

// ───────────────────────────────────────────────────────────────
// Handler capability
// ───────────────────────────────────────────────────────────────

/// Reasons a handler may decline an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerError {
    /// The payload variant was not the one this handler expects for the kind.
    PayloadMismatch,
    /// The handler could not process the event.
    Failed(&'static str),
}

impl core::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PayloadMismatch => write!(f, "payload mismatch"),
            Self::Failed(msg) => write!(f, "handler failed: {msg}"),
        }
    }
}

/// Anything that can react to an event.
///
/// `bus` is the bus doing the dispatch; handlers may publish through it.
pub trait EventHandler {
    fn handle(&mut self, envelope: &EventEnvelope, bus: &EventBus) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: FnMut(&EventEnvelope, &EventBus) -> Result<(), HandlerError>,
{
    fn handle(&mut self, envelope: &EventEnvelope, bus: &EventBus) -> Result<(), HandlerError> {
        self(envelope, bus)
    }
}

/// Shared handler reference held by the bus.
pub type SharedHandler = Rc<RefCell<dyn EventHandler>>;

// ───────────────────────────────────────────────────────────────
// Subscriptions
// ───────────────────────────────────────────────────────────────

/// Opaque token returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u32);

impl SubscriptionHandle {
    pub fn id(self) -> u32 {
        self.0
    }
}

struct Subscription {
    handle: SubscriptionHandle,
    kind: EventKind,
    owner_label: heapless::String<OWNER_LABEL_CAP>,
    handler: SharedHandler,
}

/// Cumulative handler invocation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusStats {
    /// Publishes that reached at least one subscriber.
    pub published: u32,
    pub dispatched: u32,
    /// Handler rejected the payload shape.
    pub skipped: u32,
    /// Handler returned an error or panicked.
    pub failed: u32,
    /// Deliveries postponed because the handler was mid-dispatch.
    pub deferred: u32,
}

// ───────────────────────────────────────────────────────────────
// EventBus
// ───────────────────────────────────────────────────────────────

pub struct EventBus {
    clock: Rc<dyn ClockPort>,
    subscriptions: RefCell<Vec<Subscription>>,
    next_id: Cell<u32>,
    depth: Cell<u32>,
    deferred: RefCell<VecDeque<(SharedHandler, Rc<EventEnvelope>)>>,
    stats: Cell<BusStats>,
}

impl EventBus {
    /// Create an empty bus.  `clock` stamps `emitted_at` on every publish.
    pub fn new(clock: Rc<dyn ClockPort>) -> Self {
        Self {
            clock,
            subscriptions: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            depth: Cell::new(0),
            deferred: RefCell::new(VecDeque::new()),
            stats: Cell::new(BusStats::default()),
        }
    }

    // ── Registration ──────────────────────────────────────────

    /// Register `handler` for `kind`.  No de-duplication: subscribing the
    /// same handler twice delivers each event twice.
    pub fn subscribe(
        &self,
        kind: EventKind,
        owner_label: &str,
        handler: SharedHandler,
    ) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_id.get());
        self.next_id.set(self.next_id.get().wrapping_add(1));
        self.subscriptions.borrow_mut().push(Subscription {
            handle,
            kind,
            owner_label: truncated(owner_label),
            handler,
        });
        debug!("bus: {owner_label} subscribed to {kind} (#{})", handle.0);
        handle
    }

    /// Register a closure.
    pub fn subscribe_fn<F>(&self, kind: EventKind, owner_label: &str, f: F) -> SubscriptionHandle
    where
        F: FnMut(&EventEnvelope, &EventBus) -> Result<(), HandlerError> + 'static,
    {
        self.subscribe(kind, owner_label, Rc::new(RefCell::new(f)))
    }

    /// Remove one registration.  Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subs = self.subscriptions.borrow_mut();
        let before = subs.len();
        subs.retain(|s| s.handle != handle);
        before != subs.len()
    }

    /// Remove every registration owned by `owner_label`.  Returns the count.
    pub fn unsubscribe_all(&self, owner_label: &str) -> usize {
        let label: heapless::String<OWNER_LABEL_CAP> = truncated(owner_label);
        let mut subs = self.subscriptions.borrow_mut();
        let before = subs.len();
        subs.retain(|s| s.owner_label != label);
        let removed = before - subs.len();
        if removed > 0 {
            debug!("bus: removed {removed} subscription(s) of {owner_label}");
        }
        removed
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }

    pub fn total_subscriptions(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    pub fn stats(&self) -> BusStats {
        self.stats.get()
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Publish stamped with the bus clock.
    pub fn publish(&self, kind: EventKind, payload: EventPayload) {
        self.publish_at(kind, payload, self.clock.now());
    }

    /// Publish with an explicit emission time.
    ///
    /// Returns once every matching handler has run (or been deferred
    /// behind an enclosing dispatch that will run it before returning).
    pub fn publish_at(&self, kind: EventKind, payload: EventPayload, emitted_at: Instant) {
        let targets: Vec<SharedHandler> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| Rc::clone(&s.handler))
            .collect();
        if targets.is_empty() {
            return;
        }
        self.bump(|s| s.published = s.published.wrapping_add(1));

        let envelope = Rc::new(EventEnvelope::new(kind, payload, emitted_at));
        if !envelope.is_well_formed() {
            warn!("bus: {kind} published with payload {:?}", envelope.payload);
        }

        self.depth.set(self.depth.get() + 1);
        for handler in targets {
            self.deliver(&handler, &envelope);
        }
        if self.depth.get() == 1 {
            self.drain_deferred();
        }
        self.depth.set(self.depth.get() - 1);
    }

    fn deliver(&self, handler: &SharedHandler, envelope: &Rc<EventEnvelope>) {
        let Ok(mut h) = handler.try_borrow_mut() else {
            self.bump(|s| s.deferred = s.deferred.wrapping_add(1));
            self.deferred
                .borrow_mut()
                .push_back((Rc::clone(handler), Rc::clone(envelope)));
            return;
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| h.handle(envelope, self)));
        drop(h);

        match outcome {
            Ok(Ok(())) => self.bump(|s| s.dispatched = s.dispatched.wrapping_add(1)),
            Ok(Err(HandlerError::PayloadMismatch)) => {
                warn!("bus: handler skipped {} (payload mismatch)", envelope.kind);
                self.bump(|s| s.skipped = s.skipped.wrapping_add(1));
            }
            Ok(Err(e)) => {
                error!("bus: handler for {} failed: {e}", envelope.kind);
                self.bump(|s| s.failed = s.failed.wrapping_add(1));
            }
            Err(_) => {
                error!("bus: handler for {} panicked", envelope.kind);
                self.bump(|s| s.failed = s.failed.wrapping_add(1));
            }
        }
    }

    fn drain_deferred(&self) {
        loop {
            let next = self.deferred.borrow_mut().pop_front();
            let Some((handler, envelope)) = next else {
                break;
            };
            self.deliver(&handler, &envelope);
        }
    }

    fn bump(&self, f: impl FnOnce(&mut BusStats)) {
        let mut s = self.stats.get();
        f(&mut s);
        self.stats.set(s);
    }
}
