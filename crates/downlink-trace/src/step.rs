//! A single hop-to-hop leg of a connection's trace chain.

use rust_decimal::Decimal;
use tracing::debug;

use downlink_events::{Event, EventBus};
use downlink_types::{HopId, StepState};

/// Events announced by a connection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// The step's distance has been covered.
    Traced {
        /// The hop nearer the start of the route.
        from: HopId,
        /// The hop nearer the target.
        to: HopId,
    },
}

impl Event for StepEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Traced { .. } => "traced",
        }
    }
}

/// The leg between two adjacent hops.
///
/// A step accumulates trace amounts until its distance is covered, then
/// reports how much of the last amount was left over so the connection can
/// carry it into the next step within the same tick.
#[derive(Debug)]
pub struct ConnectionStep {
    from: HopId,
    to: HopId,
    amount_traced: Decimal,
    distance: Decimal,
    state: StepState,
    events: EventBus<StepEvent>,
}

impl ConnectionStep {
    /// Create a pristine step between `from` and `to`.
    pub const fn new(from: HopId, to: HopId, distance: Decimal) -> Self {
        Self {
            from,
            to,
            amount_traced: Decimal::ZERO,
            distance,
            state: StepState::Pristine,
            events: EventBus::new(),
        }
    }

    /// Add `amount` to the trace.
    ///
    /// Returns `None` while the step is still being traced. Once the
    /// distance is reached, returns the overflow `amount_traced - distance`.
    /// A step that is already traced ignores the amount and returns
    /// `Some(0)`. Negative amounts count as zero.
    pub fn trace_amount(&mut self, amount: Decimal) -> Option<Decimal> {
        if self.state == StepState::Traced {
            return Some(Decimal::ZERO);
        }
        self.amount_traced = self.amount_traced.saturating_add(amount.max(Decimal::ZERO));
        self.state = StepState::Tracing;
        if self.amount_traced < self.distance {
            return None;
        }

        self.state = StepState::Traced;
        debug!(from = %self.from, to = %self.to, amount = %self.amount_traced, "step traced");
        self.events.trigger(&StepEvent::Traced {
            from: self.from,
            to: self.to,
        });
        Some(self.amount_traced.saturating_sub(self.distance))
    }

    /// Clear all progress for a fresh trace.
    pub const fn reset(&mut self) {
        self.amount_traced = Decimal::ZERO;
        self.state = StepState::Pristine;
    }

    /// The hop nearer the start of the route.
    pub const fn from(&self) -> HopId {
        self.from
    }

    /// The hop nearer the target.
    pub const fn to(&self) -> HopId {
        self.to
    }

    /// Amount accumulated so far.
    pub const fn amount_traced(&self) -> Decimal {
        self.amount_traced
    }

    /// Amount needed to trace the step.
    pub const fn distance(&self) -> Decimal {
        self.distance
    }

    /// Current state.
    pub const fn state(&self) -> StepState {
        self.state
    }

    /// Fraction of the distance covered, capped at 1.
    pub fn percentage(&self) -> Decimal {
        self.amount_traced
            .checked_div(self.distance)
            .map_or(Decimal::ONE, |fraction| fraction.min(Decimal::ONE))
    }

    /// Subscribe to this step's events.
    pub fn events_mut(&mut self) -> &mut EventBus<StepEvent> {
        &mut self.events
    }
}
