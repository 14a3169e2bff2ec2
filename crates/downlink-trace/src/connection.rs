//! Connections: routed paths whose trace advances hop by hop.
//!
//! A connection is an ordered list of intermediate hops, optionally
//! bracketed by a start hop (the player's machine) and an end hop (the
//! target). The first time it is traced the route is turned into a chain of
//! [`ConnectionStep`]s, reversed so the trace begins at the target and works
//! back towards the player. The chain is built once and only ever reset in
//! place afterwards, so the route is locked from that point on.
//!
//! Each [`Connection::trace_step`] call is one quantum. The amount is fed
//! into the current step, and any overflow past a step's distance carries
//! into the next step in the same call. When every step is traced the
//! connection announces [`ConnectionEvent::ConnectionTraced`]: the player
//! has been detected.
//!
//! Two connections are equal when their routes are: equality compares a
//! SHA-256 digest over the intermediate hop ids, in order.

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use downlink_events::{Event, EventBus};
use downlink_types::{ConnectionRecord, HopId, HopKind};

use crate::error::TraceError;
use crate::hop::{Hop, HopRegistry};
use crate::step::ConnectionStep;

/// Trace distance of each step unless improved.
pub const DEFAULT_CONNECTION_DISTANCE: u32 = 10;

/// Ticks between progress announcements.
pub const DEFAULT_SENSITIVITY: u64 = 10;

/// Events announced by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A step of the chain has been traced.
    StepTraced {
        /// Number of steps traced so far, including this one.
        steps_traced: usize,
    },
    /// Periodic progress report, every `sensitivity` trace ticks.
    Progress {
        /// Fraction of steps traced.
        percentage: Decimal,
    },
    /// Every step has been traced.
    ConnectionTraced,
}

impl Event for ConnectionEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::StepTraced { .. } => "steptraced",
            Self::Progress { .. } => "progress",
            Self::ConnectionTraced => "connectiontraced",
        }
    }
}

/// A route through the network that can be traced back.
#[derive(Debug)]
pub struct Connection {
    name: String,
    hops: Vec<HopId>,
    start: Option<HopId>,
    end: Option<HopId>,
    steps: Vec<ConnectionStep>,
    built: bool,
    current_step: usize,
    steps_traced: usize,
    trace_ticks: u64,
    active: bool,
    traced: bool,
    distance: Decimal,
    sensitivity: u64,
    digest: String,
    events: EventBus<ConnectionEvent>,
}

impl Connection {
    /// Create an empty connection with the default distance and sensitivity.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(
            name,
            Decimal::from(DEFAULT_CONNECTION_DISTANCE),
            DEFAULT_SENSITIVITY,
        )
    }

    /// Create an empty connection with an explicit step distance and
    /// progress cadence. A zero sensitivity disables progress reports.
    pub fn with_settings(name: impl Into<String>, distance: Decimal, sensitivity: u64) -> Self {
        let mut connection = Self {
            name: name.into(),
            hops: Vec::new(),
            start: None,
            end: None,
            steps: Vec::new(),
            built: false,
            current_step: 0,
            steps_traced: 0,
            trace_ticks: 0,
            active: false,
            traced: false,
            distance,
            sensitivity,
            digest: String::new(),
            events: EventBus::new(),
        };
        connection.rebuild_digest();
        connection
    }

    /// Restore a connection from its persisted route.
    ///
    /// # Errors
    ///
    /// - [`TraceError::HopNotFound`] if an id is not in `hops`.
    /// - [`TraceError::InvalidHopType`] if an id names a player machine.
    pub fn from_record(record: &ConnectionRecord, hops: &dyn HopRegistry) -> Result<Self, TraceError> {
        let mut connection = Self::new(record.name.clone());
        for &id in &record.hop_ids {
            let hop = hops.hop(id).ok_or(TraceError::HopNotFound(id))?;
            connection.add_hop(hop)?;
        }
        Ok(connection)
    }

    /// Persisted form: name and route only. Trace progress is not saved.
    pub fn to_record(&self) -> ConnectionRecord {
        ConnectionRecord {
            name: self.name.clone(),
            hop_ids: self.hops.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Route editing (before the chain is built)
    // -----------------------------------------------------------------------

    /// Toggle `hop` on the route: append it if absent, remove it if present.
    ///
    /// Returns `true` if the hop was added.
    ///
    /// # Errors
    ///
    /// - [`TraceError::ChainLocked`] once the chain is built.
    /// - [`TraceError::InvalidHopType`] for a player machine.
    pub fn add_hop(&mut self, hop: &dyn Hop) -> Result<bool, TraceError> {
        self.ensure_unlocked()?;
        if hop.kind() == HopKind::Player {
            return Err(TraceError::InvalidHopType {
                hop: hop.id(),
                kind: hop.kind(),
            });
        }
        if self.hops.contains(&hop.id()) {
            self.remove_hop(hop.id())?;
            return Ok(false);
        }
        self.hops.push(hop.id());
        self.rebuild_digest();
        Ok(true)
    }

    /// Take `id` off the route.
    ///
    /// # Errors
    ///
    /// - [`TraceError::ChainLocked`] once the chain is built.
    /// - [`TraceError::HopNotFound`] if the hop is not on the route.
    pub fn remove_hop(&mut self, id: HopId) -> Result<(), TraceError> {
        self.ensure_unlocked()?;
        let position = self
            .hops
            .iter()
            .position(|&hop| hop == id)
            .ok_or(TraceError::HopNotFound(id))?;
        self.hops.remove(position);
        self.rebuild_digest();
        Ok(())
    }

    /// Set the hop the route starts from, normally the player's machine.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::ChainLocked`] once the chain is built.
    pub fn set_start(&mut self, hop: HopId) -> Result<&mut Self, TraceError> {
        self.ensure_unlocked()?;
        self.start = Some(hop);
        Ok(self)
    }

    /// Set the hop the route ends at, normally the target.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::ChainLocked`] once the chain is built.
    pub fn set_end(&mut self, hop: HopId) -> Result<&mut Self, TraceError> {
        self.ensure_unlocked()?;
        self.end = Some(hop);
        Ok(self)
    }

    /// Lengthen every step by `amount`, making the route slower to trace.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::ChainLocked`] once the chain is built.
    pub fn improve_connection_distance(&mut self, amount: Decimal) -> Result<(), TraceError> {
        self.ensure_unlocked()?;
        self.distance = self.distance.saturating_add(amount);
        Ok(())
    }

    fn ensure_unlocked(&self) -> Result<(), TraceError> {
        if self.built {
            return Err(TraceError::ChainLocked {
                connection: self.name.clone(),
            });
        }
        Ok(())
    }

    fn rebuild_digest(&mut self) {
        let mut hasher = Sha256::new();
        for id in &self.hops {
            hasher.update(id.into_inner().as_bytes());
        }
        self.digest = hex::encode(hasher.finalize());
    }

    // -----------------------------------------------------------------------
    // Chain
    // -----------------------------------------------------------------------

    /// Build the step chain if it has not been built yet.
    pub fn initialise(&mut self) {
        if self.built {
            return;
        }
        let route: Vec<HopId> = self
            .start
            .into_iter()
            .chain(self.hops.iter().copied())
            .chain(self.end)
            .collect();
        let distance = self.distance;
        self.steps = route
            .windows(2)
            .filter_map(|pair| match *pair {
                [from, to] => Some(ConnectionStep::new(from, to, distance)),
                _ => None,
            })
            .rev()
            .collect();
        self.built = true;
        debug!(connection = %self.name, steps = self.steps.len(), "trace chain built");
    }

    /// Advance the trace by `amount`, carrying overflow across steps.
    pub fn trace_step(&mut self, amount: Decimal) {
        self.initialise();
        if self.traced {
            return;
        }

        self.trace_ticks = self.trace_ticks.saturating_add(1);
        if self.sensitivity > 0 && self.trace_ticks.checked_rem(self.sensitivity) == Some(0) {
            let percentage = self.percentage();
            self.events.trigger(&ConnectionEvent::Progress { percentage });
        }

        let last = self.steps.len().saturating_sub(1);
        let mut remaining = amount;
        while let Some(step) = self.steps.get_mut(self.current_step) {
            let Some(overflow) = step.trace_amount(remaining) else {
                break;
            };
            self.steps_traced = self.steps_traced.saturating_add(1);
            self.current_step = self.current_step.saturating_add(1).min(last);
            self.events.trigger(&ConnectionEvent::StepTraced {
                steps_traced: self.steps_traced,
            });
            if overflow <= Decimal::ZERO || self.steps_traced >= self.steps.len() {
                break;
            }
            remaining = overflow;
        }

        if self.steps_traced >= self.steps.len() {
            self.traced = true;
            info!(connection = %self.name, ticks = self.trace_ticks, "connection traced");
            self.events.trigger(&ConnectionEvent::ConnectionTraced);
        }
    }

    // -----------------------------------------------------------------------
    // Opening and closing
    // -----------------------------------------------------------------------

    /// Open the connection with a fresh trace: every counter and step is
    /// reset, then every hop is connected in route order.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::HopNotFound`] if a hop is missing from `hops`.
    /// Nothing is reset or connected in that case.
    pub fn connect(&mut self, hops: &mut dyn HopRegistry) -> Result<(), TraceError> {
        self.ensure_resolvable(hops)?;
        self.initialise();
        self.current_step = 0;
        self.steps_traced = 0;
        self.trace_ticks = 0;
        self.traced = false;
        for step in &mut self.steps {
            step.reset();
        }
        self.open(hops)
    }

    /// Open the connection again, keeping trace progress.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::HopNotFound`] if a hop is missing from `hops`.
    pub fn reconnect(&mut self, hops: &mut dyn HopRegistry) -> Result<(), TraceError> {
        self.ensure_resolvable(hops)?;
        self.open(hops)
    }

    /// Disconnect every hop in reverse route order.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::HopNotFound`] if a hop is missing from `hops`.
    pub fn close(&mut self, hops: &mut dyn HopRegistry) -> Result<(), TraceError> {
        self.ensure_resolvable(hops)?;
        for &id in self.hops.iter().rev() {
            if let Some(hop) = hops.hop_mut(id) {
                hop.disconnect();
            }
        }
        self.active = false;
        debug!(connection = %self.name, "connection closed");
        Ok(())
    }

    fn open(&mut self, hops: &mut dyn HopRegistry) -> Result<(), TraceError> {
        for &id in &self.hops {
            hops.hop_mut(id).ok_or(TraceError::HopNotFound(id))?.connect();
        }
        self.active = true;
        debug!(connection = %self.name, hops = self.hops.len(), "connection opened");
        Ok(())
    }

    fn ensure_resolvable(&self, hops: &dyn HopRegistry) -> Result<(), TraceError> {
        match self.hops.iter().find(|&&id| hops.hop(id).is_none()) {
            Some(&missing) => Err(TraceError::HopNotFound(missing)),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Intermediate hops, in route order.
    pub fn hops(&self) -> &[HopId] {
        &self.hops
    }

    /// Start hop, if set.
    pub const fn start(&self) -> Option<HopId> {
        self.start
    }

    /// End hop, if set.
    pub const fn end(&self) -> Option<HopId> {
        self.end
    }

    /// The step chain, nearest the target first. Empty until built.
    pub fn steps(&self) -> &[ConnectionStep] {
        &self.steps
    }

    /// The step currently being traced.
    pub fn current_step(&self) -> Option<&ConnectionStep> {
        self.steps.get(self.current_step)
    }

    /// A step by chain index, mutably (e.g. to subscribe to its events).
    pub fn step_mut(&mut self, index: usize) -> Option<&mut ConnectionStep> {
        self.steps.get_mut(index)
    }

    /// Whether the step chain has been built.
    pub const fn is_built(&self) -> bool {
        self.built
    }

    /// Steps fully traced.
    pub const fn steps_traced(&self) -> usize {
        self.steps_traced
    }

    /// Trace quanta applied since the last fresh connect.
    pub const fn trace_ticks(&self) -> u64 {
        self.trace_ticks
    }

    /// Whether the connection is open.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the whole route has been traced.
    pub const fn is_traced(&self) -> bool {
        self.traced
    }

    /// Distance of each step.
    pub const fn distance(&self) -> Decimal {
        self.distance
    }

    /// Ticks between progress reports.
    pub const fn sensitivity(&self) -> u64 {
        self.sensitivity
    }

    /// Hex-encoded SHA-256 digest of the route.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Fraction of steps traced. A connection with no steps counts as
    /// fully traced.
    pub fn percentage(&self) -> Decimal {
        Decimal::from(self.steps_traced)
            .checked_div(Decimal::from(self.steps.len()))
            .unwrap_or(Decimal::ONE)
    }

    /// Subscribe to this connection's events.
    pub fn events_mut(&mut self) -> &mut EventBus<ConnectionEvent> {
        &mut self.events
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for Connection {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
