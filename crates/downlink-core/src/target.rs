//! Mission targets: servers that trace back the player's connection.
//!
//! A [`MissionTarget`] guards a computer in the network with a set of
//! challenges. Any attack on one of those challenges raises the target's
//! alarm. While alarmed and connected, the target traces back along the
//! player's connection each tick until the player is detected.
//!
//! Breaking in pays the target's reward.
//!
//! A target remembers the last connection the player used. Reconnecting
//! over the same route to an alarmed target resumes the earlier trace
//! instead of starting over.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use tracing::{info, warn};

use downlink_events::{Event, EventBus};
use downlink_sched::{Challenge, ChallengeRegistry};
use downlink_trace::{Connection, HopRegistry, TraceError};
use downlink_types::{ChallengeId, HopId};

/// Events announced by a mission target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEvent {
    /// Every guarding challenge is solved.
    Accessed {
        /// The target's hop.
        target: HopId,
    },
    /// The trace reached the player.
    Detected {
        /// The target's hop.
        target: HopId,
    },
}

impl Event for TargetEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Accessed { .. } => "accessed",
            Self::Detected { .. } => "detected",
        }
    }
}

/// A guarded server the player breaks into.
#[derive(Debug)]
pub struct MissionTarget {
    hop: HopId,
    reward: Decimal,
    challenges: Vec<ChallengeId>,
    /// Set by challenge `start` listeners.
    alarm: Arc<AtomicBool>,
    accessible: bool,
    detected: bool,
    current: Option<Connection>,
    previous: Option<Connection>,
    events: EventBus<TargetEvent>,
}

impl MissionTarget {
    /// Create a target for the computer `hop` that pays nothing.
    pub fn new(hop: HopId) -> Self {
        Self {
            hop,
            reward: Decimal::ZERO,
            challenges: Vec::new(),
            alarm: Arc::new(AtomicBool::new(false)),
            accessible: false,
            detected: false,
            current: None,
            previous: None,
            events: EventBus::new(),
        }
    }

    /// Pay `reward` when the target is accessed.
    #[must_use]
    pub const fn with_reward(mut self, reward: Decimal) -> Self {
        self.reward = reward;
        self
    }

    /// Guard the target with `challenge`: any attack on it raises the alarm.
    pub fn guard(&mut self, challenge: &mut Challenge) {
        let alarm = Arc::clone(&self.alarm);
        challenge.events_mut().on("start", move |_| {
            alarm.store(true, Ordering::SeqCst);
        });
        self.challenges.push(challenge.id());
    }

    /// Raise the alarm directly.
    pub fn alert(&self) {
        self.alarm.store(true, Ordering::SeqCst);
    }

    /// Whether an attack has raised the alarm.
    pub fn is_alerted(&self) -> bool {
        self.alarm.load(Ordering::SeqCst)
    }

    /// Route the player onto this target over `connection`.
    ///
    /// If the target is alerted and the route matches the previous one, the
    /// earlier trace resumes. Otherwise the connection starts a fresh trace.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::HopNotFound`] if a hop on the route is missing
    /// from `hops`.
    pub fn connect(
        &mut self,
        mut connection: Connection,
        hops: &mut dyn HopRegistry,
    ) -> Result<(), TraceError> {
        let resume = self.is_alerted() && self.previous.as_ref() == Some(&connection);
        let active = match self.previous.take() {
            Some(mut previous) if resume => {
                if let Err(err) = previous.reconnect(hops) {
                    self.previous = Some(previous);
                    return Err(err);
                }
                info!(target_hop = %self.hop, traced = previous.steps_traced(), "trace resumed");
                previous
            }
            other => {
                self.previous = other;
                connection.connect(hops)?;
                connection
            }
        };
        if let Some(hop) = hops.hop_mut(self.hop) {
            hop.connect();
        }
        self.current = Some(active);
        Ok(())
    }

    /// Drop the player's connection, remembering it for a later resume.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::HopNotFound`] if a hop on the route is missing
    /// from `hops`. The connection stays current in that case.
    pub fn disconnect(&mut self, hops: &mut dyn HopRegistry) -> Result<(), TraceError> {
        let Some(mut connection) = self.current.take() else {
            return Ok(());
        };
        if let Err(err) = connection.close(hops) {
            self.current = Some(connection);
            return Err(err);
        }
        if let Some(hop) = hops.hop_mut(self.hop) {
            hop.disconnect();
        }
        self.previous = Some(connection);
        Ok(())
    }

    /// Trace back `amount` along the current connection if alerted.
    ///
    /// Returns `true` on the pass that detects the player.
    pub fn trace_back(&mut self, amount: Decimal) -> bool {
        if !self.is_alerted() || self.detected {
            return false;
        }
        let Some(connection) = self.current.as_mut() else {
            return false;
        };
        connection.trace_step(amount);
        if connection.is_traced() {
            self.detected = true;
            warn!(target_hop = %self.hop, connection = %connection.name(), "player detected");
            self.events.trigger(&TargetEvent::Detected { target: self.hop });
        }
        self.detected
    }

    /// Recheck the guarding challenges.
    ///
    /// Returns `true` on the pass where the last one falls.
    pub fn update_access(&mut self, challenges: &ChallengeRegistry) -> bool {
        if self.accessible || self.challenges.is_empty() {
            return false;
        }
        let all_solved = self
            .challenges
            .iter()
            .all(|&id| challenges.get(id).is_some_and(Challenge::is_solved));
        if all_solved {
            self.accessible = true;
            info!(target_hop = %self.hop, reward = %self.reward, "target accessed");
            self.events.trigger(&TargetEvent::Accessed { target: self.hop });
        }
        all_solved
    }

    /// The target's hop.
    pub const fn hop(&self) -> HopId {
        self.hop
    }

    /// Currency paid out on access.
    pub const fn reward(&self) -> Decimal {
        self.reward
    }

    /// Challenges guarding the target.
    pub fn challenges(&self) -> &[ChallengeId] {
        &self.challenges
    }

    /// Whether every guarding challenge is solved.
    pub const fn is_accessible(&self) -> bool {
        self.accessible
    }

    /// Whether the trace has reached the player.
    pub const fn is_detected(&self) -> bool {
        self.detected
    }

    /// The player's live connection, if connected.
    pub const fn connection(&self) -> Option<&Connection> {
        self.current.as_ref()
    }

    /// The connection used last time, if any.
    pub const fn previous_connection(&self) -> Option<&Connection> {
        self.previous.as_ref()
    }

    /// Subscribe to this target's events.
    pub fn events_mut(&mut self) -> &mut EventBus<TargetEvent> {
        &mut self.events
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use downlink_trace::{Computer, Network};
    use downlink_types::{HopKind, PasswordKind};

    use super::*;

    struct Fixture {
        network: Network,
        relays: Vec<HopId>,
        target: MissionTarget,
    }

    fn fixture() -> Fixture {
        let mut network = Network::new();
        let relays = (0..3)
            .map(|i| {
                network.insert(Computer::with_address(
                    format!("Relay {i}"),
                    HopKind::Public,
                    format!("10.1.0.{i}"),
                ))
            })
            .collect();
        let server = network.insert(Computer::with_address(
            "Uplink Corp Mainframe",
            HopKind::Mission,
            "52.1.1.1",
        ));
        Fixture {
            network,
            relays,
            target: MissionTarget::new(server),
        }
    }

    fn route(f: &Fixture, ids: &[HopId]) -> Connection {
        let mut connection = Connection::new("Player Connection");
        for &id in ids {
            connection.add_hop(f.network.hop(id).unwrap()).unwrap();
        }
        connection
    }

    #[test]
    fn attack_on_guarding_challenge_raises_alarm() {
        let mut f = fixture();
        let mut challenge = Challenge::password("hunter2", PasswordKind::Dictionary, dec!(2));
        f.target.guard(&mut challenge);
        assert!(!f.target.is_alerted());
        challenge.attack("guess");
        assert!(f.target.is_alerted());
    }

    #[test]
    fn unalerted_target_does_not_trace() {
        let mut f = fixture();
        let connection = route(&f, &f.relays.clone());
        f.target.connect(connection, &mut f.network).unwrap();
        assert!(!f.target.trace_back(dec!(100)));
        assert_eq!(f.target.connection().unwrap().steps_traced(), 0);
    }

    #[test]
    fn same_route_resumes_when_alerted() {
        let mut f = fixture();
        let relays = f.relays.clone();
        f.target.alert();
        f.target.connect(route(&f, &relays), &mut f.network).unwrap();
        f.target.trace_back(dec!(10));
        assert_eq!(f.target.connection().unwrap().steps_traced(), 1);
        f.target.disconnect(&mut f.network).unwrap();

        f.target.connect(route(&f, &relays), &mut f.network).unwrap();
        assert_eq!(f.target.connection().unwrap().steps_traced(), 1);
        assert!(f.target.trace_back(dec!(10)));
        assert!(f.target.is_detected());
    }

    #[test]
    fn different_route_starts_over() {
        let mut f = fixture();
        let relays = f.relays.clone();
        f.target.alert();
        f.target.connect(route(&f, &relays), &mut f.network).unwrap();
        f.target.trace_back(dec!(10));
        f.target.disconnect(&mut f.network).unwrap();

        let shorter: Vec<HopId> = relays.iter().take(2).copied().collect();
        f.target.connect(route(&f, &shorter), &mut f.network).unwrap();
        assert_eq!(f.target.connection().unwrap().steps_traced(), 0);
    }

    #[test]
    fn unalerted_reconnect_starts_over() {
        let mut f = fixture();
        let relays = f.relays.clone();
        f.target.connect(route(&f, &relays), &mut f.network).unwrap();
        f.target.disconnect(&mut f.network).unwrap();
        f.target.connect(route(&f, &relays), &mut f.network).unwrap();
        assert_eq!(f.target.connection().unwrap().trace_ticks(), 0);
        assert!(f.target.previous_connection().is_some());
    }

    #[test]
    fn access_needs_every_challenge_solved() {
        let mut f = fixture();
        let mut registry = ChallengeRegistry::new();
        let mut password = Challenge::password("x", PasswordKind::Dictionary, dec!(1));
        let mut grid = Challenge::encryption("Linear", 2, 2, dec!(2));
        f.target.guard(&mut password);
        f.target.guard(&mut grid);
        let password_id = registry.insert(password);
        let grid_id = registry.insert(grid);

        registry.get_mut(password_id).unwrap().solve();
        assert!(!f.target.update_access(&registry));
        registry.get_mut(grid_id).unwrap().solve();
        assert!(f.target.update_access(&registry));
        assert!(f.target.is_accessible());
        assert!(!f.target.update_access(&registry));
    }

    #[test]
    fn reward_defaults_to_nothing() {
        let f = fixture();
        assert_eq!(f.target.reward(), dec!(0));
        let paid = MissionTarget::new(f.target.hop()).with_reward(dec!(75.25));
        assert_eq!(paid.reward(), dec!(75.25));
    }
}
