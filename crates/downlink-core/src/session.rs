//! A play session: every piece of world state and the single tick pass.
//!
//! # Tick order
//!
//! 1. Advance the clock.
//! 2. Tick the player's machine (tasks, releases, units).
//! 3. Recheck every target's access, crediting the reward of each target
//!    that falls.
//! 4. Let every alerted target trace back along its connection.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rust_decimal::Decimal;
use tracing::{debug, info};

use downlink_sched::{
    Challenge, ChallengeRegistry, ComputeUnit, Dictionary, PlayerMachine, SchedError,
};
use downlink_trace::{Computer, Connection, HopRegistry, Network, TraceError};
use downlink_types::{ChallengeId, HopId, HopKind, TaskId};

use crate::clock::{ClockError, GameClock};
use crate::config::GameConfig;
use crate::target::MissionTarget;

/// Errors that can occur while driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Scheduling failed.
    #[error("scheduler error: {source}")]
    Sched {
        /// The underlying scheduler error.
        #[from]
        source: SchedError,
    },

    /// Connection handling failed.
    #[error("trace error: {source}")]
    Trace {
        /// The underlying trace error.
        #[from]
        source: TraceError,
    },

    /// The clock could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// No mission target sits on the given hop.
    #[error("no mission target at hop {0}")]
    TargetNotFound(HopId),
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Tasks that completed and left the pool, in order.
    pub completed_tasks: Vec<TaskId>,
    /// Tasks still running after the tick.
    pub running_tasks: usize,
    /// Sum of running minimums after the tick.
    pub load: Decimal,
    /// Unreserved pool capacity after the tick.
    pub free_cycles: Decimal,
    /// Targets whose last challenge fell this tick.
    pub accessed: Vec<HopId>,
    /// Rewards credited this tick.
    pub earned: Decimal,
    /// Currency balance after the tick.
    pub currency: Decimal,
    /// Targets whose trace reached the player this tick.
    pub detected: Vec<HopId>,
}

/// All mutable world state for one game.
#[derive(Debug)]
pub struct Session {
    config: GameConfig,
    clock: GameClock,
    rng: SmallRng,
    dictionary: Dictionary,
    challenges: ChallengeRegistry,
    network: Network,
    home: HopId,
    machine: PlayerMachine,
    targets: Vec<MissionTarget>,
    currency: Decimal,
}

impl Session {
    /// Start a session from `config`, attacking dictionary passwords with
    /// `dictionary`.
    ///
    /// The player's machine gets `machine.unit_count` units of
    /// `machine.unit_speed` and joins the network as its player hop.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Sched`] if the machine cannot hold the
    /// configured units.
    pub fn new(config: GameConfig, dictionary: Dictionary) -> Result<Self, SessionError> {
        let units = (0..config.machine.unit_count)
            .map(|_| {
                ComputeUnit::new(downlink_sched::unit::DEFAULT_UNIT_NAME, config.machine.unit_speed)
            })
            .collect();
        let machine = PlayerMachine::with_max_units(units, config.machine.max_units)?;

        let mut network = Network::new();
        let home = network.insert(Computer::with_address(
            machine.name(),
            HopKind::Player,
            machine.address(),
        ));

        info!(
            session = %config.world.name,
            seed = config.world.seed,
            total_speed = %machine.pool().total_speed(),
            "session started"
        );

        Ok(Self {
            rng: SmallRng::seed_from_u64(config.world.seed),
            config,
            clock: GameClock::new(),
            dictionary,
            challenges: ChallengeRegistry::new(),
            network,
            home,
            machine,
            targets: Vec::new(),
            currency: Decimal::ZERO,
        })
    }

    // -----------------------------------------------------------------------
    // World building
    // -----------------------------------------------------------------------

    /// Put a mission server on the network, guarded by `challenges` and
    /// paying `reward` once they all fall.
    ///
    /// Returns the server's hop id.
    pub fn add_target(
        &mut self,
        server: Computer,
        challenges: Vec<Challenge>,
        reward: Decimal,
    ) -> HopId {
        let hop = self.network.insert(server);
        let mut target = MissionTarget::new(hop).with_reward(reward);
        for mut challenge in challenges {
            target.guard(&mut challenge);
            self.challenges.insert(challenge);
        }
        debug!(target_hop = %hop, guards = target.challenges().len(), "mission target added");
        self.targets.push(target);
        hop
    }

    /// Build a connection from the player's machine through `relays` to
    /// `target`, using the configured trace settings.
    ///
    /// # Errors
    ///
    /// - [`TraceError::HopNotFound`] if a relay is not on the network.
    /// - [`TraceError::InvalidHopType`] if a relay is a player machine.
    pub fn route(&self, name: &str, relays: &[HopId], target: HopId) -> Result<Connection, SessionError> {
        let mut connection =
            Connection::with_settings(name, self.config.trace.distance, self.config.trace.sensitivity);
        for &id in relays {
            let hop = self.network.hop(id).ok_or(TraceError::HopNotFound(id))?;
            connection.add_hop(hop)?;
        }
        connection.set_start(self.home)?.set_end(target)?;
        Ok(connection)
    }

    /// Connect the player to `target` over `connection`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::TargetNotFound`] if no target sits on the hop.
    /// - [`SessionError::Trace`] if a hop is missing.
    pub fn connect(&mut self, target: HopId, connection: Connection) -> Result<(), SessionError> {
        let target = self
            .targets
            .iter_mut()
            .find(|t| t.hop() == target)
            .ok_or(SessionError::TargetNotFound(target))?;
        target.connect(connection, &mut self.network)?;
        Ok(())
    }

    /// Drop the player's connection to `target`.
    ///
    /// # Errors
    ///
    /// - [`SessionError::TargetNotFound`] if no target sits on the hop.
    /// - [`SessionError::Trace`] if a hop is missing.
    pub fn disconnect(&mut self, target: HopId) -> Result<(), SessionError> {
        let target = self
            .targets
            .iter_mut()
            .find(|t| t.hop() == target)
            .ok_or(SessionError::TargetNotFound(target))?;
        target.disconnect(&mut self.network)?;
        Ok(())
    }

    /// Start cracking `challenge` on the player's machine.
    ///
    /// # Errors
    ///
    /// Propagates [`PlayerMachine::add_task_for_challenge`] errors.
    pub fn start_cracking(&mut self, challenge: ChallengeId) -> Result<TaskId, SessionError> {
        let task = self.machine.add_task_for_challenge(
            challenge,
            &mut self.challenges,
            &self.dictionary,
            &mut self.rng,
        )?;
        Ok(task)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one synchronous tick pass.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Clock`] if the tick counter overflows.
    /// - [`SessionError::Sched`] if a task lost its challenge.
    pub fn tick(&mut self) -> Result<TickSummary, SessionError> {
        let tick = self.clock.advance()?;
        let completed_tasks = self.machine.tick(&mut self.challenges, &mut self.rng)?;

        let mut accessed = Vec::new();
        let mut detected = Vec::new();
        let mut earned = Decimal::ZERO;
        let trace_rate = self.config.trace.trace_rate;
        for target in &mut self.targets {
            if target.update_access(&self.challenges) {
                accessed.push(target.hop());
                earned = earned.saturating_add(target.reward());
            }
            if target.trace_back(trace_rate) {
                detected.push(target.hop());
            }
        }

        if earned > Decimal::ZERO {
            self.currency = self.currency.saturating_add(earned);
            info!(tick, earned = %earned, currency = %self.currency, "mission reward credited");
        }

        let pool = self.machine.pool();
        let summary = TickSummary {
            tick,
            completed_tasks,
            running_tasks: pool.tasks().len(),
            load: pool.load(),
            free_cycles: pool.free_cycles(),
            accessed,
            earned,
            currency: self.currency,
            detected,
        };
        debug!(
            tick,
            running = summary.running_tasks,
            load = %summary.load,
            completed = summary.completed_tasks.len(),
            "tick complete"
        );
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The session's configuration.
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The game clock.
    pub const fn clock(&self) -> &GameClock {
        &self.clock
    }

    /// The player's hop on the network.
    pub const fn home(&self) -> HopId {
        self.home
    }

    /// The player's machine.
    pub const fn machine(&self) -> &PlayerMachine {
        &self.machine
    }

    /// Every challenge in the world.
    pub const fn challenges(&self) -> &ChallengeRegistry {
        &self.challenges
    }

    /// The network.
    pub const fn network(&self) -> &Network {
        &self.network
    }

    /// The network, mutably (e.g. to add relays).
    pub const fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// The mission targets, in the order they were added.
    pub fn targets(&self) -> &[MissionTarget] {
        &self.targets
    }

    /// A mission target by hop, mutably (e.g. to subscribe to its events).
    pub fn target_mut(&mut self, hop: HopId) -> Option<&mut MissionTarget> {
        self.targets.iter_mut().find(|t| t.hop() == hop)
    }

    /// Whether every target has been accessed.
    pub fn all_targets_accessed(&self) -> bool {
        !self.targets.is_empty() && self.targets.iter().all(MissionTarget::is_accessible)
    }

    /// Whether any target has detected the player.
    pub fn player_detected(&self) -> bool {
        self.targets.iter().any(MissionTarget::is_detected)
    }

    /// Currency earned from accessed targets.
    pub const fn currency(&self) -> Decimal {
        self.currency
    }

    /// The session's random source, for generating challenges and hops.
    pub const fn rng_mut(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// The dictionary used for dictionary passwords.
    pub const fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use downlink_types::PasswordKind;

    use super::*;

    fn session() -> Session {
        let words: Dictionary = ["alpha", "bravo", "charlie"].into_iter().collect();
        Session::new(GameConfig::default(), words).unwrap()
    }

    #[test]
    fn machine_follows_config() {
        let mut config = GameConfig::default();
        config.machine.unit_count = 3;
        config.machine.unit_speed = dec!(15);
        let session = Session::new(config, Dictionary::default()).unwrap();
        assert_eq!(session.machine().pool().total_speed(), dec!(45));
        assert_eq!(
            session.network().hop(session.home()).unwrap().kind(),
            HopKind::Player
        );
    }

    #[test]
    fn oversized_machine_is_rejected() {
        let mut config = GameConfig::default();
        config.machine.unit_count = 5;
        let result = Session::new(config, Dictionary::default());
        assert!(matches!(
            result,
            Err(SessionError::Sched {
                source: SchedError::TooManyUnits { .. }
            })
        ));
    }

    #[test]
    fn tick_advances_clock_and_reports_pool() {
        let mut session = session();
        let summary = session.tick().unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.running_tasks, 0);
        assert_eq!(summary.free_cycles, dec!(20));
    }

    #[test]
    fn route_runs_from_home_to_target() {
        let mut session = session();
        let server = Computer::with_address("Server", HopKind::Mission, "9.9.9.9");
        let target = session.add_target(server, Vec::new(), dec!(0));
        let relay = session
            .network_mut()
            .insert(Computer::with_address("Relay", HopKind::Public, "1.1.1.1"));
        let connection = session.route("Run", &[relay], target).unwrap();
        assert_eq!(connection.start(), Some(session.home()));
        assert_eq!(connection.end(), Some(target));
        assert_eq!(connection.distance(), dec!(10));
    }

    #[test]
    fn unknown_target_is_reported() {
        let mut session = session();
        let connection = Connection::new("Nowhere");
        let missing = HopId::new();
        assert!(matches!(
            session.connect(missing, connection),
            Err(SessionError::TargetNotFound(_))
        ));
    }

    #[test]
    fn cracking_alerts_the_target() {
        let mut session = session();
        let server = Computer::with_address("Server", HopKind::Mission, "9.9.9.9");
        let password = Challenge::password("charlie", PasswordKind::Dictionary, dec!(1));
        let password_id = password.id();
        let target = session.add_target(server, vec![password], dec!(250));
        session.start_cracking(password_id).unwrap();

        let summary = session.tick().unwrap();
        assert!(session.targets().first().unwrap().is_alerted());
        assert_eq!(summary.accessed, vec![target]);
        assert_eq!(summary.earned, dec!(250));
        assert_eq!(summary.currency, dec!(250));
        assert!(session.all_targets_accessed());

        let summary = session.tick().unwrap();
        assert_eq!(summary.earned, dec!(0));
        assert_eq!(session.currency(), dec!(250));
    }
}
