//! The player's home machine: a CPU pool plus the tasks the player started.

use rand::Rng;
use tracing::{info, warn};

use downlink_types::{ChallengeId, MachineRecord, Point, TaskId};

use crate::challenge::{ChallengeRegistry, Dictionary};
use crate::error::SchedError;
use crate::pool::CpuPool;
use crate::task::Task;
use crate::unit::ComputeUnit;

/// Name of the player's machine.
pub const HOME_NAME: &str = "Home";

/// Loopback address of the player's machine.
pub const HOME_ADDRESS: &str = "127.0.0.1";

/// Compute unit slots on a stock machine.
pub const DEFAULT_MAX_UNITS: usize = 4;

/// The player's computer.
#[derive(Debug)]
pub struct PlayerMachine {
    name: String,
    address: String,
    location: Option<Point>,
    max_units: usize,
    pool: CpuPool,
    /// Tasks started by the player that are still running, in start order.
    mission_tasks: Vec<TaskId>,
}

impl PlayerMachine {
    /// Build the stock machine with the given units.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::TooManyUnits`] if more than
    /// [`DEFAULT_MAX_UNITS`] units are supplied.
    pub fn new(units: Vec<ComputeUnit>) -> Result<Self, SchedError> {
        Self::with_max_units(units, DEFAULT_MAX_UNITS)
    }

    /// Build a machine with `max_units` slots.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::TooManyUnits`] if `units` does not fit.
    pub fn with_max_units(units: Vec<ComputeUnit>, max_units: usize) -> Result<Self, SchedError> {
        if units.len() > max_units {
            return Err(SchedError::TooManyUnits {
                count: units.len(),
                max: max_units,
            });
        }
        Ok(Self {
            name: HOME_NAME.to_owned(),
            address: HOME_ADDRESS.to_owned(),
            location: None,
            max_units,
            pool: CpuPool::new(units),
            mission_tasks: Vec::new(),
        })
    }

    /// Restore a machine from its persisted form.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::TooManyUnits`] if the record lists more units
    /// than `max_units`.
    pub fn from_record(record: &MachineRecord, max_units: usize) -> Result<Self, SchedError> {
        let units = record.units.iter().map(ComputeUnit::from_record).collect();
        let mut machine = Self::with_max_units(units, max_units)?;
        machine.name.clone_from(&record.name);
        machine.address.clone_from(&record.address);
        machine.location = record.location;
        Ok(machine)
    }

    /// Persisted form: identity, location and units. Running tasks are not
    /// saved.
    pub fn to_record(&self) -> MachineRecord {
        MachineRecord {
            name: self.name.clone(),
            address: self.address.clone(),
            location: self.location,
            units: self.pool.units().iter().map(ComputeUnit::to_record).collect(),
        }
    }

    /// Start cracking a challenge on this machine.
    ///
    /// On failure the challenge keeps whatever task it was bound to before.
    ///
    /// # Errors
    ///
    /// - [`SchedError::ChallengeNotFound`] if `challenge` is not registered.
    /// - Any error from [`Task::for_challenge`] or [`CpuPool::add_task`].
    pub fn add_task_for_challenge<R: Rng + ?Sized>(
        &mut self,
        challenge: ChallengeId,
        challenges: &mut ChallengeRegistry,
        dictionary: &Dictionary,
        rng: &mut R,
    ) -> Result<TaskId, SchedError> {
        let target = challenges
            .get_mut(challenge)
            .ok_or(SchedError::ChallengeNotFound(challenge))?;
        let previous = target.task();
        let task = Task::for_challenge(target, dictionary, rng)?;
        match self.pool.add_task(task) {
            Ok(id) => {
                self.mission_tasks.push(id);
                info!(task = %id, challenge = %challenge, machine = %self.name, "mission task started");
                Ok(id)
            }
            Err(err) => {
                match previous {
                    Some(running) => target.set_task(running),
                    None => target.clear_task(),
                };
                warn!(challenge = %challenge, error = %err, "mission task refused");
                Err(err)
            }
        }
    }

    /// Tick the pool and forget mission tasks that completed.
    ///
    /// # Errors
    ///
    /// Propagates [`CpuPool::tick`] errors. Mission tasks released during a
    /// failed tick are forgotten all the same.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        challenges: &mut ChallengeRegistry,
        rng: &mut R,
    ) -> Result<Vec<TaskId>, SchedError> {
        let result = self.pool.tick(challenges, rng);
        let pool = &self.pool;
        self.mission_tasks.retain(|&id| pool.task(id).is_some());
        result
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Network address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Map location, if assigned.
    pub const fn location(&self) -> Option<Point> {
        self.location
    }

    /// Place the machine on the map.
    pub const fn set_location(&mut self, location: Point) {
        self.location = Some(location);
    }

    /// Compute unit slots.
    pub const fn max_units(&self) -> usize {
        self.max_units
    }

    /// The machine's CPU pool.
    pub const fn pool(&self) -> &CpuPool {
        &self.pool
    }

    /// The machine's CPU pool, mutably.
    pub const fn pool_mut(&mut self) -> &mut CpuPool {
        &mut self.pool
    }

    /// Running tasks the player started.
    pub fn mission_tasks(&self) -> &[TaskId] {
        &self.mission_tasks
    }
}
