//! The CPU pool: a fixed cycle budget shared among running tasks.
//!
//! The pool's capacity is the sum of its compute units' speeds. Every
//! running task reserves its minimum against that capacity (the pool's
//! *load*), so `load <= total_speed` holds after every operation.
//!
//! # Admission
//!
//! A new task is admitted only if its minimum fits in the free capacity.
//! It is then given an *ideal* share, `max(minimum, floor(total / (n + 1)))`,
//! reclaimed evenly from the `n` running tasks via [`Task::free_cycles`].
//! Running tasks may give back less than asked, in which case the newcomer
//! runs on whatever was reclaimed. If that falls below its minimum the
//! whole admission is rolled back.
//!
//! # Release
//!
//! A completed task's cycles are spread evenly (floored) over the tasks
//! still running, in order.

use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use downlink_events::{Event, EventBus};
use downlink_types::TaskId;

use crate::challenge::ChallengeRegistry;
use crate::error::SchedError;
use crate::task::Task;
use crate::unit::ComputeUnit;

/// Events announced by a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    /// A task finished and its cycles were handed back.
    TaskComplete {
        /// The task that left the pool.
        task: TaskId,
    },
}

impl Event for PoolEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::TaskComplete { .. } => "taskcomplete",
        }
    }
}

/// A set of compute units multiplexed across running tasks.
#[derive(Debug)]
pub struct CpuPool {
    units: Vec<ComputeUnit>,
    tasks: Vec<Task>,
    total_speed: Decimal,
    load: Decimal,
    events: EventBus<PoolEvent>,
}

impl CpuPool {
    /// Create a pool over `units`. The unit list is fixed from here on.
    pub fn new(units: Vec<ComputeUnit>) -> Self {
        let total_speed = units
            .iter()
            .fold(Decimal::ZERO, |acc, unit| acc.saturating_add(unit.speed()));
        Self {
            units,
            tasks: Vec::new(),
            total_speed,
            load: Decimal::ZERO,
            events: EventBus::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Admission and release
    // -----------------------------------------------------------------------

    /// Admit `task`, rebalancing the running tasks to make room.
    ///
    /// # Errors
    ///
    /// - [`SchedError::DuplicateTask`] with the running task's id if a task
    ///   is already working on the same challenge.
    /// - [`SchedError::InvalidTask`] if the task has already completed.
    /// - [`SchedError::InsufficientCapacity`] if its minimum exceeds the
    ///   free cycles.
    /// - [`SchedError::OverloadAssignment`] if the cycles reclaimed from
    ///   running tasks fall short of its minimum. Every running task's
    ///   assignment is restored first.
    pub fn add_task(&mut self, mut task: Task) -> Result<TaskId, SchedError> {
        if let Some(running) = self
            .tasks
            .iter()
            .find(|t| t.id() == task.id() || t.challenge() == task.challenge())
        {
            warn!(
                task = %task.id(),
                running = %running.id(),
                challenge = %task.challenge(),
                "admission rejected: challenge already under attack"
            );
            return Err(SchedError::DuplicateTask(running.id()));
        }
        if task.is_completed() {
            return Err(SchedError::InvalidTask {
                reason: format!("{} has already completed", task.name()),
            });
        }

        let minimum = task.minimum_required_cycles();
        let available = self.free_cycles();
        if minimum > available {
            warn!(
                task = %task.id(),
                name = %task.name(),
                required = %minimum,
                available = %available,
                "admission rejected: insufficient capacity"
            );
            return Err(SchedError::InsufficientCapacity {
                task: task.name().to_owned(),
                required: minimum,
                available,
            });
        }

        let running = self.tasks.len();
        let share = self
            .total_speed
            .checked_div(Decimal::from(running.saturating_add(1)))
            .map_or(Decimal::ZERO, |share| share.floor());
        let ideal = minimum.max(share);

        let (assignment, snapshot) = if running == 0 {
            (ideal, Vec::new())
        } else {
            let per_task = ideal
                .checked_div(Decimal::from(running))
                .map_or(Decimal::ZERO, |per| per.ceil());
            let snapshot: Vec<Decimal> = self.tasks.iter().map(Task::cycles_per_tick).collect();
            let reclaimed = self
                .tasks
                .iter_mut()
                .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.free_cycles(per_task)));
            (reclaimed, snapshot)
        };

        if let Err(err) = task.set_cycles_per_tick(assignment) {
            for (running_task, cycles) in self.tasks.iter_mut().zip(snapshot) {
                running_task.restore_cycles(cycles);
            }
            warn!(
                task = %task.id(),
                assignment = %assignment,
                minimum = %minimum,
                "admission rolled back: reclaimed cycles below minimum"
            );
            return Err(err);
        }

        let id = task.id();
        self.load = self.load.saturating_add(minimum);
        info!(
            task = %id,
            name = %task.name(),
            cycles = %assignment,
            ideal = %ideal,
            load = %self.load,
            "task admitted"
        );
        self.tasks.push(task);
        Ok(id)
    }

    /// Remove a task and hand its cycles to the tasks still running.
    ///
    /// Returns the removed task.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::TaskNotFound`] if no running task has `id`.
    pub fn complete_task(&mut self, id: TaskId) -> Result<Task, SchedError> {
        let position = self
            .tasks
            .iter()
            .position(|t| t.id() == id)
            .ok_or(SchedError::TaskNotFound(id))?;
        let task = self.tasks.remove(position);
        self.load = self.load.saturating_sub(task.minimum_required_cycles());

        let mut freed = task.cycles_per_tick();
        let remaining = self.tasks.len();
        if remaining > 0 {
            let per_task = freed
                .checked_div(Decimal::from(remaining))
                .map_or(Decimal::ZERO, |per| per.floor());
            for running in &mut self.tasks {
                if freed <= Decimal::ZERO {
                    break;
                }
                freed = freed.saturating_sub(per_task);
                running.add_cycles(per_task);
            }
            debug!(task = %id, per_task = %per_task, remaining, "cycles redistributed");
        }

        info!(task = %id, name = %task.name(), load = %self.load, "task released");
        self.events.trigger(&PoolEvent::TaskComplete { task: id });
        Ok(task)
    }

    /// Run one tick: every task in order, then release the tasks that
    /// completed, then count a tick on every unit.
    ///
    /// Returns the ids of the tasks released this tick, in order. A task
    /// that fails does not stop the pass.
    ///
    /// # Errors
    ///
    /// Returns the first task error, e.g. [`SchedError::ChallengeNotFound`]
    /// if a task's challenge has left the registry. Completed tasks are
    /// still released and units still ticked.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        challenges: &mut ChallengeRegistry,
        rng: &mut R,
    ) -> Result<Vec<TaskId>, SchedError> {
        let mut finished = Vec::new();
        let mut failure = None;
        for task in &mut self.tasks {
            match task.tick(challenges, rng) {
                Ok(true) => finished.push(task.id()),
                Ok(false) => {}
                Err(err) => {
                    warn!(task = %task.id(), error = %err, "task tick failed");
                    failure.get_or_insert(err);
                }
            }
        }
        for &id in &finished {
            self.complete_task(id)?;
        }
        for unit in &mut self.units {
            unit.tick();
        }
        failure.map_or(Ok(finished), Err)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The pool's compute units.
    pub fn units(&self) -> &[ComputeUnit] {
        &self.units
    }

    /// Running tasks, in admission order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// A running task by id.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// A running task by id, mutably (e.g. to subscribe to its events).
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id() == id)
    }

    /// Sum of unit speeds.
    pub const fn total_speed(&self) -> Decimal {
        self.total_speed
    }

    /// Mean unit speed, zero for a pool without units.
    pub fn average_speed(&self) -> Decimal {
        self.total_speed
            .checked_div(Decimal::from(self.units.len()))
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of the running tasks' minimums.
    pub const fn load(&self) -> Decimal {
        self.load
    }

    /// Capacity not reserved by running tasks.
    pub fn free_cycles(&self) -> Decimal {
        self.total_speed.saturating_sub(self.load)
    }

    /// Subscribe to this pool's events.
    pub fn events_mut(&mut self) -> &mut EventBus<PoolEvent> {
        &mut self.events
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
