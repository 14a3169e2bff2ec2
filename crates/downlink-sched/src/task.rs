//! Tasks: units of work a CPU pool allocates cycles to.
//!
//! A [`Task`] carries the scheduling contract shared by every kind of work:
//! a fixed minimum cycle requirement, the current per-tick assignment, a
//! tick counter, and the working/completed flags. What the cycles are spent
//! on each tick is delegated to its [`Cracker`].
//!
//! A task refers to its challenge by [`ChallengeId`] only. The challenge is
//! looked up in a [`ChallengeRegistry`] whenever the task ticks or
//! completes, so dropping the challenge never leaves a dangling owner.

use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, info};

use downlink_events::{Event, EventBus};
use downlink_types::{ChallengeId, PasswordKind, TaskId};

use crate::challenge::{Challenge, ChallengeKind, ChallengeRegistry, Dictionary};
use crate::crackers::{
    Cracker, DICTIONARY_CRACKER_MINIMUM_CYCLES, DictionaryCracker, EncryptionCracker,
    SEQUENTIAL_CRACKER_MINIMUM_CYCLES, SequentialAttacker,
};
use crate::error::SchedError;

/// Minimum cycles per tick for a task that does not declare one.
pub const DEFAULT_MINIMUM_CYCLES: u32 = 10;

/// Events announced by a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// The task has finished its work.
    Complete {
        /// The task that completed.
        task: TaskId,
    },
}

impl Event for TaskEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Complete { .. } => "complete",
        }
    }
}

/// A unit of schedulable work bound to one challenge.
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    name: String,
    minimum_required_cycles: Decimal,
    cycles_per_tick: Decimal,
    ticks_taken: u64,
    working: bool,
    completed: bool,
    challenge: ChallengeId,
    cracker: Cracker,
    events: EventBus<TaskEvent>,
}

impl Task {
    /// Create a task for `challenge`. The minimum defaults to
    /// [`DEFAULT_MINIMUM_CYCLES`] when `None`.
    pub fn new(
        name: impl Into<String>,
        challenge: ChallengeId,
        minimum_required_cycles: Option<Decimal>,
        cracker: Cracker,
    ) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            minimum_required_cycles: minimum_required_cycles
                .unwrap_or_else(|| Decimal::from(DEFAULT_MINIMUM_CYCLES)),
            cycles_per_tick: Decimal::ZERO,
            ticks_taken: 0,
            working: false,
            completed: false,
            challenge,
            cracker,
            events: EventBus::new(),
        }
    }

    /// Build the right kind of task for `challenge` and bind it.
    ///
    /// | Challenge | Task | Minimum |
    /// |-----------|------|---------|
    /// | Dictionary password | Dictionary Cracker | 5 |
    /// | Alphanumeric password | Sequential Cracker | 20 |
    /// | Encryption grid | Encryption Cracker | difficulty |
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::InvalidTask`] if the challenge is already
    /// solved.
    pub fn for_challenge<R: Rng + ?Sized>(
        challenge: &mut Challenge,
        dictionary: &Dictionary,
        rng: &mut R,
    ) -> Result<Self, SchedError> {
        if challenge.is_solved() {
            return Err(SchedError::InvalidTask {
                reason: format!("{} is already solved", challenge.name()),
            });
        }

        let task = match challenge.kind().clone() {
            ChallengeKind::Password {
                kind: PasswordKind::Dictionary,
                ..
            } => Self::new(
                "Dictionary Cracker",
                challenge.id(),
                Some(Decimal::from(DICTIONARY_CRACKER_MINIMUM_CYCLES)),
                Cracker::Dictionary(DictionaryCracker::new(dictionary, rng)),
            ),
            ChallengeKind::Password {
                text,
                kind: PasswordKind::Alphanumeric,
            } => {
                let length = text.chars().count();
                Self::new(
                    "Sequential Cracker",
                    challenge.id(),
                    Some(Decimal::from(SEQUENTIAL_CRACKER_MINIMUM_CYCLES)),
                    Cracker::Sequential(SequentialAttacker::new(length)),
                )
            }
            ChallengeKind::Encryption { rows, cols } => Self::new(
                "Encryption Cracker",
                challenge.id(),
                Some(challenge.difficulty()),
                Cracker::Encryption(EncryptionCracker::new(
                    rows,
                    cols,
                    challenge.difficulty(),
                    rng,
                )),
            ),
        };

        challenge.set_task(task.id);
        debug!(task = %task.id, name = %task.name, challenge = %challenge.id(), "task created");
        Ok(task)
    }

    // -----------------------------------------------------------------------
    // Cycle assignment
    // -----------------------------------------------------------------------

    /// Assign `cycles` per tick.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::OverloadAssignment`] if `cycles` is below the
    /// task's minimum. The assignment is left unchanged.
    pub fn set_cycles_per_tick(&mut self, cycles: Decimal) -> Result<(), SchedError> {
        if cycles < self.minimum_required_cycles {
            return Err(SchedError::OverloadAssignment {
                task: self.name.clone(),
                requested: cycles,
                minimum: self.minimum_required_cycles,
            });
        }
        self.cycles_per_tick = cycles;
        debug!(task = %self.id, cycles = %cycles, "cycles assigned");
        Ok(())
    }

    /// Add `cycles` to the current assignment.
    pub fn add_cycles(&mut self, cycles: Decimal) {
        self.cycles_per_tick = self.cycles_per_tick.saturating_add(cycles);
        debug!(task = %self.id, added = %cycles, cycles = %self.cycles_per_tick, "cycles added");
    }

    /// Give back up to `request` cycles and return how many were released.
    ///
    /// When the assignment cannot cover `request` on top of the minimum,
    /// the task halves itself instead (releasing `floor(cycles / 2)`), or
    /// releases nothing at one cycle or less. Halving can leave the task
    /// below its minimum.
    pub fn free_cycles(&mut self, request: Decimal) -> Decimal {
        let threshold = request.saturating_add(self.minimum_required_cycles);
        let released = if self.cycles_per_tick <= threshold {
            if self.cycles_per_tick > Decimal::ONE {
                self.cycles_per_tick
                    .checked_div(Decimal::TWO)
                    .map_or(Decimal::ZERO, |half| half.floor())
            } else {
                Decimal::ZERO
            }
        } else {
            request
        };
        self.cycles_per_tick = self.cycles_per_tick.saturating_sub(released);
        debug!(
            task = %self.id,
            request = %request,
            released = %released,
            cycles = %self.cycles_per_tick,
            "cycles freed"
        );
        released
    }

    /// Put back an assignment captured before a failed rebalance.
    pub(crate) const fn restore_cycles(&mut self, cycles: Decimal) {
        self.cycles_per_tick = cycles;
    }

    // -----------------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------------

    /// Run one tick of work against the bound challenge.
    ///
    /// Returns whether the task is complete after this tick.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::ChallengeNotFound`] if the challenge is no
    /// longer in the registry.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        challenges: &mut ChallengeRegistry,
        rng: &mut R,
    ) -> Result<bool, SchedError> {
        self.ticks_taken = self.ticks_taken.saturating_add(1);
        self.working = true;
        if self.completed {
            return Ok(true);
        }

        let challenge = challenges
            .get_mut(self.challenge)
            .ok_or(SchedError::ChallengeNotFound(self.challenge))?;
        if self.cracker.advance(self.cycles_per_tick, challenge, rng) {
            self.complete_against(challenge);
        }
        Ok(self.completed)
    }

    /// Mark the task complete, announce it, and solve the bound challenge.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::ChallengeNotFound`] if the challenge is no
    /// longer in the registry.
    pub fn signal_complete(&mut self, challenges: &mut ChallengeRegistry) -> Result<(), SchedError> {
        let challenge = challenges
            .get_mut(self.challenge)
            .ok_or(SchedError::ChallengeNotFound(self.challenge))?;
        self.complete_against(challenge);
        Ok(())
    }

    fn complete_against(&mut self, challenge: &mut Challenge) {
        self.working = false;
        self.completed = true;
        info!(task = %self.id, name = %self.name, ticks = self.ticks_taken, "task complete");
        self.events.trigger(&TaskEvent::Complete { task: self.id });
        if !challenge.is_solved() {
            challenge.solve();
        }
    }

    /// Cosmetic progress fraction, from 0 to 1.
    pub fn percentage(&self) -> Decimal {
        self.cracker.percentage()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The task's identifier.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Display name, e.g. `"Dictionary Cracker"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cycles per tick the task cannot run without.
    pub const fn minimum_required_cycles(&self) -> Decimal {
        self.minimum_required_cycles
    }

    /// Cycles currently assigned per tick.
    pub const fn cycles_per_tick(&self) -> Decimal {
        self.cycles_per_tick
    }

    /// Ticks run so far.
    pub const fn ticks_taken(&self) -> u64 {
        self.ticks_taken
    }

    /// Whether the task has ticked and not yet completed.
    pub const fn is_working(&self) -> bool {
        self.working
    }

    /// Whether the task has completed.
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// The challenge this task works on.
    pub const fn challenge(&self) -> ChallengeId {
        self.challenge
    }

    /// The variant logic.
    pub const fn cracker(&self) -> &Cracker {
        &self.cracker
    }

    /// Subscribe to this task's events.
    pub fn events_mut(&mut self) -> &mut EventBus<TaskEvent> {
        &mut self.events
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rust_decimal_macros::dec;

    use super::*;

    fn task_with_minimum(minimum: Decimal) -> Task {
        Task::new(
            "Test Task",
            ChallengeId::new(),
            Some(minimum),
            Cracker::Sequential(SequentialAttacker::new(1)),
        )
    }

    #[test]
    fn default_minimum_is_ten() {
        let task = Task::new(
            "Plain",
            ChallengeId::new(),
            None,
            Cracker::Sequential(SequentialAttacker::new(1)),
        );
        assert_eq!(task.minimum_required_cycles(), dec!(10));
        assert_eq!(task.cycles_per_tick(), dec!(0));
    }

    #[test]
    fn assignment_below_minimum_is_rejected() {
        let mut task = task_with_minimum(dec!(10));
        let result = task.set_cycles_per_tick(dec!(9));
        assert!(matches!(result, Err(SchedError::OverloadAssignment { .. })));
        assert_eq!(task.cycles_per_tick(), dec!(0));
        task.set_cycles_per_tick(dec!(10)).unwrap();
        assert_eq!(task.cycles_per_tick(), dec!(10));
    }

    #[test]
    fn free_cycles_halves_when_request_would_breach_minimum() {
        let mut task = task_with_minimum(dec!(10));
        task.set_cycles_per_tick(dec!(12)).unwrap();
        assert_eq!(task.free_cycles(dec!(5)), dec!(6));
        assert_eq!(task.cycles_per_tick(), dec!(6));
    }

    #[test]
    fn free_cycles_releases_request_when_affordable() {
        let mut task = task_with_minimum(dec!(5));
        task.set_cycles_per_tick(dec!(20)).unwrap();
        assert_eq!(task.free_cycles(dec!(10)), dec!(10));
        assert_eq!(task.cycles_per_tick(), dec!(10));
    }

    #[test]
    fn free_cycles_releases_nothing_at_one_cycle() {
        let mut task = task_with_minimum(dec!(1));
        task.set_cycles_per_tick(dec!(1)).unwrap();
        assert_eq!(task.free_cycles(dec!(3)), dec!(0));
        assert_eq!(task.cycles_per_tick(), dec!(1));
    }

    #[test]
    fn factory_selects_variant_by_challenge_kind() {
        let mut rng = SmallRng::seed_from_u64(4);
        let dictionary: Dictionary = ["alpha", "beta"].into_iter().collect();

        let mut words = Challenge::password("beta", PasswordKind::Dictionary, dec!(3));
        let task = Task::for_challenge(&mut words, &dictionary, &mut rng).unwrap();
        assert_eq!(task.name(), "Dictionary Cracker");
        assert_eq!(task.minimum_required_cycles(), dec!(5));
        assert_eq!(words.task(), Some(task.id()));

        let mut code = Challenge::password("abc12", PasswordKind::Alphanumeric, dec!(5));
        let task = Task::for_challenge(&mut code, &dictionary, &mut rng).unwrap();
        assert_eq!(task.name(), "Sequential Cracker");
        assert_eq!(task.minimum_required_cycles(), dec!(20));

        let mut grid = Challenge::encryption("Linear", 8, 9, dec!(8));
        let task = Task::for_challenge(&mut grid, &dictionary, &mut rng).unwrap();
        assert_eq!(task.name(), "Encryption Cracker");
        assert_eq!(task.minimum_required_cycles(), dec!(8));
    }

    #[test]
    fn factory_rejects_solved_challenge() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut grid = Challenge::encryption("Linear", 2, 2, dec!(2));
        grid.solve();
        let result = Task::for_challenge(&mut grid, &Dictionary::default(), &mut rng);
        assert!(matches!(result, Err(SchedError::InvalidTask { .. })));
        assert_eq!(grid.task(), None);
    }

    #[test]
    fn tick_completes_and_solves_challenge() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut challenges = ChallengeRegistry::new();
        let mut challenge = Challenge::password("gamma", PasswordKind::Dictionary, dec!(1));
        let dictionary: Dictionary = ["alpha", "beta", "gamma"].into_iter().collect();
        let mut task = Task::for_challenge(&mut challenge, &dictionary, &mut rng).unwrap();
        let id = challenges.insert(challenge);

        let completions = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&completions);
        task.events_mut().on("complete", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        task.set_cycles_per_tick(dec!(5)).unwrap();
        assert!(task.tick(&mut challenges, &mut rng).unwrap());
        assert!(task.is_completed());
        assert!(!task.is_working());
        assert_eq!(task.ticks_taken(), 1);
        assert!(challenges.get(id).unwrap().is_solved());
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sequential_length_follows_password_text() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut challenges = ChallengeRegistry::new();
        let mut challenge = Challenge::password("ab", PasswordKind::Alphanumeric, dec!(3));
        let mut task =
            Task::for_challenge(&mut challenge, &Dictionary::default(), &mut rng).unwrap();
        let id = challenges.insert(challenge);

        // 62 * 62 guesses cover every two-symbol string.
        task.set_cycles_per_tick(dec!(3844)).unwrap();
        assert!(task.tick(&mut challenges, &mut rng).unwrap());
        assert!(challenges.get(id).unwrap().is_solved());
    }

    #[test]
    fn tick_without_challenge_is_an_error() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut task = task_with_minimum(dec!(1));
        let result = task.tick(&mut ChallengeRegistry::new(), &mut rng);
        assert!(matches!(result, Err(SchedError::ChallengeNotFound(_))));
    }
}
