//! Challenges: the work items a task is scheduled to crack.
//!
//! A [`Challenge`] is either a password or an encryption grid. It exposes a
//! difficulty, a solved flag, the id of the task bound to it, and an
//! [`EventBus`] that announces [`ChallengeEvent::Start`] when an attack
//! begins and [`ChallengeEvent::Solved`] when it falls.
//!
//! Challenges live in a [`ChallengeRegistry`] that is passed by reference to
//! whoever needs to look one up. Tasks only remember a [`ChallengeId`], so a
//! task never owns the challenge's lifecycle.
//!
//! The word list used for dictionary passwords is an explicit [`Dictionary`]
//! value rather than a global, for the same reason.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use tracing::debug;

use downlink_events::{Event, EventBus};
use downlink_types::{ChallengeId, EncryptionTier, PasswordKind, TaskId};

use crate::error::SchedError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Easiest dictionary password difficulty.
pub const DICTIONARY_EASIEST: u32 = 1;

/// Hardest dictionary password difficulty.
pub const DICTIONARY_HARDEST: u32 = 10;

/// Shortest generated alphanumeric password.
pub const ALPHANUMERIC_MIN_LENGTH: usize = 5;

/// Longest generated alphanumeric password.
pub const ALPHANUMERIC_MAX_LENGTH: usize = 9;

// ---------------------------------------------------------------------------
// Alphabet
// ---------------------------------------------------------------------------

/// The 62-symbol search space used by brute-force attacks and cell glyphs.
///
/// Digits come first, followed by the letters with upper and lower case
/// interleaved (`A a B b ... Z z`).
pub struct Alphabet;

impl Alphabet {
    /// The symbols, in search order.
    pub const SYMBOLS: &'static [u8] =
        b"0123456789AaBbCcDdEeFfGgHhIiJjKkLlMmNnOoPpQqRrSsTtUuVvWwXxYyZz";

    /// Number of symbols in the alphabet.
    pub const fn len() -> usize {
        Self::SYMBOLS.len()
    }

    /// Symbol at `index`, if in range.
    pub fn symbol(index: usize) -> Option<char> {
        Self::SYMBOLS.get(index).map(|&b| char::from(b))
    }

    /// A uniformly random symbol.
    pub fn random_letter<R: Rng + ?Sized>(rng: &mut R) -> char {
        Self::SYMBOLS.choose(rng).map_or('0', |&b| char::from(b))
    }
}

// ---------------------------------------------------------------------------
// Dictionary
// ---------------------------------------------------------------------------

/// The word list dictionary passwords are drawn from and attacked with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    words: Vec<String>,
}

impl Dictionary {
    /// Create a dictionary from a list of words.
    pub const fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    /// All words, in their stored order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Number of words.
    pub const fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the dictionary has no words.
    pub const fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Dictionary {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// Challenge
// ---------------------------------------------------------------------------

/// Events announced by a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeEvent {
    /// An attack against the challenge has started (fires on every attempt).
    Start,
    /// The challenge has been solved.
    Solved,
}

impl Event for ChallengeEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Solved => "solved",
        }
    }
}

/// What kind of puzzle a challenge is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeKind {
    /// A password, cracked by guessing its text.
    Password {
        /// The secret text.
        text: String,
        /// Dictionary word or alphanumeric string.
        kind: PasswordKind,
    },
    /// An encryption grid, cracked cell by cell.
    Encryption {
        /// Number of grid rows.
        rows: u32,
        /// Number of grid columns.
        cols: u32,
    },
}

/// A work item a task can be bound to.
#[derive(Debug)]
pub struct Challenge {
    id: ChallengeId,
    name: String,
    difficulty: Decimal,
    solved: bool,
    task: Option<TaskId>,
    kind: ChallengeKind,
    events: EventBus<ChallengeEvent>,
}

impl Challenge {
    fn with_kind(name: String, difficulty: Decimal, kind: ChallengeKind) -> Self {
        Self {
            id: ChallengeId::new(),
            name,
            difficulty,
            solved: false,
            task: None,
            kind,
            events: EventBus::new(),
        }
    }

    /// Create a password challenge.
    pub fn password(text: impl Into<String>, kind: PasswordKind, difficulty: Decimal) -> Self {
        Self::with_kind(
            format!("{} Password", kind.label()),
            difficulty,
            ChallengeKind::Password {
                text: text.into(),
                kind,
            },
        )
    }

    /// Create an encryption challenge with an explicit difficulty.
    ///
    /// `label` prefixes the name, e.g. `"Linear"` gives `"Linear Encryption"`.
    pub fn encryption(label: &str, rows: u32, cols: u32, difficulty: Decimal) -> Self {
        Self::with_kind(
            format!("{label} Encryption"),
            difficulty,
            ChallengeKind::Encryption { rows, cols },
        )
    }

    /// Create an encryption challenge whose difficulty is derived from its
    /// size: `floor(sqrt(rows * cols))`.
    pub fn encryption_grid(tier: EncryptionTier, rows: u32, cols: u32) -> Self {
        let ratio = rows.checked_mul(cols).map_or(0, u32::isqrt);
        Self::encryption(tier.label(), rows, cols, Decimal::from(ratio))
    }

    /// Generate a dictionary password.
    ///
    /// The difficulty is clamped to `1..=10`. Harder passwords draw from a
    /// larger slice of the dictionary: an entry is a candidate when
    /// `index % 10 >= 10 - difficulty`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedError::EmptyDictionary`] if no entry qualifies.
    pub fn dictionary_password<R: Rng + ?Sized>(
        difficulty: u32,
        dictionary: &Dictionary,
        rng: &mut R,
    ) -> Result<Self, SchedError> {
        let difficulty = difficulty.clamp(DICTIONARY_EASIEST, DICTIONARY_HARDEST);
        let reduction = DICTIONARY_HARDEST.saturating_sub(difficulty);
        let hardest = usize::try_from(DICTIONARY_HARDEST).unwrap_or(10);
        let reduction = usize::try_from(reduction).unwrap_or(0);

        let candidates: Vec<&String> = dictionary
            .words()
            .iter()
            .enumerate()
            .filter(|(index, _)| index.checked_rem(hardest).unwrap_or(0) >= reduction)
            .map(|(_, word)| word)
            .collect();

        let word = candidates.choose(rng).ok_or(SchedError::EmptyDictionary)?;
        Ok(Self::password(
            (*word).clone(),
            PasswordKind::Dictionary,
            Decimal::from(difficulty),
        ))
    }

    /// Generate an alphanumeric password of 5 to 9 random symbols. The
    /// difficulty is the password's length.
    pub fn alphanumeric_password<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let length = rng.random_range(ALPHANUMERIC_MIN_LENGTH..=ALPHANUMERIC_MAX_LENGTH);
        let text: String = (0..length).map(|_| Alphabet::random_letter(rng)).collect();
        Self::password(text, PasswordKind::Alphanumeric, Decimal::from(length))
    }

    /// Generate an encryption grid sized by `tier`.
    pub fn generate_encryption<R: Rng + ?Sized>(tier: EncryptionTier, rng: &mut R) -> Self {
        let (min, max) = tier.size_range();
        let rows = rng.random_range(min..max);
        let cols = rng.random_range(min..max);
        Self::encryption_grid(tier, rows, cols)
    }

    /// The challenge's identifier.
    pub const fn id(&self) -> ChallengeId {
        self.id
    }

    /// Display name, e.g. `"Dictionary Password"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Abstract difficulty of the challenge.
    pub const fn difficulty(&self) -> Decimal {
        self.difficulty
    }

    /// Whether the challenge has been solved.
    pub const fn is_solved(&self) -> bool {
        self.solved
    }

    /// The kind of puzzle.
    pub const fn kind(&self) -> &ChallengeKind {
        &self.kind
    }

    /// The task bound to this challenge, if any.
    pub const fn task(&self) -> Option<TaskId> {
        self.task
    }

    /// Bind a task to this challenge.
    pub const fn set_task(&mut self, task: TaskId) -> &mut Self {
        self.task = Some(task);
        self
    }

    /// Unbind the current task, e.g. after a rejected admission.
    pub const fn clear_task(&mut self) -> &mut Self {
        self.task = None;
        self
    }

    /// Subscribe to this challenge's events.
    pub fn events_mut(&mut self) -> &mut EventBus<ChallengeEvent> {
        &mut self.events
    }

    /// Announce that an attack has started.
    pub fn signal_start(&mut self) {
        self.events.trigger(&ChallengeEvent::Start);
    }

    /// Try a password guess. Announces [`ChallengeEvent::Start`] and returns
    /// whether the guess matches. Encryption challenges never match.
    pub fn attack(&mut self, guess: &str) -> bool {
        self.signal_start();
        match &self.kind {
            ChallengeKind::Password { text, .. } => text == guess,
            ChallengeKind::Encryption { .. } => false,
        }
    }

    /// Mark the challenge solved and announce it.
    pub fn solve(&mut self) {
        self.solved = true;
        debug!(challenge = %self.id, name = %self.name, "challenge solved");
        self.events.trigger(&ChallengeEvent::Solved);
    }
}

// ---------------------------------------------------------------------------
// ChallengeRegistry
// ---------------------------------------------------------------------------

/// Every live challenge, keyed by id.
#[derive(Debug, Default)]
pub struct ChallengeRegistry {
    challenges: BTreeMap<ChallengeId, Challenge>,
}

impl ChallengeRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            challenges: BTreeMap::new(),
        }
    }

    /// Add a challenge and return its id.
    pub fn insert(&mut self, challenge: Challenge) -> ChallengeId {
        let id = challenge.id();
        self.challenges.insert(id, challenge);
        id
    }

    /// Look up a challenge.
    pub fn get(&self, id: ChallengeId) -> Option<&Challenge> {
        self.challenges.get(&id)
    }

    /// Look up a challenge mutably.
    pub fn get_mut(&mut self, id: ChallengeId) -> Option<&mut Challenge> {
        self.challenges.get_mut(&id)
    }

    /// Remove a challenge, returning it.
    pub fn remove(&mut self, id: ChallengeId) -> Option<Challenge> {
        self.challenges.remove(&id)
    }

    /// Number of challenges.
    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    /// Iterate over all challenges in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.values()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
