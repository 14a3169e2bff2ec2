//! Cracker variants: the per-tick progress logic of each kind of task.
//!
//! A [`Cracker`] is the variant half of a [`Task`](crate::task::Task). The
//! task owns the shared contract (cycle assignment, tick counting,
//! completion); the cracker decides how the assigned cycles are spent
//! against the bound challenge each tick.
//!
//! - [`DictionaryCracker`] -- guesses words from a shuffled word list.
//! - [`SequentialAttacker`] -- brute-forces alphanumeric strings in order.
//! - [`EncryptionCracker`] -- solves random cells of an encryption grid.

pub mod dictionary;
pub mod encryption;
pub mod sequential;

pub use dictionary::{DICTIONARY_CRACKER_MINIMUM_CYCLES, DictionaryCracker};
pub use encryption::{EncryptionCell, EncryptionCracker};
pub use sequential::{SEQUENTIAL_CRACKER_MINIMUM_CYCLES, SequentialAttacker};

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::challenge::Challenge;

/// The progress logic a task runs each tick, selected by challenge kind.
#[derive(Debug, Clone)]
pub enum Cracker {
    /// Dictionary attack against a dictionary password.
    Dictionary(DictionaryCracker),
    /// Sequential brute force against an alphanumeric password.
    Sequential(SequentialAttacker),
    /// Cell-by-cell attack against an encryption grid.
    Encryption(EncryptionCracker),
}

impl Cracker {
    /// Spend one tick's worth of `cycles` against `challenge`.
    ///
    /// Returns `true` once the challenge is cracked.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        cycles: Decimal,
        challenge: &mut Challenge,
        rng: &mut R,
    ) -> bool {
        match self {
            Self::Dictionary(cracker) => cracker.advance(guess_budget(cycles), challenge),
            Self::Sequential(cracker) => cracker.advance(guess_budget(cycles), challenge),
            Self::Encryption(cracker) => cracker.advance(cycles, challenge, rng),
        }
    }

    /// Fraction of the search space covered, from 0 to 1.
    pub fn percentage(&self) -> Decimal {
        match self {
            Self::Dictionary(cracker) => cracker.percentage(),
            Self::Sequential(cracker) => cracker.percentage(),
            Self::Encryption(cracker) => cracker.percentage(),
        }
    }
}

/// Whole guesses a password cracker may make with `cycles` in one tick.
pub(crate) fn guess_budget(cycles: Decimal) -> u64 {
    cycles.floor().to_u64().unwrap_or(0)
}
