//! Dictionary attack: guess words from a shuffled copy of the word list.

use rand::Rng;
use rand::seq::SliceRandom;
use rust_decimal::Decimal;

use crate::challenge::{Challenge, Dictionary};

/// Minimum cycles per tick a dictionary cracker needs.
pub const DICTIONARY_CRACKER_MINIMUM_CYCLES: u32 = 5;

/// Guesses dictionary words against a password, a tick's budget at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryCracker {
    /// Shuffled copy of the dictionary.
    words: Vec<String>,
    /// Index of the next word to try.
    next: usize,
    /// The most recent guess.
    current_guess: Option<String>,
}

impl DictionaryCracker {
    /// Create a cracker over a shuffled copy of `dictionary`.
    pub fn new<R: Rng + ?Sized>(dictionary: &Dictionary, rng: &mut R) -> Self {
        let mut words = dictionary.words().to_vec();
        words.shuffle(rng);
        Self::with_words(words)
    }

    /// Create a cracker that guesses `words` in the given order.
    pub const fn with_words(words: Vec<String>) -> Self {
        Self {
            words,
            next: 0,
            current_guess: None,
        }
    }

    /// Make up to `budget` guesses, stopping early on a hit or when the word
    /// list runs out. Returns `true` when the password is cracked.
    ///
    /// A challenge solved by other means counts as cracked without guessing.
    pub fn advance(&mut self, budget: u64, challenge: &mut Challenge) -> bool {
        if challenge.is_solved() {
            return true;
        }
        for _ in 0..budget {
            let Some(word) = self.words.get(self.next) else {
                break;
            };
            self.next = self.next.saturating_add(1);
            let hit = challenge.attack(word);
            self.current_guess = Some(word.clone());
            if hit {
                return true;
            }
        }
        false
    }

    /// Total guesses made so far.
    pub const fn total_guesses(&self) -> usize {
        self.next
    }

    /// Words not yet tried.
    pub const fn entries_left(&self) -> usize {
        self.words.len().saturating_sub(self.next)
    }

    /// The most recent guess, for display.
    pub fn current_guess(&self) -> Option<&str> {
        self.current_guess.as_deref()
    }

    /// Fraction of the word list tried.
    pub fn percentage(&self) -> Decimal {
        Decimal::from(self.next)
            .checked_div(Decimal::from(self.words.len()))
            .unwrap_or(Decimal::ZERO)
    }
}
