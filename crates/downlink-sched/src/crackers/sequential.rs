//! Sequential brute force over the alphanumeric alphabet.
//!
//! Guesses enumerate every string of the password's advertised length in
//! odometer order: the last position spins fastest, and each position walks
//! the alphabet from `0` to `z`.

use rust_decimal::Decimal;

use crate::challenge::{Alphabet, Challenge};

/// Minimum cycles per tick a sequential attacker needs.
pub const SEQUENTIAL_CRACKER_MINIMUM_CYCLES: u32 = 20;

/// Brute-forces a fixed-length alphanumeric password in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialAttacker {
    /// Alphabet index at each position of the next guess.
    odometer: Vec<usize>,
    /// Set once every string of the length has been tried.
    exhausted: bool,
    /// Guesses made so far.
    guesses: u64,
    /// The most recent guess.
    current_guess: Option<String>,
}

impl SequentialAttacker {
    /// Create an attacker for passwords of `length` symbols (at least one).
    pub fn new(length: usize) -> Self {
        Self {
            odometer: vec![0; length.max(1)],
            exhausted: false,
            guesses: 0,
            current_guess: None,
        }
    }

    /// Length of the strings being enumerated.
    pub fn length(&self) -> usize {
        self.odometer.len()
    }

    /// Make up to `budget` guesses, stopping early on a hit or once the
    /// search space is exhausted. Returns `true` when the password is cracked.
    pub fn advance(&mut self, budget: u64, challenge: &mut Challenge) -> bool {
        if challenge.is_solved() {
            return true;
        }
        for _ in 0..budget {
            if self.exhausted {
                break;
            }
            let guess = self.render();
            self.guesses = self.guesses.saturating_add(1);
            self.step();
            let hit = challenge.attack(&guess);
            self.current_guess = Some(guess);
            if hit {
                return true;
            }
        }
        false
    }

    /// Total guesses made so far.
    pub const fn total_guesses(&self) -> u64 {
        self.guesses
    }

    /// The most recent guess, for display.
    pub fn current_guess(&self) -> Option<&str> {
        self.current_guess.as_deref()
    }

    /// Fraction of the search space covered.
    pub fn percentage(&self) -> Decimal {
        let symbols = Decimal::from(Alphabet::len());
        let space = self
            .odometer
            .iter()
            .try_fold(Decimal::ONE, |acc, _| acc.checked_mul(symbols));
        space
            .and_then(|space| Decimal::from(self.guesses).checked_div(space))
            .unwrap_or(Decimal::ZERO)
    }

    fn render(&self) -> String {
        self.odometer
            .iter()
            .map(|&index| Alphabet::symbol(index).unwrap_or('0'))
            .collect()
    }

    /// Advance the odometer by one, flagging exhaustion on wrap-around.
    fn step(&mut self) {
        let last = Alphabet::len().saturating_sub(1);
        for digit in self.odometer.iter_mut().rev() {
            if *digit < last {
                *digit = digit.saturating_add(1);
                return;
            }
            *digit = 0;
        }
        self.exhausted = true;
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use downlink_types::PasswordKind;

    use super::*;

    #[test]
    fn enumerates_in_odometer_order() {
        let mut attacker = SequentialAttacker::new(2);
        let mut challenge = Challenge::password("zz", PasswordKind::Alphanumeric, dec!(2));
        assert!(!attacker.advance(1, &mut challenge));
        assert_eq!(attacker.current_guess(), Some("00"));
        assert!(!attacker.advance(62, &mut challenge));
        assert_eq!(attacker.current_guess(), Some("10"));
    }

    #[test]
    fn cracks_single_symbol_password() {
        let mut attacker = SequentialAttacker::new(1);
        // 'A' is the eleventh symbol.
        let mut challenge = Challenge::password("A", PasswordKind::Alphanumeric, dec!(1));
        assert!(!attacker.advance(10, &mut challenge));
        assert!(attacker.advance(10, &mut challenge));
        assert_eq!(attacker.total_guesses(), 11);
    }

    #[test]
    fn exhaustion_stops_guessing() {
        let mut attacker = SequentialAttacker::new(1);
        let mut challenge = Challenge::password("!", PasswordKind::Alphanumeric, dec!(1));
        assert!(!attacker.advance(100, &mut challenge));
        assert_eq!(attacker.total_guesses(), 62);
        assert_eq!(attacker.percentage(), Decimal::ONE);
        assert!(!attacker.advance(100, &mut challenge));
        assert_eq!(attacker.total_guesses(), 62);
    }

    #[test]
    fn zero_length_is_raised_to_one() {
        assert_eq!(SequentialAttacker::new(0).length(), 1);
    }
}
