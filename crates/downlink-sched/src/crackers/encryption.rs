//! Encryption grid attack: solve random cells as fractional progress builds.

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::challenge::{Alphabet, Challenge};

/// One cell of an encryption grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionCell {
    /// Whether the cell has been cracked.
    pub solved: bool,
    /// Cosmetic glyph, re-rolled each tick until the cell is solved.
    pub glyph: char,
}

/// Cracks an R×C encryption grid one random cell at a time.
#[derive(Debug, Clone)]
pub struct EncryptionCracker {
    rows: u32,
    cols: u32,
    difficulty: Decimal,
    cells: Vec<EncryptionCell>,
    /// Indices of cells not yet solved.
    unsolved: Vec<usize>,
    /// Fractional cells earned but not yet spent.
    progress: Decimal,
}

impl EncryptionCracker {
    /// Create a cracker for a `rows` × `cols` grid of the given difficulty.
    pub fn new<R: Rng + ?Sized>(rows: u32, cols: u32, difficulty: Decimal, rng: &mut R) -> Self {
        let size = usize::try_from(rows.saturating_mul(cols)).unwrap_or(0);
        let cells = (0..size)
            .map(|_| EncryptionCell {
                solved: false,
                glyph: Alphabet::random_letter(rng),
            })
            .collect();
        Self {
            rows,
            cols,
            difficulty,
            cells,
            unsolved: (0..size).collect(),
            progress: Decimal::ZERO,
        }
    }

    /// Spend one tick of `cycles` on the grid. Returns `true` once no
    /// unsolved cells remain.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        cycles: Decimal,
        challenge: &mut Challenge,
        rng: &mut R,
    ) -> bool {
        if challenge.is_solved() {
            return true;
        }
        for &index in &self.unsolved {
            if let Some(cell) = self.cells.get_mut(index) {
                cell.glyph = Alphabet::random_letter(rng);
            }
        }

        let to_solve = if self.difficulty <= Decimal::ZERO {
            self.unsolved.len()
        } else {
            let earned = cycles.checked_div(self.difficulty).unwrap_or(Decimal::ZERO);
            self.progress = self.progress.saturating_add(earned);
            if self.progress < Decimal::ONE {
                0
            } else {
                let whole = self.progress.floor();
                self.progress = self.progress.saturating_sub(whole);
                whole.to_usize().unwrap_or(usize::MAX)
            }
        };

        if to_solve > 0 && !self.unsolved.is_empty() {
            for _ in 0..to_solve.min(self.unsolved.len()) {
                let pick = rng.random_range(0..self.unsolved.len());
                let index = self.unsolved.swap_remove(pick);
                if let Some(cell) = self.cells.get_mut(index) {
                    cell.solved = true;
                }
            }
            challenge.signal_start();
        }

        self.unsolved.is_empty()
    }

    /// Grid rows.
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Grid columns.
    pub const fn cols(&self) -> u32 {
        self.cols
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[EncryptionCell] {
        &self.cells
    }

    /// Number of cells still unsolved.
    pub const fn unsolved_count(&self) -> usize {
        self.unsolved.len()
    }

    /// Fraction of cells solved. An empty grid counts as fully solved.
    pub fn percentage(&self) -> Decimal {
        let solved = self.cells.len().saturating_sub(self.unsolved.len());
        Decimal::from(solved)
            .checked_div(Decimal::from(self.cells.len()))
            .unwrap_or(Decimal::ONE)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn one_cell_per_tick_when_cycles_match_difficulty() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut challenge = Challenge::encryption("Linear", 2, 2, dec!(4));
        let mut cracker = EncryptionCracker::new(2, 2, dec!(4), &mut rng);
        for expected in [3, 2, 1] {
            assert!(!cracker.advance(dec!(4), &mut challenge, &mut rng));
            assert_eq!(cracker.unsolved_count(), expected);
        }
        assert!(cracker.advance(dec!(4), &mut challenge, &mut rng));
        assert_eq!(cracker.percentage(), Decimal::ONE);
        assert!(cracker.cells().iter().all(|cell| cell.solved));
    }

    #[test]
    fn fractional_progress_carries_over() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut challenge = Challenge::encryption("Linear", 3, 3, dec!(4));
        let mut cracker = EncryptionCracker::new(3, 3, dec!(4), &mut rng);
        // 3/4 per tick: nothing, then one cell with 0.5 left over.
        assert!(!cracker.advance(dec!(3), &mut challenge, &mut rng));
        assert_eq!(cracker.unsolved_count(), 9);
        assert!(!cracker.advance(dec!(3), &mut challenge, &mut rng));
        assert_eq!(cracker.unsolved_count(), 8);
        assert!(!cracker.advance(dec!(3), &mut challenge, &mut rng));
        assert_eq!(cracker.unsolved_count(), 7);
    }

    #[test]
    fn zero_difficulty_solves_everything() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut challenge = Challenge::encryption("Linear", 2, 3, dec!(0));
        let mut cracker = EncryptionCracker::new(2, 3, dec!(0), &mut rng);
        assert!(cracker.advance(dec!(1), &mut challenge, &mut rng));
    }

    #[test]
    fn cell_solves_announce_start() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let starts = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&starts);
        let mut rng = SmallRng::seed_from_u64(8);
        let mut challenge = Challenge::encryption("Linear", 2, 2, dec!(4));
        challenge.events_mut().on("start", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let mut cracker = EncryptionCracker::new(2, 2, dec!(4), &mut rng);
        cracker.advance(dec!(2), &mut challenge, &mut rng);
        assert_eq!(starts.load(Ordering::SeqCst), 0);
        cracker.advance(dec!(2), &mut challenge, &mut rng);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }
}
