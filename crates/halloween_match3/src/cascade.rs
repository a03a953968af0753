//! Cascade resolution: clear matches, apply gravity, refill, repeat.
//!
//! Resolution is an explicit loop of discrete settle passes. Callers that
//! animate can drive a [`Cascade`] one pass at a time; everyone else calls
//! [`CascadeResolver::resolve`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::board::Board;
use crate::invariants::assert_board_invariants;
use crate::matcher::find_matches;

/// Points awarded per matched piece, per pass.
pub const POINTS_PER_PIECE: u32 = 10;

/// Default upper bound on passes within one resolution.
pub const DEFAULT_MAX_PASSES: usize = 100;

/// One settle pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadePass {
    /// Pieces cleared in this pass.
    pub matched: usize,
    /// Points earned in this pass.
    pub points: u32,
}

/// Result of driving a [`Cascade`] one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
    /// A pass cleared pieces; the board may now hold new matches.
    Pass(CascadePass),
    /// The board is stable.
    Settled,
}

/// Summary of a complete resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeOutcome {
    passes: Vec<CascadePass>,
    score_delta: u32,
    rerolled: bool,
}

impl CascadeOutcome {
    /// Every pass in order.
    pub fn passes(&self) -> &[CascadePass] {
        &self.passes
    }

    /// Total points across all passes.
    pub fn score_delta(&self) -> u32 {
        self.score_delta
    }

    /// True if the pass cap was hit and the board had to be redrawn.
    pub fn rerolled(&self) -> bool {
        self.rerolled
    }
}

/// Resolution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeResolver {
    max_passes: usize,
}

impl CascadeResolver {
    /// Creates a resolver with [`DEFAULT_MAX_PASSES`].
    pub fn new() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Creates a resolver with a custom pass cap (at least one pass).
    pub fn with_max_passes(max_passes: usize) -> Self {
        Self {
            max_passes: max_passes.max(1),
        }
    }

    /// Starts an in-flight resolution.
    pub fn begin(&self) -> Cascade {
        Cascade {
            outcome: CascadeOutcome::default(),
            max_passes: self.max_passes,
            settled: false,
        }
    }

    /// Resolves `board` until no match remains.
    #[instrument(skip(self, board, rng))]
    pub fn resolve<R: Rng + ?Sized>(&self, board: &mut Board, rng: &mut R) -> CascadeOutcome {
        let mut cascade = self.begin();
        while let CascadeStep::Pass(_) = cascade.step(board, rng) {}
        cascade.finish()
    }
}

impl Default for CascadeResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// A resolution in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    outcome: CascadeOutcome,
    max_passes: usize,
    settled: bool,
}

impl Cascade {
    /// Runs one settle pass.
    ///
    /// Returns [`CascadeStep::Settled`] once the board holds no match; every
    /// later call keeps returning it. If the pass cap is reached first, the
    /// board is redrawn to restore the invariant and the cascade settles.
    #[instrument(skip(self, board, rng), fields(pass = self.outcome.passes.len() + 1))]
    pub fn step<R: Rng + ?Sized>(&mut self, board: &mut Board, rng: &mut R) -> CascadeStep {
        if self.settled {
            return CascadeStep::Settled;
        }

        let matches = find_matches(board);
        if matches.is_empty() {
            self.settled = true;
            assert_board_invariants(board);
            debug!(
                passes = self.outcome.passes.len(),
                score_delta = self.outcome.score_delta,
                "Cascade settled"
            );
            return CascadeStep::Settled;
        }

        if self.outcome.passes.len() >= self.max_passes {
            warn!(max_passes = self.max_passes, "Cascade pass cap reached, redrawing board");
            board.regenerate(rng);
            self.outcome.rerolled = true;
            self.settled = true;
            return CascadeStep::Settled;
        }

        let pass = CascadePass {
            matched: matches.len(),
            points: matches.len() as u32 * POINTS_PER_PIECE,
        };
        board.mark_matched(&matches);
        board.collapse(rng);

        self.outcome.score_delta += pass.points;
        self.outcome.passes.push(pass);
        debug!(matched = pass.matched, points = pass.points, "Cascade pass cleared");
        CascadeStep::Pass(pass)
    }

    /// True once the board is stable.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Points earned so far.
    pub fn score_so_far(&self) -> u32 {
        self.outcome.score_delta
    }

    /// Consumes the cascade, returning its summary.
    pub fn finish(self) -> CascadeOutcome {
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{BOARD_SIZE, Cell, PieceKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_stable_board_returns_unchanged() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut board = Board::generate(&mut rng);
        let before = board.clone();

        let outcome = CascadeResolver::new().resolve(&mut board, &mut rng);

        assert_eq!(board, before);
        assert_eq!(outcome.score_delta(), 0);
        assert!(outcome.passes().is_empty());
    }

    #[test]
    fn test_first_pass_scores_ten_per_piece() {
        let mut kinds = [[PieceKind::Pumpkin; BOARD_SIZE]; BOARD_SIZE];
        for (row, line) in kinds.iter_mut().enumerate() {
            for (col, kind) in line.iter_mut().enumerate() {
                *kind = PieceKind::from_index(row + 2 * col);
            }
        }
        kinds[5][0] = PieceKind::Ghost;
        kinds[5][1] = PieceKind::Ghost;
        kinds[5][2] = PieceKind::Ghost;
        let mut board = Board::from_kinds(kinds);
        let mut rng = StdRng::seed_from_u64(21);

        let outcome = CascadeResolver::new().resolve(&mut board, &mut rng);

        assert_eq!(outcome.passes()[0], CascadePass { matched: 3, points: 30 });
        assert!(outcome.score_delta() >= 30);
        assert!(!board.has_latent_match());
    }

    #[test]
    fn test_settled_cascade_stays_settled() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut board = Board::generate(&mut rng);
        let mut cascade = CascadeResolver::new().begin();
        assert_eq!(cascade.step(&mut board, &mut rng), CascadeStep::Settled);
        assert_eq!(cascade.step(&mut board, &mut rng), CascadeStep::Settled);
        assert!(cascade.is_settled());
    }

    #[test]
    fn test_pass_cap_redraws_board() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut board = Board::from_kinds([[PieceKind::Bat; BOARD_SIZE]; BOARD_SIZE]);

        let outcome = CascadeResolver::with_max_passes(1).resolve(&mut board, &mut rng);

        assert_eq!(outcome.passes()[0].matched, BOARD_SIZE * BOARD_SIZE);
        assert!(!board.has_latent_match());
        assert_eq!(board.get(Cell::new(0, 0)).cell(), Cell::new(0, 0));
    }
}
