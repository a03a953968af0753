//! First-class board invariants.
//!
//! Invariants are logical properties that must hold whenever the player may
//! act: after generation and after every settled cascade. They are checked in
//! debug builds and are testable independently.

use std::collections::HashSet;

use tracing::{instrument, warn};

use crate::board::Board;
use crate::matcher::find_matches;
use crate::piece::BOARD_SIZE;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implemented for tuples so sets compose at the type level.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        if !I1::holds(state) {
            violations.push(InvariantViolation::new(I1::description()));
        }
        if !I2::holds(state) {
            violations.push(InvariantViolation::new(I2::description()));
        }
        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = match <(I1, I2) as InvariantSet<S>>::check_all(state) {
            Ok(()) => Vec::new(),
            Err(violations) => violations,
        };
        if !I3::holds(state) {
            violations.push(InvariantViolation::new(I3::description()));
        }
        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }
}

/// Invariant: no row or column holds three consecutive equal kinds.
pub struct NoLatentMatchInvariant;

impl Invariant<Board> for NoLatentMatchInvariant {
    fn holds(board: &Board) -> bool {
        find_matches(board).is_empty()
    }

    fn description() -> &'static str {
        "No row or column contains a run of three or more"
    }
}

/// Invariant: every piece's recorded coordinates equal the cell holding it.
pub struct CoordinatesConsistentInvariant;

impl Invariant<Board> for CoordinatesConsistentInvariant {
    fn holds(board: &Board) -> bool {
        board.rows().enumerate().all(|(row, pieces)| {
            pieces
                .iter()
                .enumerate()
                .all(|(col, piece)| piece.row() == row && piece.col() == col)
        })
    }

    fn description() -> &'static str {
        "Piece coordinates match their cells"
    }
}

/// Invariant: no two cells share a piece identity.
pub struct UniqueIdentityInvariant;

impl Invariant<Board> for UniqueIdentityInvariant {
    fn holds(board: &Board) -> bool {
        let ids: HashSet<_> = board.pieces().map(|piece| piece.id()).collect();
        ids.len() == BOARD_SIZE * BOARD_SIZE
    }

    fn description() -> &'static str {
        "Piece identities are unique"
    }
}

/// Every invariant a settled board must satisfy.
pub type BoardInvariants = (
    NoLatentMatchInvariant,
    CoordinatesConsistentInvariant,
    UniqueIdentityInvariant,
);

/// Asserts the settled-board invariants (debug builds only).
#[instrument(skip(board))]
pub fn assert_board_invariants(board: &Board) {
    if cfg!(debug_assertions)
        && let Err(violations) = BoardInvariants::check_all(board)
    {
        for violation in &violations {
            warn!(description = %violation.description, "Board invariant violated");
        }
        panic!("Board invariants violated: {:?}", violations);
    }
}
