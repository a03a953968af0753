//! Swap validation.
//!
//! A swap is valid when exchanging two orthogonally adjacent cells creates at
//! least one run. Validation works on a throwaway clone; the real board is
//! never touched.

use tracing::{debug, instrument};

use crate::board::Board;
use crate::matcher::find_matches;
use crate::piece::{BOARD_SIZE, Cell};

/// Returns true if swapping `a` and `b` would produce at least one match.
///
/// Adjacency is the caller's precondition (see [`Cell::is_adjacent`]).
#[instrument(skip(board))]
pub fn is_valid_swap(board: &Board, a: Cell, b: Cell) -> bool {
    let mut hypothetical = board.clone();
    hypothetical.swap(a, b);
    let valid = !find_matches(&hypothetical).is_empty();
    debug!(valid, "Swap validated");
    valid
}

/// Finds the first valid swap in row-major order, if the board has one.
///
/// Used as a hint and to detect boards the player can no longer move on.
#[instrument(skip(board))]
pub fn find_valid_swap(board: &Board) -> Option<(Cell, Cell)> {
    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE {
            let here = Cell::new(row, col);
            let neighbours = [Cell::new(row, col + 1), Cell::new(row + 1, col)];
            for there in neighbours {
                if there.in_bounds()
                    && board.kind_at(here) != board.kind_at(there)
                    && is_valid_swap(board, here, there)
                {
                    return Some((here, there));
                }
            }
        }
    }
    None
}
