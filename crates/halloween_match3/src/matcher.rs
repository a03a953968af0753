//! Match detection: runs of three or more equal kinds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::board::Board;
use crate::piece::{BOARD_SIZE, Cell};

/// Minimum run length that counts as a match.
pub const MIN_RUN: usize = 3;

/// Cells participating in at least one run.
///
/// A cell shared by a horizontal and a vertical run (L and T shapes) appears once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSet {
    cells: BTreeSet<Cell>,
}

impl MatchSet {
    /// Number of matched cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True if `cell` is part of a run.
    pub fn contains(&self, cell: &Cell) -> bool {
        self.cells.contains(cell)
    }

    /// Matched cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub(crate) fn insert(&mut self, cell: Cell) {
        self.cells.insert(cell);
    }
}

/// Finds every piece participating in a run of three or more.
///
/// Rows are scanned left to right and columns top to bottom, independently.
/// Pure and deterministic for a given board.
#[instrument(skip(board))]
pub fn find_matches(board: &Board) -> MatchSet {
    let mut matches = MatchSet::default();

    for row in 0..BOARD_SIZE {
        scan_line(board, &mut matches, |i| Cell::new(row, i));
    }
    for col in 0..BOARD_SIZE {
        scan_line(board, &mut matches, |i| Cell::new(i, col));
    }

    trace!(matched = matches.len(), "Match scan complete");
    matches
}

/// Scans one line of the board, recording every run of at least [`MIN_RUN`].
fn scan_line(board: &Board, matches: &mut MatchSet, at: impl Fn(usize) -> Cell) {
    let mut start = 0;
    while start < BOARD_SIZE {
        let kind = board.kind_at(at(start));
        let mut end = start + 1;
        while end < BOARD_SIZE && board.kind_at(at(end)) == kind {
            end += 1;
        }
        if end - start >= MIN_RUN {
            for i in start..end {
                matches.insert(at(i));
            }
        }
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceKind;

    fn striped() -> [[PieceKind; BOARD_SIZE]; BOARD_SIZE] {
        let mut kinds = [[PieceKind::Pumpkin; BOARD_SIZE]; BOARD_SIZE];
        for (row, line) in kinds.iter_mut().enumerate() {
            for (col, kind) in line.iter_mut().enumerate() {
                *kind = PieceKind::from_index(row + 2 * col);
            }
        }
        kinds
    }

    #[test]
    fn test_striped_board_has_no_matches() {
        let board = Board::from_kinds(striped());
        assert!(find_matches(&board).is_empty());
    }

    #[test]
    fn test_horizontal_run_of_four() {
        let mut kinds = striped();
        for col in 2..6 {
            kinds[4][col] = PieceKind::Skull;
        }
        let board = Board::from_kinds(kinds);
        let matches = find_matches(&board);
        assert_eq!(matches.len(), 4);
        assert!(matches.contains(&Cell::new(4, 2)));
        assert!(matches.contains(&Cell::new(4, 5)));
    }

    #[test]
    fn test_l_shape_counts_corner_once() {
        let mut kinds = striped();
        // Row 7 cols 0..3 plus column 0 rows 5..8 share the corner (7, 0).
        for col in 0..3 {
            kinds[7][col] = PieceKind::Candy;
        }
        for row in 5..8 {
            kinds[row][0] = PieceKind::Candy;
        }
        let board = Board::from_kinds(kinds);
        let matches = find_matches(&board);
        assert_eq!(matches.len(), 5);
    }

    #[test]
    fn test_two_in_a_row_is_not_a_match() {
        let mut kinds = striped();
        kinds[0][0] = PieceKind::Bat;
        kinds[0][1] = PieceKind::Bat;
        let board = Board::from_kinds(kinds);
        assert!(find_matches(&board).is_empty());
    }
}
