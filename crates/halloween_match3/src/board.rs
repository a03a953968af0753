//! The 8x8 match-3 board.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::invariants::assert_board_invariants;
use crate::matcher::{MatchSet, find_matches};
use crate::piece::{BOARD_SIZE, Cell, Piece, PieceId, PieceKind};

/// Square grid of pieces, indexed by `(row, col)`.
///
/// Every cell holds exactly one piece. After [`Board::generate`] and after every
/// settled cascade no row or column contains three consecutive pieces of the
/// same kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Piece; BOARD_SIZE]; BOARD_SIZE],
    next_id: u64,
}

impl Board {
    /// Generates a random board with no latent match.
    ///
    /// Whole-grid reject-and-retry: a grid containing any run is discarded and
    /// redrawn, never patched in place.
    #[instrument(skip(rng))]
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut board = Self::from_kinds([[PieceKind::Pumpkin; BOARD_SIZE]; BOARD_SIZE]);
        board.next_id = 0;
        board.regenerate(rng);
        board
    }

    /// Builds a board from an explicit layout of kinds.
    ///
    /// The layout is taken as-is and may contain matches.
    pub fn from_kinds(kinds: [[PieceKind; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        let mut next_id = 0;
        let cells = std::array::from_fn(|row| {
            std::array::from_fn(|col| {
                let piece = Piece::new(PieceId(next_id), kinds[row][col], row, col);
                next_id += 1;
                piece
            })
        });
        Self { cells, next_id }
    }

    /// Redraws every cell until the no-latent-match invariant holds.
    ///
    /// Identities keep counting from where the board left off.
    #[instrument(skip(self, rng))]
    pub fn regenerate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            for row in 0..BOARD_SIZE {
                for col in 0..BOARD_SIZE {
                    let piece = self.spawn(PieceKind::random(rng), Cell::new(row, col));
                    self.cells[row][col] = piece;
                }
            }
            if !self.has_latent_match() {
                break;
            }
        }
        debug!(attempts, "Board generated");
        assert_board_invariants(self);
    }

    /// Returns the piece at `cell`.
    ///
    /// # Panics
    ///
    /// Panics if `cell` is off the board.
    pub fn get(&self, cell: Cell) -> &Piece {
        assert!(cell.in_bounds(), "cell {} is off the board", cell);
        &self.cells[cell.row][cell.col]
    }

    /// Returns the kind at `cell`.
    pub fn kind_at(&self, cell: Cell) -> PieceKind {
        self.get(cell).kind()
    }

    /// Exchanges the pieces at `a` and `b` in place.
    ///
    /// Identity and kind travel with the piece; coordinates are rewritten to
    /// the destination cell. Adjacency is not checked here.
    ///
    /// # Panics
    ///
    /// Panics if either cell is off the board.
    #[instrument(skip(self))]
    pub fn swap(&mut self, a: Cell, b: Cell) {
        assert!(a.in_bounds() && b.in_bounds(), "swap {} <-> {} is off the board", a, b);
        let first = self.cells[a.row][a.col];
        let second = self.cells[b.row][b.col];
        self.cells[a.row][a.col] = second;
        self.cells[b.row][b.col] = first;
        self.cells[a.row][a.col].place(a);
        self.cells[b.row][b.col].place(b);
    }

    /// True if any row or column holds a run of three or more.
    pub fn has_latent_match(&self) -> bool {
        !find_matches(self).is_empty()
    }

    /// Iterates over the rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Piece; BOARD_SIZE]> {
        self.cells.iter()
    }

    /// Iterates over every piece in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.cells.iter().flatten()
    }

    /// Returns the kinds in row-major layout.
    pub fn kinds(&self) -> [[PieceKind; BOARD_SIZE]; BOARD_SIZE] {
        std::array::from_fn(|row| std::array::from_fn(|col| self.cells[row][col].kind()))
    }

    /// Formats the board as text, one row per line.
    pub fn display(&self) -> String {
        let mut result = String::new();
        result.push_str("   ");
        for col in 0..BOARD_SIZE {
            result.push_str(&format!(" {} ", col));
        }
        for (row, pieces) in self.cells.iter().enumerate() {
            result.push('\n');
            result.push_str(&format!(" {} ", row));
            for piece in pieces {
                result.push(' ');
                result.push_str(piece.kind().symbol());
            }
        }
        result
    }

    /// Flags every piece in `matches` as matched.
    pub(crate) fn mark_matched(&mut self, matches: &MatchSet) {
        for cell in matches.iter() {
            self.cells[cell.row][cell.col].mark_matched();
        }
    }

    /// Drops matched pieces out of every column and refills from the top.
    ///
    /// Survivors keep their relative order and fall to the bottom; fresh
    /// random pieces fill the vacated top slots.
    pub(crate) fn collapse<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for col in 0..BOARD_SIZE {
            let survivors: Vec<Piece> = (0..BOARD_SIZE)
                .map(|row| self.cells[row][col])
                .filter(|piece| !piece.is_matched())
                .collect();
            let vacated = BOARD_SIZE - survivors.len();

            let mut column = Vec::with_capacity(BOARD_SIZE);
            for row in 0..vacated {
                column.push(self.spawn(PieceKind::random(rng), Cell::new(row, col)));
            }
            column.extend(survivors);

            for (row, mut piece) in column.into_iter().enumerate() {
                piece.place(Cell::new(row, col));
                self.cells[row][col] = piece;
            }
        }
    }

    fn spawn(&mut self, kind: PieceKind, cell: Cell) -> Piece {
        let piece = Piece::new(PieceId(self.next_id), kind, cell.row, cell.col);
        self.next_id += 1;
        piece
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generate_has_no_latent_match() {
        let mut rng = StdRng::seed_from_u64(7);
        let board = Board::generate(&mut rng);
        assert!(!board.has_latent_match());
        assert_eq!(board.pieces().count(), BOARD_SIZE * BOARD_SIZE);
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = Board::generate(&mut StdRng::seed_from_u64(42));
        let b = Board::generate(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_swap_moves_identity_and_rewrites_coordinates() {
        let mut board = Board::generate(&mut StdRng::seed_from_u64(3));
        let a = Cell::new(2, 2);
        let b = Cell::new(2, 3);
        let id_a = board.get(a).id();
        let id_b = board.get(b).id();

        board.swap(a, b);

        assert_eq!(board.get(a).id(), id_b);
        assert_eq!(board.get(b).id(), id_a);
        assert_eq!(board.get(a).cell(), a);
        assert_eq!(board.get(b).cell(), b);
    }

    #[test]
    #[should_panic(expected = "off the board")]
    fn test_swap_out_of_bounds_panics() {
        let mut board = Board::generate(&mut StdRng::seed_from_u64(3));
        board.swap(Cell::new(7, 7), Cell::new(7, 8));
    }

    #[test]
    fn test_collapse_keeps_survivor_order() {
        let mut kinds = [[PieceKind::Pumpkin; BOARD_SIZE]; BOARD_SIZE];
        for (row, line) in kinds.iter_mut().enumerate() {
            for (col, kind) in line.iter_mut().enumerate() {
                *kind = PieceKind::from_index(row + 2 * col);
            }
        }
        let mut board = Board::from_kinds(kinds);
        let above = board.get(Cell::new(0, 0)).id();
        let below = board.get(Cell::new(2, 0)).id();

        let mut matches = MatchSet::default();
        matches.insert(Cell::new(1, 0));
        board.mark_matched(&matches);
        board.collapse(&mut StdRng::seed_from_u64(1));

        assert_eq!(board.get(Cell::new(1, 0)).id(), above);
        assert_eq!(board.get(Cell::new(2, 0)).id(), below);
        assert!(board.get(Cell::new(0, 0)).id().0 >= (BOARD_SIZE * BOARD_SIZE) as u64);
        assert!(board.pieces().all(|piece| !piece.is_matched()));
    }
}
