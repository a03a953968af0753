//! Core domain types: piece kinds, pieces, and board cells.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Width and height of the square board.
pub const BOARD_SIZE: usize = 8;

/// Kind of a piece (Halloween palette).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PieceKind {
    /// Jack-o'-lantern.
    Pumpkin,
    /// Ghost.
    Ghost,
    /// Bat.
    Bat,
    /// Candy.
    Candy,
    /// Spider.
    Spider,
    /// Skull.
    Skull,
}

impl PieceKind {
    /// Every kind in palette order.
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pumpkin,
        PieceKind::Ghost,
        PieceKind::Bat,
        PieceKind::Candy,
        PieceKind::Spider,
        PieceKind::Skull,
    ];

    /// Draws a kind uniformly from the palette.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// Returns the kind at `index` in palette order, wrapping around.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Glyph used by text front ends.
    #[instrument]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Pumpkin => "🎃",
            Self::Ghost => "👻",
            Self::Bat => "🦇",
            Self::Candy => "🍬",
            Self::Spider => "🕷",
            Self::Skull => "💀",
        }
    }
}

/// Identity of a piece, unique within one board for its whole lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[display("#{}", _0)]
pub struct PieceId(pub u64);

/// A single typed token occupying one board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    id: PieceId,
    kind: PieceKind,
    row: usize,
    col: usize,
    matched: bool,
}

impl Piece {
    /// Creates an unmatched piece at the given coordinates.
    pub fn new(id: PieceId, kind: PieceKind, row: usize, col: usize) -> Self {
        Self {
            id,
            kind,
            row,
            col,
            matched: false,
        }
    }

    /// Returns the identity.
    pub fn id(&self) -> PieceId {
        self.id
    }

    /// Returns the kind.
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    /// Returns the row the piece rests in.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Returns the column the piece rests in.
    pub fn col(&self) -> usize {
        self.col
    }

    /// Returns the cell the piece rests in.
    pub fn cell(&self) -> Cell {
        Cell::new(self.row, self.col)
    }

    /// True once the piece has been caught in a run and is about to be cleared.
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    pub(crate) fn place(&mut self, cell: Cell) {
        self.row = cell.row;
        self.col = cell.col;
    }

    pub(crate) fn mark_matched(&mut self) {
        self.matched = true;
    }
}

/// Coordinates of a board cell.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[display("({}, {})", row, col)]
pub struct Cell {
    /// Row, counted from the top.
    pub row: usize,
    /// Column, counted from the left.
    pub col: usize,
}

impl Cell {
    /// Creates a cell from row and column.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True if the cell lies on the board.
    pub fn in_bounds(&self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }

    /// True if `other` is exactly one row or one column away (never diagonal).
    #[instrument]
    pub fn is_adjacent(&self, other: &Cell) -> bool {
        let rows = self.row.abs_diff(other.row);
        let cols = self.col.abs_diff(other.col);
        rows + cols == 1
    }
}
