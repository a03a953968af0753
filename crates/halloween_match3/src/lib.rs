//! Halloween Match-3 engine.
//!
//! An 8x8 match-3 board with cascade resolution, a per-phase session state
//! machine, and cross-session progression through a ten-phase difficulty
//! cycle that ends in a surprise box.
//!
//! # Architecture
//!
//! - **Board**: grid of identity-carrying pieces, generated without latent matches
//! - **Matcher / Swap**: run detection and swap validation
//! - **Cascade**: explicit clear, gravity and refill loop
//! - **Session**: one phase attempt, driven by taps and one-second ticks
//! - **Progression**: phases, cycles, lives, credits and the surprise box
//! - **Backend**: collaborator traits plus an in-memory implementation
//!
//! # Example
//!
//! ```
//! use halloween_match3::{MemoryBackend, ProgressionController};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! # fn example() -> Result<(), halloween_match3::ProgressionError> {
//! let backend = MemoryBackend::new();
//! backend.register_player(1);
//!
//! let mut progression = ProgressionController::load(backend, 1)?;
//! let mut session = progression.start_session(StdRng::seed_from_u64(7))?;
//!
//! if let Some((a, b)) = session.hint() {
//!     session.select(a);
//!     session.select(b);
//!     session.resolve_all();
//! }
//! progression.apply_events(&mut session)?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod backend;
mod board;
mod cascade;
mod difficulty;
mod invariants;
mod matcher;
mod memory;
mod piece;
mod progression;
mod session;
mod swap;

// Crate-level exports - Pieces and board
pub use board::Board;
pub use piece::{BOARD_SIZE, Cell, Piece, PieceId, PieceKind};

// Crate-level exports - Match detection and swaps
pub use matcher::{MIN_RUN, MatchSet, find_matches};
pub use swap::{find_valid_swap, is_valid_swap};

// Crate-level exports - Cascade resolution
pub use cascade::{
    Cascade, CascadeOutcome, CascadePass, CascadeResolver, CascadeStep, DEFAULT_MAX_PASSES,
    POINTS_PER_PIECE,
};

// Crate-level exports - Board invariants
pub use invariants::{
    BoardInvariants, CoordinatesConsistentInvariant, Invariant, InvariantSet,
    InvariantViolation, NoLatentMatchInvariant, UniqueIdentityInvariant,
};

// Crate-level exports - Difficulty cycle
pub use difficulty::{CYCLE_LENGTH, DIFFICULTY_CYCLE, Difficulty, DifficultyConfig, is_cycle_end};

// Crate-level exports - Session
pub use session::{
    ERRORS_PER_LIFE, Hud, LifeLossReason, ResolveStep, SelectOutcome, Session, SessionError,
    SessionEvent, SessionReport, SessionState, TickOutcome,
};

// Crate-level exports - Progression
pub use progression::{LIFE_PRICE_CREDITS, PhaseAdvance, ProgressionController, ProgressionError};

// Crate-level exports - Collaborators
pub use backend::{
    ArcadeBackend, BackendError, BackendErrorKind, Balances, GameConfigSource, MatchRecord,
    MatchRecorder, Objective, PlayerData, PlayerId, PlayerStore, Prize, PrizeKind,
    ProgressSnapshot, STARTING_LIVES, SurpriseBoxConfig, SurpriseBoxOutcome, Wallet,
};
pub use memory::MemoryBackend;
