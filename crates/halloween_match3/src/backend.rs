//! Collaborator contracts the progression controller calls into.
//!
//! The player data store, wallet, match/ranking recorder, and game
//! configuration are external systems. They are modelled as traits so the
//! engine never depends on a persistence technology.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::difficulty::Difficulty;
use crate::session::SessionReport;

/// Identifier of a player in the external store.
pub type PlayerId = i32;

/// Lives a brand-new player starts with.
pub const STARTING_LIVES: u32 = 3;

/// Shared mutable balances, authoritative in the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balances {
    /// Lives available.
    pub lives: u32,
    /// Credits in the wallet.
    pub credits: u32,
}

/// Cross-session progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Current phase within the cycle (1-10).
    pub current_phase: u32,
    /// Completed cycles.
    pub cycles_completed: u32,
    /// Lifetime score from won phases.
    pub total_score: u64,
    /// True after winning phase 10 until the surprise box is opened.
    pub surprise_box_pending: bool,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            current_phase: 1,
            cycles_completed: 0,
            total_score: 0,
            surprise_box_pending: false,
        }
    }
}

/// Everything the store knows about a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerData {
    /// Progress through the phase cycle.
    pub progress: ProgressSnapshot,
    /// Lives and credits.
    pub balances: Balances,
}

impl PlayerData {
    /// Data for a player who has never played.
    pub fn new_player() -> Self {
        Self {
            progress: ProgressSnapshot::default(),
            balances: Balances {
                lives: STARTING_LIVES,
                credits: 0,
            },
        }
    }
}

/// What the match objective measures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Objective {
    /// Reach a score.
    Points,
}

/// A finished session as reported to the ranking collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct MatchRecord {
    player_id: PlayerId,
    phase: u32,
    difficulty: Difficulty,
    score: u32,
    objective: Objective,
    objective_value: u32,
    completed: bool,
    time_spent_secs: u32,
    consecutive_errors_at_end: u32,
}

impl MatchRecord {
    /// Builds the record for a finished session.
    #[instrument(skip(report))]
    pub fn from_report(player_id: PlayerId, report: &SessionReport) -> Self {
        Self {
            player_id,
            phase: *report.phase(),
            difficulty: *report.difficulty(),
            score: *report.score(),
            objective: Objective::Points,
            objective_value: *report.objective(),
            completed: *report.won(),
            time_spent_secs: *report.time_spent_secs(),
            consecutive_errors_at_end: *report.consecutive_errors_at_end(),
        }
    }
}

/// Balance a surprise-box prize is paid into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrizeKind {
    /// Extra lives.
    Lives,
    /// Wallet credits.
    Credits,
}

/// A prize won from a surprise box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    /// Balance credited.
    pub kind: PrizeKind,
    /// Amount credited.
    pub amount: u32,
}

/// Deployment tunables for the surprise box, fetched fresh on every open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurpriseBoxConfig {
    /// Whether boxes can pay out at all.
    pub enabled: bool,
    /// Win chance in percent (0-100).
    pub win_chance_percent: u8,
    /// Balance the prize goes to.
    pub prize_kind: PrizeKind,
    /// Prize amount.
    pub prize_amount: u32,
}

impl SurpriseBoxConfig {
    /// Configuration used when nothing can be loaded: boxes never pay out.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            win_chance_percent: 5,
            prize_kind: PrizeKind::Lives,
            prize_amount: 1,
        }
    }
}

impl Default for SurpriseBoxConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Result of opening a surprise box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurpriseBoxOutcome {
    /// Cycle the box was earned in (1-based).
    pub cycle_number: u32,
    /// Whether the draw won.
    pub won: bool,
    /// Prize paid out, present only when `won`.
    pub prize: Option<Prize>,
}

/// Category of a collaborator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BackendErrorKind {
    /// The collaborator could not be reached.
    #[display("unavailable")]
    Unavailable,
    /// The requested record does not exist.
    #[display("not found")]
    NotFound,
    /// The collaborator refused the mutation (e.g. it would go negative).
    #[display("rejected")]
    Rejected,
}

/// Collaborator failure with location tracking.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Backend {} error: {} at {}:{}", kind, message, file, line)]
pub struct BackendError {
    /// Failure category.
    pub kind: BackendErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl BackendError {
    /// Creates a new backend error with caller location tracking.
    #[track_caller]
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// The collaborator is unreachable.
    #[track_caller]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message)
    }

    /// The record does not exist.
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::NotFound, message)
    }

    /// The mutation was refused.
    #[track_caller]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Rejected, message)
    }
}

/// Player data store: progress and lives.
pub trait PlayerStore {
    /// Loads progress and balances.
    fn load_player(&self, player: PlayerId) -> Result<PlayerData, BackendError>;

    /// Removes one life, rejecting when none are left. Returns lives remaining.
    fn consume_life(&self, player: PlayerId) -> Result<u32, BackendError>;

    /// Adds lives. Returns the new total.
    fn add_lives(&self, player: PlayerId, amount: u32) -> Result<u32, BackendError>;

    /// Persists progress.
    fn save_progress(&self, player: PlayerId, progress: &ProgressSnapshot) -> Result<(), BackendError>;

    /// Settles a pending surprise box in one step: records the draw, pays the
    /// prize and saves `progress`. Either all of it lands or none of it does.
    ///
    /// Rejects when no box is pending. Returns the balances afterwards.
    fn settle_surprise_box(
        &self,
        player: PlayerId,
        outcome: &SurpriseBoxOutcome,
        progress: &ProgressSnapshot,
    ) -> Result<Balances, BackendError>;
}

/// Credit wallet. Only integral credit counts cross this boundary.
pub trait Wallet {
    /// Current credit balance.
    fn credits(&self, player: PlayerId) -> Result<u32, BackendError>;

    /// Removes credits, rejecting if the balance would go negative. Returns the new balance.
    fn debit(&self, player: PlayerId, amount: u32) -> Result<u32, BackendError>;

    /// Adds credits. Returns the new balance.
    fn credit(&self, player: PlayerId, amount: u32) -> Result<u32, BackendError>;
}

/// Ranking collaborator fed with every finished session.
pub trait MatchRecorder {
    /// Records a finished session.
    fn record_match(&self, record: &MatchRecord) -> Result<(), BackendError>;
}

/// Source of deployment tunables.
pub trait GameConfigSource {
    /// Loads the surprise-box configuration.
    fn surprise_box_config(&self) -> Result<SurpriseBoxConfig, BackendError>;
}

/// Everything the progression controller needs from the outside world.
pub trait ArcadeBackend: PlayerStore + Wallet + MatchRecorder + GameConfigSource {}

impl<T> ArcadeBackend for T where T: PlayerStore + Wallet + MatchRecorder + GameConfigSource {}
