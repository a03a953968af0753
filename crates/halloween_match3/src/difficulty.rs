//! Difficulty levels and the repeating ten-phase cycle.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Number of phases in one cycle.
pub const CYCLE_LENGTH: u32 = 10;

/// Difficulty per phase, indexed by `(phase - 1) % CYCLE_LENGTH`.
///
/// Phase 10 closes the cycle and unlocks the surprise box.
pub const DIFFICULTY_CYCLE: [Difficulty; CYCLE_LENGTH as usize] = [
    Difficulty::Easy,
    Difficulty::Easy,
    Difficulty::Easy,
    Difficulty::Medium,
    Difficulty::Medium,
    Difficulty::Hard,
    Difficulty::Medium,
    Difficulty::Hard,
    Difficulty::Medium,
    Difficulty::Hard,
];

/// Difficulty of a phase.
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
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    /// 180 s, 1000 points, 30 moves.
    Easy,
    /// 120 s, 1500 points, 25 moves.
    Medium,
    /// 90 s, 2000 points, 20 moves.
    Hard,
}

/// Budgets and objective for one difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    /// Seconds on the countdown.
    pub time_budget_secs: u32,
    /// Score that wins the phase.
    pub score_objective: u32,
    /// Valid swaps allowed.
    pub move_budget: u32,
}

impl Difficulty {
    /// Returns the budgets for this difficulty.
    pub const fn config(self) -> DifficultyConfig {
        match self {
            Self::Easy => DifficultyConfig {
                time_budget_secs: 180,
                score_objective: 1000,
                move_budget: 30,
            },
            Self::Medium => DifficultyConfig {
                time_budget_secs: 120,
                score_objective: 1500,
                move_budget: 25,
            },
            Self::Hard => DifficultyConfig {
                time_budget_secs: 90,
                score_objective: 2000,
                move_budget: 20,
            },
        }
    }

    /// Returns the difficulty of a (1-based) phase.
    #[instrument]
    pub fn for_phase(phase: u32) -> Self {
        let index = (phase.max(1) - 1) % CYCLE_LENGTH;
        DIFFICULTY_CYCLE[index as usize]
    }
}

/// True if `phase` is the last of its cycle.
#[instrument]
pub fn is_cycle_end(phase: u32) -> bool {
    phase > 0 && phase % CYCLE_LENGTH == 0
}
