//! Database models and their conversions to engine types.

use chrono::{NaiveDate, NaiveDateTime};
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use halloween_match3::{
    Balances, Difficulty, MatchRecord, Prize, PrizeKind, ProgressSnapshot, SurpriseBoxOutcome,
};
use tracing::instrument;

use crate::db::{DbError, schema};

/// Converts an engine count into a column value.
#[track_caller]
pub(crate) fn to_db(value: u32) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|_| DbError::rejected(format!("{} does not fit a column", value)))
}

/// Converts a column value into an engine count.
#[track_caller]
pub(crate) fn from_db(value: i32) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_| DbError::new(format!("negative value {} in database", value)))
}

/// User profile database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::users)]
pub struct User {
    id: i32,
    display_name: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable user model for creating new users.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    display_name: String,
}

/// Progress and lives of a player.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::player_progress)]
#[diesel(primary_key(user_id))]
#[diesel(belongs_to(User))]
pub struct PlayerProgress {
    user_id: i32,
    current_phase: i32,
    cycles_completed: i32,
    total_score: i64,
    surprise_box_pending: bool,
    lives: i32,
    updated_at: NaiveDateTime,
}

impl PlayerProgress {
    /// Converts the row into an engine progress snapshot.
    #[instrument(skip(self), fields(user_id = self.user_id))]
    pub fn snapshot(&self) -> Result<ProgressSnapshot, DbError> {
        Ok(ProgressSnapshot {
            current_phase: from_db(self.current_phase)?,
            cycles_completed: from_db(self.cycles_completed)?,
            total_score: u64::try_from(self.total_score)
                .map_err(|_| DbError::new("negative total score in database"))?,
            surprise_box_pending: self.surprise_box_pending,
        })
    }
}

/// Insertable progress row for a new player.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::player_progress)]
pub struct NewPlayerProgress {
    user_id: i32,
    lives: i32,
}

/// Credit wallet of a player.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::wallets)]
#[diesel(primary_key(user_id))]
#[diesel(belongs_to(User))]
pub struct WalletRow {
    user_id: i32,
    credits: i32,
    updated_at: NaiveDateTime,
}

/// Insertable wallet row for a new player.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::wallets)]
pub struct NewWallet {
    user_id: i32,
    credits: i32,
}

/// Reads the balances split across the progress and wallet rows.
pub(crate) fn balances(progress: &PlayerProgress, wallet: &WalletRow) -> Result<Balances, DbError> {
    Ok(Balances {
        lives: from_db(progress.lives)?,
        credits: from_db(wallet.credits)?,
    })
}

/// A recorded match.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::game_matches)]
#[diesel(belongs_to(User))]
pub struct GameMatch {
    id: i32,
    user_id: i32,
    phase: i32,
    difficulty: String,
    score: i32,
    objective: String,
    objective_value: i32,
    completed: bool,
    time_spent_secs: i32,
    consecutive_errors_at_end: i32,
    created_at: NaiveDateTime,
}

/// Insertable match row.
#[derive(Debug, Clone, Insertable, Getters)]
#[diesel(table_name = schema::game_matches)]
pub struct NewGameMatch {
    user_id: i32,
    phase: i32,
    difficulty: String,
    score: i32,
    objective: String,
    objective_value: i32,
    completed: bool,
    time_spent_secs: i32,
    consecutive_errors_at_end: i32,
}

impl TryFrom<&MatchRecord> for NewGameMatch {
    type Error = DbError;

    fn try_from(record: &MatchRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: *record.player_id(),
            phase: to_db(*record.phase())?,
            difficulty: record.difficulty().to_string(),
            score: to_db(*record.score())?,
            objective: record.objective().to_string(),
            objective_value: to_db(*record.objective_value())?,
            completed: *record.completed(),
            time_spent_secs: to_db(*record.time_spent_secs())?,
            consecutive_errors_at_end: to_db(*record.consecutive_errors_at_end())?,
        })
    }
}

/// One player's accrual for one day.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::daily_ranking)]
#[diesel(belongs_to(User))]
pub struct DailyRanking {
    id: i32,
    user_id: i32,
    date: NaiveDate,
    total_score: i64,
    matches_played: i32,
    highest_difficulty: String,
}

impl DailyRanking {
    /// Parses the stored highest difficulty.
    #[instrument(skip(self), fields(highest_difficulty = %self.highest_difficulty))]
    pub fn parse_highest_difficulty(&self) -> Result<Difficulty, DbError> {
        self.highest_difficulty.parse().map_err(|_| {
            DbError::new(format!("Invalid difficulty: {}", self.highest_difficulty))
        })
    }
}

/// Insertable ranking row for a player's first completed match of the day.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::daily_ranking)]
pub struct NewDailyRanking {
    user_id: i32,
    date: NaiveDate,
    total_score: i64,
    matches_played: i32,
    highest_difficulty: String,
}

/// A ranking row joined with the player's display name.
#[derive(Debug, Clone, new, Getters)]
pub struct RankingEntry {
    position: usize,
    display_name: String,
    ranking: DailyRanking,
}

/// A recorded surprise-box draw.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::surprise_box_history)]
#[diesel(belongs_to(User))]
pub struct SurpriseBoxRecord {
    id: i32,
    user_id: i32,
    cycle_number: i32,
    won: bool,
    prize_kind: Option<String>,
    prize_amount: Option<i32>,
    opened_at: NaiveDateTime,
}

impl SurpriseBoxRecord {
    /// Converts the row back into an engine outcome.
    #[instrument(skip(self), fields(id = self.id))]
    pub fn outcome(&self) -> Result<SurpriseBoxOutcome, DbError> {
        let prize = match (&self.prize_kind, self.prize_amount) {
            (Some(kind), Some(amount)) => Some(Prize {
                kind: kind
                    .parse::<PrizeKind>()
                    .map_err(|_| DbError::new(format!("Invalid prize kind: {}", kind)))?,
                amount: from_db(amount)?,
            }),
            _ => None,
        };
        Ok(SurpriseBoxOutcome {
            cycle_number: from_db(self.cycle_number)?,
            won: self.won,
            prize,
        })
    }
}

/// Insertable surprise-box row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::surprise_box_history)]
pub struct NewSurpriseBoxRecord {
    user_id: i32,
    cycle_number: i32,
    won: bool,
    prize_kind: Option<String>,
    prize_amount: Option<i32>,
}

impl NewSurpriseBoxRecord {
    /// Builds the row for a player's draw.
    pub fn from_outcome(user_id: i32, outcome: &SurpriseBoxOutcome) -> Result<Self, DbError> {
        Ok(Self {
            user_id,
            cycle_number: to_db(outcome.cycle_number)?,
            won: outcome.won,
            prize_kind: outcome.prize.map(|p| p.kind.to_string()),
            prize_amount: outcome.prize.map(|p| to_db(p.amount)).transpose()?,
        })
    }
}

/// A deployment tunable stored as JSON text.
#[derive(Debug, Clone, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::game_config)]
pub struct GameConfigEntry {
    key: String,
    value: String,
    description: Option<String>,
    updated_at: NaiveDateTime,
}

impl GameConfigEntry {
    /// Parses the stored JSON value.
    pub fn json(&self) -> Result<serde_json::Value, DbError> {
        Ok(serde_json::from_str(&self.value)?)
    }
}

/// Insertable config row.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::game_config)]
pub struct NewGameConfigEntry {
    key: String,
    value: String,
    description: Option<String>,
}
