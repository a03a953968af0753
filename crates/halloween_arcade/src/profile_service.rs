//! Profile management business logic layer.

use chrono::{NaiveDate, Utc};
use halloween_match3::{
    BackendError, PlayerData, PlayerId, PlayerStore, ProgressionController, ProgressionError,
};
use tracing::{debug, info, instrument};

use crate::db::{ArcadeRepository, DbError, GameMatch, RankingEntry, SurpriseBoxRecord, User};

/// Service layer for player profiles.
///
/// Wraps [`ArcadeRepository`] with get-or-create semantics and hands out
/// progression controllers bound to a player.
#[derive(Debug, Clone)]
pub struct ProfileService {
    repository: ArcadeRepository,
    starting_lives: u32,
}

impl ProfileService {
    /// Creates a new profile service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: ArcadeRepository, starting_lives: u32) -> Self {
        info!("Creating ProfileService");
        Self {
            repository,
            starting_lives,
        }
    }

    /// Returns the underlying repository.
    pub fn repository(&self) -> &ArcadeRepository {
        &self.repository
    }

    /// Returns an existing user by name or creates one, with player rows in place.
    #[instrument(skip(self))]
    pub fn get_or_create_player(&self, display_name: String) -> Result<User, DbError> {
        let user = match self.repository.get_user_by_name(&display_name)? {
            Some(user) => {
                debug!(user_id = user.id(), "Existing user found");
                user
            }
            None => {
                info!(display_name = %display_name, "Creating new user");
                self.repository.create_user(display_name)?
            }
        };
        self.repository
            .ensure_player(*user.id(), self.starting_lives)?;
        Ok(user)
    }

    /// Stored progress and balances of a player, read through the engine's store contract.
    #[instrument(skip(self))]
    pub fn player_data(&self, user_id: PlayerId) -> Result<PlayerData, BackendError> {
        self.repository.load_player(user_id)
    }

    /// Progression controller for a player.
    #[instrument(skip(self))]
    pub fn progression(
        &self,
        user_id: PlayerId,
    ) -> Result<ProgressionController<ArcadeRepository>, ProgressionError> {
        ProgressionController::load(self.repository.clone(), user_id)
    }

    /// Credits the wallet, standing in for an external payment confirmation.
    #[instrument(skip(self))]
    pub fn deposit(&self, user_id: PlayerId, amount: u32) -> Result<u32, DbError> {
        if amount == 0 {
            return Err(DbError::rejected("Deposit must be positive"));
        }
        let credits = self.repository.deposit(user_id, amount)?;
        info!(user_id, amount, credits, "Deposit credited");
        Ok(credits)
    }

    /// Most recent matches and surprise-box draws of a player.
    #[instrument(skip(self))]
    pub fn history(
        &self,
        user_id: PlayerId,
        limit: i64,
    ) -> Result<(Vec<GameMatch>, Vec<SurpriseBoxRecord>), DbError> {
        let matches = self.repository.list_matches(user_id, limit)?;
        let boxes = self.repository.list_surprise_boxes(user_id)?;
        debug!(matches = matches.len(), boxes = boxes.len(), "History loaded");
        Ok((matches, boxes))
    }

    /// Ranking for `date`, defaulting to today (UTC).
    #[instrument(skip(self))]
    pub fn ranking(&self, date: Option<NaiveDate>) -> Result<Vec<RankingEntry>, DbError> {
        self.repository
            .daily_ranking(date.unwrap_or_else(|| Utc::now().date_naive()))
    }
}
