//! Engine collaborator traits backed by the sqlite repository.

use halloween_match3::{
    BackendError, Balances, GameConfigSource, MatchRecord, MatchRecorder, PlayerData, PlayerId,
    PlayerStore, ProgressSnapshot, SurpriseBoxConfig, SurpriseBoxOutcome, Wallet,
};
use tracing::instrument;

use crate::db::ArcadeRepository;
use crate::db::models::balances;

impl PlayerStore for ArcadeRepository {
    #[instrument(skip(self))]
    fn load_player(&self, player: PlayerId) -> Result<PlayerData, BackendError> {
        let (progress, wallet) = self.player_rows(player)?;
        Ok(PlayerData {
            progress: progress.snapshot()?,
            balances: balances(&progress, &wallet)?,
        })
    }

    fn consume_life(&self, player: PlayerId) -> Result<u32, BackendError> {
        Ok(self.take_life(player)?)
    }

    fn add_lives(&self, player: PlayerId, amount: u32) -> Result<u32, BackendError> {
        Ok(self.grant_lives(player, amount)?)
    }

    fn save_progress(&self, player: PlayerId, progress: &ProgressSnapshot) -> Result<(), BackendError> {
        Ok(self.update_progress(player, progress)?)
    }

    fn settle_surprise_box(
        &self,
        player: PlayerId,
        outcome: &SurpriseBoxOutcome,
        progress: &ProgressSnapshot,
    ) -> Result<Balances, BackendError> {
        Ok(ArcadeRepository::settle_surprise_box(self, player, outcome, progress)?)
    }
}

impl Wallet for ArcadeRepository {
    fn credits(&self, player: PlayerId) -> Result<u32, BackendError> {
        Ok(self.wallet_balance(player)?)
    }

    fn debit(&self, player: PlayerId, amount: u32) -> Result<u32, BackendError> {
        Ok(self.withdraw(player, amount)?)
    }

    fn credit(&self, player: PlayerId, amount: u32) -> Result<u32, BackendError> {
        Ok(self.deposit(player, amount)?)
    }
}

impl MatchRecorder for ArcadeRepository {
    fn record_match(&self, record: &MatchRecord) -> Result<(), BackendError> {
        self.insert_match(record)?;
        Ok(())
    }
}

impl GameConfigSource for ArcadeRepository {
    fn surprise_box_config(&self) -> Result<SurpriseBoxConfig, BackendError> {
        Ok(self.load_surprise_box_config()?)
    }
}
