//! In-memory implementation of every collaborator.
//!
//! Shares state through an `Arc<Mutex<_>>`, so clones observe each other's
//! writes. Outages can be simulated for tests and offline demos.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, instrument, warn};

use crate::backend::{
    BackendError, Balances, GameConfigSource, MatchRecord, MatchRecorder, PlayerData, PlayerId,
    PlayerStore, PrizeKind, ProgressSnapshot, SurpriseBoxConfig, SurpriseBoxOutcome, Wallet,
};

#[derive(Debug, Default)]
struct MemoryState {
    players: HashMap<PlayerId, PlayerData>,
    matches: Vec<MatchRecord>,
    surprise_boxes: Vec<(PlayerId, SurpriseBoxOutcome)>,
    box_config: Option<SurpriseBoxConfig>,
    offline: bool,
    lives_writes_failing: bool,
    progress_writes_failing: bool,
}

/// Collaborators backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Creates an empty backend with no surprise-box configuration.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating MemoryBackend");
        Self::default()
    }

    /// Registers a new player with starting balances. Returns the stored data.
    #[instrument(skip(self))]
    pub fn register_player(&self, player: PlayerId) -> PlayerData {
        self.insert_player(player, PlayerData::new_player());
        PlayerData::new_player()
    }

    /// Stores `data` for `player`, replacing anything present.
    #[instrument(skip(self, data))]
    pub fn insert_player(&self, player: PlayerId, data: PlayerData) {
        self.raw().players.insert(player, data);
        debug!(player, "Player stored");
    }

    /// Returns a copy of the stored player data.
    pub fn player(&self, player: PlayerId) -> Option<PlayerData> {
        self.raw().players.get(&player).copied()
    }

    /// Returns every recorded match.
    pub fn matches(&self) -> Vec<MatchRecord> {
        self.raw().matches.clone()
    }

    /// Returns every recorded surprise-box draw.
    pub fn surprise_boxes(&self) -> Vec<(PlayerId, SurpriseBoxOutcome)> {
        self.raw().surprise_boxes.clone()
    }

    /// Sets the surprise-box configuration; `None` makes it unloadable.
    pub fn set_surprise_box_config(&self, config: Option<SurpriseBoxConfig>) {
        self.raw().box_config = config;
    }

    /// Makes every collaborator call fail as unavailable.
    pub fn set_offline(&self, offline: bool) {
        self.raw().offline = offline;
    }

    /// Makes every lives write fail while everything else keeps working.
    pub fn set_lives_writes_failing(&self, failing: bool) {
        self.raw().lives_writes_failing = failing;
    }

    /// Makes progress writes fail while everything else keeps working.
    pub fn set_progress_writes_failing(&self, failing: bool) {
        self.raw().progress_writes_failing = failing;
    }

    fn raw(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn online(&self) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        let state = self.raw();
        if state.offline {
            warn!("Memory backend is offline");
            return Err(BackendError::unavailable("memory backend is offline"));
        }
        Ok(state)
    }
}

fn player_mut(state: &mut MemoryState, player: PlayerId) -> Result<&mut PlayerData, BackendError> {
    state
        .players
        .get_mut(&player)
        .ok_or_else(|| BackendError::not_found(format!("player {} is not registered", player)))
}

impl PlayerStore for MemoryBackend {
    fn load_player(&self, player: PlayerId) -> Result<PlayerData, BackendError> {
        let mut state = self.online()?;
        Ok(*player_mut(&mut state, player)?)
    }

    fn consume_life(&self, player: PlayerId) -> Result<u32, BackendError> {
        let mut state = self.online()?;
        if state.lives_writes_failing {
            return Err(BackendError::unavailable("lives table is unavailable"));
        }
        let data = player_mut(&mut state, player)?;
        data.balances.lives = data
            .balances
            .lives
            .checked_sub(1)
            .ok_or_else(|| BackendError::rejected("no lives left to consume"))?;
        Ok(data.balances.lives)
    }

    fn add_lives(&self, player: PlayerId, amount: u32) -> Result<u32, BackendError> {
        let mut state = self.online()?;
        if state.lives_writes_failing {
            return Err(BackendError::unavailable("lives table is unavailable"));
        }
        let data = player_mut(&mut state, player)?;
        data.balances.lives = checked_add(data.balances.lives, amount, "lives")?;
        Ok(data.balances.lives)
    }

    fn save_progress(&self, player: PlayerId, progress: &ProgressSnapshot) -> Result<(), BackendError> {
        let mut state = self.online()?;
        if state.progress_writes_failing {
            return Err(BackendError::unavailable("progress table is unavailable"));
        }
        player_mut(&mut state, player)?.progress = *progress;
        Ok(())
    }

    #[instrument(skip(self, outcome, progress))]
    fn settle_surprise_box(
        &self,
        player: PlayerId,
        outcome: &SurpriseBoxOutcome,
        progress: &ProgressSnapshot,
    ) -> Result<Balances, BackendError> {
        let mut state = self.online()?;
        if state.progress_writes_failing {
            return Err(BackendError::unavailable("progress table is unavailable"));
        }
        let lives_failing = state.lives_writes_failing;
        let data = player_mut(&mut state, player)?;
        if !data.progress.surprise_box_pending {
            return Err(BackendError::rejected("no surprise box is pending"));
        }

        // Staged on a copy so a rejected prize leaves the player untouched.
        let mut balances = data.balances;
        if let Some(prize) = outcome.prize {
            match prize.kind {
                PrizeKind::Lives if lives_failing => {
                    return Err(BackendError::unavailable("lives table is unavailable"));
                }
                PrizeKind::Lives => {
                    balances.lives = checked_add(balances.lives, prize.amount, "lives")?;
                }
                PrizeKind::Credits => {
                    balances.credits = checked_add(balances.credits, prize.amount, "credits")?;
                }
            }
        }

        data.balances = balances;
        data.progress = *progress;
        state.surprise_boxes.push((player, *outcome));
        debug!(player, won = outcome.won, "Surprise box settled");
        Ok(balances)
    }
}

fn checked_add(balance: u32, amount: u32, what: &str) -> Result<u32, BackendError> {
    balance
        .checked_add(amount)
        .ok_or_else(|| BackendError::rejected(format!("{} balance would overflow", what)))
}

impl Wallet for MemoryBackend {
    fn credits(&self, player: PlayerId) -> Result<u32, BackendError> {
        let mut state = self.online()?;
        Ok(player_mut(&mut state, player)?.balances.credits)
    }

    fn debit(&self, player: PlayerId, amount: u32) -> Result<u32, BackendError> {
        let mut state = self.online()?;
        let data = player_mut(&mut state, player)?;
        data.balances.credits = data
            .balances
            .credits
            .checked_sub(amount)
            .ok_or_else(|| BackendError::rejected("debit exceeds credit balance"))?;
        Ok(data.balances.credits)
    }

    fn credit(&self, player: PlayerId, amount: u32) -> Result<u32, BackendError> {
        let mut state = self.online()?;
        let data = player_mut(&mut state, player)?;
        data.balances.credits = checked_add(data.balances.credits, amount, "credits")?;
        Ok(data.balances.credits)
    }
}

impl MatchRecorder for MemoryBackend {
    fn record_match(&self, record: &MatchRecord) -> Result<(), BackendError> {
        self.online()?.matches.push(record.clone());
        Ok(())
    }
}

impl GameConfigSource for MemoryBackend {
    fn surprise_box_config(&self) -> Result<SurpriseBoxConfig, BackendError> {
        self.online()?
            .box_config
            .ok_or_else(|| BackendError::not_found("surprise box is not configured"))
    }
}
