//! Cross-session progression: phases, cycles, lives, credits and the surprise box.
//!
//! The controller owns a cached copy of the player's stored data and writes
//! every mutation through to the backend. Balances are always re-read before a
//! purchase, so a stale cache can never authorise spending.

use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::backend::{
    ArcadeBackend, Balances, BackendError, MatchRecord, PlayerData, PlayerId, Prize,
    ProgressSnapshot, SurpriseBoxConfig, SurpriseBoxOutcome,
};
use crate::difficulty::{Difficulty, is_cycle_end};
use crate::session::{Session, SessionError, SessionEvent, SessionReport};

/// Credits charged per life.
pub const LIFE_PRICE_CREDITS: u32 = 1;

/// Failure of a progression operation.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ProgressionError {
    /// Not enough credits; nothing was mutated.
    #[display("Insufficient credits: {} required, {} available", required, available)]
    InsufficientCredits {
        /// Credits the purchase costs.
        required: u32,
        /// Credits in the wallet.
        available: u32,
    },

    /// A session cannot start without lives.
    #[display("No lives left")]
    NoLivesLeft,

    /// The surprise box earned in this cycle must be opened first.
    #[display("Surprise box for cycle {} is waiting to be opened", _0)]
    SurpriseBoxPending(u32),

    /// There is no surprise box to open.
    #[display("No surprise box is pending")]
    NoSurpriseBox,

    /// Purchase amounts must be positive.
    #[display("Invalid amount: {}", _0)]
    InvalidAmount(u32),

    /// The session refused the operation.
    #[display("Session error: {}", _0)]
    Session(SessionError),

    /// A collaborator failed.
    #[display("{}", _0)]
    Backend(BackendError),
}

impl std::error::Error for ProgressionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Session(err) => Some(err),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SessionError> for ProgressionError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<BackendError> for ProgressionError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}

/// What a finished session did to progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAdvance {
    /// Won; the next phase is unlocked.
    Advanced {
        /// Phase to play next.
        next_phase: u32,
    },
    /// Won the last phase of a cycle; the surprise box is waiting.
    SurpriseBoxUnlocked {
        /// Cycle the box belongs to (1-based).
        cycle: u32,
    },
    /// Lost; the same phase must be replayed.
    Retry {
        /// Phase to replay.
        phase: u32,
        /// Lives left.
        lives: u32,
    },
}

/// Drives one player's progression against an [`ArcadeBackend`].
#[derive(Debug)]
pub struct ProgressionController<B> {
    backend: B,
    player: PlayerId,
    data: PlayerData,
}

impl<B: ArcadeBackend> ProgressionController<B> {
    /// Loads the player's stored data.
    #[instrument(skip(backend))]
    pub fn load(backend: B, player: PlayerId) -> Result<Self, ProgressionError> {
        let data = backend.load_player(player)?;
        info!(
            player,
            phase = data.progress.current_phase,
            lives = data.balances.lives,
            "Progression loaded"
        );
        Ok(Self {
            backend,
            player,
            data,
        })
    }

    /// Re-reads the player's stored data.
    #[instrument(skip(self), fields(player = self.player))]
    pub fn refresh(&mut self) -> Result<&PlayerData, ProgressionError> {
        self.data = self.backend.load_player(self.player)?;
        Ok(&self.data)
    }

    /// Player being driven.
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Cached progress.
    pub fn progress(&self) -> &ProgressSnapshot {
        &self.data.progress
    }

    /// Cached balances.
    pub fn balances(&self) -> Balances {
        self.data.balances
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Difficulty of the current phase.
    pub fn current_difficulty(&self) -> Difficulty {
        Difficulty::for_phase(self.data.progress.current_phase)
    }

    /// Starts a session for the current phase.
    ///
    /// Requires at least one life and no unopened surprise box.
    #[instrument(skip(self, rng), fields(player = self.player))]
    pub fn start_session<R: Rng>(&mut self, rng: R) -> Result<Session<R>, ProgressionError> {
        self.refresh()?;
        let progress = self.data.progress;
        if progress.surprise_box_pending {
            return Err(ProgressionError::SurpriseBoxPending(
                progress.cycles_completed + 1,
            ));
        }
        if self.data.balances.lives == 0 {
            return Err(ProgressionError::NoLivesLeft);
        }

        let phase = progress.current_phase;
        let mut session = Session::new(Difficulty::for_phase(phase), phase, self.data.balances, rng);
        session.start();
        Ok(session)
    }

    /// Applies a session event to stored state.
    ///
    /// Returns the progression change when the event finishes the session.
    #[instrument(skip(self, event), fields(player = self.player))]
    pub fn handle_event(
        &mut self,
        event: &SessionEvent,
    ) -> Result<Option<PhaseAdvance>, ProgressionError> {
        match event {
            SessionEvent::LifeLost { reason, .. } => {
                let lives = self.backend.consume_life(self.player)?;
                self.data.balances.lives = lives;
                info!(%reason, lives, "Life consumed");
                Ok(None)
            }
            SessionEvent::LifePurchased { .. } | SessionEvent::BoardReshuffled => Ok(None),
            SessionEvent::Finished(report) => self.complete_session(report).map(Some),
        }
    }

    /// Applies every pending session event, keeping the session's balances in sync.
    ///
    /// A failing event does not stop later ones from being applied; the first
    /// error is returned once all of them have been handled.
    pub fn apply_events<R: Rng>(
        &mut self,
        session: &mut Session<R>,
    ) -> Result<Option<PhaseAdvance>, ProgressionError> {
        let mut advance = None;
        let mut first_error = None;
        for event in session.drain_events() {
            match self.handle_event(&event) {
                Ok(Some(change)) => advance = Some(change),
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, ?event, "Session event failed to apply");
                    first_error.get_or_insert(err);
                }
            }
        }
        session.sync_balances(self.data.balances);
        match first_error {
            Some(err) => Err(err),
            None => Ok(advance),
        }
    }

    /// Records a finished session and updates progression.
    ///
    /// Every session is reported to the match recorder. A win adds its score to
    /// the lifetime total and either advances the phase or, at the end of a
    /// cycle, unlocks the surprise box. A loss leaves the phase unchanged.
    #[instrument(skip(self, report), fields(player = self.player, won = *report.won()))]
    pub fn complete_session(
        &mut self,
        report: &SessionReport,
    ) -> Result<PhaseAdvance, ProgressionError> {
        self.backend
            .record_match(&MatchRecord::from_report(self.player, report))?;

        let mut progress = self.data.progress;
        if *report.phase() != progress.current_phase {
            warn!(
                session_phase = *report.phase(),
                stored_phase = progress.current_phase,
                "Session phase differs from stored progress"
            );
        }

        if !*report.won() {
            let lives = self.backend.load_player(self.player)?.balances.lives;
            self.data.balances.lives = lives;
            info!(phase = progress.current_phase, lives, "Phase lost");
            return Ok(PhaseAdvance::Retry {
                phase: progress.current_phase,
                lives,
            });
        }

        progress.total_score += u64::from(*report.score());
        let advance = if is_cycle_end(progress.current_phase) {
            progress.surprise_box_pending = true;
            PhaseAdvance::SurpriseBoxUnlocked {
                cycle: progress.cycles_completed + 1,
            }
        } else {
            progress.current_phase += 1;
            PhaseAdvance::Advanced {
                next_phase: progress.current_phase,
            }
        };

        self.backend.save_progress(self.player, &progress)?;
        self.data.progress = progress;
        info!(
            ?advance,
            total_score = progress.total_score,
            "Phase won"
        );
        Ok(advance)
    }

    /// Buys `amount` lives at [`LIFE_PRICE_CREDITS`] each.
    ///
    /// Credits are re-read from the wallet first. If crediting lives fails
    /// after the debit, the debit is refunded before the error is returned.
    #[instrument(skip(self), fields(player = self.player))]
    pub fn buy_lives(&mut self, amount: u32) -> Result<Balances, ProgressionError> {
        if amount == 0 {
            return Err(ProgressionError::InvalidAmount(amount));
        }
        let required = amount
            .checked_mul(LIFE_PRICE_CREDITS)
            .ok_or(ProgressionError::InvalidAmount(amount))?;

        let available = self.backend.credits(self.player)?;
        if available < required {
            info!(required, available, "Purchase refused");
            return Err(ProgressionError::InsufficientCredits {
                required,
                available,
            });
        }

        let credits = self.backend.debit(self.player, required)?;
        let lives = match self.backend.add_lives(self.player, amount) {
            Ok(lives) => lives,
            Err(err) => {
                warn!(error = %err, required, "Crediting lives failed, refunding");
                if let Err(refund) = self.backend.credit(self.player, required) {
                    warn!(error = %refund, required, "Refund failed");
                }
                return Err(err.into());
            }
        };

        self.data.balances = Balances { lives, credits };
        info!(amount, lives, credits, "Lives purchased");
        Ok(self.data.balances)
    }

    /// Buys one life for a session that ran out.
    #[instrument(skip(self, session), fields(player = self.player))]
    pub fn buy_life_in_session<R: Rng>(
        &mut self,
        session: &mut Session<R>,
    ) -> Result<Balances, ProgressionError> {
        session.purchase_precheck()?;
        let balances = self.buy_lives(1)?;
        session.apply_life_purchase(balances);
        Ok(balances)
    }

    /// Opens the pending surprise box and starts the next cycle.
    ///
    /// The configuration is fetched fresh; if it cannot be loaded the box is
    /// treated as disabled. Whatever the draw, the phase resets to 1 and the
    /// cycle count increments. The draw, the prize and the new progress are
    /// settled by the backend in one step, so a failure leaves the box
    /// pending with nothing paid.
    #[instrument(skip(self, rng), fields(player = self.player))]
    pub fn open_surprise_box<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<SurpriseBoxOutcome, ProgressionError> {
        self.refresh()?;
        let mut progress = self.data.progress;
        if !progress.surprise_box_pending {
            return Err(ProgressionError::NoSurpriseBox);
        }

        let config = self.backend.surprise_box_config().unwrap_or_else(|err| {
            warn!(error = %err, "Surprise box config unavailable, treating as disabled");
            SurpriseBoxConfig::disabled()
        });

        let roll = rng.random_range(0..100u8);
        let won = config.enabled && roll < config.win_chance_percent;
        debug!(roll, chance = config.win_chance_percent, enabled = config.enabled, "Surprise box draw");

        let outcome = SurpriseBoxOutcome {
            cycle_number: progress.cycles_completed + 1,
            won,
            prize: won.then_some(Prize {
                kind: config.prize_kind,
                amount: config.prize_amount,
            }),
        };
        progress.current_phase = 1;
        progress.cycles_completed += 1;
        progress.surprise_box_pending = false;
        self.data.balances = self
            .backend
            .settle_surprise_box(self.player, &outcome, &progress)?;
        self.data.progress = progress;

        info!(
            cycle = outcome.cycle_number,
            won,
            prize = ?outcome.prize,
            "Surprise box opened"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn controller(credits: u32, lives: u32) -> ProgressionController<MemoryBackend> {
        let backend = MemoryBackend::new();
        let mut data = PlayerData::new_player();
        data.balances = Balances { lives, credits };
        backend.insert_player(7, data);
        ProgressionController::load(backend, 7).expect("player loads")
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        let mut controller = controller(3, 0);
        assert_eq!(controller.buy_lives(0), Err(ProgressionError::InvalidAmount(0)));
    }

    #[test]
    fn test_purchase_moves_credits_into_lives() {
        let mut controller = controller(4, 1);
        let balances = controller.buy_lives(3).expect("purchase");
        assert_eq!(balances, Balances { lives: 4, credits: 1 });
        assert_eq!(controller.backend().player(7).map(|p| p.balances), Some(balances));
    }

    #[test]
    fn test_start_refused_without_lives() {
        let mut controller = controller(0, 0);
        let result = controller.start_session(StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(ProgressionError::NoLivesLeft)));
    }

    #[test]
    fn test_error_display() {
        let err = ProgressionError::InsufficientCredits {
            required: 5,
            available: 3,
        };
        assert_eq!(err.to_string(), "Insufficient credits: 5 required, 3 available");
    }
}
