//! One phase attempt: the session state machine.
//!
//! A single [`SessionState`] value is authoritative. Player taps and timer
//! ticks are the only inputs, and both are applied one at a time by the
//! owner of the session. While a cascade is resolving the board is locked:
//! taps are ignored, and a timer expiry is deferred until the cascade settles.

use derive_getters::Getters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::backend::Balances;
use crate::board::Board;
use crate::cascade::{Cascade, CascadePass, CascadeResolver, CascadeStep};
use crate::difficulty::{Difficulty, DifficultyConfig};
use crate::piece::Cell;
use crate::swap::{find_valid_swap, is_valid_swap};

/// Invalid swaps in a row that cost a life.
pub const ERRORS_PER_LIFE: u32 = 2;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, not yet started.
    Idle,
    /// Waiting for the first tap.
    AwaitingFirstSelection,
    /// One cell selected, waiting for the second tap.
    AwaitingSecondSelection {
        /// The cell tapped first.
        first: Cell,
    },
    /// A committed swap is being resolved; input is locked.
    Resolving,
    /// Objective reached.
    Won,
    /// Countdown reached zero.
    LostByTime,
    /// Move budget used up without reaching the objective.
    LostByMoves,
}

impl SessionState {
    /// True for `Won`, `LostByTime` and `LostByMoves`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Won | Self::LostByTime | Self::LostByMoves)
    }

    /// The remembered first cell, if any.
    pub fn selected(&self) -> Option<Cell> {
        match self {
            Self::AwaitingSecondSelection { first } => Some(*first),
            _ => None,
        }
    }
}

/// Why a life was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifeLossReason {
    /// Two invalid swaps in a row.
    ConsecutiveErrors,
    /// Move budget exhausted.
    MovesExhausted,
    /// Countdown expired.
    TimeExpired,
}

/// Final statistics of a session, reported exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SessionReport {
    won: bool,
    ending: SessionState,
    phase: u32,
    difficulty: Difficulty,
    score: u32,
    objective: u32,
    moves_made: u32,
    move_budget: u32,
    time_spent_secs: u32,
    consecutive_errors_at_end: u32,
    life_consumed: bool,
}

/// Notification for the progression controller and the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A life was consumed.
    LifeLost {
        /// What cost the life.
        reason: LifeLossReason,
        /// Lives left afterwards.
        lives_remaining: u32,
    },
    /// A life was bought mid-session.
    LifePurchased {
        /// Lives afterwards.
        lives: u32,
        /// Credits afterwards.
        credits: u32,
    },
    /// The settled board had no valid move and was redrawn.
    BoardReshuffled,
    /// The session reached a terminal state.
    Finished(SessionReport),
}

/// Result of a tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Not accepted: the board is locked, the session is over or not started,
    /// or the cell is off the board.
    Ignored,
    /// No lives left; a life must be bought before playing on.
    OutOfLives,
    /// First cell remembered.
    Selected(Cell),
    /// Second cell was not adjacent; selection cleared without penalty.
    SelectionCleared,
    /// Adjacent swap that makes no match.
    InvalidSwap {
        /// Error streak after this swap (reset to 0 when a life was taken).
        consecutive_errors: u32,
        /// True if this swap cost a life.
        life_lost: bool,
    },
    /// Valid swap applied; the session is now resolving.
    Resolving,
}

/// Result of one resolution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStep {
    /// The session is not resolving.
    NotResolving,
    /// A cascade pass cleared pieces; more may follow.
    Pass(CascadePass),
    /// The cascade settled.
    Settled {
        /// Points the whole resolution added.
        score_delta: u32,
        /// State after terminal checks.
        state: SessionState,
    },
}

/// Result of a one-second timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not started or already over.
    Inactive,
    /// Countdown continues.
    Running {
        /// Seconds left.
        time_remaining: u32,
    },
    /// Time ran out mid-resolution; the loss applies once the cascade settles.
    Deferred,
    /// Time ran out; the session is lost.
    Expired,
}

/// Reasons a mid-session life purchase is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SessionError {
    /// A cascade is resolving.
    #[display("Board is busy resolving a cascade")]
    Busy,
    /// The session is over.
    #[display("Session has already finished")]
    Finished,
    /// Lives remain; purchases are only offered at zero lives.
    #[display("Player still has {} lives", _0)]
    LivesRemaining(u32),
}

impl std::error::Error for SessionError {}

/// Heads-up display fields for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hud {
    /// Phase being played.
    pub phase: u32,
    /// Its difficulty.
    pub difficulty: Difficulty,
    /// Lives.
    pub lives: u32,
    /// Credits.
    pub credits: u32,
    /// Seconds left.
    pub time_remaining: u32,
    /// Current score.
    pub score: u32,
    /// Score to reach.
    pub objective: u32,
    /// Valid swaps made.
    pub moves_made: u32,
    /// Valid swaps allowed.
    pub move_budget: u32,
    /// Current invalid-swap streak.
    pub consecutive_errors: u32,
}

/// A single phase attempt.
#[derive(Debug)]
pub struct Session<R> {
    difficulty: Difficulty,
    phase: u32,
    config: DifficultyConfig,
    board: Board,
    rng: R,
    resolver: CascadeResolver,
    balances: Balances,
    score: u32,
    moves_made: u32,
    time_remaining: u32,
    consecutive_errors: u32,
    state: SessionState,
    cascade: Option<Cascade>,
    timeout_pending: bool,
    events: Vec<SessionEvent>,
    report: Option<SessionReport>,
}

impl<R: Rng> Session<R> {
    /// Creates a session on a freshly generated board.
    #[instrument(skip(rng))]
    pub fn new(difficulty: Difficulty, phase: u32, balances: Balances, mut rng: R) -> Self {
        let board = Board::generate(&mut rng);
        Self::with_board(difficulty, phase, balances, board, rng)
    }

    /// Creates a session on an existing board.
    ///
    /// The board must already satisfy the no-latent-match invariant.
    #[instrument(skip(board, rng))]
    pub fn with_board(
        difficulty: Difficulty,
        phase: u32,
        balances: Balances,
        board: Board,
        rng: R,
    ) -> Self {
        let config = difficulty.config();
        info!(
            phase,
            %difficulty,
            objective = config.score_objective,
            move_budget = config.move_budget,
            "Creating session"
        );
        Self {
            difficulty,
            phase,
            config,
            board,
            rng,
            resolver: CascadeResolver::new(),
            balances,
            score: 0,
            moves_made: 0,
            time_remaining: config.time_budget_secs,
            consecutive_errors: 0,
            state: SessionState::Idle,
            cascade: None,
            timeout_pending: false,
            events: Vec::new(),
            report: None,
        }
    }

    /// Replaces the cascade policy.
    pub fn with_resolver(mut self, resolver: CascadeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Starts the countdown and opens the board for input.
    ///
    /// Returns false if the session was already started.
    #[instrument(skip(self), fields(phase = self.phase))]
    pub fn start(&mut self) -> bool {
        if self.state != SessionState::Idle {
            warn!(state = ?self.state, "Session already started");
            return false;
        }
        self.ensure_playable();
        self.state = SessionState::AwaitingFirstSelection;
        info!(time_budget = self.config.time_budget_secs, "Session started");
        true
    }

    /// Applies a player tap on `cell`.
    #[instrument(skip(self), fields(phase = self.phase, state = ?self.state))]
    pub fn select(&mut self, cell: Cell) -> SelectOutcome {
        if !cell.in_bounds() {
            warn!(%cell, "Tap outside the board ignored");
            return SelectOutcome::Ignored;
        }

        let first = match self.state {
            SessionState::AwaitingFirstSelection => None,
            SessionState::AwaitingSecondSelection { first } => Some(first),
            _ => {
                debug!("Input locked");
                return SelectOutcome::Ignored;
            }
        };

        if self.balances.lives == 0 {
            self.state = SessionState::AwaitingFirstSelection;
            debug!("No lives left, tap refused");
            return SelectOutcome::OutOfLives;
        }

        let Some(first) = first else {
            self.state = SessionState::AwaitingSecondSelection { first: cell };
            return SelectOutcome::Selected(cell);
        };

        self.state = SessionState::AwaitingFirstSelection;

        if !first.is_adjacent(&cell) {
            debug!(%first, %cell, "Cells not adjacent, selection cleared");
            return SelectOutcome::SelectionCleared;
        }

        if !is_valid_swap(&self.board, first, cell) {
            self.consecutive_errors += 1;
            let mut life_lost = false;
            if self.consecutive_errors >= ERRORS_PER_LIFE {
                self.consecutive_errors = 0;
                life_lost = self.consume_life(LifeLossReason::ConsecutiveErrors);
            }
            info!(
                consecutive_errors = self.consecutive_errors,
                life_lost, "Invalid swap"
            );
            return SelectOutcome::InvalidSwap {
                consecutive_errors: self.consecutive_errors,
                life_lost,
            };
        }

        self.board.swap(first, cell);
        self.cascade = Some(self.resolver.begin());
        self.state = SessionState::Resolving;
        debug!(%first, %cell, "Swap committed, resolving");
        SelectOutcome::Resolving
    }

    /// Runs one cascade pass of the in-flight resolution.
    ///
    /// When the cascade settles the move is counted and terminal conditions
    /// are checked: objective first, then move budget, then a deferred expiry.
    #[instrument(skip(self), fields(phase = self.phase))]
    pub fn resolve_step(&mut self) -> ResolveStep {
        if self.state != SessionState::Resolving {
            return ResolveStep::NotResolving;
        }
        let Some(cascade) = self.cascade.as_mut() else {
            warn!("Resolving without a cascade");
            return ResolveStep::NotResolving;
        };

        match cascade.step(&mut self.board, &mut self.rng) {
            CascadeStep::Pass(pass) => ResolveStep::Pass(pass),
            CascadeStep::Settled => {
                let outcome = self
                    .cascade
                    .take()
                    .map(Cascade::finish)
                    .unwrap_or_default();
                let score_delta = outcome.score_delta();
                let state = self.settle(score_delta);
                ResolveStep::Settled { score_delta, state }
            }
        }
    }

    /// Runs the in-flight resolution to completion.
    pub fn resolve_all(&mut self) -> SessionState {
        while let ResolveStep::Pass(_) = self.resolve_step() {}
        self.state
    }

    /// Advances the countdown by one second.
    #[instrument(skip(self), fields(phase = self.phase, time_remaining = self.time_remaining))]
    pub fn tick(&mut self) -> TickOutcome {
        if self.state == SessionState::Idle || self.state.is_terminal() {
            return TickOutcome::Inactive;
        }

        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining > 0 {
            return TickOutcome::Running {
                time_remaining: self.time_remaining,
            };
        }

        if self.state == SessionState::Resolving {
            if !self.timeout_pending {
                info!("Time expired during resolution, deferring");
            }
            self.timeout_pending = true;
            return TickOutcome::Deferred;
        }

        let life_consumed = self.consume_life(LifeLossReason::TimeExpired);
        self.finish(SessionState::LostByTime, life_consumed);
        TickOutcome::Expired
    }

    /// Checks whether a life could be bought right now.
    ///
    /// Credits are checked against the authoritative wallet by the
    /// progression controller, which then calls back with fresh balances.
    pub fn purchase_precheck(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Resolving {
            return Err(SessionError::Busy);
        }
        if self.state.is_terminal() {
            return Err(SessionError::Finished);
        }
        if self.balances.lives > 0 {
            return Err(SessionError::LivesRemaining(self.balances.lives));
        }
        Ok(())
    }

    /// Records a completed life purchase; timer, score and moves are untouched.
    pub(crate) fn apply_life_purchase(&mut self, balances: Balances) {
        self.balances = balances;
        info!(lives = balances.lives, credits = balances.credits, "Life purchased mid-session");
        self.events.push(SessionEvent::LifePurchased {
            lives: balances.lives,
            credits: balances.credits,
        });
    }

    /// Overwrites the cached balances with authoritative values.
    pub fn sync_balances(&mut self, balances: Balances) {
        self.balances = balances;
    }

    /// Takes every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while input is locked by a resolution.
    pub fn is_locked(&self) -> bool {
        self.state == SessionState::Resolving
    }

    /// The board, for rendering.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Difficulty being played.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Phase being played.
    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Score so far.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Valid swaps made so far.
    pub fn moves_made(&self) -> u32 {
        self.moves_made
    }

    /// Seconds left on the countdown.
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    /// Current invalid-swap streak.
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Cached balances.
    pub fn balances(&self) -> Balances {
        self.balances
    }

    /// The final report, once the session is over.
    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    /// A valid swap on the current board, if any.
    pub fn hint(&self) -> Option<(Cell, Cell)> {
        find_valid_swap(&self.board)
    }

    /// Snapshot of the HUD fields.
    pub fn hud(&self) -> Hud {
        Hud {
            phase: self.phase,
            difficulty: self.difficulty,
            lives: self.balances.lives,
            credits: self.balances.credits,
            time_remaining: self.time_remaining,
            score: self.score,
            objective: self.config.score_objective,
            moves_made: self.moves_made,
            move_budget: self.config.move_budget,
            consecutive_errors: self.consecutive_errors,
        }
    }

    fn settle(&mut self, score_delta: u32) -> SessionState {
        self.score += score_delta;
        self.moves_made += 1;
        self.consecutive_errors = 0;
        info!(
            score_delta,
            score = self.score,
            moves_made = self.moves_made,
            "Move resolved"
        );

        if self.score >= self.config.score_objective {
            self.finish(SessionState::Won, false);
        } else if self.moves_made >= self.config.move_budget {
            let life_consumed = self.consume_life(LifeLossReason::MovesExhausted);
            self.finish(SessionState::LostByMoves, life_consumed);
        } else if self.timeout_pending {
            let life_consumed = self.consume_life(LifeLossReason::TimeExpired);
            self.finish(SessionState::LostByTime, life_consumed);
        } else {
            self.state = SessionState::AwaitingFirstSelection;
            self.ensure_playable();
        }
        self.state
    }

    fn consume_life(&mut self, reason: LifeLossReason) -> bool {
        let Some(lives_remaining) = self.balances.lives.checked_sub(1) else {
            debug!(%reason, "No life left to consume");
            return false;
        };
        self.balances.lives = lives_remaining;
        info!(%reason, lives_remaining, "Life lost");
        self.events.push(SessionEvent::LifeLost {
            reason,
            lives_remaining,
        });
        true
    }

    fn finish(&mut self, ending: SessionState, life_consumed: bool) {
        self.state = ending;
        if self.report.is_some() {
            return;
        }
        let report = SessionReport {
            won: ending == SessionState::Won,
            ending,
            phase: self.phase,
            difficulty: self.difficulty,
            score: self.score,
            objective: self.config.score_objective,
            moves_made: self.moves_made,
            move_budget: self.config.move_budget,
            time_spent_secs: self.config.time_budget_secs - self.time_remaining,
            consecutive_errors_at_end: self.consecutive_errors,
            life_consumed,
        };
        info!(?ending, score = self.score, "Session finished");
        self.events.push(SessionEvent::Finished(report.clone()));
        self.report = Some(report);
    }

    fn ensure_playable(&mut self) {
        let mut reshuffled = false;
        while find_valid_swap(&self.board).is_none() {
            self.board.regenerate(&mut self.rng);
            reshuffled = true;
        }
        if reshuffled {
            info!("Board had no valid move, reshuffled");
            self.events.push(SessionEvent::BoardReshuffled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{BOARD_SIZE, PieceKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const VALID: (Cell, Cell) = (Cell::new(0, 2), Cell::new(1, 2));
    const INVALID: (Cell, Cell) = (Cell::new(0, 4), Cell::new(0, 5));

    /// Striped board with one known valid swap (a run of four on row 0).
    fn fixture() -> Board {
        let mut kinds = [[PieceKind::Pumpkin; BOARD_SIZE]; BOARD_SIZE];
        for (row, line) in kinds.iter_mut().enumerate() {
            for (col, kind) in line.iter_mut().enumerate() {
                *kind = PieceKind::from_index(row + 2 * col);
            }
        }
        kinds[0][1] = PieceKind::Pumpkin;
        kinds[1][2] = PieceKind::Pumpkin;
        Board::from_kinds(kinds)
    }

    fn session(difficulty: Difficulty, lives: u32, credits: u32) -> Session<StdRng> {
        let mut session = Session::with_board(
            difficulty,
            1,
            Balances { lives, credits },
            fixture(),
            StdRng::seed_from_u64(99),
        );
        assert!(session.start());
        session
    }

    fn swap(session: &mut Session<StdRng>, (a, b): (Cell, Cell)) -> SelectOutcome {
        assert_eq!(session.select(a), SelectOutcome::Selected(a));
        session.select(b)
    }

    fn finished_count(events: &[SessionEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Finished(_)))
            .count()
    }

    #[test]
    fn test_start_opens_board() {
        let session = session(Difficulty::Easy, 3, 0);
        assert_eq!(session.state(), SessionState::AwaitingFirstSelection);
        assert_eq!(session.time_remaining(), 180);
    }

    #[test]
    fn test_two_invalid_swaps_cost_one_life() {
        let mut session = session(Difficulty::Easy, 3, 0);

        assert_eq!(
            swap(&mut session, INVALID),
            SelectOutcome::InvalidSwap {
                consecutive_errors: 1,
                life_lost: false
            }
        );
        assert_eq!(
            swap(&mut session, INVALID),
            SelectOutcome::InvalidSwap {
                consecutive_errors: 0,
                life_lost: true
            }
        );

        assert_eq!(session.balances().lives, 2);
        assert_eq!(session.consecutive_errors(), 0);
        assert_eq!(session.state(), SessionState::AwaitingFirstSelection);
        let events = session.drain_events();
        assert_eq!(
            events,
            vec![SessionEvent::LifeLost {
                reason: LifeLossReason::ConsecutiveErrors,
                lives_remaining: 2
            }]
        );
    }

    #[test]
    fn test_non_adjacent_clears_without_penalty() {
        let mut session = session(Difficulty::Easy, 3, 0);
        session.select(Cell::new(0, 0));
        assert_eq!(session.select(Cell::new(2, 2)), SelectOutcome::SelectionCleared);
        assert_eq!(session.consecutive_errors(), 0);
        assert_eq!(session.balances().lives, 3);
        assert_eq!(session.state().selected(), None);
    }

    #[test]
    fn test_identical_kinds_swap_is_invalid() {
        let mut session = session(Difficulty::Easy, 3, 0);
        let outcome = swap(&mut session, (Cell::new(0, 0), Cell::new(0, 1)));
        assert!(matches!(outcome, SelectOutcome::InvalidSwap { .. }));
    }

    #[test]
    fn test_valid_swap_locks_input_until_settled() {
        let mut session = session(Difficulty::Easy, 3, 0);
        assert_eq!(swap(&mut session, VALID), SelectOutcome::Resolving);
        assert!(session.is_locked());
        assert_eq!(session.select(Cell::new(5, 5)), SelectOutcome::Ignored);

        let first = session.resolve_step();
        assert_eq!(first, ResolveStep::Pass(CascadePass { matched: 4, points: 40 }));

        assert_eq!(session.resolve_all(), SessionState::AwaitingFirstSelection);
        assert!(session.score() >= 40);
        assert_eq!(session.moves_made(), 1);
        assert!(!session.board().has_latent_match());
    }

    #[test]
    fn test_last_move_without_objective_loses_by_moves() {
        let mut session = session(Difficulty::Hard, 3, 0);
        session.moves_made = session.config.move_budget - 1;

        swap(&mut session, VALID);
        assert_eq!(session.resolve_all(), SessionState::LostByMoves);

        assert_eq!(session.balances().lives, 2);
        let report = session.report().expect("report");
        assert!(!*report.won());
        assert!(*report.life_consumed());
        assert_eq!(*report.moves_made(), 20);
    }

    #[test]
    fn test_reaching_objective_wins() {
        let mut session = session(Difficulty::Easy, 3, 0);
        session.score = session.config.score_objective - 10;

        swap(&mut session, VALID);
        assert_eq!(session.resolve_all(), SessionState::Won);

        assert_eq!(session.balances().lives, 3);
        assert!(*session.report().expect("report").won());
        assert_eq!(finished_count(&session.drain_events()), 1);
    }

    #[test]
    fn test_timer_expiry_loses_by_time_once() {
        let mut session = session(Difficulty::Medium, 3, 0);
        session.time_remaining = 2;

        assert_eq!(session.tick(), TickOutcome::Running { time_remaining: 1 });
        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.tick(), TickOutcome::Inactive);

        assert_eq!(session.state(), SessionState::LostByTime);
        assert_eq!(session.balances().lives, 2);
        assert_eq!(*session.report().expect("report").time_spent_secs(), 120);
        assert_eq!(finished_count(&session.drain_events()), 1);
    }

    #[test]
    fn test_expiry_during_resolution_is_deferred() {
        let mut session = session(Difficulty::Easy, 3, 0);
        swap(&mut session, VALID);
        session.time_remaining = 1;

        assert_eq!(session.tick(), TickOutcome::Deferred);
        assert_eq!(session.state(), SessionState::Resolving);

        assert_eq!(session.resolve_all(), SessionState::LostByTime);
        assert_eq!(session.moves_made(), 1);
        assert!(session.score() >= 40);
        assert_eq!(session.balances().lives, 2);
    }

    #[test]
    fn test_committed_swap_wins_despite_deferred_expiry() {
        let mut session = session(Difficulty::Easy, 3, 0);
        session.score = session.config.score_objective - 10;
        swap(&mut session, VALID);
        session.time_remaining = 1;

        assert_eq!(session.tick(), TickOutcome::Deferred);
        assert_eq!(session.resolve_all(), SessionState::Won);
        assert_eq!(session.balances().lives, 3);
    }

    #[test]
    fn test_zero_lives_blocks_play_until_purchase() {
        let mut session = session(Difficulty::Easy, 0, 2);
        assert_eq!(session.select(Cell::new(0, 0)), SelectOutcome::OutOfLives);
        assert!(session.purchase_precheck().is_ok());

        session.apply_life_purchase(Balances { lives: 1, credits: 1 });

        assert_eq!(session.select(Cell::new(0, 0)), SelectOutcome::Selected(Cell::new(0, 0)));
        assert_eq!(session.time_remaining(), 180);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_purchase_refused_while_resolving_or_with_lives() {
        let mut session = session(Difficulty::Easy, 1, 2);
        assert_eq!(session.purchase_precheck(), Err(SessionError::LivesRemaining(1)));
        swap(&mut session, VALID);
        assert_eq!(session.purchase_precheck(), Err(SessionError::Busy));
    }

    #[test]
    fn test_expiry_with_zero_lives_consumes_nothing() {
        let mut session = session(Difficulty::Easy, 0, 0);
        session.time_remaining = 1;
        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.balances().lives, 0);
        assert!(!*session.report().expect("report").life_consumed());
    }

    #[test]
    fn test_score_never_decreases() {
        let mut session = Session::new(
            Difficulty::Easy,
            1,
            Balances { lives: 3, credits: 0 },
            StdRng::seed_from_u64(1234),
        );
        session.start();
        let mut last = 0;
        for _ in 0..10 {
            if session.state().is_terminal() {
                break;
            }
            let (a, b) = session.hint().expect("playable board");
            session.select(a);
            assert_eq!(session.select(b), SelectOutcome::Resolving);
            session.resolve_all();
            assert!(session.score() > last);
            last = session.score();
        }
    }
}
