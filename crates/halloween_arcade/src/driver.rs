//! Real-time session driver.
//!
//! Timer ticks and player commands are serialized through one `select!` loop,
//! so the session sees exactly one input at a time. While a cascade resolves,
//! passes are paced by a presentation delay; commands that arrive meanwhile
//! are applied immediately and bounce off the locked board instead of queuing.

use std::time::Duration;

use halloween_match3::{
    ArcadeBackend, Balances, Board, CascadePass, Cell, Hud, PhaseAdvance, ProgressionController,
    ProgressionError, ResolveStep, SelectOutcome, Session, SessionEvent, SessionReport,
    SessionState, TickOutcome,
};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval};
use tracing::{debug, info, instrument, warn};

/// Player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Tap a cell.
    Select(Cell),
    /// Buy one life with one credit.
    BuyLife,
    /// Ask for a valid swap.
    Hint,
    /// Leave the session without finishing it.
    Quit,
}

/// Everything the presentation layer is told.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverUpdate {
    /// Board and HUD after a change.
    Frame {
        /// Current board.
        board: Board,
        /// Current HUD.
        hud: Hud,
        /// Cell awaiting its partner, if any.
        selected: Option<Cell>,
    },
    /// Result of a tap.
    Selection(SelectOutcome),
    /// A cascade pass cleared pieces.
    Pass(CascadePass),
    /// The cascade settled.
    Settled {
        /// Points the move earned.
        score_delta: u32,
        /// State after terminal checks.
        state: SessionState,
    },
    /// Countdown moved.
    Tick(TickOutcome),
    /// Result of a life purchase.
    Purchase(Result<Balances, ProgressionError>),
    /// Answer to a hint request.
    Hint(Option<(Cell, Cell)>),
    /// A session event, after it was applied to stored progress.
    Event(SessionEvent),
}

/// How a driven session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverExit {
    /// The session reached a terminal state and progression was updated.
    Finished {
        /// Final statistics.
        report: SessionReport,
        /// What the result did to progression.
        advance: PhaseAdvance,
    },
    /// The player left early.
    Abandoned {
        /// State at the time of leaving.
        state: SessionState,
    },
}

/// Timing of the driver loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    tick: Duration,
    pacing: Duration,
}

impl DriverSettings {
    /// One-second ticks with the given cascade pacing.
    pub fn new(pacing: Duration) -> Self {
        Self {
            tick: Duration::from_secs(1),
            pacing,
        }
    }

    /// Timer tick period.
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Delay between cascade passes.
    pub fn pacing(&self) -> Duration {
        self.pacing
    }
}

/// Drives one session in real time, feeding its events to progression.
#[derive(Debug)]
pub struct SessionDriver<B, R> {
    progression: ProgressionController<B>,
    session: Session<R>,
    settings: DriverSettings,
    updates: mpsc::UnboundedSender<DriverUpdate>,
}

impl<B: ArcadeBackend, R: Rng> SessionDriver<B, R> {
    /// Creates a driver for a started session.
    #[instrument(skip_all, fields(phase = session.phase()))]
    pub fn new(
        progression: ProgressionController<B>,
        session: Session<R>,
        settings: DriverSettings,
        updates: mpsc::UnboundedSender<DriverUpdate>,
    ) -> Self {
        info!(pacing_ms = settings.pacing.as_millis() as u64, "Creating SessionDriver");
        Self {
            progression,
            session,
            settings,
            updates,
        }
    }

    /// Runs until the session finishes or the player quits.
    ///
    /// A closed command channel counts as quitting. Collaborator failures
    /// while applying session events abort the run.
    #[instrument(skip_all, fields(player = self.progression.player(), phase = self.session.phase()))]
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
    ) -> Result<DriverExit, ProgressionError> {
        let mut ticker = time::interval_at(Instant::now() + self.settings.tick, self.settings.tick);
        self.publish_frame();

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick(),
                command = commands.recv() => match command {
                    Some(SessionCommand::Quit) | None => return Ok(self.abandon()),
                    Some(command) => self.on_command(command),
                },
            }

            if let Some(exit) = self.sync()? {
                return Ok(exit);
            }
            if self.session.is_locked()
                && let Some(exit) = self.resolve(&mut ticker, &mut commands).await?
            {
                return Ok(exit);
            }
        }
    }

    async fn resolve(
        &mut self,
        ticker: &mut Interval,
        commands: &mut mpsc::Receiver<SessionCommand>,
    ) -> Result<Option<DriverExit>, ProgressionError> {
        // One deadline per pass; ticks and taps must not push it back.
        let pacing = time::sleep(self.settings.pacing);
        tokio::pin!(pacing);
        while self.session.is_locked() {
            tokio::select! {
                _ = ticker.tick() => self.on_tick(),
                () = &mut pacing => {
                    self.on_resolve_step();
                    pacing.as_mut().reset(Instant::now() + self.settings.pacing);
                }
                command = commands.recv() => match command {
                    Some(SessionCommand::Quit) | None => return Ok(Some(self.abandon())),
                    Some(command) => self.on_command(command),
                },
            }

            if let Some(exit) = self.sync()? {
                return Ok(Some(exit));
            }
        }
        Ok(None)
    }

    fn on_tick(&mut self) {
        let outcome = self.session.tick();
        if outcome != TickOutcome::Inactive {
            self.publish(DriverUpdate::Tick(outcome));
        }
    }

    fn on_resolve_step(&mut self) {
        match self.session.resolve_step() {
            ResolveStep::Pass(pass) => self.publish(DriverUpdate::Pass(pass)),
            ResolveStep::Settled { score_delta, state } => {
                self.publish(DriverUpdate::Settled { score_delta, state })
            }
            ResolveStep::NotResolving => {}
        }
        self.publish_frame();
    }

    fn on_command(&mut self, command: SessionCommand) {
        debug!(?command, state = ?self.session.state(), "Command received");
        match command {
            SessionCommand::Select(cell) => {
                let outcome = self.session.select(cell);
                self.publish(DriverUpdate::Selection(outcome));
            }
            SessionCommand::BuyLife => {
                let result = self.progression.buy_life_in_session(&mut self.session);
                if let Err(err) = &result {
                    info!(error = %err, "Life purchase refused");
                }
                self.publish(DriverUpdate::Purchase(result));
            }
            SessionCommand::Hint => {
                let hint = self.session.hint();
                self.publish(DriverUpdate::Hint(hint));
            }
            SessionCommand::Quit => {}
        }
        self.publish_frame();
    }

    /// Applies pending session events to progression.
    ///
    /// Every drained event is applied and published even when an earlier one
    /// fails; the first error is returned afterwards.
    fn sync(&mut self) -> Result<Option<DriverExit>, ProgressionError> {
        let mut finished = None;
        let mut first_error = None;
        for event in self.session.drain_events() {
            match self.progression.handle_event(&event) {
                Ok(advance) => {
                    if let (SessionEvent::Finished(report), Some(advance)) = (&event, advance) {
                        finished = Some(DriverExit::Finished {
                            report: report.clone(),
                            advance,
                        });
                    }
                }
                Err(err) => {
                    warn!(error = %err, ?event, "Session event failed to apply");
                    first_error.get_or_insert(err);
                }
            }
            self.publish(DriverUpdate::Event(event));
        }
        self.session.sync_balances(self.progression.balances());
        if finished.is_some() || first_error.is_some() {
            self.publish_frame();
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(finished),
        }
    }

    fn abandon(&self) -> DriverExit {
        let state = self.session.state();
        warn!(?state, "Session abandoned");
        DriverExit::Abandoned { state }
    }

    fn publish_frame(&self) {
        self.publish(DriverUpdate::Frame {
            board: self.session.board().clone(),
            hud: self.session.hud(),
            selected: self.session.state().selected(),
        });
    }

    fn publish(&self, update: DriverUpdate) {
        if self.updates.send(update).is_err() {
            debug!("Update receiver dropped");
        }
    }
}
