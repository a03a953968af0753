//! Plain-text presentation: board and HUD rendering, update messages, input parsing.

use halloween_match3::{
    BOARD_SIZE, Board, Cell, Hud, LifeLossReason, SelectOutcome, SessionEvent, SessionState,
    TickOutcome,
};

use crate::driver::{DriverUpdate, SessionCommand};

/// Renders the board with row and column labels, bracketing `selected`.
pub fn render_board(board: &Board, selected: Option<Cell>) -> String {
    let mut out = String::from("   ");
    for col in 0..BOARD_SIZE {
        out.push_str(&format!(" {}  ", col));
    }
    for (row, pieces) in board.rows().enumerate() {
        out.push('\n');
        out.push_str(&format!(" {} ", row));
        for piece in pieces {
            let symbol = piece.kind().symbol();
            if selected == Some(piece.cell()) {
                out.push_str(&format!("[{}]", symbol));
            } else {
                out.push_str(&format!(" {} ", symbol));
            }
        }
    }
    out
}

/// One-line HUD.
pub fn render_hud(hud: &Hud) -> String {
    format!(
        "Phase {} ({}) | Lives {} | Credits {} | Time {}s | Score {}/{} | Moves {}/{} | Errors {}",
        hud.phase,
        hud.difficulty,
        hud.lives,
        hud.credits,
        hud.time_remaining,
        hud.score,
        hud.objective,
        hud.moves_made,
        hud.move_budget,
        hud.consecutive_errors,
    )
}

/// Message for an update, or `None` for updates shown only as frames.
pub fn describe(update: &DriverUpdate) -> Option<String> {
    let text = match update {
        DriverUpdate::Frame { .. } | DriverUpdate::Tick(TickOutcome::Running { .. }) => {
            return None;
        }
        DriverUpdate::Selection(outcome) => match outcome {
            SelectOutcome::Ignored => "Board is busy".to_string(),
            SelectOutcome::OutOfLives => "No lives left: type `buy` to continue".to_string(),
            SelectOutcome::Selected(cell) => format!("Selected {}", cell),
            SelectOutcome::SelectionCleared => "Not adjacent, selection cleared".to_string(),
            SelectOutcome::InvalidSwap {
                consecutive_errors,
                life_lost,
            } => {
                if *life_lost {
                    "No match! Two misses in a row cost a life".to_string()
                } else {
                    format!("No match! ({} miss in a row)", consecutive_errors)
                }
            }
            SelectOutcome::Resolving => "Swap!".to_string(),
        },
        DriverUpdate::Pass(pass) => format!("Matched {} pieces: +{}", pass.matched, pass.points),
        DriverUpdate::Settled { score_delta, .. } => format!("Move scored {}", score_delta),
        DriverUpdate::Tick(TickOutcome::Deferred) => "Time is up, finishing the cascade".to_string(),
        DriverUpdate::Tick(_) => return None,
        DriverUpdate::Purchase(Ok(balances)) => format!(
            "Bought a life: {} lives, {} credits",
            balances.lives, balances.credits
        ),
        DriverUpdate::Purchase(Err(err)) => format!("Cannot buy a life: {}", err),
        DriverUpdate::Hint(Some((a, b))) => format!("Try swapping {} and {}", a, b),
        DriverUpdate::Hint(None) => "No move available".to_string(),
        DriverUpdate::Event(event) => describe_event(event)?,
    };
    Some(text)
}

fn describe_event(event: &SessionEvent) -> Option<String> {
    let text = match event {
        SessionEvent::LifeLost {
            reason,
            lives_remaining,
        } => {
            let cause = match reason {
                LifeLossReason::ConsecutiveErrors => "too many misses",
                LifeLossReason::MovesExhausted => "out of moves",
                LifeLossReason::TimeExpired => "out of time",
            };
            format!("Lost a life ({}): {} left", cause, lives_remaining)
        }
        SessionEvent::LifePurchased { .. } => return None,
        SessionEvent::BoardReshuffled => "No moves left, board reshuffled".to_string(),
        SessionEvent::Finished(report) => match report.ending() {
            SessionState::Won => format!("Phase {} cleared with {} points!", report.phase(), report.score()),
            SessionState::LostByMoves => format!("Out of moves at {} points", report.score()),
            _ => format!("Time over at {} points", report.score()),
        },
    };
    Some(text)
}

/// Parses a line of player input.
///
/// Accepts `<row> <col>`, `buy`, `hint` and `quit`.
pub fn parse_command(line: &str) -> Option<SessionCommand> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "buy" | "b" => return Some(SessionCommand::BuyLife),
        "hint" | "h" => return Some(SessionCommand::Hint),
        "quit" | "q" => return Some(SessionCommand::Quit),
        _ => {}
    }
    let mut parts = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty());
    let row = parts.next()?.parse().ok()?;
    let col = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(SessionCommand::Select(Cell::new(row, col)))
}
