//! Halloween Arcade - console front end
//!
//! Plays match-3 phases against a local sqlite database.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, ConfigAction};
use halloween_arcade::{
    ArcadeConfig, ArcadeRepository, DriverExit, DriverSettings, DriverUpdate, ProfileService,
    SessionCommand, SessionDriver, describe, parse_command, render_board, render_hud,
};
use halloween_match3::{GameConfigSource, PhaseAdvance, SurpriseBoxConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the database path.
const DB_PATH_ENV: &str = "HALLOWEEN_ARCADE_DB";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let repository = ArcadeRepository::new(config.db_path().clone())?;
    repository.run_migrations()?;
    let profiles = ProfileService::new(repository, *config.starting_lives());
    let user = profiles.get_or_create_player(config.player().clone())?;
    let player = *user.id();
    info!(player, name = %user.display_name(), "Player ready");

    match cli.command {
        Command::Status => show_status(&profiles, player),
        Command::Deposit { amount } => {
            let credits = profiles.deposit(player, amount)?;
            println!("Deposited {} credits, balance {}", amount, credits);
            Ok(())
        }
        Command::BuyLives { amount } => {
            let balances = profiles.progression(player)?.buy_lives(amount)?;
            println!(
                "Bought {} lives: {} lives, {} credits",
                amount, balances.lives, balances.credits
            );
            Ok(())
        }
        Command::Play { pacing_ms } => {
            let config = match pacing_ms {
                Some(pacing_ms) => config.with_pacing_ms(pacing_ms),
                None => config,
            };
            play(&profiles, player, &config).await
        }
        Command::OpenBox => open_box(&profiles, player, &config),
        Command::Ranking { date } => show_ranking(&profiles, date),
        Command::History { limit } => show_history(&profiles, player, limit),
        Command::Config { action } => run_config(&profiles, action),
    }
}

/// Loads the config file, then applies environment and command-line overrides.
#[instrument(skip(cli))]
fn load_config(cli: &Cli) -> Result<ArcadeConfig> {
    let mut config = ArcadeConfig::load_or_default(&cli.config)?;
    if let Ok(db_path) = std::env::var(DB_PATH_ENV) {
        config = config.with_db_path(db_path);
    }
    if let Some(db_path) = &cli.db_path {
        config = config.with_db_path(db_path.clone());
    }
    if let Some(player) = &cli.player {
        config = config.with_player(player.clone());
    }
    if cli.seed.is_some() {
        config = config.with_seed(cli.seed);
    }
    Ok(config)
}

fn rng(config: &ArcadeConfig) -> StdRng {
    match config.seed() {
        Some(seed) => StdRng::seed_from_u64(*seed),
        None => StdRng::from_os_rng(),
    }
}

fn show_status(profiles: &ProfileService, player: i32) -> Result<()> {
    let data = profiles.player_data(player)?;
    let progression = profiles.progression(player)?;
    println!(
        "Phase {} ({}) | Cycles completed {} | Total score {}",
        data.progress.current_phase,
        progression.current_difficulty(),
        data.progress.cycles_completed,
        data.progress.total_score
    );
    println!(
        "Lives {} | Credits {}",
        data.balances.lives, data.balances.credits
    );
    if data.progress.surprise_box_pending {
        println!("A surprise box is waiting: run `open-box`");
    }
    Ok(())
}

#[instrument(skip(profiles, config))]
async fn play(profiles: &ProfileService, player: i32, config: &ArcadeConfig) -> Result<()> {
    let mut progression = profiles.progression(player)?;
    let session = progression.start_session(rng(config))?;

    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(16);
    let driver = SessionDriver::new(
        progression,
        session,
        DriverSettings::new(config.pacing()),
        update_tx,
    );

    let printer = tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            match &update {
                DriverUpdate::Frame {
                    board,
                    hud,
                    selected,
                } => {
                    println!("\n{}\n{}", render_board(board, *selected), render_hud(hud));
                }
                other => {
                    if let Some(message) = describe(other) {
                        println!("{}", message);
                    }
                }
            }
        }
    });

    println!("Enter `<row> <col>` to select, `hint`, `buy` or `quit`.");
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_command(&line) {
                Some(command) => {
                    if command_tx.send(command).await.is_err() {
                        break;
                    }
                }
                None => println!("Unrecognised input: {}", line.trim()),
            }
        }
        // End of input counts as quitting.
        let _ = command_tx.send(SessionCommand::Quit).await;
    });

    let exit = driver.run(command_rx).await?;
    reader.abort();
    if let Err(err) = printer.await {
        warn!(error = %err, "Printer task failed");
    }

    match exit {
        DriverExit::Finished { report, advance } => {
            println!(
                "Session over: {} points in {} moves",
                report.score(),
                report.moves_made()
            );
            match advance {
                PhaseAdvance::Advanced { next_phase } => println!("Next up: phase {}", next_phase),
                PhaseAdvance::SurpriseBoxUnlocked { cycle } => {
                    println!("Cycle {} complete! Run `open-box` for your surprise box", cycle)
                }
                PhaseAdvance::Retry { phase, lives } => {
                    println!("Phase {} must be replayed; {} lives left", phase, lives)
                }
            }
        }
        DriverExit::Abandoned { .. } => println!("Session abandoned"),
    }
    Ok(())
}

fn open_box(profiles: &ProfileService, player: i32, config: &ArcadeConfig) -> Result<()> {
    let mut progression = profiles.progression(player)?;
    let outcome = progression.open_surprise_box(&mut rng(config))?;
    match outcome.prize {
        Some(prize) => println!(
            "Cycle {} box: you won {} {}!",
            outcome.cycle_number, prize.amount, prize.kind
        ),
        None => println!("Cycle {} box: no prize this time", outcome.cycle_number),
    }
    println!("Phase reset to 1");
    Ok(())
}

fn show_ranking(profiles: &ProfileService, date: Option<chrono::NaiveDate>) -> Result<()> {
    let entries = profiles.ranking(date)?;
    if entries.is_empty() {
        println!("No completed matches yet");
    }
    for entry in entries {
        let ranking = entry.ranking();
        println!(
            "{:>3}. {:<20} {:>8} pts  {:>3} matches  best {}",
            entry.position(),
            entry.display_name(),
            ranking.total_score(),
            ranking.matches_played(),
            ranking.highest_difficulty()
        );
    }
    Ok(())
}

fn show_history(profiles: &ProfileService, player: i32, limit: i64) -> Result<()> {
    let (matches, boxes) = profiles.history(player, limit)?;
    for game in &matches {
        println!(
            "{}  phase {:>2} {:<6} {:>5}/{:<5} {}",
            game.created_at().format("%Y-%m-%d %H:%M"),
            game.phase(),
            game.difficulty(),
            game.score(),
            game.objective_value(),
            if *game.completed() { "won" } else { "lost" }
        );
    }
    for record in &boxes {
        let outcome = record.outcome()?;
        let prize = outcome
            .prize
            .map(|p| format!("{} {}", p.amount, p.kind))
            .unwrap_or_else(|| "nothing".to_string());
        println!("cycle {:>3} box: {}", outcome.cycle_number, prize);
    }
    Ok(())
}

fn run_config(profiles: &ProfileService, action: ConfigAction) -> Result<()> {
    let repository = profiles.repository();
    match action {
        ConfigAction::Show => {
            for entry in repository.list_config()? {
                println!(
                    "{} = {}{}",
                    entry.key(),
                    entry.value(),
                    entry
                        .description()
                        .as_ref()
                        .map(|d| format!("  # {}", d))
                        .unwrap_or_default()
                );
            }
            let effective = repository.surprise_box_config().unwrap_or_else(|err| {
                warn!(error = %err, "Surprise box config unavailable");
                SurpriseBoxConfig::disabled()
            });
            println!("Effective surprise box: {:?}", effective);
        }
        ConfigAction::Set {
            key,
            value,
            description,
        } => {
            let json = serde_json::from_str(&value)
                .unwrap_or_else(|_| serde_json::Value::String(value.clone()));
            repository.set_config(&key, &json, description)?;
            println!("{} = {}", key, json);
        }
    }
    Ok(())
}
