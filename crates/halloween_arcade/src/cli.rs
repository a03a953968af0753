//! Command-line interface for halloween_arcade.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Halloween Match-3 arcade - play phases, buy lives, open surprise boxes
#[derive(Parser, Debug)]
#[command(name = "halloween_arcade")]
#[command(about = "Halloween Match-3 arcade console", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "halloween_arcade.toml")]
    pub config: PathBuf,

    /// Database file (overrides the configuration)
    #[arg(long)]
    pub db_path: Option<String>,

    /// Player profile name (overrides the configuration)
    #[arg(short, long)]
    pub player: Option<String>,

    /// Seed for boards and surprise-box draws (overrides the configuration)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show progress and balances
    Status,

    /// Credit the wallet (stands in for a confirmed payment)
    Deposit {
        /// Credits to add
        amount: u32,
    },

    /// Buy lives with credits, one credit each
    BuyLives {
        /// Lives to buy
        amount: u32,
    },

    /// Play the current phase in the console
    Play {
        /// Delay between cascade passes in milliseconds (overrides the configuration)
        #[arg(long)]
        pacing_ms: Option<u64>,
    },

    /// Open the pending surprise box
    OpenBox,

    /// Show the daily ranking
    Ranking {
        /// Day to show (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show recent matches and surprise boxes
    History {
        /// Matches to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },

    /// Inspect or change deployment tunables
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Tunable actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// List stored tunables and the effective surprise-box settings
    Show,

    /// Store a tunable as JSON (bare words are stored as strings)
    Set {
        /// Key, e.g. surprise_box_enabled
        key: String,

        /// Value, e.g. true, 5 or lives
        value: String,

        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
}
