//! Halloween Match-3 arcade.
//!
//! Deploys the `halloween_match3` engine: sqlite persistence behind the
//! engine's collaborator traits, a daily ranking, deployment tunables, a
//! real-time session driver and a console front end.
//!
//! # Architecture
//!
//! - **Database**: diesel repository implementing the store, wallet, recorder and config traits
//! - **Profiles**: get-or-create players and hand out progression controllers
//! - **Driver**: tokio loop serializing timer ticks and player commands
//! - **Console**: text rendering and input parsing
//! - **Config**: TOML settings with command-line overrides

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod console;
mod db;
mod driver;
mod profile_service;

// Crate-level exports - Configuration
pub use config::{ArcadeConfig, ConfigError};

// Crate-level exports - Console presentation
pub use console::{describe, parse_command, render_board, render_hud};

// Crate-level exports - Database
pub use db::{
    ArcadeRepository, DailyRanking, DbError, DbErrorKind, GameConfigEntry, GameMatch, MIGRATIONS,
    NewDailyRanking, NewGameConfigEntry, NewGameMatch, NewPlayerProgress, NewSurpriseBoxRecord,
    NewUser, NewWallet, PlayerProgress, RANKING_LIMIT, RankingEntry, SURPRISE_BOX_CHANCE,
    SURPRISE_BOX_ENABLED, SURPRISE_BOX_PRIZE_AMOUNT, SURPRISE_BOX_PRIZE_KIND, SurpriseBoxRecord,
    User, WalletRow,
};

// Crate-level exports - Session driver
pub use driver::{DriverExit, DriverSettings, DriverUpdate, SessionCommand, SessionDriver};

// Crate-level exports - Profiles
pub use profile_service::ProfileService;
