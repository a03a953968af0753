//! Database persistence layer for players, balances, matches and rankings.

mod backend;
mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub use error::{DbError, DbErrorKind};
pub use models::{
    DailyRanking, GameConfigEntry, GameMatch, NewDailyRanking, NewGameConfigEntry, NewGameMatch,
    NewPlayerProgress, NewSurpriseBoxRecord, NewUser, NewWallet, PlayerProgress, RankingEntry,
    SurpriseBoxRecord, User, WalletRow,
};
pub use repository::{
    ArcadeRepository, RANKING_LIMIT, SURPRISE_BOX_CHANCE, SURPRISE_BOX_ENABLED,
    SURPRISE_BOX_PRIZE_AMOUNT, SURPRISE_BOX_PRIZE_KIND,
};

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
