//! Database repository for players, balances, matches, rankings and tunables.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use diesel::dsl::now;
use diesel::prelude::*;
use diesel_migrations::MigrationHarness;
use halloween_match3::{
    Balances, MatchRecord, PrizeKind, ProgressSnapshot, SurpriseBoxConfig, SurpriseBoxOutcome,
};
use tracing::{debug, info, instrument, warn};

use crate::db::models::{balances, from_db, to_db};
use crate::db::{
    DailyRanking, DbError, GameConfigEntry, GameMatch, MIGRATIONS, NewDailyRanking, NewGameConfigEntry,
    NewGameMatch, NewPlayerProgress, NewSurpriseBoxRecord, NewUser, NewWallet, PlayerProgress,
    RankingEntry, SurpriseBoxRecord, User, WalletRow, schema,
};

/// Rows returned by the daily ranking query.
pub const RANKING_LIMIT: i64 = 100;

/// Config key: whether surprise boxes pay out (JSON bool).
pub const SURPRISE_BOX_ENABLED: &str = "surprise_box_enabled";
/// Config key: win chance in percent (JSON integer, 0-100).
pub const SURPRISE_BOX_CHANCE: &str = "surprise_box_chance";
/// Config key: prize balance, `"lives"` or `"credits"` (JSON string).
pub const SURPRISE_BOX_PRIZE_KIND: &str = "surprise_box_prize_kind";
/// Config key: prize amount (JSON integer).
pub const SURPRISE_BOX_PRIZE_AMOUNT: &str = "surprise_box_prize_amount";

/// Database repository for arcade operations.
#[derive(Debug, Clone)]
pub struct ArcadeRepository {
    db_path: String,
}

impl ArcadeRepository {
    /// Creates a new repository for the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path))]
    pub fn new(db_path: impl Into<String>) -> Result<Self, DbError> {
        let db_path = db_path.into();
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating ArcadeRepository");
        Ok(Self { db_path })
    }

    /// Path of the database file.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        Ok(SqliteConnection::establish(&self.db_path)?)
    }

    /// Applies pending schema migrations. Returns how many ran.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(applied.len())
    }

    /// Creates a new user profile.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the display name is already taken or a database error occurs.
    #[instrument(skip(self))]
    pub fn create_user(&self, display_name: String) -> Result<User, DbError> {
        let mut conn = self.connection()?;
        let user = diesel::insert_into(schema::users::table)
            .values(&NewUser::new(display_name))
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        info!(user_id = user.id(), display_name = %user.display_name(), "User created");
        Ok(user)
    }

    /// Gets a user by display name. Returns `None` if not found.
    #[instrument(skip(self))]
    pub fn get_user_by_name(&self, display_name: &str) -> Result<Option<User>, DbError> {
        let mut conn = self.connection()?;
        let user = schema::users::table
            .filter(schema::users::display_name.eq(display_name))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;

        debug!(found = user.is_some(), "User lookup");
        Ok(user)
    }

    /// Lists all users, oldest first.
    #[instrument(skip(self))]
    pub fn list_users(&self) -> Result<Vec<User>, DbError> {
        let mut conn = self.connection()?;
        let users = schema::users::table
            .order(schema::users::created_at.asc())
            .select(User::as_select())
            .load(&mut conn)?;
        debug!(count = users.len(), "Users loaded");
        Ok(users)
    }

    /// Creates progress and wallet rows for a user if they are missing.
    #[instrument(skip(self))]
    pub fn ensure_player(&self, user_id: i32, starting_lives: u32) -> Result<(), DbError> {
        let lives = to_db(starting_lives)?;
        let mut conn = self.connection()?;
        conn.transaction::<_, DbError, _>(|conn| {
            let progress = diesel::insert_into(schema::player_progress::table)
                .values(&NewPlayerProgress::new(user_id, lives))
                .on_conflict_do_nothing()
                .execute(conn)?;
            let wallet = diesel::insert_into(schema::wallets::table)
                .values(&NewWallet::new(user_id, 0))
                .on_conflict_do_nothing()
                .execute(conn)?;
            if progress + wallet > 0 {
                info!(user_id, lives, "Player rows initialised");
            }
            Ok(())
        })
    }

    /// Loads the progress and wallet rows of a player.
    #[instrument(skip(self))]
    pub fn player_rows(&self, user_id: i32) -> Result<(PlayerProgress, WalletRow), DbError> {
        let mut conn = self.connection()?;
        load_rows(&mut conn, user_id)
    }

    /// Removes one life, refusing at zero. Returns lives remaining.
    #[instrument(skip(self))]
    pub fn take_life(&self, user_id: i32) -> Result<u32, DbError> {
        let mut conn = self.connection()?;
        conn.transaction(|conn| adjust_lives(conn, user_id, -1))
    }

    /// Adds lives. Returns the new total.
    #[instrument(skip(self))]
    pub fn grant_lives(&self, user_id: i32, amount: u32) -> Result<u32, DbError> {
        let mut conn = self.connection()?;
        conn.transaction(|conn| adjust_lives(conn, user_id, i64::from(amount)))
    }

    /// Current credit balance.
    #[instrument(skip(self))]
    pub fn wallet_balance(&self, user_id: i32) -> Result<u32, DbError> {
        let mut conn = self.connection()?;
        let credits = schema::wallets::table
            .find(user_id)
            .select(schema::wallets::credits)
            .first::<i32>(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::not_found(format!("No wallet for user {}", user_id)))?;
        from_db(credits)
    }

    /// Removes credits, refusing if the balance would go negative.
    #[instrument(skip(self))]
    pub fn withdraw(&self, user_id: i32, amount: u32) -> Result<u32, DbError> {
        let mut conn = self.connection()?;
        conn.transaction(|conn| adjust_credits(conn, user_id, -i64::from(amount)))
    }

    /// Adds credits.
    #[instrument(skip(self))]
    pub fn deposit(&self, user_id: i32, amount: u32) -> Result<u32, DbError> {
        let mut conn = self.connection()?;
        conn.transaction(|conn| adjust_credits(conn, user_id, i64::from(amount)))
    }

    /// Moves `amount * price` credits into `amount` lives in one transaction.
    ///
    /// Either both balances change or neither does.
    #[instrument(skip(self))]
    pub fn purchase_lives(&self, user_id: i32, amount: u32, price: u32) -> Result<Balances, DbError> {
        let cost = amount
            .checked_mul(price)
            .ok_or_else(|| DbError::rejected("Purchase cost overflows"))?;
        let mut conn = self.connection()?;
        let balances = conn.transaction::<_, DbError, _>(|conn| {
            let credits = adjust_credits(conn, user_id, -i64::from(cost))?;
            let lives = adjust_lives(conn, user_id, i64::from(amount))?;
            Ok(Balances { lives, credits })
        })?;
        info!(amount, cost, lives = balances.lives, credits = balances.credits, "Lives purchased");
        Ok(balances)
    }

    /// Persists phase, cycle, lifetime score and the pending box flag.
    #[instrument(skip(self, progress), fields(phase = progress.current_phase))]
    pub fn update_progress(&self, user_id: i32, progress: &ProgressSnapshot) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        write_progress(&mut conn, user_id, progress)
    }

    /// Records a match, accruing completed ones into today's ranking.
    #[instrument(skip(self, record), fields(player = record.player_id()))]
    pub fn insert_match(&self, record: &MatchRecord) -> Result<GameMatch, DbError> {
        self.insert_match_on(record, Utc::now().date_naive())
    }

    /// Records a match, accruing completed ones into the ranking of `date`.
    #[instrument(skip(self, record), fields(player = record.player_id(), completed = record.completed()))]
    pub fn insert_match_on(&self, record: &MatchRecord, date: NaiveDate) -> Result<GameMatch, DbError> {
        let row = NewGameMatch::try_from(record)?;
        let mut conn = self.connection()?;
        let recorded = conn.transaction::<_, DbError, _>(|conn| {
            let recorded = diesel::insert_into(schema::game_matches::table)
                .values(&row)
                .returning(GameMatch::as_returning())
                .get_result(conn)?;
            if *record.completed() {
                accrue_ranking(conn, record, date)?;
            }
            Ok(recorded)
        })?;
        info!(match_id = recorded.id(), score = recorded.score(), "Match recorded");
        Ok(recorded)
    }

    /// Most recent matches of a player.
    #[instrument(skip(self))]
    pub fn list_matches(&self, user_id: i32, limit: i64) -> Result<Vec<GameMatch>, DbError> {
        let mut conn = self.connection()?;
        let matches = schema::game_matches::table
            .filter(schema::game_matches::user_id.eq(user_id))
            .order((schema::game_matches::created_at.desc(), schema::game_matches::id.desc()))
            .limit(limit)
            .select(GameMatch::as_select())
            .load(&mut conn)?;
        debug!(count = matches.len(), "Matches loaded");
        Ok(matches)
    }

    /// Top of the ranking for `date`, highest score first.
    #[instrument(skip(self))]
    pub fn daily_ranking(&self, date: NaiveDate) -> Result<Vec<RankingEntry>, DbError> {
        use schema::daily_ranking::dsl;

        let mut conn = self.connection()?;
        let rows = dsl::daily_ranking
            .inner_join(schema::users::table)
            .filter(dsl::date.eq(date))
            .order((dsl::total_score.desc(), dsl::matches_played.asc(), dsl::id.asc()))
            .limit(RANKING_LIMIT)
            .select((DailyRanking::as_select(), schema::users::display_name))
            .load::<(DailyRanking, String)>(&mut conn)?;

        info!(%date, count = rows.len(), "Daily ranking loaded");
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(index, (ranking, name))| RankingEntry::new(index + 1, name, ranking))
            .collect())
    }

    /// A player's ranking row for `date`, if any.
    #[instrument(skip(self))]
    pub fn ranking_for(&self, user_id: i32, date: NaiveDate) -> Result<Option<DailyRanking>, DbError> {
        let mut conn = self.connection()?;
        find_ranking(&mut conn, user_id, date)
    }

    /// Records a surprise-box draw.
    #[instrument(skip(self, outcome), fields(cycle = outcome.cycle_number, won = outcome.won))]
    pub fn insert_surprise_box(
        &self,
        user_id: i32,
        outcome: &SurpriseBoxOutcome,
    ) -> Result<SurpriseBoxRecord, DbError> {
        let mut conn = self.connection()?;
        write_surprise_box(&mut conn, user_id, outcome)
    }

    /// Settles a pending surprise box in one transaction: the draw is
    /// recorded, its prize paid and `progress` saved.
    ///
    /// Refuses when no box is pending, so a retried settle never pays twice.
    #[instrument(skip(self, outcome, progress), fields(cycle = outcome.cycle_number, won = outcome.won))]
    pub fn settle_surprise_box(
        &self,
        user_id: i32,
        outcome: &SurpriseBoxOutcome,
        progress: &ProgressSnapshot,
    ) -> Result<Balances, DbError> {
        let mut conn = self.connection()?;
        let balances = conn.transaction::<_, DbError, _>(|conn| {
            let (pending, _) = load_rows(conn, user_id)?;
            if !*pending.surprise_box_pending() {
                return Err(DbError::rejected(format!(
                    "No surprise box pending for user {}",
                    user_id
                )));
            }
            write_surprise_box(conn, user_id, outcome)?;
            if let Some(prize) = outcome.prize {
                match prize.kind {
                    PrizeKind::Lives => adjust_lives(conn, user_id, i64::from(prize.amount))?,
                    PrizeKind::Credits => adjust_credits(conn, user_id, i64::from(prize.amount))?,
                };
            }
            write_progress(conn, user_id, progress)?;
            let (row, wallet) = load_rows(conn, user_id)?;
            balances(&row, &wallet)
        })?;
        info!(lives = balances.lives, credits = balances.credits, "Surprise box settled");
        Ok(balances)
    }

    /// Every surprise-box draw of a player, most recent first.
    #[instrument(skip(self))]
    pub fn list_surprise_boxes(&self, user_id: i32) -> Result<Vec<SurpriseBoxRecord>, DbError> {
        use schema::surprise_box_history::dsl;

        let mut conn = self.connection()?;
        let records = dsl::surprise_box_history
            .filter(dsl::user_id.eq(user_id))
            .order((dsl::opened_at.desc(), dsl::id.desc()))
            .select(SurpriseBoxRecord::as_select())
            .load(&mut conn)?;
        Ok(records)
    }

    /// Every stored tunable, ordered by key.
    #[instrument(skip(self))]
    pub fn list_config(&self) -> Result<Vec<GameConfigEntry>, DbError> {
        let mut conn = self.connection()?;
        let entries = schema::game_config::table
            .order(schema::game_config::key.asc())
            .select(GameConfigEntry::as_select())
            .load(&mut conn)?;
        Ok(entries)
    }

    /// One tunable, if stored.
    #[instrument(skip(self))]
    pub fn get_config(&self, key: &str) -> Result<Option<GameConfigEntry>, DbError> {
        let mut conn = self.connection()?;
        let entry = schema::game_config::table
            .find(key)
            .select(GameConfigEntry::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(entry)
    }

    /// Stores a tunable as JSON, replacing any previous value.
    ///
    /// A `None` description keeps the stored one.
    #[instrument(skip(self, value))]
    pub fn set_config(
        &self,
        key: &str,
        value: &serde_json::Value,
        description: Option<String>,
    ) -> Result<(), DbError> {
        use schema::game_config::dsl;

        let entry = NewGameConfigEntry::new(key.to_string(), serde_json::to_string(value)?, description);
        let mut conn = self.connection()?;
        let insert = diesel::insert_into(dsl::game_config).values(&entry).on_conflict(dsl::key);
        match entry.description() {
            Some(text) => insert
                .do_update()
                .set((
                    dsl::value.eq(entry.value()),
                    dsl::description.eq(text),
                    dsl::updated_at.eq(now),
                ))
                .execute(&mut conn)?,
            None => insert
                .do_update()
                .set((dsl::value.eq(entry.value()), dsl::updated_at.eq(now)))
                .execute(&mut conn)?,
        };
        info!(key, value = %value, "Config stored");
        Ok(())
    }

    /// Reads the surprise-box tunables.
    ///
    /// Fails with a not-found error when the enabled flag was never stored.
    /// Missing chance, prize kind or amount fall back to 5%, lives and 1.
    #[instrument(skip(self))]
    pub fn load_surprise_box_config(&self) -> Result<SurpriseBoxConfig, DbError> {
        let entries = self
            .list_config()?
            .into_iter()
            .map(|entry| Ok((entry.key().clone(), entry.json()?)))
            .collect::<Result<HashMap<String, serde_json::Value>, DbError>>()?;
        let defaults = SurpriseBoxConfig::disabled();

        let enabled = entries
            .get(SURPRISE_BOX_ENABLED)
            .ok_or_else(|| DbError::not_found("Surprise box is not configured"))?
            .as_bool()
            .ok_or_else(|| DbError::new(format!("{} must be a boolean", SURPRISE_BOX_ENABLED)))?;

        let win_chance_percent = match entries.get(SURPRISE_BOX_CHANCE) {
            Some(value) => value
                .as_u64()
                .and_then(|chance| u8::try_from(chance).ok())
                .filter(|chance| *chance <= 100)
                .ok_or_else(|| DbError::new(format!("{} must be 0-100", SURPRISE_BOX_CHANCE)))?,
            None => defaults.win_chance_percent,
        };

        let prize_kind = match entries.get(SURPRISE_BOX_PRIZE_KIND) {
            Some(value) => value
                .as_str()
                .and_then(|kind| kind.parse::<PrizeKind>().ok())
                .ok_or_else(|| {
                    DbError::new(format!("{} must be \"lives\" or \"credits\"", SURPRISE_BOX_PRIZE_KIND))
                })?,
            None => defaults.prize_kind,
        };

        let prize_amount = match entries.get(SURPRISE_BOX_PRIZE_AMOUNT) {
            Some(value) => value
                .as_u64()
                .and_then(|amount| u32::try_from(amount).ok())
                .ok_or_else(|| DbError::new(format!("{} must be a count", SURPRISE_BOX_PRIZE_AMOUNT)))?,
            None => defaults.prize_amount,
        };

        let config = SurpriseBoxConfig {
            enabled,
            win_chance_percent,
            prize_kind,
            prize_amount,
        };
        debug!(?config, "Surprise box config loaded");
        Ok(config)
    }

    /// Current balances of a player.
    #[instrument(skip(self))]
    pub fn balances(&self, user_id: i32) -> Result<Balances, DbError> {
        let (progress, wallet) = self.player_rows(user_id)?;
        balances(&progress, &wallet)
    }
}

fn load_rows(conn: &mut SqliteConnection, user_id: i32) -> Result<(PlayerProgress, WalletRow), DbError> {
    let progress = schema::player_progress::table
        .find(user_id)
        .select(PlayerProgress::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| DbError::not_found(format!("No progress for user {}", user_id)))?;
    let wallet = schema::wallets::table
        .find(user_id)
        .select(WalletRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| DbError::not_found(format!("No wallet for user {}", user_id)))?;
    Ok((progress, wallet))
}

fn write_progress(
    conn: &mut SqliteConnection,
    user_id: i32,
    progress: &ProgressSnapshot,
) -> Result<(), DbError> {
    use schema::player_progress::dsl;

    let total_score = i64::try_from(progress.total_score)
        .map_err(|_| DbError::rejected("Total score overflows"))?;
    let updated = diesel::update(dsl::player_progress.find(user_id))
        .set((
            dsl::current_phase.eq(to_db(progress.current_phase)?),
            dsl::cycles_completed.eq(to_db(progress.cycles_completed)?),
            dsl::total_score.eq(total_score),
            dsl::surprise_box_pending.eq(progress.surprise_box_pending),
            dsl::updated_at.eq(now),
        ))
        .execute(conn)?;
    if updated == 0 {
        return Err(DbError::not_found(format!("No progress for user {}", user_id)));
    }
    debug!(user_id, "Progress saved");
    Ok(())
}

fn write_surprise_box(
    conn: &mut SqliteConnection,
    user_id: i32,
    outcome: &SurpriseBoxOutcome,
) -> Result<SurpriseBoxRecord, DbError> {
    let row = NewSurpriseBoxRecord::from_outcome(user_id, outcome)?;
    let record = diesel::insert_into(schema::surprise_box_history::table)
        .values(&row)
        .returning(SurpriseBoxRecord::as_returning())
        .get_result(conn)?;
    info!(record_id = record.id(), "Surprise box recorded");
    Ok(record)
}

fn adjust_lives(conn: &mut SqliteConnection, user_id: i32, delta: i64) -> Result<u32, DbError> {
    use schema::player_progress::dsl;

    let lives = dsl::player_progress
        .find(user_id)
        .select(dsl::lives)
        .first::<i32>(conn)
        .optional()?
        .ok_or_else(|| DbError::not_found(format!("No progress for user {}", user_id)))?;
    let updated = checked_balance(lives, delta, "lives")?;
    diesel::update(dsl::player_progress.find(user_id))
        .set((dsl::lives.eq(updated), dsl::updated_at.eq(now)))
        .execute(conn)?;
    debug!(user_id, lives = updated, "Lives updated");
    from_db(updated)
}

fn adjust_credits(conn: &mut SqliteConnection, user_id: i32, delta: i64) -> Result<u32, DbError> {
    use schema::wallets::dsl;

    let credits = dsl::wallets
        .find(user_id)
        .select(dsl::credits)
        .first::<i32>(conn)
        .optional()?
        .ok_or_else(|| DbError::not_found(format!("No wallet for user {}", user_id)))?;
    let updated = checked_balance(credits, delta, "credits")?;
    diesel::update(dsl::wallets.find(user_id))
        .set((dsl::credits.eq(updated), dsl::updated_at.eq(now)))
        .execute(conn)?;
    debug!(user_id, credits = updated, "Credits updated");
    from_db(updated)
}

#[track_caller]
fn checked_balance(current: i32, delta: i64, balance: &str) -> Result<i32, DbError> {
    let updated = i64::from(current) + delta;
    if updated < 0 {
        warn!(current, delta, balance, "Refusing to go negative");
        return Err(DbError::rejected(format!(
            "{} would go negative ({} {:+})",
            balance, current, delta
        )));
    }
    i32::try_from(updated).map_err(|_| DbError::rejected(format!("{} overflow", balance)))
}

fn find_ranking(
    conn: &mut SqliteConnection,
    user_id: i32,
    date: NaiveDate,
) -> Result<Option<DailyRanking>, DbError> {
    use schema::daily_ranking::dsl;

    Ok(dsl::daily_ranking
        .filter(dsl::user_id.eq(user_id))
        .filter(dsl::date.eq(date))
        .select(DailyRanking::as_select())
        .first(conn)
        .optional()?)
}

fn accrue_ranking(
    conn: &mut SqliteConnection,
    record: &MatchRecord,
    date: NaiveDate,
) -> Result<(), DbError> {
    use schema::daily_ranking::dsl;

    let user_id = *record.player_id();
    let score = i64::from(*record.score());
    match find_ranking(conn, user_id, date)? {
        Some(existing) => {
            let highest = existing.parse_highest_difficulty()?.max(*record.difficulty());
            diesel::update(dsl::daily_ranking.find(*existing.id()))
                .set((
                    dsl::total_score.eq(existing.total_score() + score),
                    dsl::matches_played.eq(existing.matches_played() + 1),
                    dsl::highest_difficulty.eq(highest.to_string()),
                ))
                .execute(conn)?;
            debug!(user_id, %date, "Ranking accrued");
        }
        None => {
            diesel::insert_into(dsl::daily_ranking)
                .values(&NewDailyRanking::new(
                    user_id,
                    date,
                    score,
                    1,
                    record.difficulty().to_string(),
                ))
                .execute(conn)?;
            debug!(user_id, %date, "Ranking opened");
        }
    }
    Ok(())
}
