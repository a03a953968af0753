//! Tests for database repository operations.

use chrono::NaiveDate;
use halloween_arcade::{ArcadeRepository, DbErrorKind, SURPRISE_BOX_CHANCE, SURPRISE_BOX_ENABLED};
use halloween_match3::{
    Balances, Difficulty, MatchRecord, Prize, PrizeKind, ProgressSnapshot, SurpriseBoxOutcome,
};
use serde_json::json;
use tempfile::NamedTempFile;

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, ArcadeRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let repo = ArcadeRepository::new(db_path).expect("Failed to create repository");
    repo.run_migrations().expect("Migrations failed");
    (db_file, repo)
}

fn setup_player(repo: &ArcadeRepository, name: &str) -> i32 {
    let user = repo.create_user(name.to_string()).expect("Create failed");
    repo.ensure_player(*user.id(), 3).expect("Player rows failed");
    *user.id()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 31).expect("valid date")
}

/// A match record in its serialized form.
fn record(player: i32, difficulty: Difficulty, score: u32, completed: bool) -> MatchRecord {
    let json = json!({
        "player_id": player,
        "phase": 1,
        "difficulty": difficulty,
        "score": score,
        "objective": "points",
        "objective_value": difficulty.config().score_objective,
        "completed": completed,
        "time_spent_secs": 42,
        "consecutive_errors_at_end": 0,
    });
    serde_json::from_value(json).expect("valid match record")
}

#[test]
fn test_empty_path_rejected() {
    assert!(ArcadeRepository::new("  ").is_err());
}

#[test]
fn test_migrations_are_idempotent() {
    let (_db, repo) = setup_test_db();
    assert_eq!(repo.run_migrations().expect("Second run failed"), 0);
}

#[test]
fn test_duplicate_name_fails() {
    let (_db, repo) = setup_test_db();
    repo.create_user("Jack".to_string()).expect("First create failed");
    assert!(repo.create_user("Jack".to_string()).is_err());
}

#[test]
fn test_new_player_starts_with_three_lives_phase_one() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Wednesday");

    let (progress, _) = repo.player_rows(player).expect("Rows missing");
    assert_eq!(progress.snapshot().expect("Snapshot failed"), ProgressSnapshot::default());
    assert_eq!(repo.balances(player).expect("Balances failed"), Balances { lives: 3, credits: 0 });
}

#[test]
fn test_ensure_player_keeps_existing_rows() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Morticia");
    repo.take_life(player).expect("Take failed");

    repo.ensure_player(player, 3).expect("Second ensure failed");

    assert_eq!(repo.balances(player).expect("Balances failed").lives, 2);
}

#[test]
fn test_take_life_refuses_at_zero() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Gomez");
    for expected in [2, 1, 0] {
        assert_eq!(repo.take_life(player).expect("Take failed"), expected);
    }

    let err = repo.take_life(player).expect_err("Should refuse");
    assert_eq!(err.kind, DbErrorKind::Rejected);
    assert_eq!(repo.balances(player).expect("Balances failed").lives, 0);
}

#[test]
fn test_withdraw_refuses_overdraft() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Pugsley");
    repo.deposit(player, 3).expect("Deposit failed");

    let err = repo.withdraw(player, 5).expect_err("Should refuse");
    assert_eq!(err.kind, DbErrorKind::Rejected);
    assert_eq!(repo.wallet_balance(player).expect("Balance failed"), 3);
    assert_eq!(repo.withdraw(player, 3).expect("Withdraw failed"), 0);
}

#[test]
fn test_purchase_lives_is_all_or_nothing() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Lurch");
    repo.deposit(player, 3).expect("Deposit failed");

    assert!(repo.purchase_lives(player, 5, 1).is_err());
    assert_eq!(repo.balances(player).expect("Balances failed"), Balances { lives: 3, credits: 3 });

    let balances = repo.purchase_lives(player, 2, 1).expect("Purchase failed");
    assert_eq!(balances, Balances { lives: 5, credits: 1 });
}

#[test]
fn test_unknown_player_is_not_found() {
    let (_db, repo) = setup_test_db();
    let err = repo.player_rows(999).expect_err("Should be missing");
    assert_eq!(err.kind, DbErrorKind::NotFound);
}

#[test]
fn test_update_progress_round_trips() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Fester");
    let progress = ProgressSnapshot {
        current_phase: 10,
        cycles_completed: 2,
        total_score: 12_345,
        surprise_box_pending: true,
    };

    repo.update_progress(player, &progress).expect("Update failed");

    let (row, _) = repo.player_rows(player).expect("Rows missing");
    assert_eq!(row.snapshot().expect("Snapshot failed"), progress);
}

#[test]
fn test_completed_matches_accrue_into_daily_ranking() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Thing");

    repo.insert_match_on(&record(player, Difficulty::Medium, 1600, true), day())
        .expect("Insert failed");
    repo.insert_match_on(&record(player, Difficulty::Easy, 1100, true), day())
        .expect("Insert failed");

    let ranking = repo.ranking_for(player, day()).expect("Query failed").expect("Row missing");
    assert_eq!(*ranking.total_score(), 2700);
    assert_eq!(*ranking.matches_played(), 2);
    assert_eq!(ranking.parse_highest_difficulty().expect("Parse failed"), Difficulty::Medium);
}

#[test]
fn test_lost_matches_are_recorded_but_not_ranked() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Itt");

    repo.insert_match_on(&record(player, Difficulty::Hard, 400, false), day())
        .expect("Insert failed");

    assert!(repo.ranking_for(player, day()).expect("Query failed").is_none());
    let matches = repo.list_matches(player, 10).expect("List failed");
    assert_eq!(matches.len(), 1);
    assert!(!*matches[0].completed());
    assert_eq!(matches[0].difficulty(), "hard");
}

#[test]
fn test_daily_ranking_orders_by_score() {
    let (_db, repo) = setup_test_db();
    let low = setup_player(&repo, "Low");
    let high = setup_player(&repo, "High");

    repo.insert_match_on(&record(low, Difficulty::Easy, 1000, true), day())
        .expect("Insert failed");
    repo.insert_match_on(&record(high, Difficulty::Hard, 2100, true), day())
        .expect("Insert failed");

    let ranking = repo.daily_ranking(day()).expect("Ranking failed");
    let names: Vec<_> = ranking.iter().map(|e| e.display_name().as_str()).collect();
    assert_eq!(names, vec!["High", "Low"]);
    assert_eq!(*ranking[0].position(), 1);

    let other_day = NaiveDate::from_ymd_opt(2026, 11, 1).expect("valid date");
    assert!(repo.daily_ranking(other_day).expect("Ranking failed").is_empty());
}

#[test]
fn test_surprise_box_history_round_trips() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Grandmama");
    let outcome = SurpriseBoxOutcome {
        cycle_number: 1,
        won: true,
        prize: Some(Prize {
            kind: PrizeKind::Credits,
            amount: 10,
        }),
    };

    repo.insert_surprise_box(player, &outcome).expect("Insert failed");

    let records = repo.list_surprise_boxes(player).expect("List failed");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome().expect("Parse failed"), outcome);
}

fn pending_progress() -> ProgressSnapshot {
    ProgressSnapshot {
        current_phase: 10,
        cycles_completed: 0,
        total_score: 21_000,
        surprise_box_pending: true,
    }
}

fn next_cycle() -> ProgressSnapshot {
    ProgressSnapshot {
        current_phase: 1,
        cycles_completed: 1,
        total_score: 21_000,
        surprise_box_pending: false,
    }
}

fn won_box(kind: PrizeKind, amount: u32) -> SurpriseBoxOutcome {
    SurpriseBoxOutcome {
        cycle_number: 1,
        won: true,
        prize: Some(Prize { kind, amount }),
    }
}

#[test]
fn test_settle_surprise_box_pays_once() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Wednesday");
    repo.update_progress(player, &pending_progress()).expect("Update failed");
    let outcome = won_box(PrizeKind::Credits, 10);

    let balances = repo
        .settle_surprise_box(player, &outcome, &next_cycle())
        .expect("Settle failed");
    assert_eq!(balances, Balances { lives: 3, credits: 10 });

    let err = repo
        .settle_surprise_box(player, &outcome, &next_cycle())
        .expect_err("Box already opened");
    assert_eq!(err.kind, DbErrorKind::Rejected);

    assert_eq!(repo.balances(player).expect("Balances failed"), balances);
    assert_eq!(repo.list_surprise_boxes(player).expect("List failed").len(), 1);
    let (progress, _) = repo.player_rows(player).expect("Rows failed");
    assert_eq!(progress.snapshot().expect("Snapshot failed"), next_cycle());
}

#[test]
fn test_failed_settle_rolls_back() {
    let (_db, repo) = setup_test_db();
    let player = setup_player(&repo, "Pugsley");
    repo.update_progress(player, &pending_progress()).expect("Update failed");
    repo.grant_lives(player, i32::MAX as u32 - 3).expect("Grant failed");

    let err = repo
        .settle_surprise_box(player, &won_box(PrizeKind::Lives, 10), &next_cycle())
        .expect_err("Lives overflow");

    assert_eq!(err.kind, DbErrorKind::Rejected);
    assert!(repo.list_surprise_boxes(player).expect("List failed").is_empty());
    let (progress, _) = repo.player_rows(player).expect("Rows failed");
    assert_eq!(progress.snapshot().expect("Snapshot failed"), pending_progress());
    assert_eq!(repo.balances(player).expect("Balances failed").lives, i32::MAX as u32);
}

#[test]
fn test_surprise_box_config_missing_is_not_found() {
    let (_db, repo) = setup_test_db();
    let err = repo.load_surprise_box_config().expect_err("Should be missing");
    assert_eq!(err.kind, DbErrorKind::NotFound);
}

#[test]
fn test_surprise_box_config_defaults_and_overrides() {
    let (_db, repo) = setup_test_db();
    repo.set_config(SURPRISE_BOX_ENABLED, &json!(true), Some("master switch".to_string()))
        .expect("Set failed");

    let config = repo.load_surprise_box_config().expect("Load failed");
    assert!(config.enabled);
    assert_eq!(config.win_chance_percent, 5);
    assert_eq!(config.prize_kind, PrizeKind::Lives);

    repo.set_config(SURPRISE_BOX_CHANCE, &json!(50), None).expect("Set failed");
    repo.set_config(SURPRISE_BOX_CHANCE, &json!(75), None).expect("Replace failed");
    assert_eq!(repo.load_surprise_box_config().expect("Load failed").win_chance_percent, 75);

    let entry = repo.get_config(SURPRISE_BOX_ENABLED).expect("Get failed").expect("Missing");
    assert_eq!(entry.description().as_deref(), Some("master switch"));
}

#[test]
fn test_surprise_box_config_rejects_bad_chance() {
    let (_db, repo) = setup_test_db();
    repo.set_config(SURPRISE_BOX_ENABLED, &json!(true), None).expect("Set failed");
    repo.set_config(SURPRISE_BOX_CHANCE, &json!(250), None).expect("Set failed");

    assert!(repo.load_surprise_box_config().is_err());
}
