//! Tests for the profile service and progression over sqlite.

use halloween_arcade::{
    ArcadeRepository, ProfileService, SURPRISE_BOX_CHANCE, SURPRISE_BOX_ENABLED,
    SURPRISE_BOX_PRIZE_AMOUNT, SURPRISE_BOX_PRIZE_KIND,
};
use halloween_match3::{
    Balances, LifeLossReason, PhaseAdvance, PlayerStore, ProgressSnapshot, ProgressionError,
    SessionEvent, TickOutcome,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use tempfile::NamedTempFile;

fn setup_service() -> (NamedTempFile, ProfileService) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let repo = ArcadeRepository::new(db_path).expect("Failed to create repository");
    repo.run_migrations().expect("Migrations failed");
    (db_file, ProfileService::new(repo, 3))
}

fn pending_box() -> ProgressSnapshot {
    ProgressSnapshot {
        current_phase: 10,
        cycles_completed: 2,
        total_score: 40_000,
        surprise_box_pending: true,
    }
}

#[test]
fn test_get_or_create_is_idempotent() {
    let (_db, service) = setup_service();

    let first = service.get_or_create_player("Sally".to_string()).expect("Create failed");
    let second = service.get_or_create_player("Sally".to_string()).expect("Lookup failed");

    assert_eq!(first.id(), second.id());
    assert_eq!(service.repository().list_users().expect("List failed").len(), 1);
    let data = service.player_data(*first.id()).expect("Load failed");
    assert_eq!(data.balances, Balances { lives: 3, credits: 0 });
}

#[test]
fn test_deposit_rejects_zero() {
    let (_db, service) = setup_service();
    let player = *service.get_or_create_player("Oogie".to_string()).expect("Create failed").id();

    assert!(service.deposit(player, 0).is_err());
    assert_eq!(service.deposit(player, 4).expect("Deposit failed"), 4);
}

#[test]
fn test_buy_lives_checks_wallet() {
    let (_db, service) = setup_service();
    let player = *service.get_or_create_player("Zero".to_string()).expect("Create failed").id();
    service.deposit(player, 3).expect("Deposit failed");
    let mut progression = service.progression(player).expect("Load failed");

    assert_eq!(
        progression.buy_lives(5),
        Err(ProgressionError::InsufficientCredits {
            required: 5,
            available: 3
        })
    );
    assert_eq!(
        progression.buy_lives(2).expect("Purchase failed"),
        Balances { lives: 5, credits: 1 }
    );
    assert_eq!(
        service.player_data(player).expect("Load failed").balances,
        Balances { lives: 5, credits: 1 }
    );
}

#[test]
fn test_expired_session_is_persisted() {
    let (_db, service) = setup_service();
    let player = *service.get_or_create_player("Jack".to_string()).expect("Create failed").id();
    let mut progression = service.progression(player).expect("Load failed");
    let mut session = progression
        .start_session(StdRng::seed_from_u64(31))
        .expect("Session failed");

    while session.tick() != TickOutcome::Expired {}
    let advance = progression.apply_events(&mut session).expect("Events failed");

    assert_eq!(advance, Some(PhaseAdvance::Retry { phase: 1, lives: 2 }));
    assert_eq!(session.balances().lives, 2);
    let (matches, _) = service.history(player, 10).expect("History failed");
    assert_eq!(matches.len(), 1);
    assert!(!*matches[0].completed());
    assert_eq!(*matches[0].time_spent_secs(), 180);
    assert!(service.ranking(None).expect("Ranking failed").is_empty());
}

#[test]
fn test_life_lost_event_hits_the_database() {
    let (_db, service) = setup_service();
    let player = *service.get_or_create_player("Lock".to_string()).expect("Create failed").id();
    let mut progression = service.progression(player).expect("Load failed");

    let event = SessionEvent::LifeLost {
        reason: LifeLossReason::ConsecutiveErrors,
        lives_remaining: 2,
    };
    assert_eq!(progression.handle_event(&event).expect("Event failed"), None);

    assert_eq!(service.repository().load_player(player).expect("Load failed").balances.lives, 2);
}

#[test]
fn test_unconfigured_box_opens_without_prize() {
    let (_db, service) = setup_service();
    let player = *service.get_or_create_player("Shock".to_string()).expect("Create failed").id();
    service
        .repository()
        .update_progress(player, &pending_box())
        .expect("Update failed");
    let mut progression = service.progression(player).expect("Load failed");

    let outcome = progression
        .open_surprise_box(&mut StdRng::seed_from_u64(0))
        .expect("Open failed");

    assert_eq!(outcome.cycle_number, 3);
    assert_eq!(outcome.prize, None);
    let data = service.player_data(player).expect("Load failed");
    assert_eq!(data.progress.current_phase, 1);
    assert_eq!(data.progress.cycles_completed, 3);
    assert!(!data.progress.surprise_box_pending);
    let (_, boxes) = service.history(player, 10).expect("History failed");
    assert_eq!(boxes.len(), 1);
}

#[test]
fn test_configured_box_pays_credits() {
    let (_db, service) = setup_service();
    let player = *service.get_or_create_player("Barrel".to_string()).expect("Create failed").id();
    let repo = service.repository();
    repo.update_progress(player, &pending_box()).expect("Update failed");
    repo.set_config(SURPRISE_BOX_ENABLED, &json!(true), None).expect("Set failed");
    repo.set_config(SURPRISE_BOX_CHANCE, &json!(100), None).expect("Set failed");
    repo.set_config(SURPRISE_BOX_PRIZE_KIND, &json!("credits"), None).expect("Set failed");
    repo.set_config(SURPRISE_BOX_PRIZE_AMOUNT, &json!(25), None).expect("Set failed");
    let mut progression = service.progression(player).expect("Load failed");

    let outcome = progression
        .open_surprise_box(&mut StdRng::seed_from_u64(9))
        .expect("Open failed");

    assert!(outcome.won);
    assert_eq!(
        service.player_data(player).expect("Load failed").balances,
        Balances { lives: 3, credits: 25 }
    );
}

#[test]
fn test_pending_box_blocks_new_sessions() {
    let (_db, service) = setup_service();
    let player = *service.get_or_create_player("Sandy".to_string()).expect("Create failed").id();
    service
        .repository()
        .update_progress(player, &pending_box())
        .expect("Update failed");
    let mut progression = service.progression(player).expect("Load failed");

    let result = progression.start_session(StdRng::seed_from_u64(1));

    assert!(matches!(result, Err(ProgressionError::SurpriseBoxPending(3))));
}
