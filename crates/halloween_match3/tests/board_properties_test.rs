//! Property checks over many seeded boards.

use halloween_match3::{
    BOARD_SIZE, Board, BoardInvariants, Cell, CascadeResolver, InvariantSet, POINTS_PER_PIECE,
    find_matches, find_valid_swap, is_valid_swap,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

const SEEDS: u64 = 1000;

fn neighbours() -> impl Iterator<Item = (Cell, Cell)> {
    (0..BOARD_SIZE).flat_map(|row| {
        (0..BOARD_SIZE).flat_map(move |col| {
            let here = Cell::new(row, col);
            let right = (col + 1 < BOARD_SIZE).then(|| (here, Cell::new(row, col + 1)));
            let down = (row + 1 < BOARD_SIZE).then(|| (here, Cell::new(row + 1, col)));
            right.into_iter().chain(down)
        })
    })
}

#[test]
fn test_generated_boards_satisfy_invariants() {
    for seed in 0..SEEDS {
        let board = Board::generate(&mut StdRng::seed_from_u64(seed));
        assert!(
            BoardInvariants::check_all(&board).is_ok(),
            "seed {} produced:\n{}",
            seed,
            board.display()
        );
        assert!(find_matches(&board).is_empty());
    }
}

#[test]
fn test_match_detection_is_pure() {
    for seed in 0..50 {
        let mut board = Board::generate(&mut StdRng::seed_from_u64(seed));
        let Some((a, b)) = find_valid_swap(&board) else {
            continue;
        };
        board.swap(a, b);
        let first = find_matches(&board);
        let snapshot = board.clone();
        assert_eq!(find_matches(&board), first);
        assert_eq!(board, snapshot);
        assert!(first.contains(&a) || first.contains(&b));
    }
}

#[test]
fn test_swap_twice_restores_board() {
    let original = Board::generate(&mut StdRng::seed_from_u64(99));
    for (a, b) in neighbours() {
        let mut board = original.clone();
        board.swap(a, b);
        board.swap(a, b);
        assert_eq!(board, original, "swapping {} and {} twice", a, b);
    }
}

#[test]
fn test_swap_validity_is_symmetric() {
    let board = Board::generate(&mut StdRng::seed_from_u64(5));
    for (a, b) in neighbours() {
        assert_eq!(is_valid_swap(&board, a, b), is_valid_swap(&board, b, a));
    }
}

#[test]
fn test_cascades_terminate_on_stable_boards() {
    let resolver = CascadeResolver::new();
    for seed in 0..200 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut board = Board::generate(&mut rng);
        let Some((a, b)) = find_valid_swap(&board) else {
            continue;
        };
        board.swap(a, b);

        let outcome = resolver.resolve(&mut board, &mut rng);

        assert!(!outcome.passes().is_empty());
        assert!(BoardInvariants::check_all(&board).is_ok(), "seed {}", seed);
        let total: u32 = outcome.passes().iter().map(|pass| pass.points).sum();
        assert_eq!(outcome.score_delta(), total);
        for pass in outcome.passes() {
            assert!(pass.matched >= 3);
            assert_eq!(pass.points, pass.matched as u32 * POINTS_PER_PIECE);
        }
    }
}

#[test]
fn test_resolving_a_stable_board_changes_nothing() {
    let mut rng = StdRng::seed_from_u64(17);
    let mut board = Board::generate(&mut rng);
    let before = board.clone();

    let outcome = CascadeResolver::new().resolve(&mut board, &mut rng);

    assert_eq!(outcome.score_delta(), 0);
    assert!(outcome.passes().is_empty());
    assert_eq!(board, before);
}
