//! Resolution tests - cascades, bombs, rewards and reseeding

use match3::core::resolve::{blast_area, refill};
use match3::core::scoring::run_score;
use match3::core::{
    Board, BoardEvent, CoreError, Grid, Layout, ScriptedKinds, SimpleRng, StageConfig, Submission,
};
use match3::types::{Direction, EngineConfig, MatchOrientation, Pos};

fn config() -> EngineConfig {
    EngineConfig {
        initial_free_bomb: false,
        ..EngineConfig::default()
    }
}

fn board(rows: &[&str], script: Vec<u32>) -> Board<ScriptedKinds> {
    let grid = Grid::from_rows(rows).unwrap();
    Board::with_grid(StageConfig::default(), config(), grid, ScriptedKinds::new(script)).unwrap()
}

#[test]
fn test_refill_is_column_major_top_down() {
    let mut grid = Grid::from_rows(&["..", ".A", ".."]).unwrap();
    let mut kinds = ScriptedKinds::new(vec![1, 2, 3, 4, 0]);

    let spawned = refill(&mut grid, 5, &mut kinds);

    assert_eq!(spawned.len(), 5);
    assert_eq!(grid.to_string(), "BE\nCA\nDA");
    assert_eq!(spawned[0].pos(), Pos::new(0, 0));
    assert_eq!(spawned[3].pos(), Pos::new(1, 0));
}

#[test]
fn test_blast_area_is_clamped_square() {
    let grid = Grid::from_rows(&["ABCDE", "BCDEA", "CD*AB", "DEABC", "EABCD"]).unwrap();

    assert_eq!(blast_area(&grid, Pos::new(2, 2), 2).len(), 24);
    assert_eq!(blast_area(&grid, Pos::new(2, 2), 1).len(), 8);
    assert_eq!(blast_area(&grid, Pos::new(0, 0), 2).len(), 8);
    assert!(!blast_area(&grid, Pos::new(2, 2), 2).contains(&Pos::new(2, 2)));
}

#[test]
fn test_bomb_scores_plain_sum_and_costs_no_move() {
    let mut board = board(
        &[
            "*BCDEA", "CDEABC", "EABCDE", "BCDEAB", "DEABCD", "ABCDEA", "CDEABC", "BBCBDE",
        ],
        // Restores the original top-left 3x3 block, column by column.
        vec![0, 2, 4, 1, 3, 0, 2, 4, 1],
    );

    let report = match board.activate_consumable(Pos::new(0, 0)).unwrap() {
        Submission::Accepted(report) => report,
        other => panic!("expected accepted activation, got {other:?}"),
    };
    assert_eq!(report.removed.len(), 9);
    assert!(report.removed[0].variant.is_consumable());
    assert!(report.moved.is_empty());
    assert_eq!(report.spawned.len(), 9);
    assert_eq!(report.score_delta, 80);

    let reports = board.settle();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].finished);
    assert!(!reports[0].reseeded);

    assert_eq!(board.session().score(), 80);
    assert_eq!(board.session().moves_remaining(), 20);
    assert_eq!(board.grid().to_string().lines().next(), Some("ABCDEA"));
    assert_eq!(
        board.drain_events(),
        vec![BoardEvent::ScoreChanged { score: 80, delta: 80 }]
    );
}

#[test]
fn test_bomb_that_sets_off_a_cascade_costs_a_move() {
    let mut board = board(
        &[
            "*BCDEA", "CDEABC", "EABCDE", "BCDEAB", "DEABCD", "ABCDEA", "CDEABC", "BBCBDE",
        ],
        // Columns refill as ACE, ADB, AEC: the top row reads "AAADEA".
        vec![0, 2, 4, 0, 3, 1, 0, 4, 2],
    );

    let activated = board.activate_consumable(Pos::new(0, 0)).unwrap();
    assert_eq!(activated.report().unwrap().score_delta, 80);
    assert_eq!(board.grid().to_string().lines().next(), Some("AAADEA"));

    let reports = board.settle();
    assert_eq!(reports.len(), 1);
    let round = &reports[0];
    assert_eq!(round.runs.len(), 1);
    assert_eq!(round.runs[0].orientation, MatchOrientation::Horizontal);
    assert_eq!(round.cascade_depth, 0);
    assert_eq!(round.score_delta, 30);
    assert!(round.finished);

    assert!(board.is_idle());
    assert_eq!(board.session().score(), 110);
    assert_eq!(board.session().moves_remaining(), 19);
    assert_eq!(board.grid().to_string().lines().next(), Some("ACEDEA"));
    assert_eq!(
        board.drain_events(),
        vec![
            BoardEvent::ScoreChanged { score: 80, delta: 80 },
            BoardEvent::ScoreChanged { score: 110, delta: 30 },
            BoardEvent::MoveConsumed { remaining: 19 },
        ]
    );
}

#[test]
fn test_activation_without_bomb_is_rejected() {
    let mut board = board(&["ABAC", "CADB", "DCAC", "EEBE"], vec![0]);

    let err = board.activate_consumable(Pos::new(0, 0)).unwrap_err();
    assert_eq!(err, CoreError::NoConsumable { pos: Pos::new(0, 0) });
    assert!(board.is_idle());
}

#[test]
fn test_each_cascade_round_scores_once_with_growing_multiplier() {
    // Every refill of the top row brings back three A's until the last one.
    let mut board = board(
        &["AABCD", "CDAEB", "EEBED"],
        vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 4],
    );

    board.request_swap(Pos::new(2, 0), Pos::new(2, 1)).unwrap();
    let reports = board.settle();

    let depths: Vec<u32> = reports.iter().map(|r| r.cascade_depth).collect();
    let deltas: Vec<u32> = reports.iter().map(|r| r.score_delta).collect();
    assert_eq!(depths, vec![0, 1, 2, 3]);
    // x1, x2, x3, then capped at x3
    assert_eq!(deltas, vec![30, 60, 90, 90]);
    assert!(reports.iter().all(|r| r.removed.len() == 3 && r.spawned.len() == 3));
    assert!(reports[3].finished);

    assert_eq!(board.session().score(), 270);
    assert_eq!(board.session().moves_remaining(), 19);
    assert_eq!(board.session().cascade_chain_count(), 0);
    // Only the round at chain 2 hits the reward interval.
    assert_eq!(board.session().bombs_remaining(), 1);
    assert_eq!(board.grid().to_string(), "BCECD\nCDBEB\nEEBED");

    let events = board.drain_events();
    let scores = events
        .iter()
        .filter(|e| matches!(e, BoardEvent::ScoreChanged { .. }))
        .count();
    assert_eq!(scores, 4);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, BoardEvent::BombsChanged { bombs: 1 }))
            .count(),
        1
    );
    assert_eq!(events.last(), Some(&BoardEvent::MoveConsumed { remaining: 19 }));
}

#[test]
fn test_run_score_rounds_up() {
    let config = EngineConfig::default();

    assert_eq!(run_score(30, 3, 0, &config), 30);
    assert_eq!(run_score(40, 4, 0, &config), 60);
    assert_eq!(run_score(50, 5, 1, &config), 150);
    // 7 * 150 / 100 = 10.5
    assert_eq!(run_score(7, 4, 0, &config), 11);
}

#[test]
fn test_exhausted_reseed_keeps_grid_and_idles() {
    let grid = Grid::from_rows(&["CDC", "ECB", "CED"]).unwrap();
    let config = EngineConfig {
        max_generation_tries: 3,
        ..config()
    };
    let mut board = Board::with_grid(
        StageConfig::default(),
        config,
        grid,
        ScriptedKinds::new(vec![0, 0, 1]),
    )
    .unwrap();

    board.request_swap(Pos::new(1, 0), Pos::new(1, 1)).unwrap();
    let reports = board.settle();

    // The round that emptied the board of moves is still reported.
    assert_eq!(reports.len(), 1);
    let round = &reports[0];
    assert_eq!(round.removed.len(), 3);
    assert_eq!(round.spawned.len(), 3);
    assert_eq!(round.score_delta, 30);
    assert!(round.finished);
    assert!(!round.reseeded);

    assert!(board.is_idle());
    assert_eq!(board.grid().to_string(), "AAB\nEDB\nCED");
    assert_eq!(board.session().score(), 30);
    match &round.reseed_error {
        Some(CoreError::BoardGenerationExhausted {
            tries,
            last_candidate,
        }) => {
            assert_eq!(*tries, 3);
            assert_eq!(last_candidate.piece_count(), 9);
        }
        other => panic!("unexpected reseed outcome {other:?}"),
    }
    assert_eq!(
        board.drain_events(),
        vec![
            BoardEvent::ScoreChanged { score: 30, delta: 30 },
            BoardEvent::MoveConsumed { remaining: 19 },
        ]
    );

    // The caller may accept the candidate anyway.
    let candidate = Grid::from_rows(&["AAB", "AAB", "AAB"]).unwrap();
    board.replace_grid(candidate).unwrap();
    assert_eq!(board.drain_events().last(), Some(&BoardEvent::BoardReseeded));
}

#[test]
fn test_spawn_bomb_uses_stock() {
    let mut stage = StageConfig::default();
    stage.bombs = 1;
    let grid = Grid::from_rows(&["ABAC", "CADB", "DCAC", "EEBE"]).unwrap();
    let mut board = Board::with_grid(stage, config(), grid, ScriptedKinds::new(vec![5])).unwrap();

    let placed = board.spawn_bomb(true).unwrap();
    let report = placed.report().unwrap();
    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.spawned.len(), 1);
    assert!(report.spawned[0].variant.is_consumable());
    assert!(report.finished);
    assert!(board.is_idle());
    assert_eq!(board.session().bombs_remaining(), 0);
    assert_eq!(board.grid().to_string().matches('*').count(), 1);

    assert_eq!(
        board.spawn_bomb(true).unwrap(),
        Submission::Ignored(match3::core::IgnoreReason::NoStock)
    );
    assert!(board.spawn_bomb(false).unwrap().is_accepted());
}

fn assert_settled_cells(board: &Board, holes: &[Pos]) {
    let grid = board.grid();
    assert!(grid.is_consistent());
    for &hole in holes {
        let cell = grid.get(hole).unwrap();
        assert!(!cell.is_usable() && cell.is_empty(), "hole {hole} holds a piece");
    }
    assert!(grid.usable_positions().all(|pos| !grid.is_empty(pos)));
}

#[test]
fn test_random_play_keeps_grid_consistent_and_holes_empty() {
    let layout = Layout::from_rows(&["#....#", "......", "..##..", "......", "......", "#....#"]).unwrap();
    let holes: Vec<Pos> = (0..6)
        .flat_map(|y| (0..6).map(move |x| Pos::new(x, y)))
        .filter(|pos| !layout.is_usable(*pos))
        .collect();
    assert_eq!(holes.len(), 6);

    let mut stage = StageConfig::default()
        .with_layout(layout)
        .with_thresholds(1000, u32::MAX);
    stage.bombs = 3;
    let config = EngineConfig {
        max_generation_tries: 1000,
        ..EngineConfig::default()
    };
    let mut board = Board::with_seed(stage, config, 2024).unwrap();
    let mut picks = SimpleRng::new(7);
    assert_settled_cells(&board, &holes);

    let mut turns = 0;
    for round in 0..300 {
        assert!(board.is_idle());
        if round % 7 == 0 {
            let _ = board.spawn_bomb(true).unwrap();
            assert_settled_cells(&board, &holes);
        }

        let bomb = board.grid().pieces().find(|p| p.is_consumable()).map(|p| p.pos());
        let started = match (bomb, board.hint()) {
            (Some(pos), _) if round % 5 == 0 => board.activate_consumable(pos),
            (_, Some((a, b))) if picks.next_range(4) != 0 => board.request_swap(a, b),
            _ => {
                let a = Pos::new(picks.next_range(6) as i32, picks.next_range(6) as i32);
                let dir = if picks.next_range(2) == 0 {
                    Direction::Right
                } else {
                    Direction::Down
                };
                board.request_swap(a, a.step(dir))
            }
        };
        if !matches!(started, Ok(Submission::Accepted(_))) {
            assert!(board.is_idle());
            continue;
        }
        turns += 1;

        assert_settled_cells(&board, &holes);
        while let Some(report) = board.step() {
            assert!(report.reseed_error.is_none());
            assert_settled_cells(&board, &holes);
        }
    }

    assert!(turns > 100);
    assert!(board.session().score() > 0);
}
