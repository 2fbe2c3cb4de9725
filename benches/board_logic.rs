use criterion::{black_box, criterion_group, criterion_main, Criterion};
use match3::core::resolve::{collapse, refill};
use match3::core::{
    find_valid_move, generate_playable_board, scan_for_matches, Board, Grid, Layout, MatchRules,
    SimpleRng, StageConfig,
};
use match3::types::{EngineConfig, Pos};

fn bench_scan(c: &mut Criterion) {
    let grid = Grid::from_rows(&[
        "AAABCD", "CDEAAB", "EABCDE", "BCDEAB", "DEABCD", "AAACEA", "CDEABC", "BBCBDE",
    ])
    .unwrap();
    let rules = MatchRules::default();

    c.bench_function("scan_6x8", |b| {
        b.iter(|| scan_for_matches(black_box(&grid), &rules));
    });
}

fn bench_find_valid_move(c: &mut Criterion) {
    let grid = Grid::from_rows(&["AAB", "EDB", "CED"]).unwrap();
    let rules = MatchRules::default();

    c.bench_function("find_valid_move_dead_3x3", |b| {
        b.iter(|| find_valid_move(black_box(&grid), &rules));
    });
}

fn bench_generate(c: &mut Criterion) {
    let layout = Layout::open(6, 8);
    let rules = MatchRules::default();
    let mut rng = SimpleRng::new(12345);

    c.bench_function("generate_playable_6x8", |b| {
        b.iter(|| generate_playable_board(&layout, 5, &mut rng, &rules, 1000));
    });
}

fn bench_collapse_refill(c: &mut Criterion) {
    let mut rng = SimpleRng::new(7);

    c.bench_function("collapse_refill_half_board", |b| {
        b.iter(|| {
            let mut grid = Grid::from_rows(&[
                "......", "......", "......", "......", "ABCDEA", "CDEABC", "EABCDE", "BCDEAB",
            ])
            .unwrap();
            collapse(&mut grid);
            refill(&mut grid, 5, &mut rng);
            grid
        })
    });
}

fn bench_turn(c: &mut Criterion) {
    let config = EngineConfig {
        max_generation_tries: 1000,
        ..EngineConfig::default()
    };
    let mut board = Board::with_seed(StageConfig::default(), config, 12345).unwrap();

    c.bench_function("hint_swap_settle", |b| {
        b.iter(|| {
            let (from, to) = board.hint().unwrap_or((Pos::new(0, 0), Pos::new(1, 0)));
            let _ = board.request_swap(from, to);
            board.settle();
            if board.session().is_over() {
                let _ = board.restart();
            }
        })
    });
}

criterion_group!(
    benches,
    bench_scan,
    bench_find_valid_move,
    bench_generate,
    bench_collapse_refill,
    bench_turn
);
criterion_main!(benches);
