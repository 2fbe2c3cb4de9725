//! Matcher tests - straight, long and super runs

use match3::core::{scan_for_matches, Grid, MatchRules, ScanResult};
use match3::types::{MatchOrientation, Pos, SymbolKind};

fn scan(rows: &[&str]) -> ScanResult {
    let grid = Grid::from_rows(rows).unwrap();
    scan_for_matches(&grid, &MatchRules::default())
}

fn positions(list: &[(i32, i32)]) -> Vec<Pos> {
    list.iter().map(|&(x, y)| Pos::new(x, y)).collect()
}

#[test]
fn test_no_match_on_checkerboard() {
    let result = scan(&["ABAB", "BABA", "ABAB"]);
    assert!(!result.has_match());
    assert_eq!(result.matched_count(), 0);
}

#[test]
fn test_horizontal_three() {
    let result = scan(&["BAAAC", "CDEBD"]);

    assert_eq!(result.runs.len(), 1);
    let run = &result.runs[0];
    assert_eq!(run.kind, SymbolKind(0));
    assert_eq!(run.orientation, MatchOrientation::Horizontal);
    assert_eq!(run.positions, positions(&[(1, 0), (2, 0), (3, 0)]));
}

#[test]
fn test_long_vertical() {
    let result = scan(&["AB", "CB", "DB", "EB", "AC"]);

    assert_eq!(result.runs.len(), 1);
    assert_eq!(result.runs[0].orientation, MatchOrientation::LongVertical);
    assert_eq!(result.runs[0].len(), 4);
}

#[test]
fn test_l_shape_becomes_super() {
    let result = scan(&["AAAB", "CDAE", "EBAC"]);

    assert_eq!(result.runs.len(), 1);
    let run = &result.runs[0];
    assert_eq!(run.orientation, MatchOrientation::Super);
    assert_eq!(run.len(), 5);
    assert_eq!(
        run.positions,
        positions(&[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2)])
    );
}

#[test]
fn test_plus_shape_becomes_super() {
    let result = scan(&["BAB", "AAA", "CAD"]);

    assert_eq!(result.runs.len(), 1);
    assert_eq!(result.runs[0].orientation, MatchOrientation::Super);
    assert_eq!(result.runs[0].len(), 5);
    assert!(result.runs[0].contains(Pos::new(1, 1)));
}

#[test]
fn test_short_branch_is_not_merged() {
    let result = scan(&["AAAB", "CADE"]);

    assert_eq!(result.runs.len(), 1);
    assert_eq!(result.runs[0].orientation, MatchOrientation::Horizontal);
    assert!(!result.runs[0].contains(Pos::new(1, 1)));
}

#[test]
fn test_branch_threshold_follows_rules() {
    let grid = Grid::from_rows(&["AAAB", "CDAE", "EBAC"]).unwrap();
    let strict = MatchRules {
        extra_connection_min_len: 3,
    };
    let result = scan_for_matches(&grid, &strict);

    // The column below the run is too short to be merged or to match alone.
    assert_eq!(result.runs.len(), 1);
    assert_eq!(result.runs[0].orientation, MatchOrientation::Horizontal);
    assert_eq!(result.matched_count(), 3);
}

#[test]
fn test_holes_empties_and_bombs_break_runs() {
    assert!(!scan(&["AA#A"]).has_match());
    assert!(!scan(&["AA.A"]).has_match());
    assert!(!scan(&["AA*A"]).has_match());
}

#[test]
fn test_separate_runs_in_row_major_order() {
    let result = scan(&["BCDEB", "AAACB", "DEDAB"]);

    assert_eq!(result.runs.len(), 2);
    // The vertical B run is seeded first, at (4, 0).
    assert_eq!(result.runs[0].kind, SymbolKind(1));
    assert_eq!(result.runs[0].orientation, MatchOrientation::Vertical);
    assert_eq!(result.runs[1].kind, SymbolKind(0));
    assert_eq!(result.runs[1].orientation, MatchOrientation::Horizontal);
}

#[test]
fn test_scan_is_idempotent() {
    let grid = Grid::from_rows(&["AAAB", "CDAE", "EBAC", "AAAA"]).unwrap();
    let rules = MatchRules::default();

    let first = scan_for_matches(&grid, &rules);
    let second = scan_for_matches(&grid, &rules);
    assert_eq!(first, second);

    let claimed: Vec<Pos> = first.positions().collect();
    let mut unique = claimed.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(claimed.len(), unique.len());
}
