//! Match detection
//!
//! A scan walks the grid in row-major order. From every unclaimed normal piece
//! it probes horizontally first, then vertically; a straight run of three or
//! more becomes a [`MatchRun`]. Perpendicular branches hanging off a run are
//! merged into it (a "super" match) when they are long enough.
//!
//! Pieces claimed by a run are tracked in a mask local to the scan, so a
//! piece is never counted twice and scanning an unchanged grid twice returns
//! the same result.

use crate::grid::Grid;
use crate::types::{Direction, EngineConfig, MatchOrientation, Pos, SymbolKind, MIN_RUN_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRules {
    /// Shortest perpendicular branch (both sides combined) that gets merged
    pub extra_connection_min_len: usize,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for MatchRules {
    fn from(config: &EngineConfig) -> Self {
        Self {
            extra_connection_min_len: config.extra_connection_min_len.max(1),
        }
    }
}

/// A detected run. Positions are in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRun {
    pub positions: Vec<Pos>,
    pub kind: SymbolKind,
    pub orientation: MatchOrientation,
}

impl MatchRun {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.positions.contains(&pos)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    pub runs: Vec<MatchRun>,
}

impl ScanResult {
    pub fn has_match(&self) -> bool {
        !self.runs.is_empty()
    }

    /// All matched positions, row-major within each run
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.runs.iter().flat_map(|run| run.positions.iter().copied())
    }

    pub fn matched_count(&self) -> usize {
        self.runs.iter().map(MatchRun::len).sum()
    }
}

/// Scan-local claim marks
struct Claims {
    width: usize,
    marks: Vec<bool>,
}

impl Claims {
    fn new(grid: &Grid) -> Self {
        Self {
            width: grid.width() as usize,
            marks: vec![false; grid.width() as usize * grid.height() as usize],
        }
    }

    fn is_claimed(&self, pos: Pos) -> bool {
        self.marks[pos.y as usize * self.width + pos.x as usize]
    }

    fn claim(&mut self, pos: Pos) {
        self.marks[pos.y as usize * self.width + pos.x as usize] = true;
    }
}

/// Collect same-kind pieces from `origin` (exclusive) along `dir`.
///
/// Stops at the first hole, empty cell, consumable, claimed piece or
/// different kind; cells past a break are never considered.
fn probe(grid: &Grid, claims: &Claims, origin: Pos, kind: SymbolKind, dir: Direction, out: &mut Vec<Pos>) {
    let mut pos = origin.step(dir);
    while grid.matchable_kind(pos) == Some(kind) && !claims.is_claimed(pos) {
        out.push(pos);
        pos = pos.step(dir);
    }
}

fn probe_axis(grid: &Grid, claims: &Claims, seed: Pos, kind: SymbolKind, horizontal: bool) -> Vec<Pos> {
    let (back, forward) = if horizontal {
        (Direction::Left, Direction::Right)
    } else {
        (Direction::Up, Direction::Down)
    };
    let mut run = vec![seed];
    probe(grid, claims, seed, kind, back, &mut run);
    probe(grid, claims, seed, kind, forward, &mut run);
    run
}

fn straight_orientation(len: usize, horizontal: bool) -> MatchOrientation {
    match (horizontal, len > MIN_RUN_LEN) {
        (true, false) => MatchOrientation::Horizontal,
        (true, true) => MatchOrientation::LongHorizontal,
        (false, false) => MatchOrientation::Vertical,
        (false, true) => MatchOrientation::LongVertical,
    }
}

/// Find every match on the grid.
pub fn scan_for_matches(grid: &Grid, rules: &MatchRules) -> ScanResult {
    let mut claims = Claims::new(grid);
    let mut runs = Vec::new();

    for seed in grid.positions() {
        if claims.is_claimed(seed) {
            continue;
        }
        let Some(kind) = grid.matchable_kind(seed) else {
            continue;
        };

        let mut horizontal = true;
        let mut run = probe_axis(grid, &claims, seed, kind, true);
        if run.len() < MIN_RUN_LEN {
            horizontal = false;
            run = probe_axis(grid, &claims, seed, kind, false);
        }
        if run.len() < MIN_RUN_LEN {
            continue;
        }

        let mut orientation = straight_orientation(run.len(), horizontal);
        for pos in &run {
            claims.claim(*pos);
        }

        let spine = run.clone();
        for pos in spine {
            let mut branch = probe_axis(grid, &claims, pos, kind, !horizontal);
            // drop the spine cell itself
            branch.remove(0);
            if branch.len() >= rules.extra_connection_min_len {
                for extra in &branch {
                    claims.claim(*extra);
                }
                run.extend(branch);
                orientation = MatchOrientation::Super;
            }
        }

        run.sort_unstable_by_key(|p| (p.y, p.x));
        runs.push(MatchRun {
            positions: run,
            kind,
            orientation,
        });
    }

    ScanResult { runs }
}

/// Boolean shortcut over [`scan_for_matches`]
pub fn contains_match(grid: &Grid, rules: &MatchRules) -> bool {
    scan_for_matches(grid, rules).has_match()
}
