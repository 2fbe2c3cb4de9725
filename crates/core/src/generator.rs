//! Board generation
//!
//! Fills a layout with random symbols until the result has no match and at
//! least one swap that would create one. Retries are bounded; on exhaustion
//! the last candidate is handed back inside the error.

use log::{debug, warn};

use crate::error::CoreError;
use crate::grid::Grid;
use crate::matcher::{contains_match, MatchRules};
use crate::rng::KindSource;
use crate::stage::Layout;
use crate::types::{Direction, PieceVariant, Pos, SymbolKind};

/// Fill every usable cell of `layout` with a uniformly random kind.
pub fn fill_random<R: KindSource + ?Sized>(layout: &Layout, symbol_count: u32, source: &mut R) -> Grid {
    let mut grid = Grid::from_layout(layout);
    let positions: Vec<Pos> = grid.usable_positions().collect();
    for pos in positions {
        let kind = SymbolKind(source.pick(symbol_count) as u8);
        grid.place(pos, kind, PieceVariant::Normal);
    }
    grid
}

/// First swap (in row-major scan order) that would produce a match.
///
/// Each unordered pair is tried once: only the right and down neighbours are
/// paired with a cell. The grid is swapped back before returning.
pub fn find_valid_move(grid: &Grid, rules: &MatchRules) -> Option<(Pos, Pos)> {
    let mut probe = grid.clone();
    for a in grid.positions() {
        if grid.is_empty(a) {
            continue;
        }
        for dir in [Direction::Right, Direction::Down] {
            let b = a.step(dir);
            if grid.is_empty(b) {
                continue;
            }
            if probe.swap(a, b).is_err() {
                continue;
            }
            let found = contains_match(&probe, rules);
            // swapping back two occupied usable cells cannot fail
            let _ = probe.swap(a, b);
            if found {
                return Some((a, b));
            }
        }
    }
    None
}

/// Whether any single adjacent swap produces a match
pub fn has_valid_move(grid: &Grid, rules: &MatchRules) -> bool {
    find_valid_move(grid, rules).is_some()
}

/// Generate a match-free grid with at least one valid move.
pub fn generate_playable_board<R: KindSource + ?Sized>(
    layout: &Layout,
    symbol_count: u32,
    source: &mut R,
    rules: &MatchRules,
    max_tries: u32,
) -> Result<Grid, CoreError> {
    let tries = max_tries.max(1);
    let mut candidate = None;

    for attempt in 1..=tries {
        let grid = fill_random(layout, symbol_count, source);
        if contains_match(&grid, rules) {
            debug!("generation attempt {attempt}: spawned with a match, retrying");
        } else if !has_valid_move(&grid, rules) {
            debug!("generation attempt {attempt}: no valid move, retrying");
        } else {
            debug!("generated playable {}x{} board after {attempt} attempt(s)", grid.width(), grid.height());
            return Ok(grid);
        }
        candidate = Some(grid);
    }

    warn!("board generation exhausted after {tries} tries");
    let last_candidate = candidate.unwrap_or_else(|| Grid::from_layout(layout));
    Err(CoreError::BoardGenerationExhausted {
        tries,
        last_candidate: Box::new(last_candidate),
    })
}
