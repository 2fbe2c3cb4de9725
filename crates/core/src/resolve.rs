//! Resolution primitives: removal, gravity, refill and explosions
//!
//! Each helper takes the grid explicitly and leaves it consistent on return.
//! Sequencing (which helper runs in which settle step) is the board's job.

use crate::grid::Grid;
use crate::piece::Piece;
use crate::rng::KindSource;
use crate::snapshot::PieceMove;
use crate::types::{PieceVariant, Pos, SymbolKind};

/// Remove the pieces at `positions`, skipping empty cells
pub fn remove_pieces(grid: &mut Grid, positions: impl IntoIterator<Item = Pos>) -> Vec<Piece> {
    let removed: Vec<Piece> = positions
        .into_iter()
        .filter_map(|pos| grid.remove(pos))
        .collect();
    debug_assert!(grid.is_consistent());
    removed
}

/// Let pieces fall toward larger `y`.
///
/// Each column is compacted over its usable cells only: holes are skipped,
/// never filled, and the relative order of pieces is preserved.
pub fn collapse(grid: &mut Grid) -> Vec<PieceMove> {
    let mut moves = Vec::new();
    for x in 0..grid.width() as i32 {
        let column: Vec<Pos> = (0..grid.height() as i32)
            .map(|y| Pos::new(x, y))
            .filter(|pos| grid.is_usable(*pos))
            .collect();

        let mut write = column.len();
        for read in (0..column.len()).rev() {
            let from = column[read];
            let Some(id) = grid.piece(from).map(Piece::id) else {
                continue;
            };
            write -= 1;
            let to = column[write];
            if to != from && grid.relocate(from, to) {
                moves.push(PieceMove { id, from, to });
            }
        }
    }
    debug_assert!(grid.is_consistent());
    moves
}

/// Spawn random normal pieces into every empty usable cell.
///
/// Columns are filled left to right, each from the top down.
pub fn refill<R: KindSource + ?Sized>(grid: &mut Grid, symbol_count: u32, source: &mut R) -> Vec<Piece> {
    let mut spawned = Vec::new();
    for x in 0..grid.width() as i32 {
        for y in 0..grid.height() as i32 {
            let pos = Pos::new(x, y);
            if !grid.is_usable(pos) || !grid.is_empty(pos) {
                continue;
            }
            let kind = SymbolKind(source.pick(symbol_count) as u8);
            if let Some(piece) = grid.place(pos, kind, PieceVariant::Normal) {
                spawned.push(piece);
            }
        }
    }
    debug_assert!(grid.is_consistent());
    spawned
}

/// Usable cells within Chebyshev `radius` of `center`, clamped to the grid,
/// excluding the center itself. Row-major order.
pub fn blast_area(grid: &Grid, center: Pos, radius: u8) -> Vec<Pos> {
    let r = radius as i32;
    let mut area = Vec::new();
    for y in (center.y - r).max(0)..=(center.y + r).min(grid.height() as i32 - 1) {
        for x in (center.x - r).max(0)..=(center.x + r).min(grid.width() as i32 - 1) {
            let pos = Pos::new(x, y);
            if pos != center && grid.is_usable(pos) {
                area.push(pos);
            }
        }
    }
    area
}

/// Result of setting off a bomb
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detonation {
    pub bomb: Piece,
    /// Pieces destroyed around the bomb (the bomb excluded)
    pub destroyed: Vec<Piece>,
}

/// Remove the bomb at `center` and everything in its blast area.
///
/// Returns `None` (grid untouched) when `center` holds no piece.
pub fn detonate(grid: &mut Grid, center: Pos, radius: u8) -> Option<Detonation> {
    let area = blast_area(grid, center, radius);
    let bomb = grid.remove(center)?;
    let destroyed = remove_pieces(grid, area);
    Some(Detonation { bomb, destroyed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedKinds;

    #[test]
    fn collapse_preserves_order_and_skips_holes() {
        let mut grid = Grid::from_rows(&["A", "B", ".", "#", "."]).unwrap();
        let a = grid.piece(Pos::new(0, 0)).unwrap().id();
        let b = grid.piece(Pos::new(0, 1)).unwrap().id();

        let moves = collapse(&mut grid);

        assert_eq!(grid.to_string(), ".\n.\nA\n#\nB");
        assert_eq!(
            moves,
            vec![
                PieceMove {
                    id: b,
                    from: Pos::new(0, 1),
                    to: Pos::new(0, 4),
                },
                PieceMove {
                    id: a,
                    from: Pos::new(0, 0),
                    to: Pos::new(0, 2),
                },
            ]
        );
        assert!(grid.is_consistent());
    }

    #[test]
    fn collapse_leaves_settled_columns_alone() {
        let mut grid = Grid::from_rows(&[".B", "AC"]).unwrap();
        let moves = collapse(&mut grid);
        assert!(moves.is_empty());
        assert_eq!(grid.to_string(), ".B\nAC");
    }

    #[test]
    fn refill_fills_top_down_per_column() {
        let mut grid = Grid::from_rows(&["..", "A.", "BA"]).unwrap();
        let mut src = ScriptedKinds::new(vec![2, 3, 4]);
        let spawned = refill(&mut grid, 5, &mut src);
        assert_eq!(spawned.len(), 3);
        assert_eq!(grid.to_string(), "CD\nAE\nBA");
        assert!(grid.is_consistent());
    }

    #[test]
    fn blast_area_is_clamped() {
        let grid = Grid::from_rows(&["AAAAA", "AAAAA", "AAAAA", "AAAAA", "AAAAA"]).unwrap();
        assert_eq!(blast_area(&grid, Pos::new(2, 2), 2).len(), 24);
        assert_eq!(blast_area(&grid, Pos::new(0, 0), 2).len(), 8);
        assert_eq!(blast_area(&grid, Pos::new(0, 0), 1).len(), 3);
    }

    #[test]
    fn detonate_skips_holes_and_removes_bomb() {
        let mut grid = Grid::from_rows(&["AB#", "C*D", "EFG"]).unwrap();
        let hit = detonate(&mut grid, Pos::new(1, 1), 1).unwrap();
        assert!(hit.bomb.is_consumable());
        assert_eq!(hit.destroyed.len(), 7);
        assert_eq!(grid.piece_count(), 0);
        assert!(detonate(&mut grid, Pos::new(1, 1), 1).is_none());
    }
}
