//! Grid module - the cell matrix owned by a board
//!
//! The grid is a `width x height` matrix of cells stored in a flat vector in
//! row-major order (`y * width + x`). Row 0 is the top. Cells are either usable
//! (may hold a piece) or holes (never hold a piece).
//!
//! The grid only stores and moves pieces; detection, scoring and generation
//! live elsewhere.

use std::fmt;

use crate::error::{CoreError, SwapRejection};
use crate::piece::Piece;
use crate::stage::Layout;
use crate::types::{ConsumableKind, PieceVariant, Pos, SymbolKind, DEFAULT_BOMB_RADIUS};

/// One grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    usable: bool,
    piece: Option<Piece>,
}

impl Cell {
    fn open() -> Self {
        Self {
            usable: true,
            piece: None,
        }
    }

    fn hole() -> Self {
        Self {
            usable: false,
            piece: None,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.usable
    }

    pub fn piece(&self) -> Option<&Piece> {
        self.piece.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.piece.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: u8,
    height: u8,
    cells: Vec<Cell>,
    next_id: u32,
}

impl Grid {
    /// Empty grid shaped by `layout`
    pub fn from_layout(layout: &Layout) -> Self {
        let mut cells = Vec::with_capacity(layout.width() as usize * layout.height() as usize);
        for y in 0..layout.height() as i32 {
            for x in 0..layout.width() as i32 {
                if layout.is_usable(Pos::new(x, y)) {
                    cells.push(Cell::open());
                } else {
                    cells.push(Cell::hole());
                }
            }
        }
        Self {
            width: layout.width(),
            height: layout.height(),
            cells,
            next_id: 1,
        }
    }

    /// Build a filled grid from text rows, top row first.
    ///
    /// `A`..`Z` are symbol kinds 0..25, `*` is a bomb, `.` an empty usable
    /// cell and `#` a hole.
    ///
    /// ```
    /// use match3_core::{Grid, types::{Pos, SymbolKind}};
    ///
    /// let grid = Grid::from_rows(&["AB#", "BA*"]).unwrap();
    /// assert_eq!(grid.piece(Pos::new(1, 0)).map(|p| p.kind()), Some(SymbolKind(1)));
    /// assert!(!grid.is_usable(Pos::new(2, 0)));
    /// assert!(grid.piece(Pos::new(2, 1)).unwrap().is_consumable());
    /// ```
    pub fn from_rows(rows: &[&str]) -> Result<Self, CoreError> {
        let mask: Vec<String> = rows
            .iter()
            .map(|row| {
                row.chars()
                    .map(|ch| if ch == '#' { '#' } else { '.' })
                    .collect()
            })
            .collect();
        let mask_refs: Vec<&str> = mask.iter().map(String::as_str).collect();
        let layout = Layout::from_rows(&mask_refs)?;
        let mut grid = Self::from_layout(&layout);

        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let pos = Pos::new(x as i32, y as i32);
                match ch {
                    '#' | '.' => {}
                    '*' => {
                        grid.place(
                            pos,
                            SymbolKind(0),
                            PieceVariant::Consumable(ConsumableKind::Bomb {
                                radius: DEFAULT_BOMB_RADIUS,
                            }),
                        );
                    }
                    'A'..='Z' => {
                        let kind = SymbolKind(ch as u8 - b'A');
                        grid.place(pos, kind, PieceVariant::Normal);
                    }
                    other => {
                        return Err(CoreError::InvalidStage(format!(
                            "unexpected grid character {other:?} at {pos}"
                        )))
                    }
                }
            }
        }
        Ok(grid)
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32
    }

    #[inline(always)]
    fn index(&self, pos: Pos) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(pos.y as usize * self.width as usize + pos.x as usize)
    }

    pub fn get(&self, pos: Pos) -> Result<&Cell, CoreError> {
        self.index(pos)
            .map(|idx| &self.cells[idx])
            .ok_or(CoreError::OutOfBounds { pos })
    }

    /// Piece at `pos`, if any (out of bounds yields `None`)
    pub fn piece(&self, pos: Pos) -> Option<&Piece> {
        self.index(pos).and_then(|idx| self.cells[idx].piece.as_ref())
    }

    pub fn is_usable(&self, pos: Pos) -> bool {
        self.index(pos).is_some_and(|idx| self.cells[idx].usable)
    }

    /// Out-of-bounds and unusable cells count as empty
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.piece(pos).is_none()
    }

    /// Kind of a normal piece at `pos`; `None` for holes, empty cells and consumables
    pub fn matchable_kind(&self, pos: Pos) -> Option<SymbolKind> {
        self.piece(pos).and_then(Piece::matchable_kind)
    }

    /// Exchange the pieces of two cells. Adjacency is the caller's concern.
    pub fn swap(&mut self, a: Pos, b: Pos) -> Result<(), CoreError> {
        let ia = self.index(a).ok_or(CoreError::OutOfBounds { pos: a })?;
        let ib = self.index(b).ok_or(CoreError::OutOfBounds { pos: b })?;

        let reject = |reason| CoreError::InvalidSwap { a, b, reason };
        if !self.cells[ia].usable || !self.cells[ib].usable {
            return Err(reject(SwapRejection::Unusable));
        }
        if self.cells[ia].piece.is_none() || self.cells[ib].piece.is_none() {
            return Err(reject(SwapRejection::Empty));
        }

        self.cells.swap(ia, ib);
        if let Some(piece) = self.cells[ia].piece.as_mut() {
            piece.set_pos(a);
        }
        if let Some(piece) = self.cells[ib].piece.as_mut() {
            piece.set_pos(b);
        }
        debug_assert!(self.is_consistent());
        Ok(())
    }

    /// Clear a cell. No-op on empty, unusable or out-of-bounds cells.
    pub fn remove(&mut self, pos: Pos) -> Option<Piece> {
        let idx = self.index(pos)?;
        self.cells[idx].piece.take()
    }

    /// Every position in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        let width = self.width as i32;
        (0..self.height as i32).flat_map(move |y| (0..width).map(move |x| Pos::new(x, y)))
    }

    pub fn usable_positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.positions().filter(|pos| self.is_usable(*pos))
    }

    /// Pieces in row-major order
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.cells.iter().filter_map(|cell| cell.piece.as_ref())
    }

    pub fn piece_count(&self) -> usize {
        self.pieces().count()
    }

    /// Every piece's stored position matches its cell and holes are empty
    pub fn is_consistent(&self) -> bool {
        self.positions().zip(self.cells.iter()).all(|(pos, cell)| {
            match cell.piece.as_ref() {
                Some(piece) => cell.usable && piece.pos() == pos,
                None => true,
            }
        })
    }

    /// Put a fresh piece into an empty usable cell
    pub(crate) fn place(&mut self, pos: Pos, kind: SymbolKind, variant: PieceVariant) -> Option<Piece> {
        let idx = self.index(pos)?;
        let cell = &mut self.cells[idx];
        if !cell.usable || cell.piece.is_some() {
            return None;
        }
        let piece = Piece::new(self.next_id, kind, pos, variant);
        self.next_id = self.next_id.wrapping_add(1);
        cell.piece = Some(piece);
        Some(piece)
    }

    /// Move a piece into an empty usable cell, keeping its id
    pub(crate) fn relocate(&mut self, from: Pos, to: Pos) -> bool {
        let (Some(src), Some(dst)) = (self.index(from), self.index(to)) else {
            return false;
        };
        if !self.cells[dst].usable || self.cells[dst].piece.is_some() {
            return false;
        }
        let Some(mut piece) = self.cells[src].piece.take() else {
            return false;
        };
        piece.set_pos(to);
        self.cells[dst].piece = Some(piece);
        true
    }
}

impl fmt::Display for Grid {
    /// Same notation as [`Grid::from_rows`], one row per line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pos = Pos::new(x, y);
                let ch = match self.piece(pos) {
                    Some(piece) if piece.is_consumable() => '*',
                    Some(piece) => (b'A' + piece.kind().0.min(25)) as char,
                    None if self.is_usable(pos) => '.',
                    None => '#',
                };
                write!(f, "{ch}")?;
            }
            if y + 1 < self.height as i32 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
