//! Read-only views handed to presentation and control collaborators

use crate::error::CoreError;
use crate::grid::Grid;
use crate::matcher::MatchRun;
use crate::piece::Piece;
use crate::session::Session;
use crate::types::{BoardState, PieceVariant, Pos, SessionStatus, SymbolKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceSnapshot {
    pub id: u32,
    pub kind: SymbolKind,
    pub pos: Pos,
    pub variant: PieceVariant,
}

impl From<&Piece> for PieceSnapshot {
    fn from(piece: &Piece) -> Self {
        Self {
            id: piece.id(),
            kind: piece.kind(),
            pos: piece.pos(),
            variant: piece.variant(),
        }
    }
}

impl From<Piece> for PieceSnapshot {
    fn from(piece: Piece) -> Self {
        Self::from(&piece)
    }
}

/// A piece that changed cells during a settle step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceMove {
    pub id: u32,
    pub from: Pos,
    pub to: Pos,
}

/// What one settle step did to the grid.
///
/// Presenters animate `removed`, then `moved`, then `spawned`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettleReport {
    pub removed: Vec<PieceSnapshot>,
    pub moved: Vec<PieceMove>,
    pub spawned: Vec<PieceSnapshot>,
    pub score_delta: u32,
    /// Cascade chain count of the round this step resolved
    pub cascade_depth: u32,
    pub runs: Vec<MatchRun>,
    /// The grid was replaced wholesale because no move was left
    pub reseeded: bool,
    /// No move was left and generating a new grid failed; the old grid stays
    pub reseed_error: Option<CoreError>,
    /// The board went back to idle at the end of this step
    pub finished: bool,
}

impl SettleReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.moved.is_empty()
            && self.spawned.is_empty()
            && self.score_delta == 0
            && !self.reseeded
            && self.reseed_error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellSnapshot {
    Hole,
    Empty,
    Piece(PieceSnapshot),
}

/// Full board view
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub width: u8,
    pub height: u8,
    /// Row-major, `height * width` entries
    pub cells: Vec<CellSnapshot>,
    pub state: BoardState,
    pub status: SessionStatus,
    pub selected: Option<Pos>,
    pub score: u32,
    pub score_to_win: u32,
    pub score_progress: f32,
    pub moves_remaining: u32,
    pub bombs_remaining: u32,
    pub cascade_chain_count: u32,
    pub coins: u32,
}

impl BoardSnapshot {
    pub(crate) fn capture(
        grid: &Grid,
        session: &Session,
        state: BoardState,
        selected: Option<Pos>,
    ) -> Self {
        let cells = grid
            .positions()
            .map(|pos| match grid.piece(pos) {
                Some(piece) => CellSnapshot::Piece(piece.into()),
                None if grid.is_usable(pos) => CellSnapshot::Empty,
                None => CellSnapshot::Hole,
            })
            .collect();

        Self {
            width: grid.width(),
            height: grid.height(),
            cells,
            state,
            status: session.status(),
            selected,
            score: session.score(),
            score_to_win: session.score_to_win(),
            score_progress: session.score_progress(),
            moves_remaining: session.moves_remaining(),
            bombs_remaining: session.bombs_remaining(),
            cascade_chain_count: session.cascade_chain_count(),
            coins: session.coins(),
        }
    }

    pub fn cell(&self, pos: Pos) -> Option<&CellSnapshot> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width as i32 || pos.y >= self.height as i32 {
            return None;
        }
        self.cells
            .get(pos.y as usize * self.width as usize + pos.x as usize)
    }

    pub fn piece(&self, pos: Pos) -> Option<&PieceSnapshot> {
        match self.cell(pos) {
            Some(CellSnapshot::Piece(piece)) => Some(piece),
            _ => None,
        }
    }

    pub fn playable(&self) -> bool {
        self.state == BoardState::Idle && !self.status.is_terminal()
    }
}
