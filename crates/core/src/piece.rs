//! Piece module - occupants of usable cells

use crate::types::{ConsumableKind, PieceVariant, Pos, SymbolKind};

/// A piece sitting in a grid cell.
///
/// `pos` mirrors the coordinates of the owning cell and is only ever changed
/// by the grid. A consumable's `kind` is inert: consumables never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    id: u32,
    kind: SymbolKind,
    pos: Pos,
    variant: PieceVariant,
}

impl Piece {
    pub(crate) fn new(id: u32, kind: SymbolKind, pos: Pos, variant: PieceVariant) -> Self {
        Self {
            id,
            kind,
            pos,
            variant,
        }
    }

    /// Identifier unique for the lifetime of the owning grid
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn variant(&self) -> PieceVariant {
        self.variant
    }

    pub fn is_consumable(&self) -> bool {
        self.variant.is_consumable()
    }

    pub fn consumable(&self) -> Option<ConsumableKind> {
        match self.variant {
            PieceVariant::Consumable(kind) => Some(kind),
            PieceVariant::Normal => None,
        }
    }

    /// Kind used for matching; `None` for consumables
    pub fn matchable_kind(&self) -> Option<SymbolKind> {
        match self.variant {
            PieceVariant::Normal => Some(self.kind),
            PieceVariant::Consumable(_) => None,
        }
    }

    pub(crate) fn set_pos(&mut self, pos: Pos) {
        self.pos = pos;
    }
}
