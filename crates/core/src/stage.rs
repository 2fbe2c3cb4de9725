//! Stage module - per-stage configuration handed in by the level collaborator
//!
//! A stage defines the board shape (which cells are usable), the symbol set
//! with the score each symbol is worth, and the session thresholds. Loading
//! stages from disk is the caller's business; this module only describes and
//! validates them.

use crate::error::CoreError;
use crate::grid::Grid;
use crate::types::{Pos, SymbolKind, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Usable / hole mask of a board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    width: u8,
    height: u8,
    usable: Vec<bool>,
}

impl Layout {
    /// A fully usable rectangle
    pub fn open(width: u8, height: u8) -> Self {
        Self {
            width,
            height,
            usable: vec![true; width as usize * height as usize],
        }
    }

    /// Parse rows top to bottom: `.` is a usable cell, `#` a hole.
    ///
    /// ```
    /// use match3_core::{Layout, types::Pos};
    ///
    /// let layout = Layout::from_rows(&["..#", "..."]).unwrap();
    /// assert_eq!((layout.width(), layout.height()), (3, 2));
    /// assert!(!layout.is_usable(Pos::new(2, 0)));
    /// ```
    pub fn from_rows(rows: &[&str]) -> Result<Self, CoreError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidStage("layout is empty".into()));
        }
        if width > u8::MAX as usize || height > u8::MAX as usize {
            return Err(CoreError::InvalidStage(format!(
                "layout {width}x{height} is too large"
            )));
        }

        let mut usable = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(CoreError::InvalidStage(format!(
                    "row {y} has {} cells, expected {width}",
                    row.chars().count()
                )));
            }
            for ch in row.chars() {
                match ch {
                    '.' => usable.push(true),
                    '#' => usable.push(false),
                    other => {
                        return Err(CoreError::InvalidStage(format!(
                            "unexpected layout character {other:?} in row {y}"
                        )))
                    }
                }
            }
        }

        Ok(Self {
            width: width as u8,
            height: height as u8,
            usable,
        })
    }

    /// Layout of an existing grid
    pub fn of_grid(grid: &Grid) -> Self {
        Self {
            width: grid.width(),
            height: grid.height(),
            usable: grid.positions().map(|pos| grid.is_usable(pos)).collect(),
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Out-of-range positions are never usable
    pub fn is_usable(&self, pos: Pos) -> bool {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width as i32 || pos.y >= self.height as i32 {
            return false;
        }
        self.usable[pos.y as usize * self.width as usize + pos.x as usize]
    }

    pub fn usable_count(&self) -> usize {
        self.usable.iter().filter(|u| **u).count()
    }
}

/// A symbol the stage may spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDef {
    pub name: String,
    pub score_value: u32,
}

impl SymbolDef {
    pub fn new(name: impl Into<String>, score_value: u32) -> Self {
        Self {
            name: name.into(),
            score_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageConfig {
    pub width: u8,
    pub height: u8,
    pub layout: Layout,
    pub symbols: Vec<SymbolDef>,
    pub max_moves: u32,
    pub score_to_win: u32,
    /// Bomb stock at stage start
    pub bombs: u32,
}

impl StageConfig {
    /// Replace the layout, keeping width/height in sync
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.width = layout.width();
        self.height = layout.height();
        self.layout = layout;
        self
    }

    pub fn with_thresholds(mut self, max_moves: u32, score_to_win: u32) -> Self {
        self.max_moves = max_moves;
        self.score_to_win = score_to_win;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.symbols.is_empty() {
            return Err(CoreError::InvalidStage("symbol set is empty".into()));
        }
        if self.symbols.len() > u8::MAX as usize {
            return Err(CoreError::InvalidStage(format!(
                "{} symbols exceed the supported maximum",
                self.symbols.len()
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CoreError::InvalidStage(format!(
                "board size {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.layout.width() != self.width || self.layout.height() != self.height {
            return Err(CoreError::InvalidStage(format!(
                "layout is {}x{} but stage declares {}x{}",
                self.layout.width(),
                self.layout.height(),
                self.width,
                self.height
            )));
        }
        if self.layout.usable_count() == 0 {
            return Err(CoreError::InvalidStage("layout has no usable cell".into()));
        }
        Ok(())
    }

    pub fn symbol_count(&self) -> u32 {
        self.symbols.len() as u32
    }

    /// Base score of a symbol; unknown kinds are worth nothing
    pub fn score_value(&self, kind: SymbolKind) -> u32 {
        self.symbols
            .get(kind.index())
            .map(|s| s.score_value)
            .unwrap_or(0)
    }

    pub fn symbol_name(&self, kind: SymbolKind) -> Option<&str> {
        self.symbols.get(kind.index()).map(|s| s.name.as_str())
    }
}

impl Default for StageConfig {
    /// 6x8 open board with five symbols worth 10 points each
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            layout: Layout::open(DEFAULT_WIDTH, DEFAULT_HEIGHT),
            symbols: ["ruby", "emerald", "sapphire", "topaz", "amethyst"]
                .into_iter()
                .map(|name| SymbolDef::new(name, 10))
                .collect(),
            max_moves: 20,
            score_to_win: 1000,
            bombs: 0,
        }
    }
}
