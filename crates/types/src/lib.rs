//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (rules engine, async driver, control protocol).
//!
//! # Coordinates
//!
//! Positions are `(x, y)` with `x` growing left to right and `y` growing top to bottom:
//!
//! - **Row 0** is the top of the board; pieces fall toward larger `y`
//! - **Default size**: 6 columns x 8 rows
//! - Coordinates are signed so that out-of-range input can be represented and rejected
//!
//! # Tuning Defaults
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `MIN_RUN_LEN` | 3 | Shortest run that counts as a match |
//! | `DEFAULT_MAX_GENERATION_TRIES` | 100 | Board generation retry budget |
//! | `DEFAULT_EXTRA_CONNECTION_MIN_LEN` | 2 | Perpendicular branch length that makes a super match |
//! | `THREE_MATCH_PERCENT` | 100 | Score multiplier for 3-runs (percent) |
//! | `LONG_MATCH_PERCENT` | 150 | Score multiplier for 4+-runs (percent) |
//! | `DEFAULT_CASCADE_MAX_CHAIN` | 3 | Cap of the cascade combo multiplier |
//! | `DEFAULT_CASCADE_REWARD_INTERVAL` | 2 | Every Nth cascade grants a reward |
//! | `DEFAULT_BOMB_RADIUS` | 2 | Bomb explosion radius (Chebyshev) |
//! | `SWAP_DURATION_MS` | 200 | Presenter time budget for a swap |
//! | `CASCADE_DELAY_MS` | 400 | Pause between cascade rounds |
//!
//! # Examples
//!
//! ```
//! use match3_types::{BoardAction, Direction, Pos};
//!
//! let a = Pos::new(2, 3);
//! let b = a.step(Direction::Right);
//! assert_eq!(b, Pos::new(3, 3));
//! assert!(a.is_adjacent(b));
//!
//! assert_eq!(BoardAction::from_str("spawnBomb"), Some(BoardAction::SpawnBomb));
//! ```

use std::fmt;

/// Default board width in cells
pub const DEFAULT_WIDTH: u8 = 6;

/// Default board height in cells
pub const DEFAULT_HEIGHT: u8 = 8;

/// Shortest run of identical kinds that counts as a match
pub const MIN_RUN_LEN: usize = 3;

/// Number of attempts the generator makes before giving up
pub const DEFAULT_MAX_GENERATION_TRIES: u32 = 100;

/// Perpendicular branch length needed to promote a run to a super match
pub const DEFAULT_EXTRA_CONNECTION_MIN_LEN: usize = 2;

/// Score multiplier for a run of exactly three, in percent
pub const THREE_MATCH_PERCENT: u32 = 100;

/// Score multiplier for a run of four or more, in percent (x1.5)
pub const LONG_MATCH_PERCENT: u32 = 150;

/// Upper bound of the cascade combo multiplier
pub const DEFAULT_CASCADE_MAX_CHAIN: u32 = 3;

/// A reward is granted on every Nth consecutive cascade
pub const DEFAULT_CASCADE_REWARD_INTERVAL: u32 = 2;

/// Bombs granted per cascade reward
pub const DEFAULT_CASCADE_REWARD_BOMBS: u32 = 1;

/// Bomb explosion radius
pub const DEFAULT_BOMB_RADIUS: u8 = 2;

/// Time a presenter gets to animate a swap (ms)
pub const SWAP_DURATION_MS: u32 = 200;

/// Pause between two cascade rounds (ms)
pub const CASCADE_DELAY_MS: u32 = 400;

/// Coins granted per remaining move on stage win
pub const COINS_PER_MOVE_REMAINING: u32 = 100;

/// Remaining moves counted for the coin bonus
pub const MAX_BONUS_REMAINING_MOVES: u32 = 3;

/// Upper bound (exclusive) of the random coin bonus
pub const MAX_RANDOM_EXTRA_COINS: u32 = 20;

/// A grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighbouring position one cell in `dir` (may be out of bounds)
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn manhattan(self, other: Pos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn chebyshev(self, other: Pos) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Two cells sharing an edge
    pub fn is_adjacent(self, other: Pos) -> bool {
        self.manhattan(other) == 1
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// `(dx, dy)` with `y` growing downward
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// Index of a symbol in the active stage's symbol set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKind(pub u8);

impl SymbolKind {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Consumable power pieces.
///
/// Each kind carries its own effect parameters; the engine dispatches on the
/// variant rather than inspecting piece data at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumableKind {
    /// Clears every piece within `radius` (Chebyshev distance) of the bomb
    Bomb { radius: u8 },
}

impl ConsumableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumableKind::Bomb { .. } => "bomb",
        }
    }
}

/// What a piece is: a regular matchable symbol or a consumable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PieceVariant {
    #[default]
    Normal,
    Consumable(ConsumableKind),
}

impl PieceVariant {
    pub fn is_consumable(&self) -> bool {
        matches!(self, PieceVariant::Consumable(_))
    }
}

/// Classification of a detected run
///
/// - **Horizontal** / **Vertical**: exactly three in a line
/// - **LongHorizontal** / **LongVertical**: four or more in a line
/// - **Super**: a run with at least one perpendicular branch merged into it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOrientation {
    Horizontal,
    LongHorizontal,
    Vertical,
    LongVertical,
    Super,
}

impl MatchOrientation {
    pub fn is_horizontal(&self) -> bool {
        matches!(
            self,
            MatchOrientation::Horizontal | MatchOrientation::LongHorizontal
        )
    }

    pub fn is_vertical(&self) -> bool {
        matches!(
            self,
            MatchOrientation::Vertical | MatchOrientation::LongVertical
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOrientation::Horizontal => "horizontal",
            MatchOrientation::LongHorizontal => "longHorizontal",
            MatchOrientation::Vertical => "vertical",
            MatchOrientation::LongVertical => "longVertical",
            MatchOrientation::Super => "super",
        }
    }
}

/// Board activity state. Only `Idle` accepts player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoardState {
    #[default]
    Idle,
    Generating,
    ProcessingMove,
}

impl BoardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardState::Idle => "idle",
            BoardState::Generating => "generating",
            BoardState::ProcessingMove => "processingMove",
        }
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session lifecycle. `Won` and `GameOver` are terminal until the stage is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    #[default]
    Playing,
    Won,
    GameOver,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Playing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Playing => "playing",
            SessionStatus::Won => "won",
            SessionStatus::GameOver => "gameOver",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests an input collaborator can make
///
/// Used by the control protocol; payloads (positions) travel separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardAction {
    /// Select / deselect / swap via the click state machine
    Click,
    /// Swap two adjacent cells directly
    Swap,
    /// Trigger the consumable at a position
    Activate,
    /// Place a bomb from stock on a random cell
    SpawnBomb,
    /// Reset the session and regenerate the board
    Restart,
    /// Request a fresh observation without changing state
    Observe,
}

impl BoardAction {
    /// Parse action from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use match3_types::BoardAction;
    ///
    /// assert_eq!(BoardAction::from_str("swap"), Some(BoardAction::Swap));
    /// assert_eq!(BoardAction::from_str("spawn_bomb"), Some(BoardAction::SpawnBomb));
    /// assert_eq!(BoardAction::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "").as_str() {
            "click" => Some(BoardAction::Click),
            "swap" => Some(BoardAction::Swap),
            "activate" => Some(BoardAction::Activate),
            "spawnbomb" => Some(BoardAction::SpawnBomb),
            "restart" => Some(BoardAction::Restart),
            "observe" => Some(BoardAction::Observe),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoardAction::Click => "click",
            BoardAction::Swap => "swap",
            BoardAction::Activate => "activate",
            BoardAction::SpawnBomb => "spawnBomb",
            BoardAction::Restart => "restart",
            BoardAction::Observe => "observe",
        }
    }
}

/// Rule tuning for one board.
///
/// Stage data (size, layout, symbols, thresholds) lives in the stage
/// configuration; this struct only holds the engine knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_generation_tries: u32,
    pub extra_connection_min_len: usize,
    pub three_match_percent: u32,
    pub long_match_percent: u32,
    pub cascade_max_chain: u32,
    /// `0` disables cascade rewards
    pub cascade_reward_interval: u32,
    pub cascade_reward_bombs: u32,
    pub bomb_radius: u8,
    /// Whether an adjacent swap that produced no match still costs a move
    pub reverted_swap_costs_move: bool,
    /// Place one bomb for free when a stage is loaded
    pub initial_free_bomb: bool,
    pub swap_duration_ms: u32,
    pub cascade_delay_ms: u32,
    pub coins_per_move_remaining: u32,
    pub max_bonus_remaining_moves: u32,
    pub max_random_extra_coins: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_generation_tries: DEFAULT_MAX_GENERATION_TRIES,
            extra_connection_min_len: DEFAULT_EXTRA_CONNECTION_MIN_LEN,
            three_match_percent: THREE_MATCH_PERCENT,
            long_match_percent: LONG_MATCH_PERCENT,
            cascade_max_chain: DEFAULT_CASCADE_MAX_CHAIN,
            cascade_reward_interval: DEFAULT_CASCADE_REWARD_INTERVAL,
            cascade_reward_bombs: DEFAULT_CASCADE_REWARD_BOMBS,
            bomb_radius: DEFAULT_BOMB_RADIUS,
            reverted_swap_costs_move: true,
            initial_free_bomb: true,
            swap_duration_ms: SWAP_DURATION_MS,
            cascade_delay_ms: CASCADE_DELAY_MS,
            coins_per_move_remaining: COINS_PER_MOVE_REMAINING,
            max_bonus_remaining_moves: MAX_BONUS_REMAINING_MOVES,
            max_random_extra_coins: MAX_RANDOM_EXTRA_COINS,
        }
    }
}

impl EngineConfig {
    /// The bomb a stage hands out, sized by this configuration
    pub fn bomb(&self) -> ConsumableKind {
        ConsumableKind::Bomb {
            radius: self.bomb_radius,
        }
    }
}
