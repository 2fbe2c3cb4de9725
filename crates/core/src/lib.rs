//! Core rules module - pure, deterministic, and testable
//!
//! This crate contains the match-3 rules: the grid model, match detection,
//! board generation, resolution (removal, gravity, refill, explosions) and the
//! turn/session state machine. It has **no dependencies** on rendering,
//! networking, clocks or I/O, making it:
//!
//! - **Deterministic**: Same seed (or scripted kind source) replays the same game
//! - **Testable**: Every rule is reachable from plain function calls
//! - **Embeddable**: Any number of boards can coexist; there is no global state
//!
//! # Module Structure
//!
//! - [`grid`]: cell matrix with usable/hole cells and the pieces they hold
//! - [`matcher`]: row-major scan for straight and super matches
//! - [`generator`]: retry-bounded generation of playable boards
//! - [`resolve`]: removal, column gravity, refill and bomb explosions
//! - [`scoring`]: run, cascade and stage-win rewards
//! - [`board`]: the turn state machine tying everything together
//! - [`session`]: score, moves, bomb stock and win/lose status
//! - [`stage`]: stage layout, symbol set and thresholds
//! - [`snapshot`]: read-only views for presenters
//!
//! # Example
//!
//! ```
//! use match3_core::{Board, Grid, ScriptedKinds, StageConfig, Submission};
//! use match3_core::types::{EngineConfig, Pos};
//!
//! let grid = Grid::from_rows(&[
//!     "ABAC",
//!     "CADB",
//!     "DCAC",
//!     "EEBE",
//! ]).unwrap();
//! let mut board = Board::with_grid(
//!     StageConfig::default(),
//!     EngineConfig::default(),
//!     grid,
//!     ScriptedKinds::new(vec![3, 4]),
//! ).unwrap();
//!
//! // Swapping the A up completes the top row.
//! let started = board.request_swap(Pos::new(1, 0), Pos::new(1, 1)).unwrap();
//! assert!(matches!(started, Submission::Accepted(_)));
//!
//! let reports = board.settle();
//! assert_eq!(reports[0].runs.len(), 1);
//! assert_eq!(board.session().score(), 30);
//! assert!(board.is_idle());
//! ```

pub mod board;
pub mod error;
pub mod generator;
pub mod grid;
pub mod matcher;
pub mod piece;
pub mod resolve;
pub mod rng;
pub mod scoring;
pub mod session;
pub mod snapshot;
pub mod stage;

pub use match3_types as types;

// Re-export commonly used types for convenience
pub use board::{Board, BoardEvent, ClickOutcome, IgnoreReason, Submission};
pub use error::{CoreError, SwapRejection};
pub use generator::{find_valid_move, generate_playable_board, has_valid_move};
pub use grid::{Cell, Grid};
pub use matcher::{contains_match, scan_for_matches, MatchRules, MatchRun, ScanResult};
pub use piece::Piece;
pub use rng::{KindSource, ScriptedKinds, SimpleRng};
pub use scoring::RoundScore;
pub use session::Session;
pub use snapshot::{BoardSnapshot, CellSnapshot, PieceMove, PieceSnapshot, SettleReport};
pub use stage::{Layout, StageConfig, SymbolDef};
