//! Engine module - paces a board in real time
//!
//! The rules crate resolves a turn as a series of settle steps but never
//! waits. This crate runs a board inside one tokio task and inserts the
//! pauses a front end needs between steps:
//!
//! - after a swap: `swap_delay` (default 200 ms)
//! - after every step that removed pieces: `cascade_delay` (default 400 ms)
//!
//! # Example
//!
//! ```no_run
//! use match3_core::{Board, StageConfig};
//! use match3_core::types::{EngineConfig, Pos};
//! use match3_engine::{BoardDriver, DriverConfig, InputRequest};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DriverConfig::from_env();
//! let board = Board::with_seed(StageConfig::default(), EngineConfig::default(), config.seed)?;
//! let (handle, _task) = BoardDriver::new(board, config).spawn(16);
//!
//! handle.submit(InputRequest::Click(Pos::new(0, 0))).await?;
//! let snapshot = handle.settled().await?;
//! println!("score {}", snapshot.score);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod observer;

pub use config::DriverConfig;
pub use driver::{
    BoardDriver, DriverCommand, DriverError, DriverHandle, InputOutcome, InputReply, InputRequest,
};
pub use observer::{Presenter, SessionListener};
