//! Error taxonomy for the rules engine
//!
//! Every variant carries a stable snake_case [`code`](CoreError::code) so that
//! outer layers (the control protocol, logs) can report failures without
//! matching on the Rust type.

use std::fmt;

use thiserror::Error;

use crate::grid::Grid;
use crate::types::{BoardState, Pos, SessionStatus};

/// Why a swap request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapRejection {
    NotAdjacent,
    Unusable,
    Empty,
    SamePosition,
}

impl SwapRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            SwapRejection::NotAdjacent => "cells are not adjacent",
            SwapRejection::Unusable => "cell is not usable",
            SwapRejection::Empty => "cell holds no piece",
            SwapRejection::SamePosition => "cannot swap a cell with itself",
        }
    }
}

impl fmt::Display for SwapRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("position {pos} is outside the grid")]
    OutOfBounds { pos: Pos },

    #[error("cannot swap {a} with {b}: {reason}")]
    InvalidSwap {
        a: Pos,
        b: Pos,
        reason: SwapRejection,
    },

    /// The generator ran out of attempts. The last candidate is kept so the
    /// caller can decide to accept it anyway.
    #[error("no playable board after {tries} tries")]
    BoardGenerationExhausted {
        tries: u32,
        last_candidate: Box<Grid>,
    },

    #[error("operation not allowed while board is {state}")]
    ReentrantOperation { state: BoardState },

    #[error("session is over ({status})")]
    SessionOver { status: SessionStatus },

    #[error("no consumable at {pos}")]
    NoConsumable { pos: Pos },

    #[error("invalid stage: {0}")]
    InvalidStage(String),
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::OutOfBounds { .. } => "out_of_bounds",
            CoreError::InvalidSwap { .. } => "invalid_swap",
            CoreError::BoardGenerationExhausted { .. } => "board_generation_exhausted",
            CoreError::ReentrantOperation { .. } => "reentrant_operation",
            CoreError::SessionOver { .. } => "session_over",
            CoreError::NoConsumable { .. } => "no_consumable",
            CoreError::InvalidStage(_) => "invalid_stage",
        }
    }

    /// Whether the board can keep running after this error.
    ///
    /// Only generation exhaustion is fatal; everything else is a rejected
    /// request that left the board untouched.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::BoardGenerationExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = CoreError::InvalidSwap {
            a: Pos::new(0, 0),
            b: Pos::new(2, 0),
            reason: SwapRejection::NotAdjacent,
        };
        assert_eq!(err.code(), "invalid_swap");
        assert_eq!(
            err.to_string(),
            "cannot swap (0, 0) with (2, 0): cells are not adjacent"
        );
        assert!(!err.is_fatal());

        let err = CoreError::SessionOver {
            status: SessionStatus::GameOver,
        };
        assert_eq!(err.code(), "session_over");
        assert_eq!(err.to_string(), "session is over (gameOver)");
    }
}
