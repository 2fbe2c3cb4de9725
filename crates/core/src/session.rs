//! Session module - score, move budget and consumable stock of one stage attempt

use crate::stage::StageConfig;
use crate::types::SessionStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    score: u32,
    moves_remaining: u32,
    score_to_win: u32,
    bombs_remaining: u32,
    cascade_chain_count: u32,
    coins: u32,
    status: SessionStatus,
}

impl Session {
    pub fn new(max_moves: u32, score_to_win: u32, bombs: u32) -> Self {
        Self {
            score: 0,
            moves_remaining: max_moves,
            score_to_win,
            bombs_remaining: bombs,
            cascade_chain_count: 0,
            coins: 0,
            status: SessionStatus::Playing,
        }
    }

    pub fn for_stage(stage: &StageConfig) -> Self {
        Self::new(stage.max_moves, stage.score_to_win, stage.bombs)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn moves_remaining(&self) -> u32 {
        self.moves_remaining
    }

    pub fn score_to_win(&self) -> u32 {
        self.score_to_win
    }

    pub fn bombs_remaining(&self) -> u32 {
        self.bombs_remaining
    }

    pub fn cascade_chain_count(&self) -> u32 {
        self.cascade_chain_count
    }

    /// Coins awarded on stage win (0 until then)
    pub fn coins(&self) -> u32 {
        self.coins
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status.is_terminal()
    }

    /// `score / score_to_win`, clamped to `[0, 1]`; 0 when there is no target
    pub fn score_progress(&self) -> f32 {
        if self.score_to_win == 0 {
            return 0.0;
        }
        (self.score as f32 / self.score_to_win as f32).clamp(0.0, 1.0)
    }

    pub(crate) fn add_score(&mut self, delta: u32) -> u32 {
        self.score = self.score.saturating_add(delta);
        self.score
    }

    pub(crate) fn consume_move(&mut self) -> u32 {
        self.moves_remaining = self.moves_remaining.saturating_sub(1);
        self.moves_remaining
    }

    pub(crate) fn add_bombs(&mut self, amount: u32) -> u32 {
        self.bombs_remaining = self.bombs_remaining.saturating_add(amount);
        self.bombs_remaining
    }

    /// Take one bomb from stock; `false` when empty
    pub(crate) fn take_bomb(&mut self) -> bool {
        if self.bombs_remaining == 0 {
            return false;
        }
        self.bombs_remaining -= 1;
        true
    }

    pub(crate) fn advance_chain(&mut self) -> u32 {
        self.cascade_chain_count = self.cascade_chain_count.saturating_add(1);
        self.cascade_chain_count
    }

    pub(crate) fn reset_chain(&mut self) {
        self.cascade_chain_count = 0;
    }

    /// Evaluate win/lose thresholds. Returns the new status only on the
    /// transition out of `Playing`, so each outcome is reported once.
    pub(crate) fn settle_outcome(&mut self) -> Option<SessionStatus> {
        if self.status.is_terminal() {
            return None;
        }
        if self.score >= self.score_to_win {
            self.status = SessionStatus::Won;
        } else if self.moves_remaining == 0 {
            self.status = SessionStatus::GameOver;
        } else {
            return None;
        }
        Some(self.status)
    }

    pub(crate) fn set_coins(&mut self, coins: u32) {
        self.coins = coins;
    }
}
