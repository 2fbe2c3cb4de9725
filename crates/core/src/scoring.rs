//! Scoring module - match, cascade and stage-win rewards
//!
//! Multipliers are kept in integer percent so rounding is exact:
//! - 3-runs score at `three_match_percent` (100), longer runs at `long_match_percent` (150)
//! - The cascade multiplier is `1 + chain`, capped at `cascade_max_chain`
//! - A run's score is rounded up once, after all multipliers
//!
//! Bomb explosions score the plain sum of what they destroy.

use crate::matcher::MatchRun;
use crate::piece::Piece;
use crate::rng::KindSource;
use crate::stage::StageConfig;
use crate::types::{EngineConfig, MIN_RUN_LEN};

/// Score breakdown of one cascade round
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoundScore {
    /// One entry per run, in scan order
    pub per_run: Vec<u32>,
    pub multiplier: u32,
    pub total: u32,
}

/// Length multiplier in percent
pub fn length_percent(len: usize, config: &EngineConfig) -> u32 {
    if len > MIN_RUN_LEN {
        config.long_match_percent
    } else {
        config.three_match_percent
    }
}

/// Cascade multiplier for a round at `chain` (0 for the first round of a turn)
pub fn chain_multiplier(chain: u32, max_chain: u32) -> u32 {
    chain.saturating_add(1).min(max_chain.max(1))
}

/// `ceil(base_sum * percent * multiplier / 100)`
pub fn run_score(base_sum: u32, len: usize, chain: u32, config: &EngineConfig) -> u32 {
    let numerator = base_sum as u64
        * length_percent(len, config) as u64
        * chain_multiplier(chain, config.cascade_max_chain) as u64;
    numerator.div_ceil(100).min(u32::MAX as u64) as u32
}

/// Score every run of a round. The caller applies `total` once.
pub fn round_score(runs: &[MatchRun], stage: &StageConfig, chain: u32, config: &EngineConfig) -> RoundScore {
    let per_run: Vec<u32> = runs
        .iter()
        .map(|run| {
            let base_sum = stage.score_value(run.kind).saturating_mul(run.len() as u32);
            run_score(base_sum, run.len(), chain, config)
        })
        .collect();
    let total = per_run.iter().fold(0u32, |acc, s| acc.saturating_add(*s));
    RoundScore {
        per_run,
        multiplier: chain_multiplier(chain, config.cascade_max_chain),
        total,
    }
}

/// Plain sum of destroyed normal pieces; consumables are worth nothing
pub fn explosion_score<'a>(destroyed: impl IntoIterator<Item = &'a Piece>, stage: &StageConfig) -> u32 {
    destroyed
        .into_iter()
        .filter_map(Piece::matchable_kind)
        .fold(0u32, |acc, kind| acc.saturating_add(stage.score_value(kind)))
}

/// Whether a round at `chain` grants the cascade reward
pub fn is_reward_round(chain: u32, interval: u32) -> bool {
    interval > 0 && chain > 0 && chain % interval == 0
}

/// Coins earned on stage win.
///
/// `score / 2 + per_move * clamp(moves, 1, max_moves)` plus a random bonus
/// in `[0, min(max_random, move_bonus))` when more than one move is left.
pub fn stage_win_coins<R: KindSource + ?Sized>(
    score: u32,
    moves_remaining: u32,
    config: &EngineConfig,
    rng: &mut R,
) -> u32 {
    let score_coins = score / 2;
    let bonus_moves = moves_remaining.clamp(1, config.max_bonus_remaining_moves.max(1));
    let move_bonus = config.coins_per_move_remaining.saturating_mul(bonus_moves);
    let max_random = if moves_remaining > 1 {
        config.max_random_extra_coins.min(move_bonus)
    } else {
        0
    };
    let random_bonus = if max_random > 0 { rng.pick(max_random) } else { 0 };
    score_coins
        .saturating_add(move_bonus)
        .saturating_add(random_bonus)
}
