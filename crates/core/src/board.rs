//! Board module - turn and session state machine
//!
//! A [`Board`] owns one grid and one session and is the only thing allowed to
//! mutate them. Player input starts a turn; the turn is then advanced one
//! settle step at a time with [`Board::step`] until the board is idle again.
//! After every step the grid is consistent and a presenter may animate the
//! returned [`SettleReport`].
//!
//! # Turn flow
//!
//! ```text
//!            request_swap / click            step()
//!   Idle ─────────────────────────► Check ───────────► revert + finish ─► Idle
//!     │                               │ match
//!     │ activate_consumable           ▼
//!     └──────────────────────────► Cascade ──(rescan finds a match)──┐
//!        (explosion, then Check)      ▲  │                          │
//!                                     └──┼──────────────────────────┘
//!                                        └─(no match)─► finish ─► Idle
//! ```
//!
//! Finishing a turn resets the cascade chain, consumes a move when the turn
//! counts, evaluates win/lose thresholds and reseeds the grid when no valid
//! move is left. Every turn that reaches a cascade costs one move; a swap
//! that gets reverted costs one per configuration, and an explosion that sets
//! off no match is free. While a turn is in flight, input is ignored and
//! restart/regenerate are refused.

use log::{debug, info, warn};

use crate::error::{CoreError, SwapRejection};
use crate::generator::{find_valid_move, generate_playable_board};
use crate::grid::Grid;
use crate::matcher::{scan_for_matches, MatchRules, MatchRun};
use crate::resolve::{collapse, detonate, refill, remove_pieces};
use crate::rng::{KindSource, SimpleRng};
use crate::scoring::{explosion_score, is_reward_round, round_score, stage_win_coins};
use crate::session::Session;
use crate::snapshot::{BoardSnapshot, PieceMove, PieceSnapshot, SettleReport};
use crate::stage::{Layout, StageConfig};
use crate::types::{
    BoardState, ConsumableKind, EngineConfig, PieceVariant, Pos, SessionStatus,
};

/// Why a request was dropped without effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A turn is still being resolved
    Busy,
    /// The clicked cell holds no piece
    EmptyCell,
    /// No bomb left in stock
    NoStock,
    /// No cell can receive a bomb
    NoTarget,
}

impl IgnoreReason {
    pub fn as_str(self) -> &'static str {
        match self {
            IgnoreReason::Busy => "busy",
            IgnoreReason::EmptyCell => "empty_cell",
            IgnoreReason::NoStock => "no_stock",
            IgnoreReason::NoTarget => "no_target",
        }
    }
}

/// Outcome of an input request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The request was applied; the report covers its first settle step
    Accepted(SettleReport),
    Ignored(IgnoreReason),
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted(_))
    }

    pub fn report(&self) -> Option<&SettleReport> {
        match self {
            Submission::Accepted(report) => Some(report),
            Submission::Ignored(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Selected(Pos),
    Deselected,
    /// A swap or an activation started a turn
    Started(SettleReport),
    Ignored(IgnoreReason),
}

impl From<Submission> for ClickOutcome {
    fn from(value: Submission) -> Self {
        match value {
            Submission::Accepted(report) => ClickOutcome::Started(report),
            Submission::Ignored(reason) => ClickOutcome::Ignored(reason),
        }
    }
}

/// Session-level notifications, drained with [`Board::drain_events`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    ScoreChanged { score: u32, delta: u32 },
    BombsChanged { bombs: u32 },
    MoveConsumed { remaining: u32 },
    StageWon { score: u32, coins: u32 },
    GameOver { score: u32 },
    BoardReseeded,
}

impl BoardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BoardEvent::ScoreChanged { .. } => "score_changed",
            BoardEvent::BombsChanged { .. } => "bombs_changed",
            BoardEvent::MoveConsumed { .. } => "move_consumed",
            BoardEvent::StageWon { .. } => "stage_won",
            BoardEvent::GameOver { .. } => "game_over",
            BoardEvent::BoardReseeded => "board_reseeded",
        }
    }
}

/// Where the current turn stands
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Next step scans the grid; a swap without a match gets reverted
    Check { revert: Option<(Pos, Pos)> },
    /// Next step resolves these runs (found by the previous rescan)
    Cascade { runs: Vec<MatchRun> },
}

#[derive(Debug, Clone)]
pub struct Board<R: KindSource = SimpleRng> {
    stage: StageConfig,
    config: EngineConfig,
    rules: MatchRules,
    grid: Grid,
    session: Session,
    rng: R,
    state: BoardState,
    phase: Phase,
    selected: Option<Pos>,
    events: Vec<BoardEvent>,
}

impl Board<SimpleRng> {
    /// Board driven by the default LCG
    pub fn with_seed(stage: StageConfig, config: EngineConfig, seed: u32) -> Result<Self, CoreError> {
        Self::new(stage, config, SimpleRng::new(seed))
    }
}

impl<R: KindSource> Board<R> {
    /// Load a stage: validate it, generate a playable grid and start a fresh session.
    pub fn new(stage: StageConfig, config: EngineConfig, mut rng: R) -> Result<Self, CoreError> {
        stage.validate()?;
        let rules = MatchRules::from(&config);
        let grid = generate_playable_board(
            &stage.layout,
            stage.symbol_count(),
            &mut rng,
            &rules,
            config.max_generation_tries,
        )?;

        let mut board = Self::assemble(stage, config, rules, grid, rng);
        board.place_free_bomb();
        info!(
            "stage loaded: {}x{} board, {} moves, target {}",
            board.grid.width(),
            board.grid.height(),
            board.session.moves_remaining(),
            board.session.score_to_win()
        );
        Ok(board)
    }

    /// Start from a prepared grid instead of generating one.
    ///
    /// The stage's layout is replaced by the grid's. No free bomb is placed
    /// and the grid is not checked for matches or moves.
    pub fn with_grid(stage: StageConfig, config: EngineConfig, grid: Grid, rng: R) -> Result<Self, CoreError> {
        let stage = stage.with_layout(Layout::of_grid(&grid));
        stage.validate()?;
        if let Some(piece) = grid
            .pieces()
            .find(|p| !p.is_consumable() && p.kind().index() >= stage.symbols.len())
        {
            return Err(CoreError::InvalidStage(format!(
                "piece at {} uses unknown symbol {}",
                piece.pos(),
                piece.kind().0
            )));
        }
        if !grid.is_consistent() {
            return Err(CoreError::InvalidStage("grid is inconsistent".into()));
        }
        let rules = MatchRules::from(&config);
        Ok(Self::assemble(stage, config, rules, grid, rng))
    }

    fn assemble(stage: StageConfig, config: EngineConfig, rules: MatchRules, grid: Grid, rng: R) -> Self {
        let session = Session::for_stage(&stage);
        Self {
            stage,
            config,
            rules,
            grid,
            session,
            rng,
            state: BoardState::Idle,
            phase: Phase::Idle,
            selected: None,
            events: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stage(&self) -> &StageConfig {
        &self.stage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> BoardState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == BoardState::Idle
    }

    pub fn selected(&self) -> Option<Pos> {
        self.selected
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::capture(&self.grid, &self.session, self.state, self.selected)
    }

    /// First swap that would produce a match, if any
    pub fn hint(&self) -> Option<(Pos, Pos)> {
        find_valid_move(&self.grid, &self.rules)
    }

    pub fn has_valid_move(&self) -> bool {
        self.hint().is_some()
    }

    /// Take all queued events, oldest first
    pub fn drain_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_playing(&self) -> Result<(), CoreError> {
        if self.session.is_over() {
            return Err(CoreError::SessionOver {
                status: self.session.status(),
            });
        }
        Ok(())
    }

    fn ignore_busy(&self, what: &str) -> Submission {
        debug!("{what} ignored: board is {}", self.state);
        Submission::Ignored(IgnoreReason::Busy)
    }

    // ---------------------------------------------------------------------
    // Input
    // ---------------------------------------------------------------------

    /// Translate a click on `pos` through the selection state machine.
    ///
    /// With nothing selected, a consumable is activated and any other piece
    /// becomes the selection. Clicking the selection clears it, clicking an
    /// adjacent piece swaps, and clicking anything else moves the selection.
    pub fn click(&mut self, pos: Pos) -> Result<ClickOutcome, CoreError> {
        if !self.is_idle() {
            return Ok(self.ignore_busy("click").into());
        }
        self.ensure_playing()?;
        let Some(piece) = self.grid.get(pos)?.piece().copied() else {
            return Ok(ClickOutcome::Ignored(IgnoreReason::EmptyCell));
        };

        match self.selected {
            None if piece.is_consumable() => Ok(self.activate_consumable(pos)?.into()),
            None => {
                self.selected = Some(pos);
                Ok(ClickOutcome::Selected(pos))
            }
            Some(sel) if sel == pos => {
                self.selected = None;
                Ok(ClickOutcome::Deselected)
            }
            Some(sel) if sel.is_adjacent(pos) => Ok(self.request_swap(sel, pos)?.into()),
            Some(_) => {
                self.selected = Some(pos);
                Ok(ClickOutcome::Selected(pos))
            }
        }
    }

    /// Swap two adjacent pieces and start a turn.
    ///
    /// Rejected swaps leave the board exactly as it was.
    pub fn request_swap(&mut self, a: Pos, b: Pos) -> Result<Submission, CoreError> {
        if !self.is_idle() {
            return Ok(self.ignore_busy("swap"));
        }
        self.ensure_playing()?;
        self.grid.get(a)?;
        self.grid.get(b)?;
        if a == b {
            return Err(CoreError::InvalidSwap {
                a,
                b,
                reason: SwapRejection::SamePosition,
            });
        }
        if !a.is_adjacent(b) {
            return Err(CoreError::InvalidSwap {
                a,
                b,
                reason: SwapRejection::NotAdjacent,
            });
        }
        self.grid.swap(a, b)?;

        self.selected = None;
        self.state = BoardState::ProcessingMove;
        self.phase = Phase::Check {
            revert: Some((a, b)),
        };
        debug!("swap {a} <-> {b}");
        Ok(Submission::Accepted(SettleReport {
            moved: self.swap_moves(a, b),
            ..SettleReport::default()
        }))
    }

    /// Set off the consumable at `pos`.
    ///
    /// The turn only costs a move if the refill leaves a match behind.
    pub fn activate_consumable(&mut self, pos: Pos) -> Result<Submission, CoreError> {
        if !self.is_idle() {
            return Ok(self.ignore_busy("activation"));
        }
        self.ensure_playing()?;
        let kind = self
            .grid
            .get(pos)?
            .piece()
            .and_then(|p| p.consumable())
            .ok_or(CoreError::NoConsumable { pos })?;

        let report = match kind {
            ConsumableKind::Bomb { radius } => self.explode(pos, radius)?,
        };

        self.selected = None;
        self.state = BoardState::ProcessingMove;
        self.phase = Phase::Check { revert: None };
        Ok(Submission::Accepted(report))
    }

    /// Turn a random normal piece into a bomb.
    ///
    /// With `consume_stock` one bomb is taken from the session's stock. The
    /// board stays idle: placing a bomb is not a turn.
    pub fn spawn_bomb(&mut self, consume_stock: bool) -> Result<Submission, CoreError> {
        if !self.is_idle() {
            return Ok(self.ignore_busy("bomb spawn"));
        }
        self.ensure_playing()?;
        if consume_stock && self.session.bombs_remaining() == 0 {
            return Ok(Submission::Ignored(IgnoreReason::NoStock));
        }
        if self.bomb_targets().is_empty() {
            return Ok(Submission::Ignored(IgnoreReason::NoTarget));
        }
        if consume_stock && self.session.take_bomb() {
            self.events.push(BoardEvent::BombsChanged {
                bombs: self.session.bombs_remaining(),
            });
        }
        match self.place_bomb() {
            Some(report) => Ok(Submission::Accepted(report)),
            None => Ok(Submission::Ignored(IgnoreReason::NoTarget)),
        }
    }

    /// Reset the session and generate a fresh grid for the same stage.
    pub fn restart(&mut self) -> Result<(), CoreError> {
        if !self.is_idle() {
            return Err(CoreError::ReentrantOperation { state: self.state });
        }
        self.state = BoardState::Generating;
        let generated = generate_playable_board(
            &self.stage.layout,
            self.stage.symbol_count(),
            &mut self.rng,
            &self.rules,
            self.config.max_generation_tries,
        );
        self.state = BoardState::Idle;
        self.grid = generated?;
        self.session = Session::for_stage(&self.stage);
        self.phase = Phase::Idle;
        self.selected = None;
        self.events.push(BoardEvent::BoardReseeded);
        self.place_free_bomb();
        info!("stage restarted");
        Ok(())
    }

    /// Replace the grid with a freshly generated one, keeping the session.
    pub fn regenerate(&mut self) -> Result<(), CoreError> {
        if !self.is_idle() {
            return Err(CoreError::ReentrantOperation { state: self.state });
        }
        self.reseed()
    }

    /// Install a grid supplied by the caller, e.g. the candidate carried by
    /// [`CoreError::BoardGenerationExhausted`].
    pub fn replace_grid(&mut self, grid: Grid) -> Result<(), CoreError> {
        if !self.is_idle() {
            return Err(CoreError::ReentrantOperation { state: self.state });
        }
        if grid.width() != self.grid.width() || grid.height() != self.grid.height() {
            return Err(CoreError::InvalidStage(format!(
                "grid is {}x{}, board is {}x{}",
                grid.width(),
                grid.height(),
                self.grid.width(),
                self.grid.height()
            )));
        }
        self.grid = grid;
        self.selected = None;
        self.events.push(BoardEvent::BoardReseeded);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Resolution
    // ---------------------------------------------------------------------

    /// Advance the current turn by one settle step.
    ///
    /// Returns `None` when there is nothing to resolve. When finishing the
    /// turn had to reseed and generation was exhausted, the report still
    /// describes the step and carries the failure in
    /// [`SettleReport::reseed_error`]; the board is then idle with its
    /// previous grid.
    pub fn step(&mut self) -> Option<SettleReport> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => None,
            Phase::Check { revert } => {
                let scan = scan_for_matches(&self.grid, &self.rules);
                if scan.has_match() {
                    return Some(self.cascade_round(scan.runs));
                }

                let mut report = SettleReport::default();
                let counts_move = match revert {
                    Some((a, b)) => {
                        if self.grid.swap(a, b).is_ok() {
                            report.moved = self.swap_moves(a, b);
                        }
                        debug!("swap {a} <-> {b} made no match, reverted");
                        self.config.reverted_swap_costs_move
                    }
                    None => false,
                };
                self.finish(counts_move, &mut report);
                Some(report)
            }
            Phase::Cascade { runs } => Some(self.cascade_round(runs)),
        }
    }

    /// Run the current turn to completion
    pub fn settle(&mut self) -> Vec<SettleReport> {
        let mut reports = Vec::new();
        while let Some(report) = self.step() {
            reports.push(report);
        }
        reports
    }

    /// Score, remove, collapse and refill one round of runs, then rescan.
    fn cascade_round(&mut self, runs: Vec<MatchRun>) -> SettleReport {
        let chain = self.session.cascade_chain_count();
        let score = round_score(&runs, &self.stage, chain, &self.config);
        debug!(
            "cascade round {chain}: {} run(s), x{} multiplier, +{}",
            runs.len(),
            score.multiplier,
            score.total
        );

        let removed = remove_pieces(
            &mut self.grid,
            runs.iter().flat_map(|run| run.positions.iter().copied()),
        );
        let moved = collapse(&mut self.grid);
        let spawned = refill(&mut self.grid, self.stage.symbol_count(), &mut self.rng);
        self.apply_score(score.total);

        if is_reward_round(chain, self.config.cascade_reward_interval)
            && self.config.cascade_reward_bombs > 0
        {
            let bombs = self.session.add_bombs(self.config.cascade_reward_bombs);
            debug!("cascade {chain} rewarded, bomb stock now {bombs}");
            self.events.push(BoardEvent::BombsChanged { bombs });
        }

        let mut report = SettleReport {
            removed: removed.into_iter().map(PieceSnapshot::from).collect(),
            moved,
            spawned: spawned.into_iter().map(PieceSnapshot::from).collect(),
            score_delta: score.total,
            cascade_depth: chain,
            runs,
            ..SettleReport::default()
        };

        let next = scan_for_matches(&self.grid, &self.rules);
        if next.has_match() {
            self.session.advance_chain();
            self.phase = Phase::Cascade { runs: next.runs };
        } else {
            self.finish(true, &mut report);
        }
        report
    }

    fn explode(&mut self, center: Pos, radius: u8) -> Result<SettleReport, CoreError> {
        let hit = detonate(&mut self.grid, center, radius).ok_or(CoreError::NoConsumable { pos: center })?;
        let delta = explosion_score(&hit.destroyed, &self.stage);
        debug!(
            "bomb at {center} destroyed {} piece(s), +{delta}",
            hit.destroyed.len()
        );

        let mut removed = Vec::with_capacity(hit.destroyed.len() + 1);
        removed.push(PieceSnapshot::from(hit.bomb));
        removed.extend(hit.destroyed.iter().map(PieceSnapshot::from));
        let moved = collapse(&mut self.grid);
        let spawned = refill(&mut self.grid, self.stage.symbol_count(), &mut self.rng);
        self.apply_score(delta);

        Ok(SettleReport {
            removed,
            moved,
            spawned: spawned.into_iter().map(PieceSnapshot::from).collect(),
            score_delta: delta,
            ..SettleReport::default()
        })
    }

    /// Close the turn and return to idle.
    fn finish(&mut self, counts_move: bool, report: &mut SettleReport) {
        self.session.reset_chain();
        if counts_move {
            let remaining = self.session.consume_move();
            self.events.push(BoardEvent::MoveConsumed { remaining });
        }
        self.settle_outcome();
        self.phase = Phase::Idle;
        report.finished = true;

        if !self.session.is_over() && !self.has_valid_move() {
            info!("no valid move left, reseeding");
            match self.reseed() {
                Ok(()) => report.reseeded = true,
                Err(err) => report.reseed_error = Some(err),
            }
        }
        self.state = BoardState::Idle;
    }

    fn settle_outcome(&mut self) {
        match self.session.settle_outcome() {
            Some(SessionStatus::Won) => {
                let score = self.session.score();
                let coins = stage_win_coins(
                    score,
                    self.session.moves_remaining(),
                    &self.config,
                    &mut self.rng,
                );
                self.session.set_coins(coins);
                info!("stage won with {score} points, {coins} coins");
                self.events.push(BoardEvent::StageWon { score, coins });
            }
            Some(SessionStatus::GameOver) => {
                let score = self.session.score();
                info!("game over at {score} points");
                self.events.push(BoardEvent::GameOver { score });
            }
            _ => {}
        }
    }

    /// Swap in a freshly generated grid. On exhaustion the old grid stays.
    fn reseed(&mut self) -> Result<(), CoreError> {
        self.state = BoardState::Generating;
        let generated = generate_playable_board(
            &self.stage.layout,
            self.stage.symbol_count(),
            &mut self.rng,
            &self.rules,
            self.config.max_generation_tries,
        );
        self.state = BoardState::Idle;
        match generated {
            Ok(grid) => {
                self.grid = grid;
                self.selected = None;
                self.events.push(BoardEvent::BoardReseeded);
                Ok(())
            }
            Err(err) => {
                warn!("reseed failed: {err}");
                Err(err)
            }
        }
    }

    fn apply_score(&mut self, delta: u32) {
        if delta == 0 {
            return;
        }
        let score = self.session.add_score(delta);
        self.events.push(BoardEvent::ScoreChanged { score, delta });
    }

    fn swap_moves(&self, a: Pos, b: Pos) -> Vec<PieceMove> {
        let mut moves = Vec::with_capacity(2);
        if let Some(piece) = self.grid.piece(a) {
            moves.push(PieceMove {
                id: piece.id(),
                from: b,
                to: a,
            });
        }
        if let Some(piece) = self.grid.piece(b) {
            moves.push(PieceMove {
                id: piece.id(),
                from: a,
                to: b,
            });
        }
        moves
    }

    // ---------------------------------------------------------------------
    // Bombs
    // ---------------------------------------------------------------------

    fn bomb_targets(&self) -> Vec<Pos> {
        self.grid
            .pieces()
            .filter(|p| !p.is_consumable())
            .map(|p| p.pos())
            .collect()
    }

    /// The free bomb leaves the stock alone but still needs one in it.
    fn place_free_bomb(&mut self) {
        if !self.config.initial_free_bomb || self.session.bombs_remaining() == 0 {
            return;
        }
        if let Some(report) = self.place_bomb() {
            if let Some(bomb) = report.spawned.first() {
                debug!("free bomb placed at {}", bomb.pos);
            }
        }
    }

    fn place_bomb(&mut self) -> Option<SettleReport> {
        let targets = self.bomb_targets();
        if targets.is_empty() {
            return None;
        }
        let pos = targets[self.rng.pick(targets.len() as u32) as usize];
        let old = self.grid.remove(pos)?;
        let bomb = self
            .grid
            .place(pos, old.kind(), PieceVariant::Consumable(self.config.bomb()))?;
        debug_assert!(self.grid.is_consistent());
        Some(SettleReport {
            removed: vec![old.into()],
            spawned: vec![bomb.into()],
            finished: true,
            ..SettleReport::default()
        })
    }
}
