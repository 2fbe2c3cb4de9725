//! Async board driver
//!
//! A [`BoardDriver`] owns one [`Board`] and runs it as a single sequential
//! task. Input arrives as [`DriverCommand`]s on a bounded channel; once a
//! turn starts, the driver advances it one settle step at a time and sleeps
//! between steps so presenters can animate. Steps never overlap, so cascade
//! N+1 always sees the refilled grid of cascade N.
//!
//! Input that arrives mid-turn is handed to the board anyway, which ignores
//! it (`Ignored(Busy)`). Snapshot queries are answered at any time.

use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use match3_core::{
    Board, BoardSnapshot, ClickOutcome, CoreError, IgnoreReason, KindSource, SettleReport,
    SimpleRng, Submission,
};
use match3_types::Pos;

use crate::config::DriverConfig;
use crate::observer::{Presenter, SessionListener};

/// Player input understood by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRequest {
    Click(Pos),
    Swap { from: Pos, to: Pos },
    Activate(Pos),
    /// Spend one bomb from stock
    SpawnBomb,
    Restart,
}

/// What an accepted request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// A turn started and is now settling
    Started,
    Selected(Pos),
    Deselected,
    /// Applied in one go (bomb spawn, restart)
    Applied,
    Ignored(IgnoreReason),
}

impl InputOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, InputOutcome::Ignored(_))
    }
}

pub type InputReply = oneshot::Sender<Result<InputOutcome, CoreError>>;

#[derive(Debug)]
pub enum DriverCommand {
    Input {
        request: InputRequest,
        reply: Option<InputReply>,
    },
    /// Current state, even mid-turn
    Snapshot { reply: oneshot::Sender<BoardSnapshot> },
    /// Answered once the board is idle again
    WhenIdle { reply: oneshot::Sender<BoardSnapshot> },
    /// Finish the running turn without delays, then stop
    Shutdown,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver is not running")]
    Closed,
    #[error("driver queue is full")]
    Full,
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DriverError {
    pub fn code(&self) -> &'static str {
        match self {
            DriverError::Closed => "driver_closed",
            DriverError::Full => "backpressure",
            DriverError::Core(err) => err.code(),
        }
    }
}

pub struct BoardDriver<R: KindSource = SimpleRng> {
    board: Board<R>,
    config: DriverConfig,
    presenters: Vec<Box<dyn Presenter>>,
    listeners: Vec<Box<dyn SessionListener>>,
    idle_waiters: Vec<oneshot::Sender<BoardSnapshot>>,
    /// Pause owed after the last presented step
    next_delay: Option<Duration>,
}

impl<R: KindSource> BoardDriver<R> {
    pub fn new(board: Board<R>, config: DriverConfig) -> Self {
        Self {
            board,
            config,
            presenters: Vec::new(),
            listeners: Vec::new(),
            idle_waiters: Vec::new(),
            next_delay: None,
        }
    }

    pub fn with_presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenters.push(Box::new(presenter));
        self
    }

    pub fn with_listener(mut self, listener: impl SessionListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn board(&self) -> &Board<R> {
        &self.board
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn into_board(self) -> Board<R> {
        self.board
    }

    /// Hand one request to the board and publish its first settle step.
    ///
    /// Does not wait for the turn to settle; see [`BoardDriver::settle_now`].
    pub fn apply(&mut self, request: InputRequest) -> Result<InputOutcome, CoreError> {
        let result = self.dispatch(request);
        self.forward_events();
        result
    }

    /// Run the current turn to completion without any delay
    pub fn settle_now(&mut self) {
        while self.advance().is_some() {}
        self.wake_idle_waiters();
    }

    /// Process commands until the channel closes or [`DriverCommand::Shutdown`]
    /// arrives. Returns the board, idle.
    pub async fn run(mut self, mut rx: mpsc::Receiver<DriverCommand>) -> Board<R> {
        info!(
            "driver started (swap delay {:?}, cascade delay {:?})",
            self.config.swap_delay, self.config.cascade_delay
        );
        let mut deadline: Option<Instant> = None;

        loop {
            let command = match deadline {
                Some(at) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(at) => {
                            deadline = self.advance().map(|delay| Instant::now() + delay);
                            self.wake_idle_waiters();
                            continue;
                        }
                        command = rx.recv() => command,
                    }
                }
                None => rx.recv().await,
            };

            let Some(command) = command else {
                debug!("driver channel closed");
                break;
            };

            match command {
                DriverCommand::Input { request, reply } => {
                    let result = self.apply(request);
                    if let Err(err) = &result {
                        debug!("{request:?} rejected: {err}");
                    }
                    if let Some(delay) = self.next_delay.take() {
                        deadline = Some(Instant::now() + delay);
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                    self.wake_idle_waiters();
                }
                DriverCommand::Snapshot { reply } => {
                    let _ = reply.send(self.board.snapshot());
                }
                DriverCommand::WhenIdle { reply } => {
                    self.idle_waiters.push(reply);
                    self.wake_idle_waiters();
                }
                DriverCommand::Shutdown => break,
            }
        }

        self.settle_now();
        info!("driver stopped");
        self.board
    }

    fn dispatch(&mut self, request: InputRequest) -> Result<InputOutcome, CoreError> {
        match request {
            InputRequest::Click(pos) => match self.board.click(pos)? {
                ClickOutcome::Selected(at) => Ok(InputOutcome::Selected(at)),
                ClickOutcome::Deselected => Ok(InputOutcome::Deselected),
                ClickOutcome::Started(report) => {
                    self.present(&report);
                    Ok(InputOutcome::Started)
                }
                ClickOutcome::Ignored(reason) => Ok(InputOutcome::Ignored(reason)),
            },
            InputRequest::Swap { from, to } => {
                let submission = self.board.request_swap(from, to)?;
                Ok(self.accept(submission, InputOutcome::Started))
            }
            InputRequest::Activate(pos) => {
                let submission = self.board.activate_consumable(pos)?;
                Ok(self.accept(submission, InputOutcome::Started))
            }
            InputRequest::SpawnBomb => {
                let submission = self.board.spawn_bomb(true)?;
                Ok(self.accept(submission, InputOutcome::Applied))
            }
            InputRequest::Restart => {
                self.board.restart()?;
                let snapshot = self.board.snapshot();
                for presenter in &mut self.presenters {
                    presenter.on_reset(&snapshot);
                }
                Ok(InputOutcome::Applied)
            }
        }
    }

    fn accept(&mut self, submission: Submission, outcome: InputOutcome) -> InputOutcome {
        match submission {
            Submission::Accepted(report) => {
                self.present(&report);
                outcome
            }
            Submission::Ignored(reason) => InputOutcome::Ignored(reason),
        }
    }

    /// One settle step. Returns the pause before the next one, `None` once idle.
    fn advance(&mut self) -> Option<Duration> {
        let report = self.board.step()?;
        self.present(&report);
        self.forward_events();
        if let Some(err) = &report.reseed_error {
            warn!("turn finished but reseed failed: {err}");
            for listener in &mut self.listeners {
                listener.on_failure(err);
            }
        }
        self.next_delay.take()
    }

    /// Steps that only moved pieces get the swap pause
    fn delay_after(&self, report: &SettleReport) -> Option<Duration> {
        if self.board.is_idle() {
            return None;
        }
        if report.removed.is_empty() {
            Some(self.config.swap_delay)
        } else {
            Some(self.config.cascade_delay)
        }
    }

    fn present(&mut self, report: &SettleReport) {
        self.next_delay = self.delay_after(report);
        if self.presenters.is_empty() {
            return;
        }
        let snapshot = self.board.snapshot();
        for presenter in &mut self.presenters {
            presenter.on_settle(report, &snapshot);
        }
    }

    fn forward_events(&mut self) {
        for event in self.board.drain_events() {
            debug!("session event: {}", event.name());
            for listener in &mut self.listeners {
                listener.on_event(&event);
            }
        }
    }

    fn wake_idle_waiters(&mut self) {
        if !self.board.is_idle() || self.idle_waiters.is_empty() {
            return;
        }
        let snapshot = self.board.snapshot();
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(snapshot.clone());
        }
    }
}

impl<R: KindSource + Send + 'static> BoardDriver<R> {
    /// Run the driver on the current tokio runtime.
    ///
    /// `queue` bounds the number of commands waiting for the driver.
    pub fn spawn(self, queue: usize) -> (DriverHandle, JoinHandle<Board<R>>) {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let task = tokio::spawn(self.run(rx));
        (DriverHandle::new(tx), task)
    }
}

/// Cloneable front door to a running driver
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<DriverCommand>,
}

impl DriverHandle {
    pub fn new(tx: mpsc::Sender<DriverCommand>) -> Self {
        Self { tx }
    }

    /// Submit a request and wait for the board's answer (not for the turn to settle)
    pub async fn submit(&self, request: InputRequest) -> Result<InputOutcome, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(DriverCommand::Input {
            request,
            reply: Some(reply),
        })
        .await?;
        Ok(rx.await.map_err(|_| DriverError::Closed)??)
    }

    /// Queue a request without waiting; fails with [`DriverError::Full`]
    /// when the queue is at capacity.
    pub fn try_submit(&self, request: InputRequest, reply: Option<InputReply>) -> Result<(), DriverError> {
        self.tx
            .try_send(DriverCommand::Input { request, reply })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => DriverError::Full,
                mpsc::error::TrySendError::Closed(_) => DriverError::Closed,
            })
    }

    pub async fn snapshot(&self) -> Result<BoardSnapshot, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(DriverCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| DriverError::Closed)
    }

    /// Wait until the running turn (if any) has settled
    pub async fn settled(&self) -> Result<BoardSnapshot, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(DriverCommand::WhenIdle { reply }).await?;
        rx.await.map_err(|_| DriverError::Closed)
    }

    pub async fn shutdown(&self) -> Result<(), DriverError> {
        self.send(DriverCommand::Shutdown).await
    }

    async fn send(&self, command: DriverCommand) -> Result<(), DriverError> {
        self.tx.send(command).await.map_err(|_| DriverError::Closed)
    }
}
