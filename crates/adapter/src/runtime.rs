//! Adapter runtime integration.
//!
//! Bridges the TCP server and a running board driver: validated commands go
//! to the driver, answers come back as acks/errors, and every settle step and
//! session event is broadcast to observing clients.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use log::{debug, info};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::core::{BoardEvent, BoardSnapshot, CoreError, SettleReport};
use crate::engine::{DriverHandle, Presenter, SessionListener};
use crate::protocol::{
    create_ack, create_error, create_event, create_observation, AckMessage, ClientCommand, ErrorCode,
};
use crate::server::{run_server, BoardInfo, ServerConfig};

/// Command delivered to the driver bridge.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub payload: InboundPayload,
}

#[derive(Debug, Clone)]
pub enum InboundPayload {
    Command(ClientCommand),
    /// Send this client a fresh observation
    SnapshotRequest,
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClient { client_id: usize, line: String },
    /// Delivered to every client that asked for observations
    Broadcast { line: String },
}

/// Serialises server-initiated messages and numbers them.
///
/// Replies to a client reuse the client's `seq`; broadcasts draw from a
/// shared counter.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<OutboundMessage>,
    seq: Arc<AtomicU64>,
}

impl Outbound {
    pub fn new(tx: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn to_client(&self, client_id: usize, msg: &impl Serialize) {
        if let Some(line) = to_line(msg) {
            let _ = self.tx.send(OutboundMessage::ToClient { client_id, line });
        }
    }

    pub fn broadcast(&self, msg: &impl Serialize) {
        if let Some(line) = to_line(msg) {
            let _ = self.tx.send(OutboundMessage::Broadcast { line });
        }
    }

    pub fn presenter(&self) -> ObservationPresenter {
        ObservationPresenter {
            out: self.clone(),
        }
    }

    pub fn listener(&self) -> EventBroadcaster {
        EventBroadcaster {
            out: self.clone(),
        }
    }
}

fn to_line(msg: &impl Serialize) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(line) => Some(line),
        Err(e) => {
            debug!("dropping unserialisable message: {e}");
            None
        }
    }
}

/// Broadcasts an observation after every settle step
#[derive(Debug, Clone)]
pub struct ObservationPresenter {
    out: Outbound,
}

impl Presenter for ObservationPresenter {
    fn on_settle(&mut self, report: &SettleReport, snapshot: &BoardSnapshot) {
        let obs = create_observation(self.out.next_seq(), snapshot, Some(report));
        self.out.broadcast(&obs);
    }

    fn on_reset(&mut self, snapshot: &BoardSnapshot) {
        let obs = create_observation(self.out.next_seq(), snapshot, None);
        self.out.broadcast(&obs);
    }
}

/// Broadcasts session events as `event` messages
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    out: Outbound,
}

impl SessionListener for EventBroadcaster {
    fn on_event(&mut self, event: &BoardEvent) {
        let mut msg = create_event(self.out.next_seq(), event.name());
        match *event {
            BoardEvent::ScoreChanged { score, delta } => {
                msg.score = Some(score);
                msg.delta = Some(delta);
            }
            BoardEvent::BombsChanged { bombs } => msg.bombs = Some(bombs),
            BoardEvent::MoveConsumed { remaining } => msg.remaining = Some(remaining),
            BoardEvent::StageWon { score, coins } => {
                msg.score = Some(score);
                msg.coins = Some(coins);
            }
            BoardEvent::GameOver { score } => msg.score = Some(score),
            BoardEvent::BoardReseeded => {}
        }
        self.out.broadcast(&msg);
    }

    fn on_failure(&mut self, error: &CoreError) {
        let mut msg = create_event(self.out.next_seq(), error.code());
        msg.message = Some(error.to_string());
        self.out.broadcast(&msg);
    }
}

/// Forward inbound commands to the driver until either side goes away.
pub async fn bridge(mut cmd_rx: mpsc::Receiver<InboundCommand>, driver: DriverHandle, out: Outbound) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd.payload {
            InboundPayload::Command(ClientCommand::Input(request)) => match driver.submit(request).await {
                Ok(outcome) => out.to_client(cmd.client_id, &create_ack(cmd.seq, &outcome)),
                Err(err) => {
                    debug!("client {} {request:?} failed: {err}", cmd.client_id);
                    let error = create_error(cmd.seq, ErrorCode::from_driver(&err), &err.to_string());
                    out.to_client(cmd.client_id, &error);
                }
            },
            InboundPayload::Command(ClientCommand::Observe) | InboundPayload::SnapshotRequest => {
                match driver.snapshot().await {
                    Ok(snapshot) => {
                        if matches!(cmd.payload, InboundPayload::Command(_)) {
                            out.to_client(cmd.client_id, &observed_ack(cmd.seq));
                        }
                        let obs = create_observation(out.next_seq(), &snapshot, None);
                        out.to_client(cmd.client_id, &obs);
                    }
                    Err(err) => {
                        let error = create_error(cmd.seq, ErrorCode::from_driver(&err), &err.to_string());
                        out.to_client(cmd.client_id, &error);
                    }
                }
            }
        }
    }
    debug!("adapter bridge stopped");
}

fn observed_ack(seq: u64) -> AckMessage {
    let mut ack = create_ack(seq, &crate::engine::InputOutcome::Applied);
    ack.outcome = "observed".to_string();
    ack
}

/// Running adapter instance.
pub struct Adapter {
    addr: SocketAddr,
    server: JoinHandle<anyhow::Result<()>>,
    bridge: JoinHandle<()>,
}

impl Adapter {
    /// Bind the server and start bridging to `driver`.
    ///
    /// `out`/`out_rx` must be the pair whose presenter and listener were
    /// attached to the driver, so broadcasts reach the connected clients.
    pub async fn start(
        config: ServerConfig,
        driver: DriverHandle,
        out: Outbound,
        out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ) -> anyhow::Result<Self> {
        if config.disabled {
            anyhow::bail!("adapter is disabled (MATCH3_ADAPTER_DISABLED)");
        }

        let snapshot = driver.snapshot().await.context("driver is not running")?;
        let info = BoardInfo {
            width: snapshot.width,
            height: snapshot.height,
        };

        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(config.max_pending_commands.max(1));
        let (ready_tx, ready_rx) = oneshot::channel();

        let server = tokio::spawn(run_server(config, info, cmd_tx, out_rx, Some(ready_tx)));
        let addr = match ready_rx.await {
            Ok(addr) => addr,
            Err(_) => {
                // The server dropped the ready channel: it failed before binding.
                return match server.await {
                    Ok(Err(e)) => Err(e),
                    Ok(Ok(())) => Err(anyhow::anyhow!("adapter server exited before binding")),
                    Err(e) => Err(e.into()),
                };
            }
        };
        let bridge = tokio::spawn(bridge(cmd_rx, driver, out));
        info!("adapter ready on {addr}");

        Ok(Self {
            addr,
            server,
            bridge,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting clients and drop the bridge
    pub fn abort(&self) {
        self.server.abort();
        self.bridge.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Board, Grid, ScriptedKinds, StageConfig};
    use crate::engine::{BoardDriver, DriverConfig, InputRequest};
    use crate::types::{EngineConfig, Pos};

    #[tokio::test]
    async fn bridge_acks_commands_and_broadcasts_steps() {
        let grid = Grid::from_rows(&["ABAC", "CADB", "DCAC", "EEBE"]).unwrap();
        let board = Board::with_grid(
            StageConfig::default(),
            EngineConfig {
                initial_free_bomb: false,
                ..EngineConfig::default()
            },
            grid,
            ScriptedKinds::new(vec![3, 4]),
        )
        .unwrap();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let out = Outbound::new(out_tx);
        let driver = BoardDriver::new(board, DriverConfig::immediate(1))
            .with_presenter(out.presenter())
            .with_listener(out.listener());
        let (handle, _task) = driver.spawn(8);

        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        tokio::spawn(bridge(cmd_rx, handle.clone(), out.clone()));
        cmd_tx
            .send(InboundCommand {
                client_id: 1,
                seq: 2,
                payload: InboundPayload::Command(ClientCommand::Input(InputRequest::Swap {
                    from: Pos::new(1, 0),
                    to: Pos::new(1, 1),
                })),
            })
            .await
            .unwrap();

        // The ack is only sent once the driver took the swap.
        let mut broadcasts = Vec::new();
        let ack = loop {
            match out_rx.recv().await.unwrap() {
                OutboundMessage::ToClient { client_id, line } => {
                    assert_eq!(client_id, 1);
                    break line;
                }
                OutboundMessage::Broadcast { line } => broadcasts.push(line),
            }
        };
        handle.settled().await.unwrap();
        while let Ok(msg) = out_rx.try_recv() {
            if let OutboundMessage::Broadcast { line } = msg {
                broadcasts.push(line);
            }
        }

        let ack: serde_json::Value = serde_json::from_str(&ack).unwrap();
        assert_eq!(ack["type"], "ack");
        assert_eq!(ack["seq"], 2);
        assert_eq!(ack["outcome"], "started");

        let kinds: Vec<String> = broadcasts
            .iter()
            .map(|line| {
                let v: serde_json::Value = serde_json::from_str(line).unwrap();
                match v["type"].as_str().unwrap() {
                    "event" => v["name"].as_str().unwrap().to_string(),
                    other => other.to_string(),
                }
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["observation", "observation", "score_changed", "move_consumed"]
        );
    }
}
