//! TCP server for the control adapter
//!
//! Handles incoming connections and manages client lifecycle: handshake,
//! controller assignment, per-client sequencing and outbound fan-out.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::protocol::*;
use crate::runtime::{InboundCommand, InboundPayload, OutboundMessage};

pub const DEFAULT_PORT: u16 = 7878;
pub const DEFAULT_MAX_PENDING: usize = 10;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Capacity of the queue between clients and the driver
    pub max_pending_commands: usize,
    pub disabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_pending_commands: DEFAULT_MAX_PENDING,
            disabled: false,
        }
    }
}

impl ServerConfig {
    /// Read `MATCH3_ADAPTER_HOST`, `MATCH3_ADAPTER_PORT`,
    /// `MATCH3_ADAPTER_MAX_PENDING` and `MATCH3_ADAPTER_DISABLED`.
    pub fn from_env() -> Self {
        use std::env;

        let host = env::var("MATCH3_ADAPTER_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = env::var("MATCH3_ADAPTER_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let max_pending_commands = env::var("MATCH3_ADAPTER_MAX_PENDING")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_PENDING);
        let disabled = env::var("MATCH3_ADAPTER_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            host,
            port,
            max_pending_commands,
            disabled,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid adapter address {}:{}", self.host, self.port))
    }
}

/// Board facts announced in `welcome`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardInfo {
    pub width: u8,
    pub height: u8,
}

/// Handle to a connected client
struct ClientHandle {
    id: usize,
    is_controller: bool,
    stream_observations: bool,
    handshaken: bool,
    last_seq: Option<u64>,
    tx: mpsc::UnboundedSender<ClientOutbound>,
}

#[derive(Debug, Clone)]
enum ClientOutbound {
    Line(String),
    Welcome(WelcomeMessage),
    Error(ErrorMessage),
}

/// Shared server state
struct ServerState {
    info: BoardInfo,
    clients: RwLock<Vec<ClientHandle>>,
    controller: RwLock<Option<usize>>,
}

impl ServerState {
    fn new(info: BoardInfo) -> Self {
        Self {
            info,
            clients: RwLock::new(Vec::new()),
            controller: RwLock::new(None),
        }
    }

    async fn is_handshaken(&self, client_id: usize) -> bool {
        let clients = self.clients.read().await;
        clients
            .iter()
            .find(|c| c.id == client_id)
            .map(|c| c.handshaken)
            .unwrap_or(false)
    }

    async fn is_controller(&self, client_id: usize) -> bool {
        let clients = self.clients.read().await;
        clients
            .iter()
            .find(|c| c.id == client_id)
            .map(|c| c.is_controller)
            .unwrap_or(false)
    }

    /// Record `seq` if it is newer than the client's last one
    async fn check_and_update_seq(&self, client_id: usize, seq: u64) -> bool {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
            return true;
        };
        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }
}

/// Start the TCP server.
///
/// `ready_tx` receives the bound address once the listener is up, which
/// lets callers bind port 0.
pub async fn run_server(
    config: ServerConfig,
    info: BoardInfo,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind adapter to {addr}"))?;
    let bound = listener.local_addr()?;
    info!("adapter listening on {bound}");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new(info));
    let mut client_id_counter = 0usize;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let clients = state.clients.read().await;
                match msg {
                    OutboundMessage::ToClient { client_id, line } => {
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Line(line));
                        }
                    }
                    OutboundMessage::Broadcast { line } => {
                        for c in clients.iter().filter(|c| c.stream_observations) {
                            let _ = c.tx.send(ClientOutbound::Line(line.clone()));
                        }
                    }
                }
            }
        });
    }

    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;
        info!("client {client_id} connected from {addr}");

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id, state, command_tx).await {
                warn!("client {client_id} error: {e}");
            }
            info!("client {client_id} disconnected");
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: usize,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    state.clients.write().await.push(ClientHandle {
        id: client_id,
        is_controller: false,
        stream_observations: false,
        handshaken: false,
        last_seq: None,
        tx: tx.clone(),
    });

    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            let encoded = match msg {
                ClientOutbound::Line(line) => {
                    buf.extend_from_slice(line.as_bytes());
                    Ok(())
                }
                ClientOutbound::Welcome(welcome) => serde_json::to_writer(&mut buf, &welcome),
                ClientOutbound::Error(err) => serde_json::to_writer(&mut buf, &err),
            };
            if encoded.is_err() {
                continue;
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() || writer.flush().await.is_err() {
                break;
            }
        }
    });

    let result = read_loop(&mut reader, client_id, &state, &command_tx, &tx).await;

    // Clean up: remove client and promote the next controller if needed.
    {
        let mut controller = state.controller.write().await;
        let mut clients = state.clients.write().await;
        clients.retain(|c| c.id != client_id);

        if *controller == Some(client_id) {
            let next_id = clients.iter().filter(|c| c.handshaken).map(|c| c.id).min();
            *controller = next_id;
            match next_id {
                Some(new_id) => {
                    if let Some(c) = clients.iter_mut().find(|c| c.id == new_id) {
                        c.is_controller = true;
                    }
                    info!("client {new_id} promoted to controller");
                }
                None => info!("controller {client_id} released"),
            }
        }
    }

    drop(tx);
    let _ = write_task.await;
    result
}

async fn read_loop(
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    client_id: usize,
    state: &ServerState,
    command_tx: &mpsc::Sender<InboundCommand>,
    tx: &mpsc::UnboundedSender<ClientOutbound>,
) -> anyhow::Result<()> {
    let reply_error = |seq: u64, code: ErrorCode, message: &str| {
        debug!("client {client_id} seq {seq}: {message}");
        let _ = tx.send(ClientOutbound::Error(create_error(seq, code, message)));
    };

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                if state.is_handshaken(client_id).await
                    && !state.check_and_update_seq(client_id, hello.seq).await
                {
                    reply_error(hello.seq, ErrorCode::OutOfOrder, "seq must be strictly increasing");
                    continue;
                }
                if !is_compatible_version(&hello.protocol_version) {
                    reply_error(
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("protocol version {} not supported", hello.protocol_version),
                    );
                    return Ok(());
                }

                // First client to hello becomes controller.
                let role = {
                    let mut controller = state.controller.write().await;
                    let mut clients = state.clients.write().await;
                    let claim = controller.is_none() || *controller == Some(client_id);
                    if claim {
                        *controller = Some(client_id);
                    }
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.last_seq = Some(hello.seq);
                        client.is_controller = claim;
                        client.stream_observations = hello.stream_observations;
                    }
                    if claim {
                        Role::Controller
                    } else {
                        Role::Observer
                    }
                };
                info!(
                    "client {client_id} ({} {}) joined as {role:?}",
                    hello.client.name, hello.client.version
                );

                let welcome = create_welcome(
                    hello.seq,
                    client_id as u64,
                    role,
                    state.info.width,
                    state.info.height,
                );
                let _ = tx.send(ClientOutbound::Welcome(welcome));

                if hello.stream_observations {
                    let _ = command_tx.try_send(InboundCommand {
                        client_id,
                        seq: hello.seq,
                        payload: InboundPayload::SnapshotRequest,
                    });
                }
            }

            Ok(ParsedMessage::Command(cmd)) => {
                if !state.is_handshaken(client_id).await {
                    reply_error(cmd.seq, ErrorCode::HandshakeRequired, "send hello before command");
                    continue;
                }
                if !state.check_and_update_seq(client_id, cmd.seq).await {
                    reply_error(cmd.seq, ErrorCode::OutOfOrder, "seq must be strictly increasing");
                    continue;
                }

                let mapped = match map_command(&cmd) {
                    Ok(c) => c,
                    Err((code, message)) => {
                        reply_error(cmd.seq, code, &message);
                        continue;
                    }
                };

                // Observers may ask for a snapshot; everything else needs control.
                if mapped != ClientCommand::Observe && !state.is_controller(client_id).await {
                    reply_error(cmd.seq, ErrorCode::NotController, "only the controller may send commands");
                    continue;
                }

                // Ack is sent by the bridge once the driver answered.
                if command_tx
                    .try_send(InboundCommand {
                        client_id,
                        seq: cmd.seq,
                        payload: InboundPayload::Command(mapped),
                    })
                    .is_err()
                {
                    reply_error(cmd.seq, ErrorCode::Backpressure, "command queue is full");
                }
            }

            Ok(ParsedMessage::Unknown(unknown)) => {
                if state.is_handshaken(client_id).await
                    && !state.check_and_update_seq(client_id, unknown.seq).await
                {
                    reply_error(unknown.seq, ErrorCode::OutOfOrder, "seq must be strictly increasing");
                    continue;
                }
                reply_error(unknown.seq, ErrorCode::InvalidCommand, "unknown message type");
            }

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                reply_error(seq, ErrorCode::InvalidCommand, &format!("JSON parse error: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 7878);
        assert_eq!(config.max_pending_commands, 10);
        assert!(!config.disabled);
        assert_eq!(config.socket_addr().unwrap().port(), 7878);
    }

    #[test]
    fn bad_host_is_an_error_not_a_panic() {
        let config = ServerConfig {
            host: "not a host".into(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }

    #[tokio::test]
    async fn seq_must_increase_per_client() {
        let state = ServerState::new(BoardInfo { width: 6, height: 8 });
        let (tx, _rx) = mpsc::unbounded_channel();
        state.clients.write().await.push(ClientHandle {
            id: 1,
            is_controller: false,
            stream_observations: false,
            handshaken: true,
            last_seq: Some(3),
            tx,
        });

        assert!(!state.check_and_update_seq(1, 3).await);
        assert!(state.check_and_update_seq(1, 4).await);
        assert!(!state.check_and_update_seq(1, 2).await);
        assert!(state.is_handshaken(1).await);
        assert!(!state.is_controller(1).await);
    }
}
