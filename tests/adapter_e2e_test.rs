use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use match3::adapter::{create_hello, Adapter, Outbound, ServerConfig};
use match3::core::{Board, Grid, ScriptedKinds, StageConfig};
use match3::engine::{BoardDriver, DriverConfig, DriverHandle};
use match3::types::EngineConfig;

const ROWS: [&str; 8] = [
    "AACDEA", "CDAABC", "EABCDE", "BCDEAB", "DEABCD", "ABCDEA", "CDEABC", "BBCBDE",
];

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(adapter: &Adapter) -> Self {
        let stream = TcpStream::connect(adapter.local_addr()).await.expect("connect failed");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn hello(&mut self, seq: u64, stream_observations: bool) {
        let hello = create_hello(seq, "e2e-test", stream_observations);
        self.send(&serde_json::to_string(&hello).unwrap()).await;
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed");
        serde_json::from_str(&line).unwrap()
    }
}

async fn start() -> (Adapter, DriverHandle) {
    let grid = Grid::from_rows(&ROWS).unwrap();
    let config = EngineConfig {
        initial_free_bomb: false,
        ..EngineConfig::default()
    };
    let board = Board::with_grid(StageConfig::default(), config, grid, ScriptedKinds::new(vec![1, 2, 4])).unwrap();

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let out = Outbound::new(out_tx);
    let driver = BoardDriver::new(board, DriverConfig::immediate(1))
        .with_presenter(out.presenter())
        .with_listener(out.listener());
    let (handle, _task) = driver.spawn(8);

    let server = ServerConfig {
        port: 0,
        max_pending_commands: 8,
        ..ServerConfig::default()
    };
    let adapter = tokio::time::timeout(
        Duration::from_secs(2),
        Adapter::start(server, handle.clone(), out, out_rx),
    )
    .await
    .expect("adapter did not start")
    .expect("adapter failed to bind");
    (adapter, handle)
}

#[tokio::test]
async fn adapter_hello_swap_ack_and_observations() {
    let (adapter, handle) = start().await;
    let mut client = Client::connect(&adapter).await;

    client.hello(1, true).await;
    let welcome = client.recv().await;
    assert_eq!(welcome["type"], "welcome");
    assert_eq!(welcome["seq"], 1);
    assert_eq!(welcome["role"], "controller");
    assert_eq!(welcome["width"], 6);
    assert_eq!(welcome["height"], 8);

    let first = client.recv().await;
    assert_eq!(first["type"], "observation");
    assert_eq!(first["snapshot"]["rows"][0], "AACDEA");
    assert_eq!(first["snapshot"]["state"], "idle");

    client
        .send(r#"{"type":"command","seq":2,"ts":1,"action":"swap","from":{"x":2,"y":0},"to":{"x":2,"y":1}}"#)
        .await;

    let mut ack = None;
    let mut observations = Vec::new();
    let mut events = Vec::new();
    while ack.is_none() || !events.iter().any(|e| e == "move_consumed") {
        let msg = client.recv().await;
        match msg["type"].as_str().unwrap() {
            "ack" => ack = Some(msg),
            "observation" => observations.push(msg),
            "event" => events.push(msg["name"].as_str().unwrap().to_string()),
            other => panic!("unexpected message {other}: {msg}"),
        }
    }

    let ack = ack.unwrap();
    assert_eq!(ack["seq"], 2);
    assert_eq!(ack["outcome"], "started");
    assert_eq!(events, vec!["score_changed", "move_consumed"]);

    assert_eq!(observations.len(), 2);
    let last = observations.last().unwrap();
    assert_eq!(last["settle"]["score_delta"], 30);
    assert_eq!(last["settle"]["finished"], true);
    assert_eq!(last["snapshot"]["score"], 30);
    assert_eq!(last["snapshot"]["moves_remaining"], 19);
    assert_eq!(last["snapshot"]["rows"][0], "BCEDEA");

    // Broadcast seq numbers keep increasing.
    let s0 = first["seq"].as_u64().unwrap();
    let s1 = observations[0]["seq"].as_u64().unwrap();
    let s2 = observations[1]["seq"].as_u64().unwrap();
    assert!(s0 < s1 && s1 < s2);

    assert_eq!(handle.settled().await.unwrap().score, 30);
    adapter.abort();
}

#[tokio::test]
async fn adapter_enforces_handshake_control_and_order() {
    let (adapter, _handle) = start().await;

    let mut controller = Client::connect(&adapter).await;
    controller.hello(1, false).await;
    assert_eq!(controller.recv().await["role"], "controller");

    let mut observer = Client::connect(&adapter).await;
    observer
        .send(r#"{"type":"command","seq":1,"ts":1,"action":"click","at":{"x":0,"y":0}}"#)
        .await;
    let err = observer.recv().await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "handshake_required");
    assert_eq!(err["seq"], 1);

    observer.hello(1, false).await;
    assert_eq!(observer.recv().await["role"], "observer");

    observer
        .send(r#"{"type":"command","seq":2,"ts":1,"action":"click","at":{"x":0,"y":0}}"#)
        .await;
    let err = observer.recv().await;
    assert_eq!(err["code"], "not_controller");

    observer.send(r#"{"type":"command","seq":3,"ts":1,"action":"observe"}"#).await;
    let ack = observer.recv().await;
    assert_eq!(ack["type"], "ack");
    assert_eq!(ack["seq"], 3);
    assert_eq!(ack["outcome"], "observed");
    let obs = observer.recv().await;
    assert_eq!(obs["type"], "observation");
    assert_eq!(obs["snapshot"]["rows"][7], "BBCBDE");

    observer.send(r#"{"type":"command","seq":3,"ts":1,"action":"observe"}"#).await;
    assert_eq!(observer.recv().await["code"], "out_of_order");

    controller.send(r#"{"type":"command","seq":2,"ts":1,"action":"dance"}"#).await;
    assert_eq!(controller.recv().await["code"], "invalid_command");

    controller
        .send(r#"{"type":"command","seq":3,"ts":1,"action":"swap","from":{"x":0,"y":0},"to":{"x":3,"y":0}}"#)
        .await;
    let err = controller.recv().await;
    assert_eq!(err["seq"], 3);
    assert_eq!(err["code"], "invalid_swap");

    adapter.abort();
}

#[tokio::test]
async fn adapter_promotes_next_client_when_controller_leaves() {
    let (adapter, _handle) = start().await;

    let mut first = Client::connect(&adapter).await;
    first.hello(1, false).await;
    assert_eq!(first.recv().await["role"], "controller");

    let mut second = Client::connect(&adapter).await;
    second.hello(1, false).await;
    assert_eq!(second.recv().await["role"], "observer");

    drop(first);

    // Promotion happens when the server notices the disconnect.
    let mut seq = 2;
    let ack = loop {
        second
            .send(&format!(
                r#"{{"type":"command","seq":{seq},"ts":1,"action":"click","at":{{"x":0,"y":0}}}}"#
            ))
            .await;
        let msg = second.recv().await;
        if msg["type"] == "ack" {
            break msg;
        }
        assert_eq!(msg["code"], "not_controller");
        seq += 1;
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    assert_eq!(ack["outcome"], "selected");

    adapter.abort();
}
