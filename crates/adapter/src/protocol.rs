//! Protocol module - JSON message types for the control adapter
//!
//! Every message is one JSON object per line carrying `type`, `seq` and
//! `ts` (milliseconds since the Unix epoch). Board payloads use the same
//! cell notation as the rules crate: `A`..`Z` for symbol kinds, `*` for a
//! bomb, `.` for an empty usable cell and `#` for a hole.

use serde::{Deserialize, Serialize};

use crate::core::{BoardSnapshot, CellSnapshot, CoreError, MatchRun, PieceMove, PieceSnapshot, SettleReport};
use crate::engine::{DriverError, InputOutcome, InputRequest};
use crate::types::{BoardAction, PieceVariant, Pos};

pub const PROTOCOL_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Hello,
    Command,
    Welcome,
    Ack,
    Error,
    Observation,
    Event,
}

// ============== Client -> Server ==============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub client: ClientInfo,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default)]
    pub stream_observations: bool,
}

fn default_protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePos {
    pub x: i32,
    pub y: i32,
}

impl From<Pos> for WirePos {
    fn from(pos: Pos) -> Self {
        Self { x: pos.x, y: pos.y }
    }
}

impl From<WirePos> for Pos {
    fn from(pos: WirePos) -> Self {
        Pos::new(pos.x, pos.y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub seq: u64,
    #[serde(default)]
    pub ts: u64,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<WirePos>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<WirePos>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<WirePos>,
}

/// A validated command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    Input(InputRequest),
    Observe,
}

/// Translate a command message; errors carry the code and message to send back.
pub fn map_command(cmd: &CommandMessage) -> Result<ClientCommand, (ErrorCode, String)> {
    let Some(action) = BoardAction::from_str(&cmd.action) else {
        return Err((
            ErrorCode::InvalidCommand,
            format!("unknown action: {}", cmd.action),
        ));
    };
    let field = |value: Option<WirePos>, name: &str| {
        value.map(Pos::from).ok_or_else(|| {
            (
                ErrorCode::InvalidCommand,
                format!("{} requires `{name}`", action.as_str()),
            )
        })
    };

    let request = match action {
        BoardAction::Click => InputRequest::Click(field(cmd.at, "at")?),
        BoardAction::Activate => InputRequest::Activate(field(cmd.at, "at")?),
        BoardAction::Swap => InputRequest::Swap {
            from: field(cmd.from, "from")?,
            to: field(cmd.to, "to")?,
        },
        BoardAction::SpawnBomb => InputRequest::SpawnBomb,
        BoardAction::Restart => InputRequest::Restart,
        BoardAction::Observe => return Ok(ClientCommand::Observe),
    };
    Ok(ClientCommand::Input(request))
}

// ============== Server -> Client ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Controller,
    Observer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub role: Role,
    pub width: u8,
    pub height: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub seq: u64,
    pub ts: u64,
    /// `started`, `selected`, `deselected`, `applied`, `ignored` or `observed`
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<WirePos>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    HandshakeRequired,
    ProtocolMismatch,
    NotController,
    OutOfOrder,
    InvalidCommand,
    Backpressure,
    OutOfBounds,
    InvalidSwap,
    BoardGenerationExhausted,
    ReentrantOperation,
    SessionOver,
    NoConsumable,
    InvalidStage,
    DriverClosed,
}

impl ErrorCode {
    pub fn from_core(err: &CoreError) -> Self {
        match err {
            CoreError::OutOfBounds { .. } => ErrorCode::OutOfBounds,
            CoreError::InvalidSwap { .. } => ErrorCode::InvalidSwap,
            CoreError::BoardGenerationExhausted { .. } => ErrorCode::BoardGenerationExhausted,
            CoreError::ReentrantOperation { .. } => ErrorCode::ReentrantOperation,
            CoreError::SessionOver { .. } => ErrorCode::SessionOver,
            CoreError::NoConsumable { .. } => ErrorCode::NoConsumable,
            CoreError::InvalidStage(_) => ErrorCode::InvalidStage,
        }
    }

    pub fn from_driver(err: &DriverError) -> Self {
        match err {
            DriverError::Closed => ErrorCode::DriverClosed,
            DriverError::Full => ErrorCode::Backpressure,
            DriverError::Core(err) => Self::from_core(err),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub seq: u64,
    pub ts: u64,
    pub snapshot: WireSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle: Option<WireSettle>,
}

/// Session notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub seq: u64,
    pub ts: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bombs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePiece {
    pub id: u32,
    pub kind: u8,
    pub x: i32,
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumable: Option<String>,
}

impl From<&PieceSnapshot> for WirePiece {
    fn from(piece: &PieceSnapshot) -> Self {
        Self {
            id: piece.id,
            kind: piece.kind.0,
            x: piece.pos.x,
            y: piece.pos.y,
            consumable: match piece.variant {
                PieceVariant::Normal => None,
                PieceVariant::Consumable(kind) => Some(kind.as_str().to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMove {
    pub id: u32,
    pub from: WirePos,
    pub to: WirePos,
}

impl From<&PieceMove> for WireMove {
    fn from(mv: &PieceMove) -> Self {
        Self {
            id: mv.id,
            from: mv.from.into(),
            to: mv.to.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRun {
    pub kind: u8,
    pub orientation: String,
    pub positions: Vec<WirePos>,
}

impl From<&MatchRun> for WireRun {
    fn from(run: &MatchRun) -> Self {
        Self {
            kind: run.kind.0,
            orientation: run.orientation.as_str().to_string(),
            positions: run.positions.iter().copied().map(WirePos::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSettle {
    pub removed: Vec<WirePiece>,
    pub moved: Vec<WireMove>,
    pub spawned: Vec<WirePiece>,
    pub score_delta: u32,
    pub cascade_depth: u32,
    pub runs: Vec<WireRun>,
    pub reseeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reseed_error: Option<String>,
    pub finished: bool,
}

impl From<&SettleReport> for WireSettle {
    fn from(report: &SettleReport) -> Self {
        Self {
            removed: report.removed.iter().map(WirePiece::from).collect(),
            moved: report.moved.iter().map(WireMove::from).collect(),
            spawned: report.spawned.iter().map(WirePiece::from).collect(),
            score_delta: report.score_delta,
            cascade_depth: report.cascade_depth,
            runs: report.runs.iter().map(WireRun::from).collect(),
            reseeded: report.reseeded,
            reseed_error: report.reseed_error.as_ref().map(|e| e.code().to_string()),
            finished: report.finished,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSnapshot {
    pub width: u8,
    pub height: u8,
    /// One string per row, top to bottom
    pub rows: Vec<String>,
    pub pieces: Vec<WirePiece>,
    pub state: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<WirePos>,
    pub score: u32,
    pub score_to_win: u32,
    pub score_progress: f32,
    pub moves_remaining: u32,
    pub bombs_remaining: u32,
    pub cascade_chain_count: u32,
    pub coins: u32,
}

fn cell_char(cell: &CellSnapshot) -> char {
    match cell {
        CellSnapshot::Hole => '#',
        CellSnapshot::Empty => '.',
        CellSnapshot::Piece(piece) if piece.variant.is_consumable() => '*',
        CellSnapshot::Piece(piece) => (b'A' + piece.kind.0.min(25)) as char,
    }
}

impl From<&BoardSnapshot> for WireSnapshot {
    fn from(snapshot: &BoardSnapshot) -> Self {
        let width = snapshot.width.max(1) as usize;
        let rows = snapshot
            .cells
            .chunks(width)
            .map(|row| row.iter().map(cell_char).collect())
            .collect();
        let pieces = snapshot
            .cells
            .iter()
            .filter_map(|cell| match cell {
                CellSnapshot::Piece(piece) => Some(WirePiece::from(piece)),
                _ => None,
            })
            .collect();

        Self {
            width: snapshot.width,
            height: snapshot.height,
            rows,
            pieces,
            state: snapshot.state.as_str().to_string(),
            status: snapshot.status.as_str().to_string(),
            selected: snapshot.selected.map(WirePos::from),
            score: snapshot.score,
            score_to_win: snapshot.score_to_win,
            score_progress: snapshot.score_progress,
            moves_remaining: snapshot.moves_remaining,
            bombs_remaining: snapshot.bombs_remaining,
            cascade_chain_count: snapshot.cascade_chain_count,
            coins: snapshot.coins,
        }
    }
}

// ============== Parsing ==============

#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

/// Parse one inbound line.
///
/// A well-formed object with an unrecognised `type` is not an error; it
/// comes back as [`ParsedMessage::Unknown`] so the server can answer it.
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloBody),
        #[serde(rename = "command")]
        Command(CommandBody),
    }

    // Internally tagged enums consume `type`; the bodies mirror the messages without it.
    #[derive(Debug, Deserialize)]
    struct HelloBody {
        seq: u64,
        #[serde(default)]
        ts: u64,
        client: ClientInfo,
        #[serde(default = "default_protocol_version")]
        protocol_version: String,
        #[serde(default)]
        stream_observations: bool,
    }

    #[derive(Debug, Deserialize)]
    struct CommandBody {
        seq: u64,
        #[serde(default)]
        ts: u64,
        action: String,
        #[serde(default)]
        at: Option<WirePos>,
        #[serde(default)]
        from: Option<WirePos>,
        #[serde(default)]
        to: Option<WirePos>,
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(HelloMessage {
            msg_type: MessageType::Hello,
            seq: m.seq,
            ts: m.ts,
            client: m.client,
            protocol_version: m.protocol_version,
            stream_observations: m.stream_observations,
        })),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(CommandMessage {
            msg_type: MessageType::Command,
            seq: m.seq,
            ts: m.ts,
            action: m.action,
            at: m.at,
            from: m.from,
            to: m.to,
        })),
        Err(e) => {
            #[derive(Debug, Deserialize)]
            struct Envelope {
                #[serde(rename = "type")]
                msg_type: Option<String>,
                seq: Option<u64>,
            }
            let envelope = serde_json::from_str::<Envelope>(json)?;
            match envelope.msg_type.as_deref() {
                Some("hello") | Some("command") => Err(e),
                _ => Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: envelope.seq.unwrap_or(0),
                })),
            }
        }
    }
}

/// Pull `seq` out of a line that failed to parse, if it is there at all
pub fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse().ok()
}

/// Whether a client speaking `version` can talk to this server (same major)
pub fn is_compatible_version(version: &str) -> bool {
    let major = |v: &str| v.split('.').next().map(str::to_owned);
    major(version).is_some_and(|m| Some(m) == major(PROTOCOL_VERSION))
}

// ============== Builders ==============

pub fn create_hello(seq: u64, client_name: &str, stream_observations: bool) -> HelloMessage {
    HelloMessage {
        msg_type: MessageType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: PROTOCOL_VERSION.to_string(),
        stream_observations,
    }
}

pub fn create_welcome(seq: u64, client_id: u64, role: Role, width: u8, height: u8) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: MessageType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        client_id,
        role,
        width,
        height,
    }
}

pub fn create_ack(seq: u64, outcome: &InputOutcome) -> AckMessage {
    let (name, reason, selected) = match outcome {
        InputOutcome::Started => ("started", None, None),
        InputOutcome::Selected(pos) => ("selected", None, Some(WirePos::from(*pos))),
        InputOutcome::Deselected => ("deselected", None, None),
        InputOutcome::Applied => ("applied", None, None),
        InputOutcome::Ignored(reason) => ("ignored", Some(reason.as_str().to_string()), None),
    };
    AckMessage {
        msg_type: MessageType::Ack,
        seq,
        ts: current_timestamp_ms(),
        outcome: name.to_string(),
        reason,
        selected,
    }
}

pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: MessageType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

pub fn create_observation(
    seq: u64,
    snapshot: &BoardSnapshot,
    settle: Option<&SettleReport>,
) -> ObservationMessage {
    ObservationMessage {
        msg_type: MessageType::Observation,
        seq,
        ts: current_timestamp_ms(),
        snapshot: snapshot.into(),
        settle: settle.map(WireSettle::from),
    }
}

pub fn create_event(seq: u64, name: &str) -> EventMessage {
    EventMessage {
        msg_type: MessageType::Event,
        seq,
        ts: current_timestamp_ms(),
        name: name.to_string(),
        score: None,
        delta: None,
        coins: None,
        bombs: None,
        remaining: None,
        message: None,
    }
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
