//! Adapter module - remote control via TCP socket with a JSON protocol
//!
//! This crate lets an external front end, bot or test harness drive a board
//! through a running [`match3_engine::BoardDriver`]. The rules crate owns no
//! wire format; everything protocol-shaped lives here.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: client connects (default `127.0.0.1:7878`)
//! 2. **Handshake**: client sends `hello`, server responds with `welcome`
//! 3. **Controller Assignment**: the first client to say hello controls the
//!    board; later clients observe. When the controller leaves, the oldest
//!    remaining client is promoted.
//! 4. **Commanding**: the controller sends `command`s and gets an `ack` (or
//!    an `error`) once the driver has answered
//! 5. **Observation Streaming**: clients that asked for it receive an
//!    `observation` after every settle step plus `event`s for score, moves,
//!    bombs, win and game over
//!
//! # Commands
//!
//! | action | payload | effect |
//! |--------|---------|--------|
//! | `click` | `at` | selection state machine |
//! | `swap` | `from`, `to` | swap two adjacent cells |
//! | `activate` | `at` | set off a bomb |
//! | `spawn_bomb` | | place a bomb from stock |
//! | `restart` | | fresh session and board |
//! | `observe` | | one observation for the sender |
//!
//! # Environment Variables
//!
//! - `MATCH3_ADAPTER_HOST`: bind address (default `127.0.0.1`)
//! - `MATCH3_ADAPTER_PORT`: port (default 7878)
//! - `MATCH3_ADAPTER_MAX_PENDING`: command queue capacity (default 10)
//! - `MATCH3_ADAPTER_DISABLED`: `1` or `true` disables the adapter
//!
//! # Example Protocol Flow
//!
//! ```text
//! C: {"type":"hello","seq":1,"client":{"name":"bot","version":"0.1"},"stream_observations":true}
//! S: {"type":"welcome","seq":1,"ts":...,"protocol_version":"1.0.0","client_id":1,"role":"controller","width":6,"height":8}
//! S: {"type":"observation","seq":1,"ts":...,"snapshot":{"rows":["ABCDEA",...],...}}
//! C: {"type":"command","seq":2,"action":"swap","from":{"x":1,"y":0},"to":{"x":1,"y":1}}
//! S: {"type":"observation","seq":2,...,"settle":{"moved":[...],...}}
//! S: {"type":"ack","seq":2,"ts":...,"outcome":"started"}
//! ```
//!
//! Connect with netcat for manual testing: `nc 127.0.0.1 7878`.

pub mod protocol;
pub mod runtime;
pub mod server;

pub use match3_core as core;
pub use match3_engine as engine;
pub use match3_types as types;

// Re-export protocol types for convenience
pub use protocol::*;
pub use runtime::{
    bridge, Adapter, EventBroadcaster, InboundCommand, InboundPayload, ObservationPresenter, Outbound,
    OutboundMessage,
};
pub use server::{run_server, BoardInfo, ServerConfig};
