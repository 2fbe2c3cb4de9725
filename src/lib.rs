//! Match-3 (workspace facade crate).
//!
//! Re-exports the member crates so applications and integration tests can
//! depend on a single package:
//!
//! - [`types`]: positions, kinds, state enums and engine tuning
//! - [`core`]: the deterministic rules engine
//! - [`engine`]: the async driver that paces settle steps
//! - [`adapter`]: the line-delimited JSON control server

pub use match3_adapter as adapter;
pub use match3_core as core;
pub use match3_engine as engine;
pub use match3_types as types;
