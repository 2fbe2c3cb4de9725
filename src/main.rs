//! Headless match-3 runner (default binary).
//!
//! Loads the built-in stage, runs it under the async driver and exposes it
//! through the JSON control adapter until Ctrl-C. Logging goes through
//! `env_logger`; set `RUST_LOG` to change the filter (default `info`).

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;

use match3::adapter::{Adapter, Outbound, ServerConfig};
use match3::core::{Board, CoreError, SimpleRng, StageConfig};
use match3::engine::{BoardDriver, DriverConfig, SessionListener};
use match3::types::EngineConfig;

/// Mirrors session milestones into the log
struct LogListener;

impl SessionListener for LogListener {
    fn on_stage_win(&mut self, score: u32, coins: u32) {
        info!("stage won: {score} points, {coins} coins");
    }

    fn on_game_over(&mut self, score: u32) {
        info!("game over: {score} points");
    }

    fn on_failure(&mut self, error: &CoreError) {
        warn!("board failure: {error}");
    }
}

fn load_board(stage: StageConfig, engine: EngineConfig, seed: u32) -> Result<Board> {
    match Board::with_seed(stage.clone(), engine.clone(), seed) {
        Ok(board) => Ok(board),
        Err(CoreError::BoardGenerationExhausted {
            tries,
            last_candidate,
        }) => {
            // Better a board with a match or no move than no board at all.
            warn!("generation gave up after {tries} tries, using the last candidate");
            Board::with_grid(stage, engine, *last_candidate, SimpleRng::new(seed))
                .context("last generated candidate was rejected")
        }
        Err(e) => Err(e).context("cannot load stage"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let driver_config = DriverConfig::from_env();
    let engine = EngineConfig {
        swap_duration_ms: driver_config.swap_delay.as_millis() as u32,
        cascade_delay_ms: driver_config.cascade_delay.as_millis() as u32,
        ..EngineConfig::default()
    };
    let board = load_board(StageConfig::default(), engine, driver_config.seed)?;
    info!("seed {}, board:\n{}", driver_config.seed, board.grid());

    let server_config = ServerConfig::from_env();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let out = Outbound::new(out_tx);

    let mut driver = BoardDriver::new(board, driver_config).with_listener(LogListener);
    if !server_config.disabled {
        driver = driver
            .with_presenter(out.presenter())
            .with_listener(out.listener());
    }
    let queue = server_config.max_pending_commands.max(1);
    let (handle, task) = driver.spawn(queue);

    let adapter = if server_config.disabled {
        info!("adapter disabled via MATCH3_ADAPTER_DISABLED");
        None
    } else {
        Some(Adapter::start(server_config, handle.clone(), out, out_rx).await?)
    };

    tokio::signal::ctrl_c().await.context("cannot listen for ctrl-c")?;
    info!("shutting down");

    if let Some(adapter) = adapter {
        adapter.abort();
    }
    handle.shutdown().await?;
    let board = task.await?;
    info!(
        "final score {} ({})",
        board.session().score(),
        board.session().status()
    );
    Ok(())
}
