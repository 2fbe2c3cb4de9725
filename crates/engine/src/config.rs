//! Driver pacing configuration

use std::env;
use std::time::Duration;

use match3_types::{EngineConfig, CASCADE_DELAY_MS, SWAP_DURATION_MS};

/// How long the driver waits between settle steps, and which seed the binary
/// uses to build its board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Pause after a swap, before the board is scanned
    pub swap_delay: Duration,
    /// Pause after every step that removed pieces
    pub cascade_delay: Duration,
    pub seed: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            swap_delay: Duration::from_millis(SWAP_DURATION_MS as u64),
            cascade_delay: Duration::from_millis(CASCADE_DELAY_MS as u64),
            seed: 1,
        }
    }
}

impl DriverConfig {
    /// Read `MATCH3_SWAP_DELAY_MS`, `MATCH3_CASCADE_DELAY_MS` and `MATCH3_SEED`.
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| {
            env::var(key)
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            swap_delay: millis("MATCH3_SWAP_DELAY_MS", defaults.swap_delay),
            cascade_delay: millis("MATCH3_CASCADE_DELAY_MS", defaults.cascade_delay),
            seed: env::var("MATCH3_SEED")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.seed),
        }
    }

    /// Take the delays from the engine tuning
    pub fn from_engine(config: &EngineConfig, seed: u32) -> Self {
        Self {
            swap_delay: Duration::from_millis(config.swap_duration_ms as u64),
            cascade_delay: Duration::from_millis(config.cascade_delay_ms as u64),
            seed,
        }
    }

    /// No pauses at all; turns settle as fast as the task is polled
    pub fn immediate(seed: u32) -> Self {
        Self {
            swap_delay: Duration::ZERO,
            cascade_delay: Duration::ZERO,
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_engine_timings() {
        let config = DriverConfig::default();
        assert_eq!(config.swap_delay, Duration::from_millis(200));
        assert_eq!(config.cascade_delay, Duration::from_millis(400));
        assert_eq!(config, DriverConfig::from_engine(&EngineConfig::default(), 1));
    }

    #[test]
    fn immediate_has_no_delays() {
        let config = DriverConfig::immediate(7);
        assert!(config.swap_delay.is_zero());
        assert!(config.cascade_delay.is_zero());
        assert_eq!(config.seed, 7);
    }
}
