//! RNG module - deterministic randomness for spawning and rewards
//!
//! The engine never touches a global RNG. Every board owns a [`KindSource`]
//! and draws from it for generation, refills, bomb placement and coin
//! bonuses, so the same seed always replays the same game.
//!
//! Two sources ship with the crate:
//! - [`SimpleRng`]: a seeded LCG, the default
//! - [`ScriptedKinds`]: replays a fixed sequence, for tests that need exact refills

/// Uniform draws in `[0, bound)`
pub trait KindSource {
    /// Returns a value in `[0, bound)`; `bound == 0` yields 0
    fn pick(&mut self, bound: u32) -> u32;
}

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // High bits of an LCG are far better distributed than the low ones.
        ((self.next_u32() as u64 * max as u64) >> 32) as u32
    }
}

impl KindSource for SimpleRng {
    fn pick(&mut self, bound: u32) -> u32 {
        self.next_range(bound)
    }
}

/// Replays a fixed script of draws, wrapping around at the end.
///
/// Each scripted value is reduced modulo the requested bound.
#[derive(Debug, Clone)]
pub struct ScriptedKinds {
    script: Vec<u32>,
    cursor: usize,
}

impl ScriptedKinds {
    pub fn new(script: Vec<u32>) -> Self {
        Self { script, cursor: 0 }
    }

    /// Number of draws made so far
    pub fn drawn(&self) -> usize {
        self.cursor
    }
}

impl KindSource for ScriptedKinds {
    fn pick(&mut self, bound: u32) -> u32 {
        if bound == 0 || self.script.is_empty() {
            return 0;
        }
        let value = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        value % bound
    }
}
