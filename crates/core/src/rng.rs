//! RNG module - deterministic tile generation
//!
//! The engine draws every fresh tile through the [`TileSource`] seam, so the
//! default seeded generator can be swapped for a scripted sequence in tests.
//! Same seed, same board, same refill stream.

use crate::types::{TileKind, MAX_COLOR_COUNT};

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
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            0
        } else {
            self.next_u32() % max
        }
    }

    /// Current internal state (for observation payloads and debugging).
    pub fn state(&self) -> u32 {
        self.state
    }
}

/// Source of fresh tile kinds for generation and refill.
///
/// Implementations must draw uniformly from the first `color_count` entries
/// of [`TileKind::ALL`]. The engine never obtains a kind any other way,
/// which is what makes sessions reproducible from a seed.
pub trait TileSource {
    /// Draw one kind from the first `color_count` palette entries.
    fn next_tile(&mut self, color_count: u8) -> TileKind;
}

impl TileSource for SimpleRng {
    fn next_tile(&mut self, color_count: u8) -> TileKind {
        let count = color_count.clamp(1, MAX_COLOR_COUNT);
        TileKind::ALL[self.next_range(count as u32) as usize]
    }
}

/// Replays a fixed kind sequence, ignoring `color_count`.
///
/// A test double for cascade scenarios that need exact refills. Panics when
/// the script runs dry; a silent fallback would mask a test whose
/// expectations drifted from the moves it makes.
#[derive(Debug, Clone)]
pub struct ScriptedTiles {
    tiles: std::collections::VecDeque<TileKind>,
}

impl ScriptedTiles {
    pub fn new(tiles: &[TileKind]) -> Self {
        Self {
            tiles: tiles.iter().copied().collect(),
        }
    }

    /// Kinds not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }
}

impl TileSource for ScriptedTiles {
    fn next_tile(&mut self, _color_count: u8) -> TileKind {
        match self.tiles.pop_front() {
            Some(kind) => kind,
            None => panic!("scripted tile source exhausted"),
        }
    }
}
