//! Gridwave: a grid-driven dataflow instrument.
//!
//! A fixed grid of operator instances is re-evaluated once per audio block with
//! double-buffered scheduling; bandlimited oscillators render through a kernel
//! table over a queue of time-stamped polynomial segments.

pub mod control;
pub mod graph;
#[doc(hidden)]
pub mod invariant;
pub mod kernel;
pub mod operators;
pub mod patch;
pub mod player;
pub mod samples;
pub mod scheduler;
pub mod stream;
pub mod value;

/// Audio samples produced per tick.
pub const BLOCK_SIZE: usize = 60;
/// Audio samples covered by one bytebeat entry.
pub const BYTEBEAT_OVERSAMPLE: usize = 6;
/// Bytebeat entries per tick.
pub const BYTEBEAT_SIZE: usize = BLOCK_SIZE / BYTEBEAT_OVERSAMPLE;
/// Default output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

/// Engine parameters shared by every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f64,
}

impl EngineConfig {
    /// Duration of one tick in seconds.
    pub fn block_duration(&self) -> f64 {
        BLOCK_SIZE as f64 / self.sample_rate
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}
