//! Solver: the coordinate-ascent driver over liquidity distributions.

pub mod optimizer;

pub use optimizer::{Checkpoint, OptimizeOutcome, Optimizer};
