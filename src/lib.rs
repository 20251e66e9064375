//! CPMM Liquidity Reallocation Optimizer
//!
//! Simulates trading through a network of constant-product AMM pools and
//! searches for a reallocation of the total liquidity across pools that
//! maximizes the expected amount a random trader receives, weighted by
//! historically observed trade-size demand. Deterministic, offline, single
//! machine: the input is a static snapshot, the outputs are liquidity
//! states, scores, and CSV reports.

pub mod config;
pub mod error;
pub mod market;
pub mod report;
pub mod routing;
pub mod snapshot;
pub mod solver;
pub mod types;

// Re-export commonly used types
pub use config::RunConfig;
pub use error::ContractError;
pub use market::{LiquidityState, Market};
pub use routing::{BucketScore, Evaluator, Router};
pub use snapshot::Snapshot;
pub use solver::{Checkpoint, OptimizeOutcome, Optimizer};
pub use types::{DemandBucket, ReservePair, RouteOutcome, TokenInfo};
