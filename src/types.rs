//! Core value types shared across the market model, router, and solver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into the market's token table.
pub type TokenId = usize;

/// Index into the market's directed-edge table.
pub type EdgeId = usize;

/// A token known to the market: snapshot address plus display symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub symbol: String,
}

impl fmt::Display for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// The two reserves backing one directed trading edge.
///
/// `x` is the pool's reserve of the inbound token, `y` of the outbound token.
/// The opposite direction of the same pool holds the mirrored pair
/// (`x` and `y` swapped); every mutation must keep the two views consistent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReservePair {
    pub x: f64,
    pub y: f64,
}

impl ReservePair {
    pub const EMPTY: ReservePair = ReservePair { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// A pool with either side at zero cannot be traded through.
    pub fn is_tradable(&self) -> bool {
        self.x > 0.0 && self.y > 0.0
    }
}

/// One trade-size class for an ordered token pair.
///
/// `count` is normalized at market construction so counts across all buckets
/// of all ordered pairs sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandBucket {
    pub count: f64,
    pub trade_size: f64,
    pub range_low: f64,
    pub range_up: f64,
}

/// Result of routing one trade.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    /// Amount of the target token received; 0.0 when no path exists.
    pub received: f64,
    /// Token sequence the trade was executed along; empty when no path exists.
    pub path: Vec<TokenId>,
}

impl RouteOutcome {
    pub fn unreachable() -> Self {
        Self {
            received: 0.0,
            path: Vec::new(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        !self.path.is_empty()
    }

    /// Number of pools the trade crossed.
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}
