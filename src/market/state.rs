//! Liquidity State
//!
//! The full directed-edge -> reserve-pair mapping at a point in time, stored
//! densely by edge id. Mutation goes through two narrow paths only: applying
//! a routed hop and shifting liquidity between pools. Both keep the two
//! directed views of each physical pool mirrored.

use crate::types::{EdgeId, ReservePair};
use serde::{Deserialize, Serialize};

/// Round to `precision` decimal places.
pub fn round_to(value: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityState {
    reserves: Vec<ReservePair>,
}

impl LiquidityState {
    pub fn new(reserves: Vec<ReservePair>) -> Self {
        Self { reserves }
    }

    pub fn len(&self) -> usize {
        self.reserves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reserves.is_empty()
    }

    pub fn get(&self, edge: EdgeId) -> ReservePair {
        self.reserves[edge]
    }

    pub fn iter(&self) -> impl Iterator<Item = (EdgeId, ReservePair)> + '_ {
        self.reserves.iter().copied().enumerate()
    }

    /// Apply one routed hop through the pool behind `edge`.
    ///
    /// `net_in` is the fee-adjusted inbound amount credited to the pool,
    /// `out` the amount removed on the outbound side. Both directed views
    /// of the pool are updated in the same call, so the mirroring invariant
    /// holds on return.
    pub fn apply_hop(&mut self, edge: EdgeId, reverse: EdgeId, net_in: f64, out: f64) {
        self.reserves[edge].x += net_in;
        self.reserves[edge].y -= out;
        self.reserves[reverse].x -= out;
        self.reserves[reverse].y += net_in;
    }

    /// Move `delta` units of liquidity from one pool into another, both
    /// directions of each pool adjusted together and snapped back onto the
    /// `precision` rounding grid.
    pub fn shift_liquidity(
        &mut self,
        into: EdgeId,
        into_rev: EdgeId,
        from: EdgeId,
        from_rev: EdgeId,
        delta: f64,
        precision: i32,
    ) {
        for edge in [into, into_rev] {
            let r = &mut self.reserves[edge];
            r.x = round_to(r.x + delta, precision);
            r.y = round_to(r.y + delta, precision);
        }
        for edge in [from, from_rev] {
            let r = &mut self.reserves[edge];
            r.x = round_to(r.x - delta, precision);
            r.y = round_to(r.y - delta, precision);
        }
    }
}

#[cfg(test)]
impl LiquidityState {
    /// Test-only backdoor for building arbitrary states.
    pub(crate) fn set(&mut self, edge: EdgeId, pair: ReservePair) {
        self.reserves[edge] = pair;
    }
}
