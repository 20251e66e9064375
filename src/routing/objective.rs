//! Objective Evaluator
//!
//! Scores a liquidity distribution for one demand bucket: the bucket's
//! aggregate volume for every ordered token pair is split into many small
//! sequential trades routed against an evolving copy of the state, and the
//! received amounts are weighted by normalized demand counts. Splitting
//! approximates continuous flow against discrete CPMM slippage - one large
//! trade would overstate market impact.

use crate::error::ContractError;
use crate::market::{LiquidityState, Market};
use crate::routing::Router;
use crate::types::TokenId;
use tracing::debug;

/// Score for one (state, bucket) evaluation.
#[derive(Debug, Clone, Copy)]
pub struct BucketScore {
    pub value: f64,
    /// Ordered pairs whose every split trade returned zero - the
    /// disconnected-graph signal.
    pub disconnected_pairs: usize,
}

/// One ordered pair's full routing result, kept for report writing.
#[derive(Debug, Clone)]
pub struct PairRouting {
    pub source: TokenId,
    pub target: TokenId,
    pub arrived: f64,
    /// State after all split trades for this pair ran
    pub routed: LiquidityState,
}

pub struct Evaluator<'a> {
    market: &'a Market,
    router: Router<'a>,
    split_into: u32,
}

impl<'a> Evaluator<'a> {
    pub fn new(market: &'a Market, fee: f64, split_into: u32) -> Result<Self, ContractError> {
        if split_into == 0 {
            return Err(ContractError::NonPositiveTradeSize(0.0));
        }
        Ok(Self {
            market,
            router: Router::new(market, fee)?,
            split_into,
        })
    }

    /// Evaluate the demand-weighted objective for one bucket. The caller's
    /// state is never mutated; each pair routes against its own clone.
    pub fn evaluate(
        &self,
        state: &LiquidityState,
        bucket: &str,
    ) -> Result<BucketScore, ContractError> {
        let bucket_pos = self.market.bucket_position(bucket)?;
        let mut value = 0.0;
        let mut disconnected = 0;

        for edge in 0..self.market.edge_count() {
            let (arrived, _) = self.route_pair(state, edge, bucket_pos)?;
            if arrived == 0.0 {
                let (source, target) = self.market.edge(edge);
                debug!(
                    "Explored a disconnected graph: {} -> {} ({})",
                    self.market.symbol(source),
                    self.market.symbol(target),
                    bucket
                );
                disconnected += 1;
            }
            value += self.market.demand(edge, bucket_pos).count * arrived;
        }

        Ok(BucketScore {
            value,
            disconnected_pairs: disconnected,
        })
    }

    /// Like `evaluate`, but keeps every pair's routed end state so reports
    /// can diff it against the starting distribution.
    pub fn evaluate_pairs(
        &self,
        state: &LiquidityState,
        bucket: &str,
    ) -> Result<Vec<PairRouting>, ContractError> {
        let bucket_pos = self.market.bucket_position(bucket)?;
        let mut routings = Vec::with_capacity(self.market.edge_count());

        for edge in 0..self.market.edge_count() {
            let (arrived, routed) = self.route_pair(state, edge, bucket_pos)?;
            let (source, target) = self.market.edge(edge);
            routings.push(PairRouting {
                source,
                target,
                arrived,
                routed,
            });
        }

        Ok(routings)
    }

    /// Route one pair's bucket volume as `split_into` sequential packages
    /// against a private clone of the state.
    fn route_pair(
        &self,
        state: &LiquidityState,
        edge: usize,
        bucket_pos: usize,
    ) -> Result<(f64, LiquidityState), ContractError> {
        let (source, target) = self.market.edge(edge);
        let demand = self.market.demand(edge, bucket_pos);

        // Per-package size in the same scaled units as the state.
        let trade_size =
            demand.trade_size / (self.split_into as f64 * self.market.total_liquidity());

        let mut routing = state.clone();
        if trade_size <= 0.0 {
            // No representative volume for this pair and bucket.
            return Ok((0.0, routing));
        }

        let mut arrived = 0.0;
        for _ in 0..self.split_into {
            arrived += self
                .router
                .route(&mut routing, source, target, trade_size)?
                .received;
        }

        Ok((arrived, routing))
    }
}
