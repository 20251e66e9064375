//! Trade Router
//!
//! Single-source best-payout search over the pool graph, specialized to the
//! CPMM payout function. A label-correcting worklist kept sorted by received
//! amount replaces Dijkstra's additive relaxation: labels are "how much of
//! this node's token the trade is worth here", and an edge relaxation pushes
//! the whole label through one pool.
//!
//! Correctness hinges on the no-profitable-edge rule: a hop is only accepted
//! if its output is strictly below its input. A profitable edge could form a
//! profitable cycle, which this search (it re-relaxes already-dequeued
//! nodes) cannot handle - such edges are skipped, degrading route quality
//! instead of looping.

use crate::error::ContractError;
use crate::market::{LiquidityState, Market};
use crate::types::{RouteOutcome, TokenId};
use tracing::trace;

pub struct Router<'a> {
    market: &'a Market,
    fee: f64,
}

impl<'a> Router<'a> {
    pub fn new(market: &'a Market, fee: f64) -> Result<Self, ContractError> {
        if !(0.0..1.0).contains(&fee) {
            return Err(ContractError::FeeOutOfRange(fee));
        }
        Ok(Self { market, fee })
    }

    pub fn fee(&self) -> f64 {
        self.fee
    }

    /// Route `trade_size` units of `source`'s token into `target`'s token
    /// along the best multi-hop path, applying the trade to `state`.
    ///
    /// When no path exists the state is left untouched and the outcome
    /// carries zero received - a valid result, not an error. Bad arguments
    /// (zero size, same token, out-of-range id) fail fast.
    pub fn route(
        &self,
        state: &mut LiquidityState,
        source: TokenId,
        target: TokenId,
        trade_size: f64,
    ) -> Result<RouteOutcome, ContractError> {
        let n = self.market.token_count();
        if source >= n {
            return Err(ContractError::UnknownToken(format!("token id {}", source)));
        }
        if target >= n {
            return Err(ContractError::UnknownToken(format!("token id {}", target)));
        }
        if source == target {
            return Err(ContractError::SameToken(
                self.market.symbol(source).to_string(),
            ));
        }
        if !(trade_size > 0.0) {
            return Err(ContractError::NonPositiveTradeSize(trade_size));
        }

        let keep = 1.0 - self.fee;

        let mut received = vec![0.0f64; n];
        let mut paths: Vec<Vec<TokenId>> = vec![Vec::new(); n];
        received[source] = trade_size;
        paths[source] = vec![source];

        // Worklist sorted non-increasing by received amount, source first.
        // Improved nodes are repositioned; nodes improved after their dequeue
        // re-enter and count against the |nodes| dequeue budget.
        let mut worklist: Vec<TokenId> = Vec::with_capacity(n);
        worklist.push(source);
        worklist.extend((0..n).filter(|&t| t != source));

        for _ in 0..n {
            if worklist.is_empty() {
                break;
            }
            let active = worklist.remove(0);
            let amount_in = received[active];
            if amount_in <= 0.0 {
                continue;
            }

            for node in 0..n {
                if node == active {
                    continue;
                }
                let edge = self.market.edge_between(active, node);
                let pool = state.get(edge);
                if pool.y <= 0.0 {
                    continue;
                }

                // 1/payout = x/y * 1/(1-fee) * 1/dx + 1/y
                let payout = 1.0 / (pool.x / pool.y / keep / amount_in + 1.0 / pool.y);

                // Strict improvement, and the hop must be lossy.
                if payout > received[node] && payout < amount_in {
                    received[node] = payout;
                    let mut path = paths[active].clone();
                    path.push(node);
                    paths[node] = path;
                    Self::requeue(&mut worklist, &received, node);
                } else if payout >= amount_in {
                    trace!(
                        "Skipping profitable edge {} -> {} (in {:.6}, out {:.6})",
                        self.market.symbol(active),
                        self.market.symbol(node),
                        amount_in,
                        payout
                    );
                }
            }
        }

        if received[target] <= 0.0 {
            trace!(
                "No route from {} to {} at current liquidity",
                self.market.symbol(source),
                self.market.symbol(target)
            );
            return Ok(RouteOutcome::unreachable());
        }

        // Execute along the winning path: fee charged on every inbound leg,
        // the exact routed amount removed on every outbound leg, both
        // directed views updated together.
        let path = std::mem::take(&mut paths[target]);
        for hop in path.windows(2) {
            let (a, b) = (hop[0], hop[1]);
            let edge = self.market.edge_between(a, b);
            state.apply_hop(edge, self.market.reverse(edge), keep * received[a], received[b]);
        }

        Ok(RouteOutcome {
            received: received[target],
            path,
        })
    }

    /// Reposition `node` in the worklist, keeping it sorted non-increasing
    /// by received amount. A node that was already dequeued re-enters.
    fn requeue(worklist: &mut Vec<TokenId>, received: &[f64], node: TokenId) {
        if let Some(pos) = worklist.iter().position(|&t| t == node) {
            worklist.remove(pos);
        }
        let insert_at = worklist
            .iter()
            .position(|&t| received[t] <= received[node])
            .unwrap_or(worklist.len());
        worklist.insert(insert_at, node);
    }
}
