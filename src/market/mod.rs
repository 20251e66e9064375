//! Market Model
//!
//! Immutable per-run view of the pool network, built once from the input
//! snapshot: the token table, every ordered token pair as a directed edge,
//! normalized demand weights per edge and bucket, and the scaled initial
//! liquidity distribution. Constructed explicitly and passed by reference
//! into the router, evaluator, and solver; there is no ambient global state.

pub mod state;

pub use state::{round_to, LiquidityState};

use crate::error::ContractError;
use crate::snapshot::Snapshot;
use crate::types::{DemandBucket, EdgeId, ReservePair, TokenId, TokenInfo};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Market {
    tokens: Vec<TokenInfo>,
    token_index: HashMap<String, TokenId>,
    /// Every ordered pair of distinct tokens, row-major over the token table
    edges: Vec<(TokenId, TokenId)>,
    edge_index: HashMap<(TokenId, TokenId), EdgeId>,
    /// Opposite direction of each edge, same physical pool
    reverse: Vec<EdgeId>,
    /// Bucket names, one canonical sorted list shared by every edge
    buckets: Vec<String>,
    /// Normalized demand per [edge][bucket position]
    demand: Vec<Vec<DemandBucket>>,
    /// Real-world liquidity summed over all pools, the scaling denominator
    total_liquidity: f64,
    scaled: LiquidityState,
    precision: i32,
}

impl Market {
    pub fn from_snapshot(snapshot: &Snapshot, precision: i32) -> Result<Self, ContractError> {
        // Token table in sorted address order so runs are deterministic.
        let mut addresses: Vec<&String> = snapshot.weights.keys().collect();
        addresses.sort();

        let tokens: Vec<TokenInfo> = addresses
            .iter()
            .map(|addr| TokenInfo {
                address: (*addr).clone(),
                symbol: snapshot.weights[*addr].symb.clone(),
            })
            .collect();
        let n = tokens.len();

        if n < 2 {
            return Err(ContractError::MalformedSnapshot(format!(
                "need at least 2 tokens, got {}",
                n
            )));
        }
        if snapshot.size != n {
            warn!(
                "Snapshot declares {} tokens but weights contain {}",
                snapshot.size, n
            );
        }

        let token_index: HashMap<String, TokenId> = tokens
            .iter()
            .enumerate()
            .map(|(id, t)| (t.address.clone(), id))
            .collect();

        // Directed edge table: both directions of every unordered pool.
        let mut edges = Vec::with_capacity(n * (n - 1));
        let mut edge_index = HashMap::new();
        for a in 0..n {
            for b in 0..n {
                if a != b {
                    edge_index.insert((a, b), edges.len());
                    edges.push((a, b));
                }
            }
        }
        let reverse: Vec<EdgeId> = edges.iter().map(|&(a, b)| edge_index[&(b, a)]).collect();

        let (buckets, demand) = Self::build_demand(snapshot, &tokens, &edges)?;

        let (current, total_liquidity) =
            Self::aggregate_reserves(snapshot, &token_index, &edge_index, edges.len());

        if total_liquidity <= 0.0 {
            return Err(ContractError::MalformedSnapshot(
                "snapshot contains no pool liquidity".to_string(),
            ));
        }

        let scaled = LiquidityState::new(
            current
                .iter()
                .map(|r| {
                    ReservePair::new(
                        round_to(r.x / total_liquidity, precision),
                        round_to(r.y / total_liquidity, precision),
                    )
                })
                .collect(),
        );

        info!(
            "Market built: {} tokens, {} directed edges, {} buckets, total liquidity {:.4}",
            n,
            edges.len(),
            buckets.len(),
            total_liquidity
        );

        Ok(Self {
            tokens,
            token_index,
            edges,
            edge_index,
            reverse,
            buckets,
            demand,
            total_liquidity,
            scaled,
            precision,
        })
    }

    /// Collect demand buckets for every ordered pair and normalize counts so
    /// they sum to 1 across the whole matrix.
    fn build_demand(
        snapshot: &Snapshot,
        tokens: &[TokenInfo],
        edges: &[(TokenId, TokenId)],
    ) -> Result<(Vec<String>, Vec<Vec<DemandBucket>>), ContractError> {
        let mut bucket_names: Option<Vec<String>> = None;
        let mut demand: Vec<Vec<DemandBucket>> = Vec::with_capacity(edges.len());

        for &(a, b) in edges {
            let from = &tokens[a].address;
            let to = &tokens[b].address;

            let pair = snapshot.weights[from].pairs.get(to).ok_or_else(|| {
                ContractError::MalformedSnapshot(format!(
                    "missing demand record for pair {} -> {}",
                    from, to
                ))
            })?;

            let mut names: Vec<String> = pair.buckets.keys().cloned().collect();
            names.sort();
            match &bucket_names {
                None => bucket_names = Some(names),
                Some(expected) if *expected != names => {
                    return Err(ContractError::MalformedSnapshot(format!(
                        "bucket names for pair {} -> {} differ from the rest of the matrix",
                        from, to
                    )));
                }
                Some(_) => {}
            }

            let names = bucket_names.as_ref().unwrap();
            demand.push(
                names
                    .iter()
                    .map(|name| {
                        let record = pair.buckets[name];
                        DemandBucket {
                            count: record.count,
                            trade_size: record.tradesize,
                            range_low: record.range_low,
                            range_up: record.range_up,
                        }
                    })
                    .collect(),
            );
        }

        let total_trades: f64 = demand
            .iter()
            .flat_map(|per_edge| per_edge.iter())
            .map(|b| b.count)
            .sum();
        if total_trades <= 0.0 {
            return Err(ContractError::MalformedSnapshot(
                "demand matrix contains no observed trades".to_string(),
            ));
        }
        for per_edge in &mut demand {
            for bucket in per_edge {
                bucket.count /= total_trades;
            }
        }

        Ok((bucket_names.unwrap(), demand))
    }

    /// Sum every physical pool's reserves into the mirrored per-edge pairs.
    /// The snapshot carries one balanced reserve level per pool, credited to
    /// both sides of both directions; multiple pools on the same pair add up.
    fn aggregate_reserves(
        snapshot: &Snapshot,
        token_index: &HashMap<String, TokenId>,
        edge_index: &HashMap<(TokenId, TokenId), EdgeId>,
        edge_count: usize,
    ) -> (Vec<ReservePair>, f64) {
        let mut current = vec![ReservePair::EMPTY; edge_count];
        let mut total = 0.0;

        let mut pool_ids: Vec<&String> = snapshot.reserves.keys().collect();
        pool_ids.sort();

        for pool_id in pool_ids {
            let pool = &snapshot.reserves[pool_id];
            let (Some(&t0), Some(&t1)) = (
                token_index.get(&pool.token0),
                token_index.get(&pool.token1),
            ) else {
                warn!(
                    "Ignoring pool {} - tokens not in the weight matrix",
                    pool_id
                );
                continue;
            };
            if t0 == t1 {
                warn!("Ignoring pool {} - both sides are the same token", pool_id);
                continue;
            }

            for edge in [edge_index[&(t0, t1)], edge_index[&(t1, t0)]] {
                current[edge].x += pool.reserves;
                current[edge].y += pool.reserves;
            }
            total += pool.reserves;

            debug!(
                "Aggregated pool {} ({} <-> {}) with reserves {}",
                pool_id, pool.token0, pool.token1, pool.reserves
            );
        }

        (current, total)
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn tokens(&self) -> &[TokenInfo] {
        &self.tokens
    }

    pub fn token(&self, id: TokenId) -> &TokenInfo {
        &self.tokens[id]
    }

    pub fn symbol(&self, id: TokenId) -> &str {
        &self.tokens[id].symbol
    }

    /// Resolve a token address to its id; unknown tokens are a caller
    /// contract violation.
    pub fn token_id(&self, address: &str) -> Result<TokenId, ContractError> {
        self.token_index
            .get(address)
            .copied()
            .ok_or_else(|| ContractError::UnknownToken(address.to_string()))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[(TokenId, TokenId)] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> (TokenId, TokenId) {
        self.edges[id]
    }

    /// Every ordered pair of distinct tokens has an edge by construction.
    pub fn edge_between(&self, from: TokenId, to: TokenId) -> EdgeId {
        self.edge_index[&(from, to)]
    }

    pub fn reverse(&self, edge: EdgeId) -> EdgeId {
        self.reverse[edge]
    }

    pub fn buckets(&self) -> &[String] {
        &self.buckets
    }

    pub fn bucket_position(&self, name: &str) -> Result<usize, ContractError> {
        self.buckets
            .iter()
            .position(|b| b == name)
            .ok_or_else(|| ContractError::UnknownBucket(name.to_string()))
    }

    pub fn demand(&self, edge: EdgeId, bucket: usize) -> DemandBucket {
        self.demand[edge][bucket]
    }

    pub fn total_liquidity(&self) -> f64 {
        self.total_liquidity
    }

    /// The snapshot's real reserves divided by total liquidity and rounded to
    /// the precision grid; the solver's starting point.
    pub fn scaled_state(&self) -> &LiquidityState {
        &self.scaled
    }

    pub fn precision(&self) -> i32 {
        self.precision
    }

    /// Demand-weighted average trade size, the reference ceiling for the
    /// objective (a perfect market would pay out the average input).
    pub fn average_input(&self) -> f64 {
        self.demand
            .iter()
            .flat_map(|per_edge| per_edge.iter())
            .map(|b| b.count * b.trade_size)
            .sum()
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use crate::snapshot::{BucketRecord, PairDemand, PoolReserves, Snapshot, TokenWeights};
    use std::collections::HashMap;

    /// Snapshot with tokens a/b/c, one bucket, and pools on the given pairs
    /// (one balanced reserve level each).
    pub fn line_snapshot(pools: &[(&str, &str, f64)], counts: &[(&str, &str, f64)]) -> Snapshot {
        let tokens = ["0xa", "0xb", "0xc"];
        let symbols = ["A", "B", "C"];

        let mut weights = HashMap::new();
        for (i, addr) in tokens.iter().enumerate() {
            let mut pairs = HashMap::new();
            for other in tokens.iter().filter(|o| *o != addr) {
                let count = counts
                    .iter()
                    .find(|(f, t, _)| f == addr && t == other)
                    .map(|(_, _, c)| *c)
                    .unwrap_or(0.0);
                let mut buckets = HashMap::new();
                buckets.insert(
                    "bucket0".to_string(),
                    BucketRecord {
                        count,
                        range_low: 0.0,
                        range_up: 32.0,
                        tradesize: 10.0,
                    },
                );
                pairs.insert(
                    other.to_string(),
                    PairDemand {
                        total_vol: 0.0,
                        buckets,
                    },
                );
            }
            weights.insert(
                addr.to_string(),
                TokenWeights {
                    symb: symbols[i].to_string(),
                    pairs,
                },
            );
        }

        let mut reserves = HashMap::new();
        for (i, (t0, t1, r)) in pools.iter().enumerate() {
            reserves.insert(
                format!("0xpool{}", i),
                PoolReserves {
                    reserves: *r,
                    token0: t0.to_string(),
                    token1: t1.to_string(),
                },
            );
        }

        Snapshot {
            blocks: None,
            size: 3,
            weights,
            reserves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::line_snapshot;
    use super::*;

    fn uniform_counts() -> Vec<(&'static str, &'static str, f64)> {
        vec![
            ("0xa", "0xb", 1.0),
            ("0xb", "0xa", 1.0),
            ("0xb", "0xc", 1.0),
            ("0xc", "0xb", 1.0),
            ("0xa", "0xc", 1.0),
            ("0xc", "0xa", 1.0),
        ]
    }

    #[test]
    fn test_builds_every_directed_pair() {
        let snapshot = line_snapshot(&[("0xa", "0xb", 50.0), ("0xb", "0xc", 50.0)], &uniform_counts());
        let market = Market::from_snapshot(&snapshot, 2).unwrap();

        assert_eq!(market.token_count(), 3);
        assert_eq!(market.edge_count(), 6);

        // Reverse edges point at each other.
        for edge in 0..market.edge_count() {
            let (a, b) = market.edge(edge);
            let rev = market.reverse(edge);
            assert_eq!(market.edge(rev), (b, a));
            assert_eq!(market.reverse(rev), edge);
        }
    }

    #[test]
    fn test_scaled_state_mirrors_and_rounds() {
        let snapshot = line_snapshot(&[("0xa", "0xb", 75.0), ("0xb", "0xc", 25.0)], &uniform_counts());
        let market = Market::from_snapshot(&snapshot, 2).unwrap();

        assert_eq!(market.total_liquidity(), 100.0);

        let state = market.scaled_state();
        let a = market.token_id("0xa").unwrap();
        let b = market.token_id("0xb").unwrap();
        let c = market.token_id("0xc").unwrap();

        let ab = state.get(market.edge_between(a, b));
        assert_eq!(ab, ReservePair::new(0.75, 0.75));
        let ba = state.get(market.edge_between(b, a));
        assert_eq!(ba, ReservePair::new(0.75, 0.75));

        // No pool between a and c.
        let ac = state.get(market.edge_between(a, c));
        assert_eq!(ac, ReservePair::EMPTY);
    }

    #[test]
    fn test_multiple_pools_on_one_pair_aggregate() {
        let snapshot = line_snapshot(
            &[("0xa", "0xb", 30.0), ("0xb", "0xa", 20.0), ("0xb", "0xc", 50.0)],
            &uniform_counts(),
        );
        let market = Market::from_snapshot(&snapshot, 2).unwrap();

        assert_eq!(market.total_liquidity(), 100.0);
        let a = market.token_id("0xa").unwrap();
        let b = market.token_id("0xb").unwrap();
        let ab = market.scaled_state().get(market.edge_between(a, b));
        assert_eq!(ab, ReservePair::new(0.5, 0.5));
    }

    #[test]
    fn test_demand_counts_normalize_to_one() {
        let snapshot = line_snapshot(&[("0xa", "0xb", 50.0)], &uniform_counts());
        let market = Market::from_snapshot(&snapshot, 2).unwrap();

        let total: f64 = (0..market.edge_count())
            .map(|e| market.demand(e, 0).count)
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_input_weighted_by_demand() {
        let snapshot = line_snapshot(&[("0xa", "0xb", 50.0)], &uniform_counts());
        let market = Market::from_snapshot(&snapshot, 2).unwrap();

        // All buckets share tradesize 10 and counts normalize to 1.
        assert!((market.average_input() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_token_rejected() {
        let snapshot = line_snapshot(&[("0xa", "0xb", 50.0)], &uniform_counts());
        let market = Market::from_snapshot(&snapshot, 2).unwrap();

        assert!(matches!(
            market.token_id("0xdead"),
            Err(ContractError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_unknown_reserve_tokens_ignored() {
        let mut snapshot = line_snapshot(&[("0xa", "0xb", 50.0)], &uniform_counts());
        snapshot.reserves.insert(
            "0xghost".to_string(),
            crate::snapshot::PoolReserves {
                reserves: 1000.0,
                token0: "0xdead".to_string(),
                token1: "0xa".to_string(),
            },
        );

        let market = Market::from_snapshot(&snapshot, 2).unwrap();
        assert_eq!(market.total_liquidity(), 50.0);
    }

    #[test]
    fn test_missing_pair_record_rejected() {
        let mut snapshot = line_snapshot(&[("0xa", "0xb", 50.0)], &uniform_counts());
        snapshot
            .weights
            .get_mut("0xa")
            .unwrap()
            .pairs
            .remove("0xb")
            .unwrap();

        assert!(matches!(
            Market::from_snapshot(&snapshot, 2),
            Err(ContractError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_mismatched_bucket_names_rejected() {
        let mut snapshot = line_snapshot(&[("0xa", "0xb", 50.0)], &uniform_counts());
        let buckets = &mut snapshot
            .weights
            .get_mut("0xa")
            .unwrap()
            .pairs
            .get_mut("0xb")
            .unwrap()
            .buckets;
        let record = buckets.remove("bucket0").unwrap();
        buckets.insert("bucket9".to_string(), record);

        assert!(matches!(
            Market::from_snapshot(&snapshot, 2),
            Err(ContractError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_empty_liquidity_rejected() {
        let snapshot = line_snapshot(&[], &uniform_counts());
        assert!(matches!(
            Market::from_snapshot(&snapshot, 2),
            Err(ContractError::MalformedSnapshot(_))
        ));
    }
}
