//! Coordinate-Ascent Optimizer
//!
//! Local search over liquidity distributions: every round tries moving one
//! quantum of liquidity between every ordered pair of pools, re-scores the
//! full objective for each candidate, and keeps the single best strictly
//! improving one. Halts at the first round with no improvement - a local
//! optimum, no backtracking.
//!
//! A round is quadratic in edge count and each candidate evaluation runs
//! thousands of routing calls, so the solver dominates a run's cost. The
//! candidates within a round are independent and could be fanned out over
//! workers; the baseline stays sequential.

use crate::config::SolverConfig;
use crate::error::ContractError;
use crate::market::{LiquidityState, Market};
use crate::routing::Evaluator;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of a full optimization run.
#[derive(Debug, Clone)]
pub struct OptimizeOutcome {
    pub best_state: LiquidityState,
    pub best_score: f64,
    pub baseline_score: f64,
    /// Rounds executed, including the final no-improvement round
    pub rounds: u32,
}

/// Best state persisted at round boundaries so an interrupted run can resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub written_at: String,
    pub rounds: u32,
    pub score: f64,
    pub state: LiquidityState,
}

impl Checkpoint {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read checkpoint: {}", path.as_ref().display()))?;
        let checkpoint: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse checkpoint: {}", path.as_ref().display()))?;
        Ok(checkpoint)
    }
}

pub struct Optimizer<'a> {
    market: &'a Market,
    evaluator: Evaluator<'a>,
    delta: f64,
    precision: i32,
    checkpoint_file: Option<PathBuf>,
}

impl<'a> Optimizer<'a> {
    pub fn new(
        market: &'a Market,
        solver: &SolverConfig,
        checkpoint_file: Option<PathBuf>,
    ) -> Result<Self, ContractError> {
        solver.validate()?;
        Ok(Self {
            market,
            evaluator: Evaluator::new(market, solver.fee, solver.split_into)?,
            delta: solver.delta(),
            precision: solver.precision,
            checkpoint_file,
        })
    }

    /// Sum of the bucket objectives, the score the search climbs.
    pub fn total_objective(&self, state: &LiquidityState) -> Result<f64, ContractError> {
        let mut total = 0.0;
        for bucket in self.market.buckets() {
            total += self.evaluator.evaluate(state, bucket)?.value;
        }
        Ok(total)
    }

    /// Run the coordinate ascent from `initial` until a round produces no
    /// strictly improving reallocation. The accepted score sequence is
    /// non-decreasing by construction.
    pub fn optimize(&self, initial: &LiquidityState) -> Result<OptimizeOutcome, ContractError> {
        let baseline_score = self.total_objective(initial)?;
        info!("Baseline objective: {:.6}", baseline_score);

        let mut best_state = initial.clone();
        let mut best_score = baseline_score;
        let mut rounds = 0u32;

        loop {
            let improved = self.best_candidate(&best_state, best_score)?;
            rounds += 1;

            match improved {
                Some((state, score)) => {
                    info!(
                        "Round {}: objective improved {:.6} -> {:.6}",
                        rounds, best_score, score
                    );
                    best_state = state;
                    best_score = score;
                    self.write_checkpoint(&best_state, best_score, rounds);
                }
                None => {
                    info!("Round {}: no improving reallocation, stopping", rounds);
                    break;
                }
            }
        }

        Ok(OptimizeOutcome {
            best_state,
            best_score,
            baseline_score,
            rounds,
        })
    }

    /// Scan every ordered pair of directed edges, moving `delta` from the
    /// second pool into the first, and return the best candidate whose score
    /// strictly exceeds `floor`. Empty source pools are never drawn from.
    fn best_candidate(
        &self,
        current: &LiquidityState,
        floor: f64,
    ) -> Result<Option<(LiquidityState, f64)>, ContractError> {
        let mut best: Option<(LiquidityState, f64)> = None;

        for into in 0..self.market.edge_count() {
            for from in 0..self.market.edge_count() {
                if into == from {
                    continue;
                }
                if !current.get(from).is_tradable() {
                    continue;
                }

                let mut candidate = current.clone();
                candidate.shift_liquidity(
                    into,
                    self.market.reverse(into),
                    from,
                    self.market.reverse(from),
                    self.delta,
                    self.precision,
                );

                let score = self.total_objective(&candidate)?;
                let bar = best.as_ref().map_or(floor, |(_, s)| *s);
                if score > bar {
                    let (i_from, i_to) = self.market.edge(into);
                    let (f_from, f_to) = self.market.edge(from);
                    debug!(
                        "Candidate {}-{} <- {}-{} scores {:.6}",
                        self.market.symbol(i_from),
                        self.market.symbol(i_to),
                        self.market.symbol(f_from),
                        self.market.symbol(f_to),
                        score
                    );
                    best = Some((candidate, score));
                }
            }
        }

        Ok(best)
    }

    /// Persist the accepted state at a round boundary. Failures are logged,
    /// never fatal: losing a checkpoint must not kill an hours-long run.
    fn write_checkpoint(&self, state: &LiquidityState, score: f64, rounds: u32) {
        let Some(path) = &self.checkpoint_file else {
            return;
        };

        let checkpoint = Checkpoint {
            written_at: chrono::Utc::now().to_rfc3339(),
            rounds,
            score,
            state: state.clone(),
        };

        let result = serde_json::to_string_pretty(&checkpoint)
            .map_err(anyhow::Error::from)
            .and_then(|json| std::fs::write(path, json).map_err(anyhow::Error::from));

        match result {
            Ok(()) => debug!("Checkpoint written to {}", path.display()),
            Err(err) => warn!("Failed to write checkpoint {}: {}", path.display(), err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::test_fixtures::line_snapshot;

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

    fn small_solver() -> SolverConfig {
        SolverConfig {
            fee: 0.003,
            precision: 2,
            split_into: 10,
        }
    }

    #[test]
    fn test_optimize_never_decreases_score() {
        let snapshot = line_snapshot(
            &[("0xa", "0xb", 90.0), ("0xb", "0xc", 10.0)],
            &uniform_counts(),
        );
        let market = Market::from_snapshot(&snapshot, 2).unwrap();
        let optimizer = Optimizer::new(&market, &small_solver(), None).unwrap();

        let outcome = optimizer.optimize(market.scaled_state()).unwrap();
        assert!(outcome.best_score >= outcome.baseline_score);
        assert!(outcome.rounds >= 1);
    }

    #[test]
    fn test_candidates_never_drain_empty_pools() {
        // a-c has no pool; no candidate may push its reserves negative.
        let snapshot = line_snapshot(
            &[("0xa", "0xb", 50.0), ("0xb", "0xc", 50.0)],
            &uniform_counts(),
        );
        let market = Market::from_snapshot(&snapshot, 2).unwrap();
        let optimizer = Optimizer::new(&market, &small_solver(), None).unwrap();

        let outcome = optimizer.optimize(market.scaled_state()).unwrap();
        for (_, pair) in outcome.best_state.iter() {
            assert!(pair.x >= 0.0);
            assert!(pair.y >= 0.0);
        }
    }

    #[test]
    fn test_best_state_stays_mirrored() {
        let snapshot = line_snapshot(
            &[("0xa", "0xb", 80.0), ("0xb", "0xc", 20.0)],
            &uniform_counts(),
        );
        let market = Market::from_snapshot(&snapshot, 2).unwrap();
        let optimizer = Optimizer::new(&market, &small_solver(), None).unwrap();

        let outcome = optimizer.optimize(market.scaled_state()).unwrap();
        for edge in 0..market.edge_count() {
            let fwd = outcome.best_state.get(edge);
            let back = outcome.best_state.get(market.reverse(edge));
            assert_eq!(fwd.x, back.y);
            assert_eq!(fwd.y, back.x);
        }
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let dir = std::env::temp_dir().join("cpmm_optimizer_checkpoint_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checkpoint.json");

        let snapshot = line_snapshot(
            &[("0xa", "0xb", 90.0), ("0xb", "0xc", 10.0)],
            &uniform_counts(),
        );
        let market = Market::from_snapshot(&snapshot, 2).unwrap();
        let optimizer = Optimizer::new(&market, &small_solver(), Some(path.clone())).unwrap();

        let outcome = optimizer.optimize(market.scaled_state()).unwrap();

        if outcome.best_score > outcome.baseline_score {
            let checkpoint = Checkpoint::load(&path).unwrap();
            assert_eq!(checkpoint.state, outcome.best_state);
            assert_eq!(checkpoint.score, outcome.best_score);
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
