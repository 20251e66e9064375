//! CPMM Liquidity Reallocation Optimizer
//!
//! Main entry point. Loads the run configuration and the demand/reserve
//! snapshot, builds the market model, evaluates the baseline objective,
//! runs the coordinate-ascent solver, and writes route and chart reports
//! for the pre- and post-optimization liquidity distributions.

use anyhow::Result;
use clap::Parser;
use cpmm_optimizer::report::{write_liquidity_chart, ReportPhase, RouteReportWriter};
use cpmm_optimizer::{
    Checkpoint, Evaluator, LiquidityState, Market, Optimizer, RunConfig, Snapshot,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CPMM Liquidity Reallocation Optimizer - offline batch analysis
#[derive(Parser)]
#[command(name = "cpmm-optimizer")]
struct Args {
    /// Path to the TOML run configuration
    #[arg(
        short,
        long,
        env = "CPMM_OPTIMIZER_CONFIG",
        default_value = "config/solver.toml"
    )]
    config: PathBuf,

    /// Override the snapshot file from the configuration
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Seed the solver from the configured checkpoint file instead of the
    /// scaled snapshot state
    #[arg(long)]
    resume: bool,

    /// Run the solver without writing CSV reports
    #[arg(long)]
    skip_reports: bool,
}

fn main() -> Result<()> {
    // Initialize logging, RUST_LOG overrides the info default
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = RunConfig::load(&args.config)?;
    let snapshot_path = args
        .snapshot
        .clone()
        .unwrap_or_else(|| config.input.snapshot_file.clone());

    info!("CPMM Liquidity Optimizer starting");
    info!(
        "Solver: fee={}, precision={}, split_into={}",
        config.solver.fee, config.solver.precision, config.solver.split_into
    );

    let snapshot = Snapshot::load(&snapshot_path)?;
    info!(
        "Snapshot loaded from {}: {} tokens, {} pools",
        snapshot_path.display(),
        snapshot.weights.len(),
        snapshot.reserves.len()
    );

    let market = Market::from_snapshot(&snapshot, config.solver.precision)?;

    // Baseline diagnostics: surface disconnected pairs before the long run.
    let evaluator = Evaluator::new(&market, config.solver.fee, config.solver.split_into)?;
    let mut disconnected = 0;
    for bucket in market.buckets() {
        disconnected += evaluator
            .evaluate(market.scaled_state(), bucket)?
            .disconnected_pairs;
    }
    if disconnected > 0 {
        warn!(
            "{} (bucket, pair) combinations route no volume - the pool graph is not fully connected",
            disconnected
        );
    }

    let initial = initial_state(&args, &config, &market)?;

    let optimizer = Optimizer::new(&market, &config.solver, config.output.checkpoint_file.clone())?;
    let outcome = optimizer.optimize(&initial)?;

    if !args.skip_reports {
        write_reports(&config, &market, &evaluator, &outcome.best_state)?;
    }

    print_summary(&config, &market, &outcome);

    Ok(())
}

/// Scaled snapshot state, or the persisted best state when resuming.
fn initial_state(args: &Args, config: &RunConfig, market: &Market) -> Result<LiquidityState> {
    if args.resume {
        let Some(path) = &config.output.checkpoint_file else {
            anyhow::bail!("--resume requires output.checkpoint_file in the configuration");
        };
        let checkpoint = Checkpoint::load(path)?;
        if checkpoint.state.len() != market.edge_count() {
            anyhow::bail!(
                "checkpoint {} holds {} edges but the market has {}",
                path.display(),
                checkpoint.state.len(),
                market.edge_count()
            );
        }
        info!(
            "Resuming from checkpoint {} (round {}, score {:.6})",
            path.display(),
            checkpoint.rounds,
            checkpoint.score
        );
        Ok(checkpoint.state)
    } else {
        Ok(market.scaled_state().clone())
    }
}

fn write_reports(
    config: &RunConfig,
    market: &Market,
    evaluator: &Evaluator,
    best_state: &LiquidityState,
) -> Result<()> {
    let report_dir = &config.output.report_dir;

    if config.output.write_route_reports {
        let writer = RouteReportWriter::new(market, report_dir, config.solver.fee);
        for bucket in market.buckets() {
            let old = evaluator.evaluate_pairs(market.scaled_state(), bucket)?;
            writer.write_bucket(ReportPhase::Current, bucket, market.scaled_state(), &old)?;

            let opt = evaluator.evaluate_pairs(best_state, bucket)?;
            writer.write_bucket(ReportPhase::Optimized, bucket, best_state, &opt)?;
        }
        info!(
            "Route reports written under {}",
            report_dir.join("routing").display()
        );
    }

    let current = write_liquidity_chart(market, market.scaled_state(), report_dir, "liquidity_current")?;
    let best = write_liquidity_chart(market, best_state, report_dir, "liquidity_best")?;
    info!(
        "Chart data written: {}, {}",
        current.display(),
        best.display()
    );

    Ok(())
}

fn print_summary(
    config: &RunConfig,
    market: &Market,
    outcome: &cpmm_optimizer::OptimizeOutcome,
) {
    let total = market.total_liquidity();

    println!("\nOptimization Summary");
    println!("─────────────────────────────────────");
    println!("average input:\t{:.6}", market.average_input());
    println!("old:\t\t{:.6}", total * outcome.baseline_score);
    println!("opt:\t\t{:.6}\n", total * outcome.best_score);
    println!("rounds:\t\t{}", outcome.rounds);
    println!("precision:\t{}", config.solver.precision);
    println!("split into {} trades\n", config.solver.split_into);
    println!("tokens:");
    for token in market.tokens() {
        println!("\t{}", token.symbol);
    }
}
