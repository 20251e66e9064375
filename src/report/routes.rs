//! Route CSV Reports
//!
//! One CSV per (bucket, ordered token pair) describing how that pair's
//! bucket volume moved liquidity through the graph, written for the
//! pre-optimization ("old") and post-optimization ("opt") states. The
//! figures are rescaled from routing units back to real liquidity so the
//! files can be explored directly in a graph tool.

use crate::market::{LiquidityState, Market};
use crate::routing::PairRouting;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Which side of the optimization a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPhase {
    Current,
    Optimized,
}

impl ReportPhase {
    fn dir_name(&self) -> &'static str {
        match self {
            ReportPhase::Current => "old",
            ReportPhase::Optimized => "opt",
        }
    }
}

pub struct RouteReportWriter<'a> {
    market: &'a Market,
    report_dir: PathBuf,
    fee: f64,
}

impl<'a> RouteReportWriter<'a> {
    const HEADERS: &'static [&'static str] = &[
        "token1",
        "token2",
        "insertedLiquidity",
        "removedLiquidity",
        "originalLiquidity",
        "demand",
    ];

    pub fn new<P: AsRef<Path>>(market: &'a Market, report_dir: P, fee: f64) -> Self {
        Self {
            market,
            report_dir: report_dir.as_ref().to_path_buf(),
            fee,
        }
    }

    /// Write one CSV per pair routing for the given bucket and phase.
    pub fn write_bucket(
        &self,
        phase: ReportPhase,
        bucket: &str,
        start: &LiquidityState,
        routings: &[PairRouting],
    ) -> Result<()> {
        let bucket_pos = self.market.bucket_position(bucket)?;

        let dir = self
            .report_dir
            .join("routing")
            .join(phase.dir_name())
            .join(bucket);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;

        for routing in routings {
            let filename = format!(
                "route_{}-{}.csv",
                self.market.symbol(routing.source),
                self.market.symbol(routing.target)
            );
            let path = dir.join(filename);
            self.write_pair(&path, bucket_pos, start, routing)
                .with_context(|| format!("Failed to write route report: {}", path.display()))?;
        }

        Ok(())
    }

    fn write_pair(
        &self,
        path: &Path,
        bucket_pos: usize,
        start: &LiquidityState,
        routing: &PairRouting,
    ) -> Result<()> {
        let mut file = File::create(path)?;
        writeln!(file, "{}", Self::HEADERS.join(","))?;

        let total = self.market.total_liquidity();
        for (edge, (a, b)) in self.market.edges().iter().copied().enumerate() {
            let before = start.get(edge);
            let after = routing.routed.get(edge);

            // Undo the inbound fee scaling so the column reads as the amount
            // the traders actually put in.
            let inserted = total * (after.x - before.x) / (1.0 - self.fee);
            let removed = total * (before.y - after.y);
            let original = total * before.x;
            let demand = self.market.demand(edge, bucket_pos).count;

            let (inserted_field, removed_field) = if inserted > 0.0 {
                (inserted.to_string(), removed.to_string())
            } else {
                (String::new(), String::new())
            };

            let fields = [
                escape_csv_field(self.market.symbol(a)),
                escape_csv_field(self.market.symbol(b)),
                inserted_field,
                removed_field,
                original.to_string(),
                demand.to_string(),
            ];
            writeln!(file, "{}", fields.join(","))?;
        }

        Ok(())
    }
}

/// Escape a CSV field that may contain special characters
pub(crate) fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
