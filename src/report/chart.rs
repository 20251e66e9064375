//! Chart Data Export
//!
//! Pool liquidity levels keyed by deduplicated unordered symbol pairs, the
//! data feed for an external bar-chart renderer. Each physical pool appears
//! once, under whichever direction is enumerated first.

use crate::market::{LiquidityState, Market};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::routes::escape_csv_field;

/// Write `<name>.csv` with `pool,liquidity` rows under `report_dir`.
/// Returns the path written.
pub fn write_liquidity_chart<P: AsRef<Path>>(
    market: &Market,
    state: &LiquidityState,
    report_dir: P,
    name: &str,
) -> Result<PathBuf> {
    let dir = report_dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;

    let path = dir.join(format!("{}.csv", name));
    let mut file = File::create(&path)
        .with_context(|| format!("Failed to create chart file: {}", path.display()))?;
    writeln!(file, "pool,liquidity")?;

    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    for (edge, (a, b)) in market.edges().iter().copied().enumerate() {
        let key = if a < b { (a, b) } else { (b, a) };
        if !seen.insert(key) {
            continue;
        }

        let label = format!("{}-{}", market.symbol(a), market.symbol(b));
        writeln!(file, "{},{}", escape_csv_field(&label), state.get(edge).x)?;
    }

    Ok(path)
}
