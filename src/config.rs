//! Run Configuration
//!
//! Reads solver parameters from a TOML file. Defaults mirror the original
//! study: 0.3% CPMM fee, 2-decimal liquidity grid, 500-way trade splitting.

use crate::error::ContractError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level TOML configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Snapshot produced by the ingestion pipeline (config.json shape)
    pub snapshot_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolverConfig {
    /// CPMM fee, must be in [0, 1)
    #[serde(default = "default_fee")]
    pub fee: f64,
    /// Decimals for the scaled-liquidity grid; the reallocation quantum
    /// delta is 10^-precision
    #[serde(default = "default_precision")]
    pub precision: i32,
    /// How many uniform packages each aggregate trade is split into
    #[serde(default = "default_split_into")]
    pub split_into: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    #[serde(default = "default_true")]
    pub write_route_reports: bool,
    /// Best state + score persisted here at every accepted round boundary
    #[serde(default)]
    pub checkpoint_file: Option<PathBuf>,
}

fn default_fee() -> f64 {
    0.003
}
fn default_precision() -> i32 {
    2
}
fn default_split_into() -> u32 {
    500
}
fn default_report_dir() -> PathBuf {
    PathBuf::from("outputs")
}
fn default_true() -> bool {
    true
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            fee: default_fee(),
            precision: default_precision(),
            split_into: default_split_into(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
            write_route_reports: true,
            checkpoint_file: None,
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.solver.validate()?;
        Ok(config)
    }
}

impl SolverConfig {
    /// Fail fast on parameters the core contracts reject anyway.
    pub fn validate(&self) -> Result<(), ContractError> {
        if !(0.0..1.0).contains(&self.fee) {
            return Err(ContractError::FeeOutOfRange(self.fee));
        }
        if self.precision <= 0 {
            return Err(ContractError::MalformedSnapshot(format!(
                "precision must be positive, got {}",
                self.precision
            )));
        }
        if self.split_into == 0 {
            return Err(ContractError::NonPositiveTradeSize(0.0));
        }
        Ok(())
    }

    /// The liquidity reallocation quantum, one step on the rounding grid.
    pub fn delta(&self) -> f64 {
        10f64.powi(-self.precision)
    }
}
