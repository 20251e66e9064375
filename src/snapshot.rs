//! Input Snapshot
//!
//! Serde mirror of the config.json emitted by the ingestion pipeline:
//! `{ blocks?, size, weights, reserves }`. The weights map mixes a `symb`
//! field with per-counterparty demand records under one token key, so the
//! counterparty records hang off a flattened map.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub blocks: Option<BlockRange>,
    /// Token count the ingestion pipeline believes it wrote
    pub size: usize,
    /// token address -> symbol + demand records against every other token
    pub weights: HashMap<String, TokenWeights>,
    /// pool id -> balanced reserve level and the pair it connects
    pub reserves: HashMap<String, PoolReserves>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenWeights {
    pub symb: String,
    #[serde(flatten)]
    pub pairs: HashMap<String, PairDemand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairDemand {
    #[serde(rename = "totalVol", default)]
    pub total_vol: f64,
    pub buckets: HashMap<String, BucketRecord>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BucketRecord {
    pub count: f64,
    #[serde(rename = "rangeLow")]
    pub range_low: f64,
    #[serde(rename = "rangeUp")]
    pub range_up: f64,
    pub tradesize: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolReserves {
    pub reserves: f64,
    pub token0: String,
    pub token1: String,
}

impl Snapshot {
    /// Load a snapshot from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read snapshot: {}", path.as_ref().display()))?;

        let snapshot: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.as_ref().display()))?;

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot_json() {
        let json = r#"{
            "blocks": { "start": 10100000, "end": 12800000 },
            "size": 2,
            "weights": {
                "0xaaa": {
                    "symb": "WETH",
                    "0xbbb": {
                        "totalVol": 123.0,
                        "buckets": {
                            "bucket0": { "count": 4, "rangeLow": 0, "rangeUp": 32, "tradesize": 10 }
                        }
                    }
                },
                "0xbbb": {
                    "symb": "WBTC",
                    "0xaaa": {
                        "totalVol": 50.0,
                        "buckets": {
                            "bucket0": { "count": 1, "rangeLow": 0, "rangeUp": 32, "tradesize": 10 }
                        }
                    }
                }
            },
            "reserves": {
                "0xpool": { "reserves": 1000.0, "token0": "0xaaa", "token1": "0xbbb" }
            }
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.size, 2);
        assert_eq!(snapshot.weights["0xaaa"].symb, "WETH");

        let demand = &snapshot.weights["0xaaa"].pairs["0xbbb"];
        assert_eq!(demand.total_vol, 123.0);
        assert_eq!(demand.buckets["bucket0"].count, 4.0);
        assert_eq!(demand.buckets["bucket0"].tradesize, 10.0);

        let pool = &snapshot.reserves["0xpool"];
        assert_eq!(pool.reserves, 1000.0);
        assert_eq!(pool.token0, "0xaaa");
    }

    #[test]
    fn test_round_trip() {
        let json = r#"{
            "size": 2,
            "weights": {
                "0xaaa": {
                    "symb": "A",
                    "0xbbb": {
                        "totalVol": 1.0,
                        "buckets": {
                            "bucket0": { "count": 2, "rangeLow": 0, "rangeUp": 32, "tradesize": 10 }
                        }
                    }
                },
                "0xbbb": {
                    "symb": "B",
                    "0xaaa": {
                        "totalVol": 1.0,
                        "buckets": {
                            "bucket0": { "count": 2, "rangeLow": 0, "rangeUp": 32, "tradesize": 10 }
                        }
                    }
                }
            },
            "reserves": {}
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let serialized = serde_json::to_string(&snapshot).unwrap();
        let reparsed: Snapshot = serde_json::from_str(&serialized).unwrap();

        assert_eq!(reparsed.size, snapshot.size);
        assert_eq!(
            reparsed.weights["0xaaa"].pairs["0xbbb"].buckets["bucket0"].count,
            2.0
        );
    }
}
