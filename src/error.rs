//! Contract-violation errors
//!
//! Hard failures only: bad caller arguments or a snapshot that does not match
//! the expected shape. Recoverable routing anomalies (disconnected pair,
//! skipped edge) are ordinary results, not errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("trade size must be positive, got {0}")]
    NonPositiveTradeSize(f64),

    #[error("fee must be in [0, 1), got {0}")]
    FeeOutOfRange(f64),

    #[error("source and target token are the same: {0}")]
    SameToken(String),

    #[error("unknown demand bucket: {0}")]
    UnknownBucket(String),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
}
