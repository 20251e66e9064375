//! Routing: the widest-path trade router and the demand-weighted objective
//! built on top of it.

pub mod objective;
pub mod router;

pub use objective::{BucketScore, Evaluator, PairRouting};
pub use router::Router;
