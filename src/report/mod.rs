//! Output artifacts for the external visualization tooling: per-pair route
//! CSVs and deduplicated pool-liquidity chart data.

pub mod chart;
pub mod routes;

pub use chart::write_liquidity_chart;
pub use routes::{ReportPhase, RouteReportWriter};
