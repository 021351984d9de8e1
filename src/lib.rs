//! # frontier-rs
//!
//! $$
//! \min_{\mathbf w \in \Delta_K} \sigma_p(\mathbf w) \quad \text{s.t.} \quad \lfloor\mu_p(\mathbf w)\rfloor_d = q
//! $$
//!
//! Per-instrument return/risk/correlation statistics with memoization,
//! weighted portfolio aggregation, and an exhaustive search over weight
//! compositions on a `1/K` grid that approximates the efficient frontier.
//!
//! ```ignore
//! use frontier_rs::frontier::search;
//! use frontier_rs::loader::{load_path, CsvLayout};
//!
//! let outcome = load_path("sp500.csv", &CsvLayout::sp_500())?;
//! let instruments: Vec<_> = outcome.instruments.into_iter().map(std::sync::Arc::new).collect();
//! let frontier = search(&instruments, 10)?;
//! for row in frontier.entries() {
//!   println!("{:.2} {:.4} {:?}", row.expected_return, row.risk, row.weights);
//! }
//! ```

pub mod error;
pub mod frontier;
pub mod instrument;
pub mod loader;
pub mod period;
pub mod portfolio;
pub mod visualization;

pub use error::FrontierError;
pub use frontier::Frontier;
pub use frontier::FrontierConfig;
pub use frontier::FrontierSearch;
pub use instrument::Instrument;
pub use instrument::InstrumentId;
pub use period::Granularity;
pub use portfolio::Portfolio;
pub use portfolio::PortfolioPoint;
