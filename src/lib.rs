//! Bootstrap Monte Carlo risk analysis for multi-asset portfolios.
//!
//! Price histories are aligned into a daily returns table, combined into a
//! weighted portfolio return series and resampled with replacement to project
//! the distribution of future portfolio value. Pairwise return correlation of
//! the same table measures diversification.

pub mod analyzer;
pub mod config;
pub mod correlation;
pub mod data;
pub mod error;
pub mod portfolio;
pub mod report;
pub mod returns;
pub mod simulation;
pub mod summary;
pub mod universe;

pub use analyzer::{compute_report, AnalysisConfig, DateWindow, RiskAnalyzer, RiskReport};
pub use correlation::{analyze_correlation, CorrelationMatrix, CorrelationReport};
pub use data::{CoinGeckoClient, InMemoryPriceSource, PriceSource};
pub use error::RiskError;
pub use portfolio::{aggregate_portfolio_returns, PortfolioReturnSeries, WeightVector};
pub use returns::{build_returns_table, PricePoint, PriceSeries, ReturnsTable};
pub use simulation::{run_simulation, SimulationConfig, SimulationResult};
pub use summary::{percentile, summarize, Histogram, SimulationSummary};
pub use universe::{select_portfolio, AssetUniverse, StaticUniverse, TokenInfo};
