use crate::config::{DEFAULT_HISTOGRAM_BINS, DEFAULT_HISTORY_DAYS};
use crate::correlation::{analyze_correlation, CorrelationReport};
use crate::data::PriceSource;
use crate::error::RiskError;
use crate::portfolio::{aggregate_portfolio_returns, WeightVector};
use crate::returns::{build_returns_table, PriceSeries};
use crate::simulation::{run_simulation, SimulationConfig, SimulationResult};
use crate::summary::{summarize, Histogram, SimulationSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Time range of price history to request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateWindow {
    /// The `days` days up to now.
    pub fn trailing_days(days: i64) -> Self {
        let to = Utc::now();
        Self {
            from: to - Duration::days(days),
            to,
        }
    }
}

impl Default for DateWindow {
    fn default() -> Self {
        Self::trailing_days(DEFAULT_HISTORY_DAYS)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisConfig {
    pub simulation: SimulationConfig,
    pub histogram_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

/// Everything one analysis run produces.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskReport {
    pub assets: Vec<String>,
    pub weights: WeightVector,
    pub first_return_date: NaiveDate,
    pub last_return_date: NaiveDate,
    pub observations: usize,
    pub horizon_days: usize,
    pub initial_value: f64,
    pub summary: SimulationSummary,
    pub simulation: SimulationResult,
    pub histogram: Histogram,
    pub correlation: CorrelationReport,
}

/// Runs the full pipeline on price series that are already in memory.
///
/// The simulation branch (aggregate, simulate, summarize) and the correlation
/// branch only share the read-only returns table and run concurrently.
pub fn compute_report(
    assets: &[String],
    prices: &HashMap<String, PriceSeries>,
    weights: Option<WeightVector>,
    config: &AnalysisConfig,
) -> std::result::Result<RiskReport, RiskError> {
    let table = build_returns_table(assets, prices)?;
    let weights = match weights {
        Some(w) => w,
        None => WeightVector::equal(table.num_assets())?,
    };
    info!(
        "Aligned {} daily returns for {} assets ({} -> {})",
        table.num_rows(),
        table.num_assets(),
        table.dates()[0],
        table.dates()[table.num_rows() - 1]
    );

    let (simulated, correlation) = rayon::join(
        || -> std::result::Result<_, RiskError> {
            let portfolio = aggregate_portfolio_returns(&table, &weights)?;
            let simulation = run_simulation(portfolio.returns(), &config.simulation)?;
            let summary = summarize(simulation.values())?;
            let histogram = Histogram::from_values(simulation.values(), config.histogram_bins)?;
            Ok((simulation, summary, histogram))
        },
        || analyze_correlation(&table),
    );
    let (simulation, summary, histogram) = simulated?;
    let correlation = correlation?;

    info!(
        "Simulated {} trials: mean={:.2}, median={:.2}, p5={:.2}, p95={:.2}",
        summary.trials, summary.mean, summary.median, summary.p5, summary.p95
    );
    if let Some(avg) = correlation.average_pairwise {
        info!("Average pairwise correlation: {:.4}", avg);
    }

    Ok(RiskReport {
        assets: table.assets().to_vec(),
        weights,
        first_return_date: table.dates()[0],
        last_return_date: table.dates()[table.num_rows() - 1],
        observations: table.num_rows(),
        horizon_days: config.simulation.horizon_days,
        initial_value: config.simulation.initial_value,
        summary,
        simulation,
        histogram,
        correlation,
    })
}

/// Fetches prices through an injected [`PriceSource`] and runs the analysis.
pub struct RiskAnalyzer<S> {
    source: S,
    config: AnalysisConfig,
}

impl<S: PriceSource> RiskAnalyzer<S> {
    pub fn new(source: S, config: AnalysisConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Fetches every asset in turn; any failed fetch aborts the run. The
    /// simulation and correlation work runs on the blocking pool.
    pub async fn analyze(
        &self,
        assets: &[String],
        weights: Option<WeightVector>,
        window: DateWindow,
    ) -> Result<RiskReport> {
        info!(
            "Analyzing {} assets over {} -> {}",
            assets.len(),
            window.from.date_naive(),
            window.to.date_naive()
        );

        let mut prices = HashMap::with_capacity(assets.len());
        for asset in assets {
            let series = self
                .source
                .fetch_prices(asset, window.from, window.to)
                .await
                .with_context(|| format!("failed to fetch price history for {}", asset))?;
            prices.insert(asset.clone(), series);
        }

        let assets = assets.to_vec();
        let config = self.config.clone();
        let report = tokio::task::spawn_blocking(move || {
            compute_report(&assets, &prices, weights, &config)
        })
        .await
        .context("risk computation task failed")??;
        Ok(report)
    }
}
