use crate::config::WEIGHT_SUM_TOLERANCE;
use crate::error::{Result, RiskError};
use crate::returns::ReturnsTable;
use chrono::NaiveDate;
use serde::Serialize;

// ──────────────────────────────────────────────────────────────────────────────
// Weights
// ──────────────────────────────────────────────────────────────────────────────

/// Static portfolio weights, one per asset, non-negative and summing to 1.0.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(RiskError::InvalidWeight("weight vector is empty".to_string()));
        }
        if let Some((idx, w)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(RiskError::InvalidWeight(format!(
                "weight {} at position {} must be a non-negative finite number",
                w, idx
            )));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RiskError::InvalidWeight(format!(
                "weights sum to {}, expected 1.0 (tolerance {})",
                sum, WEIGHT_SUM_TOLERANCE
            )));
        }
        Ok(Self(weights))
    }

    /// `1/n` for each of `n` assets.
    pub fn equal(n: usize) -> Result<Self> {
        Self::new(vec![1.0 / n as f64; n])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Aggregation
// ──────────────────────────────────────────────────────────────────────────────

/// Daily returns of the weighted portfolio, one per returns-table row.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioReturnSeries {
    dates: Vec<NaiveDate>,
    returns: Vec<f64>,
}

impl PortfolioReturnSeries {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }
}

fn portfolio_return(weights: &[f64], returns: impl Iterator<Item = f64>) -> f64 {
    weights.iter().zip(returns).map(|(w, r)| w * r).sum()
}

/// Weighted sum of per-asset returns on each row. Weights are held fixed over
/// the whole window; nothing is compounded here.
pub fn aggregate_portfolio_returns(
    table: &ReturnsTable,
    weights: &WeightVector,
) -> Result<PortfolioReturnSeries> {
    if weights.len() != table.num_assets() {
        return Err(RiskError::DimensionMismatch {
            weights: weights.len(),
            assets: table.num_assets(),
        });
    }

    let returns = (0..table.num_rows())
        .map(|row| portfolio_return(weights.as_slice(), table.row(row)))
        .collect();

    Ok(PortfolioReturnSeries {
        dates: table.dates().to_vec(),
        returns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::returns::build_returns_table;
    use crate::returns::tests::series;
    use std::collections::HashMap;

    fn two_asset_table() -> ReturnsTable {
        let prices: HashMap<_, _> = [
            series("btc", &[100.0, 110.0, 121.0]),
            series("eth", &[50.0, 45.0, 40.5]),
        ]
        .into_iter()
        .map(|s| (s.asset().to_string(), s))
        .collect();
        build_returns_table(&["btc".to_string(), "eth".to_string()], &prices).unwrap()
    }

    #[test]
    fn test_equal_weights_cancel_opposite_moves() {
        let table = two_asset_table();
        let weights = WeightVector::new(vec![0.5, 0.5]).unwrap();
        let portfolio = aggregate_portfolio_returns(&table, &weights).unwrap();

        assert_eq!(portfolio.len(), table.num_rows());
        assert_eq!(portfolio.dates(), table.dates());
        for r in portfolio.returns() {
            assert!(r.abs() < 1e-12, "expected 0.0, got {}", r);
        }
    }

    #[test]
    fn test_weighted_sum_is_linear() {
        let table = two_asset_table();
        let weights = WeightVector::new(vec![0.75, 0.25]).unwrap();
        let portfolio = aggregate_portfolio_returns(&table, &weights).unwrap();
        for r in portfolio.returns() {
            assert!((r - 0.05).abs() < 1e-12);
        }
    }

    #[test]
    fn test_equal_weights_sum_to_one() {
        for n in 1..=25 {
            let w = WeightVector::equal(n).unwrap();
            let sum: f64 = w.as_slice().iter().sum();
            assert!((sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE);
            assert!(w.as_slice().iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn test_rejects_bad_weights() {
        assert!(matches!(
            WeightVector::new(vec![0.5, 0.4]),
            Err(RiskError::InvalidWeight(_))
        ));
        assert!(matches!(
            WeightVector::new(vec![1.5, -0.5]),
            Err(RiskError::InvalidWeight(_))
        ));
        assert!(matches!(
            WeightVector::new(vec![f64::NAN, 1.0]),
            Err(RiskError::InvalidWeight(_))
        ));
        assert!(matches!(WeightVector::equal(0), Err(RiskError::InvalidWeight(_))));
    }

    #[test]
    fn test_accepts_sum_within_tolerance() {
        assert!(WeightVector::new(vec![0.5, 0.5 + 5e-7]).is_ok());
        assert!(WeightVector::new(vec![0.5, 0.5 + 5e-6]).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        let table = two_asset_table();
        let weights = WeightVector::new(vec![0.2, 0.3, 0.5]).unwrap();
        let err = aggregate_portfolio_returns(&table, &weights).unwrap_err();
        assert_eq!(err, RiskError::DimensionMismatch { weights: 3, assets: 2 });
    }
}
