use crate::error::{Result, RiskError};
use crate::returns::ReturnsTable;
use serde::Serialize;

/// Symmetric Pearson correlation matrix with a unit diagonal.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    assets: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.assets.iter().position(|x| x == a)?;
        let j = self.assets.iter().position(|x| x == b)?;
        Some(self.values[i][j])
    }

    /// Mean of the strictly upper-triangular entries, each pair counted once.
    /// `None` when there are fewer than two assets.
    pub fn average_pairwise(&self) -> Option<f64> {
        let n = self.assets.len();
        let pairs: Vec<f64> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .map(|(i, j)| self.values[i][j])
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.iter().sum::<f64>() / pairs.len() as f64)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationReport {
    pub matrix: CorrelationMatrix,
    pub average_pairwise: Option<f64>,
}

/// Relative spread below which a return column counts as constant.
const CONSTANT_SPREAD_TOLERANCE: f64 = 1e-12;

/// Centered column and its sum of squared deviations.
fn centered(col: &[f64]) -> (Vec<f64>, f64) {
    let mean = col.iter().sum::<f64>() / col.len() as f64;
    let dev: Vec<f64> = col.iter().map(|v| v - mean).collect();
    let ss = dev.iter().map(|d| d * d).sum();
    (dev, ss)
}

/// True when `max - min` is within rounding noise of the column's scale, i.e.
/// `max - min <= 1e-12 * max(1, |mean|)`. Compounded constant-growth prices
/// yield returns that differ only in the last bits and land here.
fn is_constant(col: &[f64]) -> bool {
    let (lo, hi) = col
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let mean = col.iter().sum::<f64>() / col.len() as f64;
    !(hi - lo).is_finite() || hi - lo <= CONSTANT_SPREAD_TOLERANCE * mean.abs().max(1.0)
}

/// Pearson correlation for every asset pair of the table.
///
/// Fails with `InsufficientVariance` if any column is constant, since the
/// coefficient is undefined for it. A column is constant when its spread is
/// at most `1e-12 * max(1, |mean|)`, so rounding noise is not correlated.
pub fn analyze_correlation(table: &ReturnsTable) -> Result<CorrelationReport> {
    if let Some(idx) = table.columns().iter().position(|c| is_constant(c)) {
        return Err(RiskError::InsufficientVariance(table.assets()[idx].clone()));
    }

    let stats: Vec<(Vec<f64>, f64)> = table.columns().iter().map(|c| centered(c)).collect();
    if let Some(idx) = stats.iter().position(|(_, ss)| *ss <= 0.0 || !ss.is_finite()) {
        return Err(RiskError::InsufficientVariance(table.assets()[idx].clone()));
    }

    let n = stats.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let (di, ssi) = &stats[i];
            let (dj, ssj) = &stats[j];
            let cov: f64 = di.iter().zip(dj.iter()).map(|(a, b)| a * b).sum();
            let corr = (cov / (ssi.sqrt() * ssj.sqrt())).clamp(-1.0, 1.0);
            values[i][j] = corr;
            values[j][i] = corr;
        }
    }

    let matrix = CorrelationMatrix {
        assets: table.assets().to_vec(),
        values,
    };
    let average_pairwise = matrix.average_pairwise();
    Ok(CorrelationReport {
        matrix,
        average_pairwise,
    })
}
