use crate::error::{Result, RiskError};
use serde::Serialize;

/// Distribution statistics of simulated terminal values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub trials: usize,
    pub mean: f64,
    pub median: f64,
    pub p5: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
}

/// Linear-interpolation percentile over an ascending slice, `rank = p/100 * (n-1)`.
///
/// `None` for an empty slice; `p` is clamped to `[0, 100]`.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    Some(interpolate(sorted, p))
}

fn interpolate(sorted: &[f64], p: f64) -> f64 {
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

pub fn summarize(values: &[f64]) -> Result<SimulationSummary> {
    if values.is_empty() {
        return Err(RiskError::EmptyResult);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    Ok(SimulationSummary {
        trials: n,
        mean: sorted.iter().sum::<f64>() / n as f64,
        median: interpolate(&sorted, 50.0),
        p5: interpolate(&sorted, 5.0),
        p95: interpolate(&sorted, 95.0),
        min: sorted[0],
        max: sorted[n - 1],
    })
}

/// Equal-width histogram of terminal values, for presentation layers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    pub lower: f64,
    pub upper: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bins `values` into `bins` equal-width buckets spanning `[min, max]`.
    /// The maximum lands in the last bucket. A zero-width range collapses into
    /// a single bucket.
    pub fn from_values(values: &[f64], bins: usize) -> Result<Self> {
        if values.is_empty() {
            return Err(RiskError::EmptyResult);
        }
        if bins == 0 {
            return Err(RiskError::InvalidParameter {
                name: "bins",
                value: bins.to_string(),
            });
        }

        let lower = values.iter().copied().fold(f64::INFINITY, f64::min);
        let upper = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let width = (upper - lower) / bins as f64;

        if width <= 0.0 || !width.is_finite() {
            return Ok(Self {
                lower,
                upper,
                counts: vec![values.len()],
            });
        }

        let mut counts = vec![0usize; bins];
        for &v in values {
            let idx = (((v - lower) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(Self { lower, upper, counts })
    }

    pub fn bin_width(&self) -> f64 {
        (self.upper - self.lower) / self.counts.len() as f64
    }

    /// `(lower edge, upper edge, count)` for each bucket.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        let width = self.bin_width();
        self.counts.iter().enumerate().map(move |(i, &count)| {
            let start = self.lower + width * i as f64;
            (start, start + width, count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let vals: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        assert!((percentile(&vals, 50.0).unwrap() - 5.5).abs() < 1e-12);
        assert!((percentile(&vals, 0.0).unwrap() - 1.0).abs() < 1e-12);
        assert!((percentile(&vals, 100.0).unwrap() - 10.0).abs() < 1e-12);
        // rank = 0.05 * 9 = 0.45
        assert!((percentile(&vals, 5.0).unwrap() - 1.45).abs() < 1e-12);
        // rank = 0.95 * 9 = 8.55
        assert!((percentile(&vals, 95.0).unwrap() - 9.55).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_of_empty_slice() {
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&[7.0], 95.0), Some(7.0));
    }

    #[test]
    fn test_summary_of_unsorted_values() {
        let summary = summarize(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.trials, 4);
        assert!((summary.mean - 2.5).abs() < 1e-12);
        assert!((summary.median - 2.5).abs() < 1e-12);
        assert!((summary.p5 - 1.15).abs() < 1e-12);
        assert!((summary.p95 - 3.85).abs() < 1e-12);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
    }

    #[test]
    fn test_single_value() {
        let summary = summarize(&[10_000.0]).unwrap();
        assert_eq!(summary.mean, 10_000.0);
        assert_eq!(summary.median, 10_000.0);
        assert_eq!(summary.p5, 10_000.0);
        assert_eq!(summary.p95, 10_000.0);
    }

    #[test]
    fn test_percentiles_are_ordered() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let n = rng.gen_range(2..200);
            let vals: Vec<f64> = (0..n).map(|_| rng.gen_range(-5_000.0..50_000.0)).collect();
            let s = summarize(&vals).unwrap();
            assert!(s.p5 <= s.median && s.median <= s.p95, "{:?}", s);
            assert!(s.min <= s.p5 && s.p95 <= s.max);
        }
    }

    #[test]
    fn test_empty_result() {
        assert_eq!(summarize(&[]).unwrap_err(), RiskError::EmptyResult);
        assert_eq!(Histogram::from_values(&[], 10).unwrap_err(), RiskError::EmptyResult);
    }

    #[test]
    fn test_histogram_counts_every_value() {
        let vals = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0];
        let hist = Histogram::from_values(&vals, 5).unwrap();
        assert_eq!(hist.counts, vec![2, 2, 2, 2, 2]);
        assert_eq!(hist.counts.iter().sum::<usize>(), vals.len());
        assert!((hist.bin_width() - 2.0).abs() < 1e-12);

        let edges: Vec<(f64, f64, usize)> = hist.bins().collect();
        assert_eq!(edges[0], (0.0, 2.0, 2));
        assert_eq!(edges[4].2, 2);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        let hist = Histogram::from_values(&[5.0, 5.0, 5.0], 50).unwrap();
        assert_eq!(hist.counts, vec![3]);
    }
}
