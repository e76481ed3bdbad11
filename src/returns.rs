use crate::error::{Result, RiskError};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A single daily price observation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Daily price history for one asset. Dates are strictly increasing.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceSeries {
    asset: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series from points that must already be sorted by date with no duplicates.
    pub fn new(asset: impl Into<String>, points: Vec<PricePoint>) -> Result<Self> {
        let asset = asset.into();
        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(RiskError::InvalidPriceSeries {
                reason: format!("dates not strictly increasing at {} -> {}", w[0].date, w[1].date),
                asset,
            });
        }
        validate_prices(&asset, &points)?;
        Ok(Self { asset, points })
    }

    /// Sorts raw provider output by date and keeps the last observation for each date.
    pub fn from_unordered(asset: impl Into<String>, points: Vec<PricePoint>) -> Result<Self> {
        let asset = asset.into();
        let by_date: BTreeMap<NaiveDate, f64> =
            points.into_iter().map(|p| (p.date, p.price)).collect();
        let points: Vec<PricePoint> = by_date
            .into_iter()
            .map(|(date, price)| PricePoint { date, price })
            .collect();
        validate_prices(&asset, &points)?;
        Ok(Self { asset, points })
    }

    /// Convenience constructor pairing dates with prices.
    pub fn from_pairs(asset: impl Into<String>, pairs: &[(NaiveDate, f64)]) -> Result<Self> {
        let points = pairs
            .iter()
            .map(|&(date, price)| PricePoint { date, price })
            .collect();
        Self::new(asset, points)
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn price_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].price)
    }
}

fn validate_prices(asset: &str, points: &[PricePoint]) -> Result<()> {
    match points.iter().find(|p| !p.price.is_finite() || p.price <= 0.0) {
        Some(bad) => Err(RiskError::InvalidPriceSeries {
            asset: asset.to_string(),
            reason: format!("price {} on {} is not a positive finite number", bad.price, bad.date),
        }),
        None => Ok(()),
    }
}

/// Daily fractional returns for a set of assets, aligned on common dates.
///
/// `dates[i]` is the date on which `columns[k][i]` was realised; every column
/// has the same length, which is at least one.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnsTable {
    assets: Vec<String>,
    dates: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl ReturnsTable {
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn column(&self, asset: &str) -> Option<&[f64]> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }

    /// Number of return rows.
    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }

    /// Returns of every asset on row `idx`, in asset order.
    pub fn row(&self, idx: usize) -> impl Iterator<Item = f64> + '_ {
        self.columns.iter().map(move |col| col[idx])
    }
}

/// Aligns the requested assets on the intersection of their dates and computes
/// `price[t] / price[t-1] - 1` between consecutive aligned dates.
///
/// The first aligned date has no predecessor and is dropped, so each column has
/// one entry fewer than the number of aligned dates.
pub fn build_returns_table(
    assets: &[String],
    prices: &HashMap<String, PriceSeries>,
) -> Result<ReturnsTable> {
    let series: Vec<&PriceSeries> = assets
        .iter()
        .map(|id| prices.get(id).ok_or_else(|| RiskError::MissingAsset(id.clone())))
        .collect::<Result<_>>()?;

    let mut aligned: BTreeSet<NaiveDate> = match series.first() {
        Some(first) => first.points.iter().map(|p| p.date).collect(),
        None => BTreeSet::new(),
    };
    for s in series.iter().skip(1) {
        aligned.retain(|date| s.price_on(*date).is_some());
    }

    if aligned.len() < 2 {
        return Err(RiskError::InsufficientData {
            aligned_rows: aligned.len(),
            assets: assets.len(),
        });
    }

    let aligned: Vec<NaiveDate> = aligned.into_iter().collect();
    let columns: Vec<Vec<f64>> = series
        .iter()
        .map(|s| {
            let closes: Vec<f64> = aligned
                .iter()
                .filter_map(|date| s.price_on(*date))
                .collect();
            closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect::<Vec<f64>>()
        })
        .collect();

    Ok(ReturnsTable {
        assets: assets.to_vec(),
        dates: aligned[1..].to_vec(),
        columns,
    })
}
