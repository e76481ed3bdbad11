use crate::config::{ProviderSettings, VS_CURRENCY};
use crate::returns::{PricePoint, PriceSeries};
use crate::universe::{AssetUniverse, TokenInfo};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Supplies daily price history for an asset over a time window.
///
/// Implementations must hand back a [`PriceSeries`], which is sorted and free of
/// duplicate dates by construction.
pub trait PriceSource {
    fn fetch_prices(
        &self,
        asset: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<PriceSeries>> + Send;
}

// ──────────────────────────────────────────────────────────────────────────────
// In-memory source
// ──────────────────────────────────────────────────────────────────────────────

/// Fixed price histories, for tests and offline runs. The window is applied by date.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPriceSource {
    series: HashMap<String, PriceSeries>,
}

impl InMemoryPriceSource {
    pub fn new(series: impl IntoIterator<Item = PriceSeries>) -> Self {
        Self {
            series: series
                .into_iter()
                .map(|s| (s.asset().to_string(), s))
                .collect(),
        }
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.asset().to_string(), series);
    }
}

impl PriceSource for InMemoryPriceSource {
    async fn fetch_prices(
        &self,
        asset: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<PriceSeries> {
        let series = self
            .series
            .get(asset)
            .with_context(|| format!("no in-memory price history for {}", asset))?;
        let (from, to) = (from.date_naive(), to.date_naive());
        let points = series
            .points()
            .iter()
            .filter(|p| p.date >= from && p.date <= to)
            .copied()
            .collect();
        Ok(PriceSeries::new(asset, points)?)
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// CoinGecko
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct MarketChartResponse {
    prices: Vec<[f64; 2]>,
}

#[derive(Deserialize, Debug)]
struct CoinMarket {
    id: String,
    symbol: String,
    name: String,
    market_cap_rank: Option<u32>,
}

/// Client for the public CoinGecko v3 API.
///
/// Serves both token rankings and price history. Consecutive requests are
/// spaced by `fetch_delay` to stay under the free-tier rate limit.
pub struct CoinGeckoClient {
    http: reqwest::Client,
    settings: ProviderSettings,
    last_request: Mutex<Option<Instant>>,
}

impl CoinGeckoClient {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_env() -> Self {
        Self::new(ProviderSettings::from_env())
    }

    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.settings.fetch_delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let attempts = self.settings.retry_attempts.max(1);
        let mut last_err: Option<anyhow::Error> = None;

        for attempt in 1..=attempts {
            self.pace().await;

            let mut request = self
                .http
                .get(url)
                .header("Accept", "application/json")
                .timeout(self.settings.request_timeout);
            if let Some(key) = &self.settings.api_key {
                request = request.header("x-cg-demo-api-key", key);
            }

            match request.send().await {
                Ok(resp) => match resp.error_for_status() {
                    Ok(ok_resp) => match ok_resp.json::<T>().await {
                        Ok(parsed) => return Ok(parsed),
                        Err(err) => last_err = Some(err.into()),
                    },
                    Err(err) => last_err = Some(err.into()),
                },
                Err(err) => last_err = Some(err.into()),
            }

            if attempt < attempts {
                warn!("CoinGecko {} fetch retry ({}/{})", what, attempt, attempts);
                let backoff = std::time::Duration::from_millis((500 * attempt as u64).min(3000));
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("CoinGecko {} fetch failed", what)))
    }
}

/// Converts a `market_chart/range` payload into a daily series. CoinGecko stamps
/// prices in epoch milliseconds and may return several points for one calendar
/// day; the last one wins.
fn market_chart_to_series(asset: &str, response: &MarketChartResponse) -> Result<PriceSeries> {
    let points: Vec<PricePoint> = response
        .prices
        .iter()
        .filter_map(|&[ts_ms, price]| {
            let date = Utc.timestamp_millis_opt(ts_ms as i64).single()?.date_naive();
            Some(PricePoint { date, price })
        })
        .collect();

    if points.is_empty() {
        return Err(anyhow::anyhow!("No CoinGecko price data found for {}", asset));
    }

    Ok(PriceSeries::from_unordered(asset, points)?)
}

impl PriceSource for CoinGeckoClient {
    async fn fetch_prices(
        &self,
        asset: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<PriceSeries> {
        let url = format!(
            "{}/coins/{}/market_chart/range?vs_currency={}&from={}&to={}",
            self.settings.base_url,
            asset,
            VS_CURRENCY,
            from.timestamp(),
            to.timestamp()
        );
        debug!("Fetching {} history {} -> {}", asset, from.date_naive(), to.date_naive());

        let response: MarketChartResponse = self
            .get_json(&url, &format!("history for {}", asset))
            .await?;
        let series = market_chart_to_series(asset, &response)?;
        info!("{}: {} daily prices", asset, series.len());
        Ok(series)
    }
}

impl AssetUniverse for CoinGeckoClient {
    async fn top_assets(&self, count: usize) -> Result<Vec<TokenInfo>> {
        let url = format!(
            "{}/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page=1",
            self.settings.base_url, VS_CURRENCY, count
        );
        let markets: Vec<CoinMarket> = self.get_json(&url, "market ranking").await?;
        info!("Fetched top {} tokens by market cap", markets.len());

        Ok(markets
            .into_iter()
            .map(|m| {
                debug!("  #{:?} {} ({})", m.market_cap_rank, m.id, m.symbol);
                TokenInfo {
                    id: m.id,
                    symbol: m.symbol,
                    name: m.name,
                }
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rand::{Rng, SeedableRng};

    /// Random-walk daily prices starting at 100, reproducible from `seed`.
    pub(crate) fn mock_series(asset: &str, start: NaiveDate, days: usize, seed: u64) -> PriceSeries {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut price: f64 = 100.0;
        let points = (0..days)
            .map(|i| {
                let point = PricePoint {
                    date: start + Duration::days(i as i64),
                    price,
                };
                price *= 1.0 + rng.gen_range(-0.05..0.05);
                point
            })
            .collect();
        PriceSeries::new(asset, points).unwrap()
    }

    #[test]
    fn test_market_chart_parsing_dedupes_days() {
        // 2024-01-01 00:00, 2024-01-01 12:00, 2024-01-02 00:00 (UTC)
        let payload = r#"{
            "prices": [[1704067200000, 100.0], [1704110400000, 101.5], [1704153600000, 103.0]],
            "market_caps": [],
            "total_volumes": []
        }"#;
        let response: MarketChartResponse = serde_json::from_str(payload).unwrap();
        let series = market_chart_to_series("bitcoin", &response).unwrap();

        assert_eq!(series.asset(), "bitcoin");
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(series.points()[0].price, 101.5);
        assert_eq!(series.points()[1].price, 103.0);
    }

    #[test]
    fn test_market_chart_empty_is_error() {
        let response = MarketChartResponse { prices: vec![] };
        assert!(market_chart_to_series("bitcoin", &response).is_err());
    }

    #[test]
    fn test_coin_markets_parsing() {
        let payload = r#"[
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "market_cap_rank": 1, "current_price": 65000.0},
            {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "market_cap_rank": null}
        ]"#;
        let markets: Vec<CoinMarket> = serde_json::from_str(payload).unwrap();
        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].id, "bitcoin");
        assert_eq!(markets[1].market_cap_rank, None);
    }

    #[tokio::test]
    async fn test_in_memory_source_applies_window() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let source = InMemoryPriceSource::new([mock_series("sol", start, 30, 1)]);

        let from = Utc.from_utc_datetime(&(start + Duration::days(10)).and_hms_opt(0, 0, 0).unwrap());
        let to = Utc.from_utc_datetime(&(start + Duration::days(19)).and_hms_opt(23, 0, 0).unwrap());
        let series = source.fetch_prices("sol", from, to).await.unwrap();
        assert_eq!(series.len(), 10);
        assert_eq!(series.points()[0].date, start + Duration::days(10));

        assert!(source.fetch_prices("missing", from, to).await.is_err());
    }
}
