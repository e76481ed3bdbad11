use rayon::ThreadPoolBuilder;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

static RAYON_INIT: OnceLock<()> = OnceLock::new();

/// Sizes the global Rayon pool to the logical CPU count. Safe to call more than once.
pub fn init_cpu_parallelism() {
    RAYON_INIT.get_or_init(|| {
        let num_threads = num_cpus::get().max(1);
        match ThreadPoolBuilder::new().num_threads(num_threads).build_global() {
            Ok(_) => info!(
                "Initialized Rayon thread pool with {} threads for simulation trials",
                num_threads
            ),
            Err(e) => warn!(
                "Rayon thread pool already initialized or unavailable ({}). Using existing configuration.",
                e
            ),
        }
    });
}

// ──────────────────────────────────────────────────────────────────────────────
// Simulation defaults
// ──────────────────────────────────────────────────────────────────────────────

/// Number of independent bootstrap trials.
pub const DEFAULT_TRIALS: usize = 1000;

/// Simulated horizon in days (crypto trades every calendar day).
pub const DEFAULT_HORIZON_DAYS: usize = 365;

/// Starting portfolio value in USD.
pub const DEFAULT_INITIAL_VALUE: f64 = 10_000.0;

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Number of bins for the terminal value histogram.
pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

// ──────────────────────────────────────────────────────────────────────────────
// Universe & history defaults
// ──────────────────────────────────────────────────────────────────────────────

/// How many tokens to pull from the market-cap ranking.
pub const DEFAULT_UNIVERSE_SIZE: usize = 25;

/// How many tokens (from the tail of the ranking) form the portfolio.
pub const DEFAULT_PORTFOLIO_SIZE: usize = 10;

/// Days of price history to fetch.
pub const DEFAULT_HISTORY_DAYS: i64 = 365;

/// Quote currency for all price requests.
pub const VS_CURRENCY: &str = "usd";

pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Settings for the CoinGecko client, read from the environment.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub retry_attempts: usize,
    pub fetch_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_COINGECKO_BASE_URL.to_string(),
            api_key: None,
            retry_attempts: 4,
            fetch_delay: Duration::from_millis(1500),
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl ProviderSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_string("COINGECKO_BASE_URL").unwrap_or(defaults.base_url),
            api_key: env_string("COINGECKO_API_KEY"),
            retry_attempts: retry_attempts().unwrap_or(defaults.retry_attempts),
            fetch_delay: fetch_delay_ms()
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_delay),
            request_timeout: defaults.request_timeout,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn retry_attempts() -> Option<usize> {
    env_string("PORTFOLIO_RISK_RETRY_ATTEMPTS")
        .and_then(|v| v.parse::<usize>().ok())
        .map(|v| v.clamp(1, 8))
}

fn fetch_delay_ms() -> Option<u64> {
    env_string("PORTFOLIO_RISK_FETCH_DELAY_MS")
        .and_then(|v| v.parse::<u64>().ok())
        .map(|v| v.clamp(0, 10_000))
}
