use anyhow::Result;
use clap::Parser;
use portfolio_risk::config::{
    self, DEFAULT_HISTOGRAM_BINS, DEFAULT_HISTORY_DAYS, DEFAULT_HORIZON_DAYS, DEFAULT_INITIAL_VALUE,
    DEFAULT_PORTFOLIO_SIZE, DEFAULT_TRIALS, DEFAULT_UNIVERSE_SIZE,
};
use portfolio_risk::{
    report, select_portfolio, AnalysisConfig, AssetUniverse, CoinGeckoClient, DateWindow,
    RiskAnalyzer, SimulationConfig, WeightVector,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Portfolio risk: bootstrap Monte Carlo projection and correlation analysis for crypto portfolios",
    after_help = "EXAMPLES:
    # Last 10 of the top 25 tokens, equal weights
    cargo run --release

    # Explicit assets and weights, reproducible run
    cargo run --release -- --assets bitcoin,ethereum,solana --weights 0.5,0.3,0.2 --seed 42

    # JSON output for another tool
    cargo run --release -- --json > report.json"
)]
struct Args {
    /// Comma-separated CoinGecko ids (e.g. bitcoin,ethereum). Skips the market-cap ranking.
    #[arg(long)]
    assets: Option<String>,

    /// Comma-separated weights matching --assets (default: equal weights)
    #[arg(long)]
    weights: Option<String>,

    /// How many tokens to fetch from the market-cap ranking
    #[arg(long, default_value_t = DEFAULT_UNIVERSE_SIZE)]
    universe_size: usize,

    /// How many tokens from the tail of the ranking form the portfolio
    #[arg(long, default_value_t = DEFAULT_PORTFOLIO_SIZE)]
    portfolio_size: usize,

    /// Days of price history to resample from
    #[arg(long, default_value_t = DEFAULT_HISTORY_DAYS)]
    history_days: i64,

    /// Number of simulated trials
    #[arg(long, default_value_t = DEFAULT_TRIALS)]
    trials: usize,

    /// Simulated horizon in days
    #[arg(long, default_value_t = DEFAULT_HORIZON_DAYS)]
    horizon: usize,

    /// Starting portfolio value in USD
    #[arg(long, default_value_t = DEFAULT_INITIAL_VALUE)]
    initial_value: f64,

    /// Master seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Floor simulated terminal values at zero
    #[arg(long)]
    clamp_at_zero: bool,

    /// Histogram bins in the text report
    #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
    bins: usize,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_weights(raw: &str) -> Result<WeightVector> {
    let weights = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| anyhow::anyhow!("Invalid weight: {}", s))
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(WeightVector::new(weights)?)
}

async fn resolve_assets(client: &CoinGeckoClient, args: &Args) -> Result<Vec<String>> {
    if let Some(raw) = &args.assets {
        return Ok(parse_list(raw));
    }
    let ranked = client.top_assets(args.universe_size).await?;
    let picked = select_portfolio(&ranked, args.portfolio_size);
    for token in &picked {
        info!("  {} ({}) - {}", token.id, token.symbol.to_uppercase(), token.name);
    }
    Ok(picked.into_iter().map(|t| t.id).collect())
}

async fn run(args: Args) -> Result<()> {
    let client = CoinGeckoClient::from_env();
    let assets = resolve_assets(&client, &args).await?;
    if assets.is_empty() {
        return Err(anyhow::anyhow!("No assets selected"));
    }

    let weights = args.weights.as_deref().map(parse_weights).transpose()?;
    let analysis = AnalysisConfig {
        simulation: SimulationConfig {
            trials: args.trials,
            horizon_days: args.horizon,
            initial_value: args.initial_value,
            seed: args.seed,
            clamp_at_zero: args.clamp_at_zero,
        },
        histogram_bins: args.bins,
    };

    let analyzer = RiskAnalyzer::new(client, analysis);
    let report = analyzer
        .analyze(&assets, weights, DateWindow::trailing_days(args.history_days))
        .await?;

    if args.json {
        println!("{}", report::to_json(&report)?);
    } else {
        report::print_report(&report);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    config::init_cpu_parallelism();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("portfolio_risk=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("Portfolio risk analysis failed: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_normalizes() {
        assert_eq!(
            parse_list(" Bitcoin, ethereum ,,SOLANA"),
            vec!["bitcoin", "ethereum", "solana"]
        );
    }

    #[test]
    fn test_parse_weights() {
        let w = parse_weights("0.5, 0.3,0.2").unwrap();
        assert_eq!(w.as_slice(), &[0.5, 0.3, 0.2]);
        assert!(parse_weights("0.5,abc").is_err());
        assert!(parse_weights("0.5,0.6").is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["portfolio-risk"]);
        assert_eq!(args.trials, DEFAULT_TRIALS);
        assert_eq!(args.horizon, DEFAULT_HORIZON_DAYS);
        assert_eq!(args.universe_size, 25);
        assert_eq!(args.portfolio_size, 10);
        assert!(!args.json);
    }
}
