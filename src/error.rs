use thiserror::Error;

/// Failures raised by the returns, aggregation, simulation and statistics stages.
///
/// Every variant carries enough context (asset id, counts, offending value) to
/// diagnose the violated precondition without looking at internals.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("insufficient data: {aligned_rows} aligned price rows across {assets} assets, need at least 2")]
    InsufficientData { aligned_rows: usize, assets: usize },

    #[error("no price series supplied for asset '{0}'")]
    MissingAsset(String),

    #[error("weight vector has {weights} entries but the returns table has {assets} assets")]
    DimensionMismatch { weights: usize, assets: usize },

    #[error("invalid portfolio weights: {0}")]
    InvalidWeight(String),

    #[error("cannot resample from an empty portfolio return series")]
    EmptyPool,

    #[error("invalid simulation parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("cannot summarize an empty simulation result")]
    EmptyResult,

    #[error("return series for '{0}' has zero variance, correlation is undefined")]
    InsufficientVariance(String),

    #[error("invalid price series for '{asset}': {reason}")]
    InvalidPriceSeries { asset: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RiskError>;
