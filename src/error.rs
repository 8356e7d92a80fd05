use thiserror::Error;

use crate::types::Hazard;

/// Rejected engine configuration. Raised once, at construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("hazard weights must sum to 1.0, got {0}")]
    WeightSum(f64),

    #[error("weight for {0:?} must be finite and non-negative, got {1}")]
    InvalidWeight(Hazard, f64),

    #[error("base annual probability for {0:?} must lie in [0, 1], got {1}")]
    InvalidProbability(Hazard, f64),

    #[error("horizon years must satisfy 1 <= short <= medium <= long, got {short}/{medium}/{long}")]
    InvalidHorizons { short: u32, medium: u32, long: u32 },

    #[error("MSK-64 factor for intensity {0} must lie in [0, 1], got {1}")]
    InvalidMskFactor(u32, f64),

    #[error("correlation multiplier must be positive, got {0}")]
    InvalidCorrelation(f64),

    #[error("MSK-64 missing-zone intensity must be finite and positive, got {0}")]
    InvalidMissingIntensity(f64),

    #[error("setting `{0}` must be finite, got {1}")]
    NonFiniteSetting(String, f64),

    #[error("loss factor `{0}` must lie in [0, 1], got {1}")]
    InvalidLossFactor(String, f64),

    #[error("bounding box `{0}` has min greater than max")]
    InvertedBounds(String),

    #[error("scenario table needs exactly one catch-all entry without a zone, found {0}")]
    CatchAllCount(usize),

    #[error("sum-insured distribution needs finite mu and sigma >= 0, got mu={mu} sigma={sigma}")]
    InvalidSumDistribution { mu: f64, sigma: f64 },

    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single geometric test. Always absorbed per feature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("geometry contains non-finite coordinates")]
    NonFinite,

    #[error("ring has {0} distinct vertices, need at least 3")]
    DegenerateRing(usize),

    #[error("buffer radius must be finite and positive, got {0}")]
    InvalidRadius(f64),
}
