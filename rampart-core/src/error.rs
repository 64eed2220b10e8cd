use serde::{Serialize, Serializer};
use thiserror::Error;

/// A run configuration that must be rejected before any load is generated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("no stages configured")]
    NoStages,

    #[error("malformed stage `{0}`, expected DURATION:TARGET (e.g. 30s:10)")]
    MalformedStage(String),

    #[error("stage `{0}` has a negative duration")]
    NegativeDuration(String),

    #[error("stage `{0}` has a negative target concurrency")]
    NegativeConcurrency(String),

    #[error("invalid threshold: {0}")]
    Threshold(#[from] ThresholdParseError),

    #[error("invalid target `{input}`: {reason}")]
    InvalidTarget { input: String, reason: String },

    #[error("unsupported HTTP method `{0}`")]
    UnsupportedMethod(String),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field} range {min}..={max} is invalid (allowed 1..={limit})")]
    PayloadRange {
        field: &'static str,
        min: u32,
        max: u32,
        limit: u32,
    },

    #[error("item value range {min}..={max} is empty")]
    ItemValueRange { min: i64, max: i64 },

    #[error("success status set is empty")]
    NoSuccessStatus,

    #[error("invalid status code `{0}`")]
    InvalidStatus(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThresholdParseError {
    #[error("`{0}` is missing the `METRIC:` prefix")]
    MissingMetric(String),

    #[error("`{0}` has no comparator (one of < > <= >=)")]
    MissingComparator(String),

    #[error("unknown aggregate `{selector}` in `{input}`")]
    UnknownSelector { input: String, selector: String },

    #[error("percentile in `{0}` must be within (0, 100]")]
    PercentileOutOfRange(String),

    #[error("bound in `{0}` is not a finite number")]
    InvalidBound(String),
}

/// A threshold that could not be assessed against a summary.
///
/// Distinct from a violated threshold: the run is inconclusive, not failed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("unknown metric `{0}`")]
    UnknownMetric(String),

    #[error("aggregate `{selector}` does not apply to {kind} metric `{metric}`")]
    UnsupportedSelector {
        metric: String,
        kind: &'static str,
        selector: String,
    },

    #[error("metric `{0}` recorded no samples")]
    NoSamples(String),
}

impl Serialize for EvaluationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
