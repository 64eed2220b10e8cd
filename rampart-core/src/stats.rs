use crate::{EvaluationError, ThresholdSpec, SUMMARY_PERCENTILES};
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr, DurationMilliSeconds};
use std::collections::BTreeMap;
use std::time::Duration;

/// Point-in-time aggregate of every metric series recorded during a run.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub elapsed: Duration,
    pub peak_vus: usize,
    pub metrics: BTreeMap<String, MetricSummary>,
}

impl RunSummary {
    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricSummary {
    Counter(CounterSummary),
    Rate(RateSummary),
    Trend(TrendSummary),
}

impl MetricSummary {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Counter(_) => "counter",
            Self::Rate(_) => "rate",
            Self::Trend(_) => "trend",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CounterSummary {
    pub count: u64,
    pub per_second: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: BTreeMap<String, u64>,
}

impl CounterSummary {
    pub fn new(count: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        Self {
            count,
            per_second: if secs > 0. { count as f64 / secs } else { 0. },
            breakdown: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RateSummary {
    pub total: u64,
    pub passes: u64,
    pub rate: Option<f64>,
}

impl RateSummary {
    pub fn new(passes: u64, total: u64) -> Self {
        Self {
            total,
            passes,
            rate: (total > 0).then(|| passes as f64 / total as f64),
        }
    }
}

/// Distribution of a scalar series, in milliseconds.
///
/// Keeps the full sorted distribution so that any percentile can be computed exactly.
/// Percentiles use the nearest-rank method: the smallest recorded value such that at
/// least N% of all values are less than or equal to it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendSummary {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub med: Option<f64>,
    pub stddev: Option<f64>,
    pub percentiles: BTreeMap<String, f64>,
    #[serde(skip)]
    sorted: Vec<f64>,
}

impl TrendSummary {
    pub fn from_values(mut values: Vec<f64>) -> Self {
        values.retain(|v| v.is_finite());
        values.sort_by(f64::total_cmp);

        let mut summary = Self {
            count: values.len() as u64,
            min: values.first().copied(),
            max: values.last().copied(),
            avg: (!values.is_empty()).then(|| statistical::mean(&values)),
            med: None,
            stddev: (values.len() > 1).then(|| statistical::standard_deviation(&values, None)),
            percentiles: BTreeMap::new(),
            sorted: values,
        };

        summary.med = summary.percentile(50.);
        for pct in SUMMARY_PERCENTILES {
            if let Some(value) = summary.percentile(pct) {
                summary.percentiles.insert(format!("p({pct})"), value);
            }
        }
        summary
    }

    pub fn percentile(&self, pct: f64) -> Option<f64> {
        if self.sorted.is_empty() {
            return None;
        }
        let n = self.sorted.len();
        // Guard against `99.9 * 1000 / 100` landing a hair above an integer rank.
        let rank = (pct * n as f64 / 100. - 1e-9).ceil().max(1.) as usize;
        self.sorted.get(rank.min(n) - 1).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
    /// At least one threshold could not be assessed. Never treated as a pass.
    Inconclusive,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => f.write_str("PASSED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Inconclusive => f.write_str("INCONCLUSIVE"),
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThresholdResult {
    #[serde_as(as = "DisplayFromStr")]
    pub spec: ThresholdSpec,
    pub observed: Option<f64>,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EvaluationError>,
}

impl ThresholdResult {
    pub fn assessed(spec: ThresholdSpec, observed: f64) -> Self {
        let passed = spec.comparator.holds(observed, spec.bound);
        Self {
            spec,
            observed: Some(observed),
            passed,
            error: None,
        }
    }

    pub fn unresolved(spec: ThresholdSpec, error: EvaluationError) -> Self {
        Self {
            spec,
            observed: None,
            passed: false,
            error: Some(error),
        }
    }

    pub fn verdict(&self) -> Verdict {
        match (&self.error, self.passed) {
            (Some(_), _) => Verdict::Inconclusive,
            (None, true) => Verdict::Passed,
            (None, false) => Verdict::Failed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunVerdict {
    pub results: Vec<ThresholdResult>,
    pub overall_passed: bool,
    pub verdict: Verdict,
}

impl RunVerdict {
    pub fn new(results: Vec<ThresholdResult>) -> Self {
        let verdict = results
            .iter()
            .map(ThresholdResult::verdict)
            .max()
            .unwrap_or(Verdict::Passed);
        Self {
            results,
            overall_passed: verdict == Verdict::Passed,
            verdict,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.results
            .iter()
            .filter(|r| r.verdict() == Verdict::Failed)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &ThresholdResult> {
        self.results
            .iter()
            .filter(|r| r.verdict() == Verdict::Inconclusive)
    }
}
