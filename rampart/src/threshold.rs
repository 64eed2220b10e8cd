//! Threshold evaluation against a final summary.
use rampart_core::{
    EvaluationError, MetricSummary, RunSummary, RunVerdict, Selector, ThresholdResult,
    ThresholdSpec,
};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Evaluates every threshold against one immutable summary.
///
/// Pure: the same summary and thresholds always produce the same verdict. Thresholds that
/// cannot be assessed make the verdict inconclusive, never a pass.
pub fn evaluate(summary: &RunSummary, thresholds: &[ThresholdSpec]) -> RunVerdict {
    let results = thresholds
        .iter()
        .map(|spec| match resolve(summary, spec) {
            Ok(observed) => ThresholdResult::assessed(spec.clone(), observed),
            Err(err) => {
                warn!("Cannot assess threshold {spec}: {err}");
                ThresholdResult::unresolved(spec.clone(), err)
            }
        })
        .collect();

    RunVerdict::new(results)
}

/// The value of `spec.selector` over the named metric.
pub fn resolve(summary: &RunSummary, spec: &ThresholdSpec) -> Result<f64, EvaluationError> {
    let metric = summary
        .metric(&spec.metric)
        .ok_or_else(|| EvaluationError::UnknownMetric(spec.metric.clone()))?;

    let unsupported = || EvaluationError::UnsupportedSelector {
        metric: spec.metric.clone(),
        kind: metric.kind(),
        selector: spec.selector.to_string(),
    };
    let no_samples = || EvaluationError::NoSamples(spec.metric.clone());

    match (metric, spec.selector) {
        (MetricSummary::Counter(counter), Selector::Count) => Ok(counter.count as f64),
        (MetricSummary::Counter(counter), Selector::Rate) => Ok(counter.per_second),

        (MetricSummary::Rate(rate), Selector::Rate) => rate.rate.ok_or_else(no_samples),
        (MetricSummary::Rate(rate), Selector::Count) => Ok(rate.passes as f64),

        (MetricSummary::Trend(trend), Selector::Count) => Ok(trend.count as f64),
        (MetricSummary::Trend(trend), Selector::Avg) => trend.avg.ok_or_else(no_samples),
        (MetricSummary::Trend(trend), Selector::Min) => trend.min.ok_or_else(no_samples),
        (MetricSummary::Trend(trend), Selector::Max) => trend.max.ok_or_else(no_samples),
        (MetricSummary::Trend(trend), Selector::Med) => trend.med.ok_or_else(no_samples),
        (MetricSummary::Trend(trend), Selector::Percentile(pct)) => {
            trend.percentile(pct).ok_or_else(no_samples)
        }

        _ => Err(unsupported()),
    }
}
