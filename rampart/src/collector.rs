//! Shared sink for request outcomes.
use metrics_util::AtomicBucket;
use rampart_core::{
    CounterSummary, MetricSummary, RateSummary, RequestOutcome, RunSummary, TrendSummary,
    METRIC_DURATION, METRIC_ERRORS, METRIC_FAILED, METRIC_REQUESTS, METRIC_SUCCESS, METRIC_TTFB,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Concurrency-safe accumulator of every [`RequestOutcome`] in a run.
///
/// Outcomes are appended to a lock-free bucket, so any number of virtual users can record at
/// once without contending on a lock, and [`snapshot`](Self::snapshot) reads the committed
/// outcomes without blocking writers. Aggregation happens only at snapshot time, over the
/// full distribution.
pub struct MetricsCollector {
    started: Instant,
    outcomes: AtomicBucket<RequestOutcome>,
    recorded: AtomicU64,
    peak_vus: AtomicUsize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            outcomes: AtomicBucket::new(),
            recorded: AtomicU64::new(0),
            peak_vus: AtomicUsize::new(0),
        }
    }

    pub fn record(&self, outcome: RequestOutcome) {
        trace!(
            status = ?outcome.status_code,
            success = outcome.success,
            duration = ?outcome.total_duration,
            "request complete"
        );

        #[cfg(feature = "metrics")]
        emit(&outcome);

        self.outcomes.push(outcome);
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of outcomes recorded so far.
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    pub fn set_live_vus(&self, vus: usize) {
        self.peak_vus.fetch_max(vus, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::gauge!("vus").set(vus as f64);
    }

    pub fn snapshot(&self) -> RunSummary {
        let mut durations = vec![];
        let mut ttfb = vec![];
        let mut passes = 0u64;
        let mut total = 0u64;
        let mut errors: BTreeMap<String, u64> = BTreeMap::new();

        self.outcomes.data_with(|block| {
            for outcome in block {
                total += 1;
                durations.push(as_millis(outcome.total_duration));
                if let Some(first_byte) = outcome.time_to_first_byte {
                    ttfb.push(as_millis(first_byte));
                }
                if outcome.success {
                    passes += 1;
                } else {
                    let kind = outcome.error.as_deref().unwrap_or("unknown");
                    *errors.entry(kind.to_string()).or_default() += 1;
                }
            }
        });

        let elapsed = self.started.elapsed();
        let failures = total - passes;

        let mut error_counter = CounterSummary::new(failures, elapsed);
        error_counter.breakdown = errors;

        let metrics = BTreeMap::from([
            (
                METRIC_REQUESTS.to_string(),
                MetricSummary::Counter(CounterSummary::new(total, elapsed)),
            ),
            (
                METRIC_DURATION.to_string(),
                MetricSummary::Trend(TrendSummary::from_values(durations)),
            ),
            (
                METRIC_TTFB.to_string(),
                MetricSummary::Trend(TrendSummary::from_values(ttfb)),
            ),
            (
                METRIC_SUCCESS.to_string(),
                MetricSummary::Rate(RateSummary::new(passes, total)),
            ),
            (
                METRIC_FAILED.to_string(),
                MetricSummary::Rate(RateSummary::new(failures, total)),
            ),
            (
                METRIC_ERRORS.to_string(),
                MetricSummary::Counter(error_counter),
            ),
        ]);

        RunSummary {
            elapsed,
            peak_vus: self.peak_vus.load(Ordering::Relaxed),
            metrics,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn as_millis(dur: Duration) -> f64 {
    dur.as_secs_f64() * 1_000.
}

#[cfg(feature = "metrics")]
fn emit(outcome: &RequestOutcome) {
    metrics::counter!(METRIC_REQUESTS).increment(1);
    metrics::histogram!(METRIC_DURATION).record(as_millis(outcome.total_duration));
    if let Some(first_byte) = outcome.time_to_first_byte {
        metrics::histogram!(METRIC_TTFB).record(as_millis(first_byte));
    }
    if !outcome.success {
        metrics::counter!(METRIC_ERRORS).increment(1);
    }
}
