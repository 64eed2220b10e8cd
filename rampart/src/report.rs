//! Final run reports and their process exit statuses.
use rampart_core::{MetricSummary, RunConfig, RunSummary, RunVerdict, ThresholdResult, Verdict};
use serde::Serialize;
use std::fmt;

/// Process exit status for a verdict. Configuration errors exit with `1` before any load is
/// generated and never reach a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ExitStatus {
    Passed = 0,
    Failed = 2,
    Inconclusive = 3,
}

impl ExitStatus {
    pub const CONFIG_ERROR: u8 = 1;

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<Verdict> for ExitStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Passed => Self::Passed,
            Verdict::Failed => Self::Failed,
            Verdict::Inconclusive => Self::Inconclusive,
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}

/// Everything known about one completed run.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub config: RunConfig,
    pub summary: RunSummary,
    pub verdict: RunVerdict,
}

impl RunReport {
    pub fn exit_status(&self) -> ExitStatus {
        self.verdict.verdict.into()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "target: {}", self.config.target)?;
        let stages: Vec<_> = self.config.stages.iter().map(|s| s.to_string()).collect();
        writeln!(
            f,
            "stages: {} ({} total, peak {} VUs)",
            stages.join(","),
            humantime::format_duration(self.config.total_duration()),
            self.summary.peak_vus
        )?;
        writeln!(f)?;

        for (name, metric) in &self.summary.metrics {
            writeln!(f, "  {name:.<24}: {}", MetricLine(metric))?;
        }

        if !self.verdict.results.is_empty() {
            writeln!(f)?;
            for result in &self.verdict.results {
                writeln!(f, "  {}", ResultLine(result))?;
            }
        }

        writeln!(f)?;
        write!(f, "verdict: {}", self.verdict.verdict)
    }
}

struct MetricLine<'a>(&'a MetricSummary);

impl fmt::Display for MetricLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            MetricSummary::Counter(counter) => {
                write!(f, "{} {:.2}/s", counter.count, counter.per_second)?;
                for (key, count) in &counter.breakdown {
                    write!(f, " [{key}: {count}]")?;
                }
                Ok(())
            }
            MetricSummary::Rate(rate) => match rate.rate {
                Some(value) => write!(
                    f,
                    "{:.2}% ✓ {} ✗ {}",
                    value * 100.,
                    rate.passes,
                    rate.total - rate.passes
                ),
                None => f.write_str("n/a"),
            },
            MetricSummary::Trend(trend) => {
                let ms = |v: Option<f64>| v.map_or("n/a".to_string(), |v| format!("{v:.2}ms"));
                write!(
                    f,
                    "avg={} min={} med={} max={}",
                    ms(trend.avg),
                    ms(trend.min),
                    ms(trend.med),
                    ms(trend.max)
                )?;
                for (label, value) in &trend.percentiles {
                    write!(f, " {label}={value:.2}ms")?;
                }
                Ok(())
            }
        }
    }
}

struct ResultLine<'a>(&'a ThresholdResult);

impl fmt::Display for ResultLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        match (&result.error, result.observed) {
            (Some(err), _) => write!(f, "? {} (cannot assess: {err})", result.spec),
            (None, Some(observed)) => {
                let mark = if result.passed { '✓' } else { '✗' };
                write!(f, "{mark} {} (observed {observed:.4})", result.spec)
            }
            (None, None) => write!(f, "? {}", result.spec),
        }
    }
}

/// Two runs of the same workload against different targets.
#[derive(Clone, Debug, Serialize)]
pub struct Comparison {
    pub reports: Vec<RunReport>,
}

impl Comparison {
    /// The most severe status among all compared runs.
    pub fn exit_status(&self) -> ExitStatus {
        self.reports
            .iter()
            .map(RunReport::exit_status)
            .max()
            .unwrap_or(ExitStatus::Passed)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.reports {
            writeln!(f, "{report}")?;
            writeln!(f)?;
        }

        write!(f, "{:<28}", "")?;
        for report in &self.reports {
            write!(f, "{:>16}", report.config.target.name)?;
        }
        writeln!(f)?;

        let rows: [(&str, fn(&RunSummary) -> Option<f64>); 4] = [
            ("http_req_duration:avg", |s| trend(s, |t| t.avg)),
            ("http_req_duration:p(95)", |s| trend(s, |t| t.percentile(95.))),
            ("http_req_success:rate", |s| {
                match s.metric(rampart_core::METRIC_SUCCESS) {
                    Some(MetricSummary::Rate(rate)) => rate.rate,
                    _ => None,
                }
            }),
            ("http_reqs:rate", |s| match s.metric(rampart_core::METRIC_REQUESTS) {
                Some(MetricSummary::Counter(counter)) => Some(counter.per_second),
                _ => None,
            }),
        ];

        for (label, value) in rows {
            write!(f, "{label:.<28}")?;
            for report in &self.reports {
                match value(&report.summary) {
                    Some(v) => write!(f, "{v:>16.3}")?,
                    None => write!(f, "{:>16}", "n/a")?,
                }
            }
            writeln!(f)?;
        }

        write!(f, "{:<28}", "verdict")?;
        for report in &self.reports {
            write!(f, "{:>16}", report.verdict.verdict.to_string())?;
        }
        Ok(())
    }
}

fn trend(
    summary: &RunSummary,
    select: impl Fn(&rampart_core::TrendSummary) -> Option<f64>,
) -> Option<f64> {
    match summary.metric(rampart_core::METRIC_DURATION) {
        Some(MetricSummary::Trend(t)) => select(t),
        _ => None,
    }
}
