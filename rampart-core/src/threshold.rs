use crate::ThresholdParseError;
use std::fmt;
use std::str::FromStr;

/// Which aggregate of a metric a threshold looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Selector {
    Rate,
    Count,
    Avg,
    Min,
    Max,
    Med,
    Percentile(f64),
}

impl Selector {
    fn parse(input: &str, raw: &str) -> Result<Self, ThresholdParseError> {
        let selector = match raw {
            "rate" => Self::Rate,
            "count" => Self::Count,
            "avg" => Self::Avg,
            "min" => Self::Min,
            "max" => Self::Max,
            "med" => Self::Med,
            _ => {
                let inner = raw
                    .strip_prefix("p(")
                    .and_then(|s| s.strip_suffix(')'))
                    .ok_or_else(|| ThresholdParseError::UnknownSelector {
                        input: input.to_string(),
                        selector: raw.to_string(),
                    })?;
                let pct: f64 = inner.trim().parse().map_err(|_| {
                    ThresholdParseError::UnknownSelector {
                        input: input.to_string(),
                        selector: raw.to_string(),
                    }
                })?;
                if !(pct > 0. && pct <= 100.) {
                    return Err(ThresholdParseError::PercentileOutOfRange(input.to_string()));
                }
                Self::Percentile(pct)
            }
        };
        Ok(selector)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate => f.write_str("rate"),
            Self::Count => f.write_str("count"),
            Self::Avg => f.write_str("avg"),
            Self::Min => f.write_str("min"),
            Self::Max => f.write_str("max"),
            Self::Med => f.write_str("med"),
            Self::Percentile(p) => write!(f, "p({p})"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub fn holds(&self, observed: f64, bound: f64) -> bool {
        match self {
            Self::Lt => observed < bound,
            Self::Le => observed <= bound,
            Self::Gt => observed > bound,
            Self::Ge => observed >= bound,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A pass/fail rule over one aggregated metric, e.g. `http_req_duration:p(95)<500`.
///
/// Parsed once when the configuration is loaded. Trend bounds are in milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdSpec {
    pub metric: String,
    pub selector: Selector,
    pub comparator: Comparator,
    pub bound: f64,
}

impl ThresholdSpec {
    pub fn new(metric: impl Into<String>, selector: Selector, comparator: Comparator, bound: f64) -> Self {
        Self {
            metric: metric.into(),
            selector,
            comparator,
            bound,
        }
    }
}

impl FromStr for ThresholdSpec {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();

        let (metric, expr) = input
            .split_once(':')
            .filter(|(metric, _)| !metric.trim().is_empty())
            .ok_or_else(|| ThresholdParseError::MissingMetric(input.to_string()))?;

        let idx = expr
            .find(['<', '>'])
            .ok_or_else(|| ThresholdParseError::MissingComparator(input.to_string()))?;
        let rest = &expr[idx..];
        let (comparator, len) = match (rest.starts_with('<'), rest[1..].starts_with('=')) {
            (true, true) => (Comparator::Le, 2),
            (true, false) => (Comparator::Lt, 1),
            (false, true) => (Comparator::Ge, 2),
            (false, false) => (Comparator::Gt, 1),
        };

        let selector = Selector::parse(input, expr[..idx].trim())?;

        let bound: f64 = rest[len..]
            .trim()
            .parse()
            .map_err(|_| ThresholdParseError::InvalidBound(input.to_string()))?;
        if !bound.is_finite() {
            return Err(ThresholdParseError::InvalidBound(input.to_string()));
        }

        Ok(Self {
            metric: metric.trim().to_string(),
            selector,
            comparator,
            bound,
        })
    }
}

impl fmt::Display for ThresholdSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}{}{}",
            self.metric,
            self.selector,
            self.comparator.as_str(),
            self.bound
        )
    }
}
