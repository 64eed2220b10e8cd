use crate::{
    ConfigError, ThresholdSpec, DEFAULT_ITERATION_SLEEP, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SUCCESS_STATUSES, DEFAULT_TICK_INTERVAL, PAYLOAD_LIMIT,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, DurationMilliSeconds};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// One segment of the ramp: reach `target` virtual users over `duration`.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

impl FromStr for Stage {
    type Err = ConfigError;

    /// Parses `DURATION:TARGET`, e.g. `30s:10` or `1m30s:0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let malformed = || ConfigError::MalformedStage(raw.to_string());

        let (duration, target) = raw.split_once(':').ok_or_else(malformed)?;
        let (duration, target) = (duration.trim(), target.trim());

        if duration.starts_with('-') {
            return Err(ConfigError::NegativeDuration(raw.to_string()));
        }
        let duration = humantime::parse_duration(duration).map_err(|_| malformed())?;

        let target: i64 = target.parse().map_err(|_| malformed())?;
        let target =
            usize::try_from(target).map_err(|_| ConfigError::NegativeConcurrency(raw.to_string()))?;

        Ok(Self { duration, target })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            humantime::format_duration(self.duration),
            self.target
        )
    }
}

/// Parses a comma separated stage list such as `30s:10,30s:0`.
pub fn parse_stages(input: &str) -> Result<Vec<Stage>, ConfigError> {
    let stages = input
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(Stage::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    if stages.is_empty() {
        return Err(ConfigError::NoStages);
    }
    Ok(stages)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a generated payload.
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl FromStr for HttpMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(ConfigError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The endpoint a run sends its requests to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub url: Url,
    pub method: HttpMethod,
    pub content_type: String,
}

impl TargetSpec {
    /// Joins `path` onto `base` (an absolute http or https address).
    pub fn new(name: impl Into<String>, base: &str, path: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTarget {
            input: base.to_string(),
            reason,
        };

        let base_url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "scheme `{}` is not http or https",
                base_url.scheme()
            )));
        }
        let url = base_url.join(path).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            url,
            method: HttpMethod::Post,
            content_type: "application/json".to_string(),
        })
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.method, self.url)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: i64,
    pub max: i64,
}

/// Shape of the request body generated for every iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadSpec {
    /// No body, e.g. for read endpoints.
    Empty,
    /// `{items, iterations, multiplier}` with `items` drawn at random.
    Compute {
        items: CountRange,
        values: ValueRange,
        iterations: u32,
        multiplier: u32,
    },
}

impl Default for PayloadSpec {
    fn default() -> Self {
        Self::Compute {
            items: CountRange { min: 10, max: 100 },
            values: ValueRange { min: 1, max: 1_000 },
            iterations: 10,
            multiplier: 3,
        }
    }
}

impl PayloadSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self::Compute {
            items,
            values,
            iterations,
            multiplier,
        } = self
        else {
            return Ok(());
        };

        check_count("items", items.min, items.max)?;
        check_count("iterations", *iterations, *iterations)?;
        check_count("multiplier", *multiplier, *multiplier)?;

        if values.min > values.max {
            return Err(ConfigError::ItemValueRange {
                min: values.min,
                max: values.max,
            });
        }
        Ok(())
    }
}

fn check_count(field: &'static str, min: u32, max: u32) -> Result<(), ConfigError> {
    if min == 0 || min > max || max > PAYLOAD_LIMIT {
        return Err(ConfigError::PayloadRange {
            field,
            min,
            max,
            limit: PAYLOAD_LIMIT,
        });
    }
    Ok(())
}

/// One generated request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub items: Vec<i64>,
    pub iterations: u32,
    pub multiplier: u32,
}

/// Immutable description of a run. Built once, then shared by every component.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub stages: Vec<Stage>,
    pub target: TargetSpec,
    pub payload: PayloadSpec,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub iteration_sleep: Duration,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub thresholds: Vec<ThresholdSpec>,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick_interval: Duration,
    pub success_statuses: BTreeSet<u16>,
    pub seed: u64,
}

impl RunConfig {
    pub fn builder(target: TargetSpec) -> RunConfigBuilder {
        RunConfigBuilder::new(target)
    }

    /// Sum of all stage durations.
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "request timeout",
            });
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "tick interval",
            });
        }
        if self.success_statuses.is_empty() {
            return Err(ConfigError::NoSuccessStatus);
        }
        if let Some(status) = self
            .success_statuses
            .iter()
            .find(|s| !(100..=599).contains(*s))
        {
            return Err(ConfigError::InvalidStatus(status.to_string()));
        }
        if self.target.method.has_body() {
            self.payload.validate()?;
        }
        Ok(())
    }
}

pub struct RunConfigBuilder {
    target: TargetSpec,
    stages: Vec<Stage>,
    payload: PayloadSpec,
    request_timeout: Duration,
    iteration_sleep: Duration,
    thresholds: Vec<String>,
    tick_interval: Duration,
    success_statuses: BTreeSet<u16>,
    seed: u64,
}

impl RunConfigBuilder {
    fn new(target: TargetSpec) -> Self {
        let payload = if target.method.has_body() {
            PayloadSpec::default()
        } else {
            PayloadSpec::Empty
        };
        Self {
            target,
            stages: vec![],
            payload,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            iteration_sleep: DEFAULT_ITERATION_SLEEP,
            thresholds: vec![],
            tick_interval: DEFAULT_TICK_INTERVAL,
            success_statuses: DEFAULT_SUCCESS_STATUSES.into_iter().collect(),
            seed: 0,
        }
    }

    pub fn stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = stages;
        self
    }

    pub fn stage(mut self, duration: Duration, target: usize) -> Self {
        self.stages.push(Stage::new(duration, target));
        self
    }

    pub fn payload(mut self, payload: PayloadSpec) -> Self {
        self.payload = payload;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn iteration_sleep(mut self, sleep: Duration) -> Self {
        self.iteration_sleep = sleep;
        self
    }

    /// Adds a threshold expression such as `http_req_duration:p(95)<500`.
    pub fn threshold(mut self, expr: impl Into<String>) -> Self {
        self.thresholds.push(expr.into());
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn success_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.success_statuses = statuses.into_iter().collect();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let thresholds = self
            .thresholds
            .iter()
            .map(|t| t.parse::<ThresholdSpec>())
            .collect::<Result<Vec<_>, _>>()?;

        let config = RunConfig {
            stages: self.stages,
            target: self.target,
            payload: self.payload,
            request_timeout: self.request_timeout,
            iteration_sleep: self.iteration_sleep,
            thresholds,
            tick_interval: self.tick_interval,
            success_statuses: self.success_statuses,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetSpec {
        TargetSpec::new("local", "http://127.0.0.1:31143", "/api/v1/auth/load-test").unwrap()
    }

    #[test]
    fn parses_stage_list() {
        let stages = parse_stages("30s:10, 1m:20,0s:5").unwrap();
        assert_eq!(
            stages,
            vec![
                Stage::new(Duration::from_secs(30), 10),
                Stage::new(Duration::from_secs(60), 20),
                Stage::new(Duration::ZERO, 5),
            ]
        );
    }

    #[test]
    fn rejects_negative_stages() {
        assert_eq!(
            "-5s:10".parse::<Stage>(),
            Err(ConfigError::NegativeDuration("-5s:10".to_string()))
        );
        assert_eq!(
            "5s:-1".parse::<Stage>(),
            Err(ConfigError::NegativeConcurrency("5s:-1".to_string()))
        );
        assert!(matches!(
            "5s".parse::<Stage>(),
            Err(ConfigError::MalformedStage(_))
        ));
        assert_eq!(parse_stages(" , "), Err(ConfigError::NoStages));
    }

    #[test]
    fn joins_target_path() {
        let target = target();
        assert_eq!(
            target.url.as_str(),
            "http://127.0.0.1:31143/api/v1/auth/load-test"
        );
        assert!(matches!(
            TargetSpec::new("x", "ftp://host", "/"),
            Err(ConfigError::InvalidTarget { .. })
        ));
        assert!(matches!(
            TargetSpec::new("x", "not a url", "/"),
            Err(ConfigError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn builder_defaults() {
        let config = RunConfig::builder(target())
            .stage(Duration::from_secs(30), 10)
            .stage(Duration::from_secs(30), 0)
            .threshold("http_req_duration:p(95)<500")
            .build()
            .unwrap();

        assert_eq!(config.total_duration(), Duration::from_secs(60));
        assert_eq!(config.tick_interval, DEFAULT_TICK_INTERVAL);
        assert_eq!(config.success_statuses, BTreeSet::from([200, 201]));
        assert_eq!(config.thresholds.len(), 1);
        assert!(matches!(config.payload, PayloadSpec::Compute { .. }));
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let no_stages = RunConfig::builder(target()).build();
        assert_eq!(no_stages, Err(ConfigError::NoStages));

        let bad_threshold = RunConfig::builder(target())
            .stage(Duration::from_secs(1), 1)
            .threshold("http_req_duration p(95)<500")
            .build();
        assert!(matches!(bad_threshold, Err(ConfigError::Threshold(_))));

        let bad_tick = RunConfig::builder(target())
            .stage(Duration::from_secs(1), 1)
            .tick_interval(Duration::ZERO)
            .build();
        assert!(matches!(bad_tick, Err(ConfigError::ZeroDuration { .. })));

        let bad_payload = RunConfig::builder(target())
            .stage(Duration::from_secs(1), 1)
            .payload(PayloadSpec::Compute {
                items: CountRange { min: 1, max: 200_000 },
                values: ValueRange { min: 1, max: 10 },
                iterations: 1,
                multiplier: 1,
            })
            .build();
        assert!(matches!(
            bad_payload,
            Err(ConfigError::PayloadRange { field: "items", .. })
        ));
    }

    #[test]
    fn read_targets_skip_payload() {
        let target = TargetSpec::new("db", "http://127.0.0.1:31143", "/api/v1/data/all")
            .unwrap()
            .with_method(HttpMethod::Get);
        let config = RunConfig::builder(target)
            .stage(Duration::from_secs(1), 1)
            .build()
            .unwrap();
        assert_eq!(config.payload, PayloadSpec::Empty);
    }

    #[test]
    fn config_serializes_thresholds_as_expressions() {
        let config = RunConfig::builder(target())
            .stage(Duration::from_secs(1), 1)
            .threshold("http_req_success:rate>0.99")
            .build()
            .unwrap();

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["thresholds"][0], "http_req_success:rate>0.99");
        assert_eq!(json["stages"][0]["duration"], 1000);

        let back: RunConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
