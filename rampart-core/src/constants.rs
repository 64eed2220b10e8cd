use std::time::Duration;

/// Interval at which the ramp scheduler re-evaluates the desired concurrency.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on a single request, including reading the body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between two iterations of the same virtual user.
pub const DEFAULT_ITERATION_SLEEP: Duration = Duration::from_secs(1);

/// Status codes considered a success unless configured otherwise.
pub const DEFAULT_SUCCESS_STATUSES: [u16; 2] = [200, 201];

/// Path of the compute endpoint exposed by the measured services.
pub const DEFAULT_TARGET_PATH: &str = "/api/v1/auth/load-test";

/// Largest item count, iteration count, or multiplier the measured services accept.
pub const PAYLOAD_LIMIT: u32 = 100_000;

/// Percentiles always present in a trend summary.
pub const SUMMARY_PERCENTILES: [f64; 4] = [50., 90., 95., 99.];

pub const METRIC_REQUESTS: &str = "http_reqs";
pub const METRIC_DURATION: &str = "http_req_duration";
pub const METRIC_TTFB: &str = "http_req_ttfb";
pub const METRIC_SUCCESS: &str = "http_req_success";
pub const METRIC_FAILED: &str = "http_req_failed";
pub const METRIC_ERRORS: &str = "errors";
