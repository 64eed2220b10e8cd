use std::time::{Duration, Instant};

/// Timed result of one request. Produced once per attempt and never mutated after recording.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOutcome {
    pub issued_at: Instant,
    pub total_duration: Duration,
    pub time_to_first_byte: Option<Duration>,
    pub status_code: Option<u16>,
    pub success: bool,
    pub error: Option<String>,
}

impl RequestOutcome {
    /// A request that never produced a response (timeout, transport failure).
    pub fn failed(issued_at: Instant, total_duration: Duration, error: impl Into<String>) -> Self {
        Self {
            issued_at,
            total_duration,
            time_to_first_byte: None,
            status_code: None,
            success: false,
            error: Some(error.into()),
        }
    }

    /// A completed response. `success` is decided by the caller's success status set.
    pub fn completed(
        issued_at: Instant,
        total_duration: Duration,
        time_to_first_byte: Option<Duration>,
        status_code: u16,
        success: bool,
    ) -> Self {
        Self {
            issued_at,
            total_duration,
            time_to_first_byte,
            status_code: Some(status_code),
            success,
            error: (!success).then(|| format!("status {status_code}")),
        }
    }

    /// Marks the outcome as failed with `error`, keeping whatever was observed.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}
