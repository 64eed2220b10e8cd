//! Sending one request and timing it.
mod http;
mod mock;

pub use http::HttpTarget;
pub use mock::{MockResponse, MockTarget};

use rampart_core::{Payload, RequestOutcome};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// What a target observed for one completed exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub time_to_first_byte: Option<Duration>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TargetError {
    #[error("encode error: {0}")]
    Encode(String),

    #[error("transport error: {0}")]
    Transport(String),

    /// The response headers arrived but the body could not be read.
    #[error("body read error: {reason}")]
    Body {
        status: u16,
        time_to_first_byte: Duration,
        reason: String,
    },
}

/// Something requests can be sent to: a live endpoint or a scripted mock.
///
/// Implementations only perform the exchange. Timing, timeouts, and deciding whether a
/// status counts as a success are handled by [`RequestExecutor`].
#[trait_variant::make(Target: Send)]
pub trait LocalTarget {
    async fn exchange(&self, payload: Option<&Payload>) -> Result<Response, TargetError>;
}

/// Turns one exchange with a [`Target`] into a [`RequestOutcome`].
pub struct RequestExecutor<T> {
    target: T,
    success_statuses: BTreeSet<u16>,
}

impl<T: Target + Sync> RequestExecutor<T> {
    pub fn new(target: T, success_statuses: BTreeSet<u16>) -> Self {
        Self {
            target,
            success_statuses,
        }
    }

    /// Never fails: timeouts and transport errors become unsuccessful outcomes.
    pub async fn send(&self, payload: Option<&Payload>, timeout: Duration) -> RequestOutcome {
        let issued_at = Instant::now();
        let res = tokio::time::timeout(timeout, self.target.exchange(payload)).await;
        let elapsed = issued_at.elapsed();
        let issued_at = issued_at.into_std();

        match res {
            Err(_) => RequestOutcome::failed(issued_at, elapsed, "timeout"),
            // Headers arrived, so the status is known even though the exchange failed.
            Ok(Err(err)) => match &err {
                TargetError::Body {
                    status,
                    time_to_first_byte,
                    ..
                } => RequestOutcome::completed(
                    issued_at,
                    elapsed,
                    Some(*time_to_first_byte),
                    *status,
                    false,
                )
                .with_error(err.to_string()),
                _ => RequestOutcome::failed(issued_at, elapsed, err.to_string()),
            },
            Ok(Ok(response)) => RequestOutcome::completed(
                issued_at,
                elapsed,
                response.time_to_first_byte,
                response.status,
                self.success_statuses.contains(&response.status),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_core::DEFAULT_SUCCESS_STATUSES;

    fn executor(target: MockTarget) -> RequestExecutor<MockTarget> {
        RequestExecutor::new(target, DEFAULT_SUCCESS_STATUSES.into_iter().collect())
    }

    #[tokio::test(start_paused = true)]
    async fn success_statuses() {
        let executor = executor(MockTarget::cycle(vec![
            MockResponse::status(200, Duration::from_millis(10)),
            MockResponse::status(201, Duration::from_millis(10)),
            MockResponse::status(400, Duration::from_millis(10)),
            MockResponse::status(503, Duration::from_millis(10)),
        ]));

        let mut outcomes = vec![];
        for _ in 0..4 {
            outcomes.push(executor.send(None, Duration::from_secs(1)).await);
        }

        let success: Vec<_> = outcomes.iter().map(|o| o.success).collect();
        assert_eq!(success, vec![true, true, false, false]);
        assert_eq!(outcomes[3].status_code, Some(503));
        assert_eq!(outcomes[3].error.as_deref(), Some("status 503"));
        assert_eq!(outcomes[0].total_duration, Duration::from_millis(10));
        assert_eq!(outcomes[0].time_to_first_byte, Some(Duration::from_millis(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_success_set() {
        let executor = RequestExecutor::new(
            MockTarget::status(204, Duration::ZERO),
            BTreeSet::from([204]),
        );
        assert!(executor.send(None, Duration::from_secs(1)).await.success);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_a_failed_outcome() {
        let executor = executor(MockTarget::ok(Duration::from_secs(5)));
        let outcome = executor.send(None, Duration::from_millis(250)).await;

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("timeout"));
        assert_eq!(outcome.status_code, None);
        assert_eq!(outcome.total_duration, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_is_a_failed_outcome() {
        let executor = executor(MockTarget::cycle(vec![MockResponse::transport(
            "connection refused",
            Duration::from_millis(1),
        )]));
        let outcome = executor.send(None, Duration::from_secs(1)).await;

        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("transport error: connection refused")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn body_error_keeps_the_status() {
        let executor = executor(MockTarget::cycle(vec![MockResponse::body_error(
            200,
            "connection reset",
            Duration::from_millis(20),
        )]));
        let outcome = executor.send(None, Duration::from_secs(1)).await;

        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(200));
        assert_eq!(outcome.time_to_first_byte, Some(Duration::from_millis(20)));
        assert_eq!(
            outcome.error.as_deref(),
            Some("body read error: connection reset")
        );
    }
}
