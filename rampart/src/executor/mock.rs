use super::{Response, Target, TargetError};
use rampart_core::Payload;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// One scripted reply of a [`MockTarget`].
#[derive(Clone, Debug, PartialEq)]
pub enum MockResponse {
    Status { status: u16, latency: Duration },
    Transport { message: String, latency: Duration },
    /// Headers with `status` arrive after `latency`, then reading the body fails.
    BodyError {
        status: u16,
        message: String,
        latency: Duration,
    },
}

impl MockResponse {
    pub fn status(status: u16, latency: Duration) -> Self {
        Self::Status { status, latency }
    }

    pub fn transport(message: impl Into<String>, latency: Duration) -> Self {
        Self::Transport {
            message: message.into(),
            latency,
        }
    }

    pub fn body_error(status: u16, message: impl Into<String>, latency: Duration) -> Self {
        Self::BodyError {
            status,
            message: message.into(),
            latency,
        }
    }

    fn latency(&self) -> Duration {
        match self {
            Self::Status { latency, .. }
            | Self::Transport { latency, .. }
            | Self::BodyError { latency, .. } => *latency,
        }
    }
}

/// Deterministic target for exercising the harness without a live service.
///
/// Replies cycle through the scripted responses in call order. Clones share call accounting,
/// including the start time of every exchange.
#[derive(Clone, Debug)]
pub struct MockTarget {
    responses: Arc<[MockResponse]>,
    calls: Arc<AtomicU64>,
    started: Arc<Mutex<Vec<Instant>>>,
}

impl MockTarget {
    pub fn cycle(responses: Vec<MockResponse>) -> Self {
        let responses = if responses.is_empty() {
            vec![MockResponse::status(200, Duration::ZERO)]
        } else {
            responses
        };
        Self {
            responses: responses.into(),
            calls: Arc::new(AtomicU64::new(0)),
            started: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Always answers 200 after `latency`.
    pub fn ok(latency: Duration) -> Self {
        Self::status(200, latency)
    }

    pub fn status(status: u16, latency: Duration) -> Self {
        Self::cycle(vec![MockResponse::status(status, latency)])
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// When each exchange started, in call order.
    pub fn call_starts(&self) -> Vec<Instant> {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// When the most recent exchange started.
    pub fn last_call(&self) -> Option<Instant> {
        self.call_starts().into_iter().max()
    }
}

impl Target for MockTarget {
    async fn exchange(&self, _payload: Option<&Payload>) -> Result<Response, TargetError> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Instant::now());

        let response = &self.responses[idx as usize % self.responses.len()];
        tokio::time::sleep(response.latency()).await;

        match response {
            MockResponse::Status { status, latency } => Ok(Response {
                status: *status,
                time_to_first_byte: Some(*latency),
            }),
            MockResponse::Transport { message, .. } => Err(TargetError::Transport(message.clone())),
            MockResponse::BodyError {
                status,
                message,
                latency,
            } => Err(TargetError::Body {
                status: *status,
                time_to_first_byte: *latency,
                reason: message.clone(),
            }),
        }
    }
}
