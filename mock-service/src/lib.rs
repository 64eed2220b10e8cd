//! Reference implementation of the load-test target contract.
//!
//! `POST /api/v1/auth/load-test` validates a `{items, iterations, multiplier}` body, runs a
//! small CPU-bound computation over it, and answers `{ok: true, ...}`. `/health` and
//! `/metrics` report liveness and request counters, and `/api/v1/data/all` is always
//! unavailable since no database is attached.
use axum::{
    body::Bytes,
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
#[allow(unused)]
use tracing::{debug, error, info, warn};

pub const LOAD_TEST_PATH: &str = "/api/v1/auth/load-test";
pub const DATA_PATH: &str = "/api/v1/data/all";

/// Largest accepted `iterations`, `multiplier`, and `items` length.
pub const FIELD_LIMIT: i64 = 100_000;

const MODULUS: i64 = 1_000_003;

/// Knobs for shaping the service's behavior under test.
#[derive(Clone, Debug, Default)]
pub struct ServiceConfig {
    /// Added to every load-test response.
    pub delay: Duration,
    /// Standard deviation of a normally distributed extra delay.
    pub jitter: Option<Duration>,
    /// Every Nth load-test request answers 503.
    pub fail_every: Option<u64>,
}

#[derive(Debug, Default)]
pub struct ServiceState {
    config: ServiceConfig,
    requests: AtomicU64,
    errors: AtomicU64,
}

impl ServiceState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    fn error(&self, status: StatusCode, message: impl Into<String>) -> Response {
        self.errors.fetch_add(1, Ordering::Relaxed);
        counter!("mock_service.errors").increment(1);
        (status, message.into()).into_response()
    }

    fn delay(&self) -> Duration {
        let extra = self.config.jitter.and_then(|jitter| {
            let normal = Normal::new(0., jitter.as_secs_f64()).ok()?;
            let sample: f64 = normal.sample(&mut rand::thread_rng());
            Some(Duration::from_secs_f64(sample.abs()))
        });
        self.config.delay + extra.unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoadTestRequest {
    pub items: Vec<i64>,
    pub iterations: i64,
    pub multiplier: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoadTestResponse {
    pub ok: bool,
    pub result: i64,
    pub count: usize,
    pub iterations: i64,
    pub multiplier: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Counters {
    pub requests: u64,
    pub errors: u64,
}

impl LoadTestRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        let limit = 1..=FIELD_LIMIT;
        if !limit.contains(&self.iterations) {
            return Err("iterations must be in range 1..100000");
        }
        if !limit.contains(&self.multiplier) {
            return Err("multiplier must be in range 1..100000");
        }
        if !limit.contains(&(self.items.len() as i64)) {
            return Err("items length must be in range 1..100000");
        }
        Ok(())
    }
}

/// Folds every item through two rounds of squaring modulo a prime, `iterations` times.
pub fn compute(items: &[i64], iterations: i64, multiplier: i64) -> i64 {
    let mut acc = 0i64;
    for i in 0..iterations {
        for &v in items {
            let mut x = v.wrapping_mul(multiplier).wrapping_add(i + 1);
            x = x.wrapping_mul(x).wrapping_add(31) % MODULUS;
            x = x.wrapping_mul(x).wrapping_add(17) % MODULUS;
            acc = (acc + x) % MODULUS;
        }
    }
    acc
}

pub fn router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route(LOAD_TEST_PATH, post(load_test))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route(DATA_PATH, get(data))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until the listener fails.
pub async fn serve(listener: TcpListener, state: Arc<ServiceState>) -> anyhow::Result<()> {
    info!("Mock service listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Binds `addr` (port 0 for an ephemeral port) and serves in the background.
pub async fn spawn(
    addr: SocketAddr,
    config: ServiceConfig,
) -> anyhow::Result<(SocketAddr, Arc<ServiceState>)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    let state = Arc::new(ServiceState::new(config));

    let served = state.clone();
    tokio::spawn(async move {
        if let Err(err) = serve(listener, served).await {
            error!("Mock service stopped: {err:#}");
        }
    });

    Ok((local, state))
}

#[debug_handler]
async fn load_test(State(state): State<Arc<ServiceState>>, body: Bytes) -> Response {
    let n = state.requests.fetch_add(1, Ordering::Relaxed) + 1;
    counter!("mock_service.requests").increment(1);

    let req: LoadTestRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(err) => {
            return state.error(StatusCode::BAD_REQUEST, format!("invalid json body: {err}"))
        }
    };
    if let Err(message) = req.validate() {
        return state.error(StatusCode::BAD_REQUEST, message);
    }

    tokio::time::sleep(state.delay()).await;

    if state.config.fail_every.is_some_and(|every| every > 0 && n % every == 0) {
        debug!(n, "Injected failure");
        return state.error(StatusCode::SERVICE_UNAVAILABLE, "injected failure");
    }

    let result = compute(&req.items, req.iterations, req.multiplier);
    Json(LoadTestResponse {
        ok: true,
        result,
        count: req.items.len(),
        iterations: req.iterations,
        multiplier: req.multiplier,
    })
    .into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "service": "mock-service",
        "timestamp": humantime::format_rfc3339_millis(SystemTime::now()).to_string(),
    }))
}

async fn metrics(State(state): State<Arc<ServiceState>>) -> Json<Counters> {
    Json(Counters {
        requests: state.requests(),
        errors: state.errors(),
    })
}

async fn data() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "database not configured")
}
