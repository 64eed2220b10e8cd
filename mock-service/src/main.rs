use anyhow::Context;
use mock_service::{serve, ServiceConfig, ServiceState};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:31143";

fn duration_var(name: &str) -> anyhow::Result<Option<Duration>> {
    std::env::var(name)
        .ok()
        .map(|v| humantime::parse_duration(&v).with_context(|| format!("Invalid {name}: {v}")))
        .transpose()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=info,tower_http=info")),
        )
        .init();

    let config = ServiceConfig {
        delay: duration_var("MOCK_DELAY")?.unwrap_or_default(),
        jitter: duration_var("MOCK_JITTER")?,
        fail_every: std::env::var("MOCK_FAIL_EVERY")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("Invalid MOCK_FAIL_EVERY")?,
    };

    let addr = std::env::var("MOCK_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Database not configured; {} will return 503", mock_service::DATA_PATH);
    serve(listener, Arc::new(ServiceState::new(config))).await
}
