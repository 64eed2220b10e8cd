use mock_service::{ServiceConfig, ServiceState};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tracing::error;
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter("rampart=debug,mock_service=debug,axum::rejection=trace")
            .with_test_writer()
            .try_init();
    });
}

/// Starts a mock service on an ephemeral port and returns its base address.
#[allow(unused)]
pub async fn service(config: ServiceConfig) -> anyhow::Result<(String, Arc<ServiceState>)> {
    init();
    let (addr, state) = mock_service::spawn(SocketAddr::from(([127, 0, 0, 1], 0)), config).await?;
    Ok((format!("http://{addr}"), state))
}
