mod processor;

use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

use crate::processor::{router, MockState};

/// Default starting balance of the mock merchant account, in cents
const DEFAULT_BALANCE_CENTS: i64 = 1_000_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port: u16 = std::env::var("MOCK_PROCESSOR_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(12111);

    let balance_cents: i64 = std::env::var("MOCK_PROCESSOR_BALANCE_CENTS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_BALANCE_CENTS);

    let state = Arc::new(RwLock::new(MockState::with_balance(balance_cents)));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(%addr, balance_cents, "Mock payment processor running at http://");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
