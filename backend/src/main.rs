mod config;
mod processor;
mod redemptions;
mod utils;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::{
    config::{Args, PayoutConfig},
    processor::StripeProcessor,
    redemptions::{
        db::{init_pool, run_migrations, SqliteRecordStore},
        handler::payout_routes,
        orchestrator::PayoutOrchestrator,
    },
    utils::create_http_client,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Before parsing args so `.env` values can fill env-backed flags
    dotenv().ok();
    let args = Args::parse();

    let config = PayoutConfig::new()?;

    let pool = init_pool(&args.database_url)
        .await
        .with_context(|| format!("failed to open database {}", args.database_url))?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let http_client =
        create_http_client(config.step_timeout()).context("failed to build HTTP client")?;

    let orchestrator = Arc::new(PayoutOrchestrator::new(
        Arc::new(SqliteRecordStore::new(pool)),
        Arc::new(StripeProcessor::new(http_client, &config)),
        config.statement_descriptor(),
        config.step_timeout(),
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = payout_routes(orchestrator).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!(%addr, "Server running at http://");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
