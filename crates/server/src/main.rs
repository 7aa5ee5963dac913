mod config;
mod convert;
mod error;
mod logging;
mod routes;

use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;
use metro_transit::{FareSchedule, StaticTransitProvider, TransitService};

use config::Config;

fn load_catalog(config: &Config) -> eyre::Result<StaticTransitProvider> {
    #[cfg(feature = "gtfs")]
    if let Some(feed) = &config.gtfs {
        tracing::info!("loading GTFS feed {feed}");
        return StaticTransitProvider::from_gtfs(feed).wrap_err("failed to load GTFS feed");
    }

    tracing::info!("loading catalog {}", config.catalog.display());
    StaticTransitProvider::load(&config.catalog)
        .wrap_err_with(|| format!("failed to load catalog {}", config.catalog.display()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    logging::init(config.verbose);

    let provider = load_catalog(&config)?;
    let service = Arc::new(TransitService::with_config(
        Arc::new(provider),
        config.planner_config(),
        FareSchedule::default(),
    ));
    let app = routes::create_router(service);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on http://{addr}{}", routes::API_PREFIX);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
