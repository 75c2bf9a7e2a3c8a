mod api;
mod config;
mod engine;
mod error;
mod fetcher;
mod refresh;
mod render;
mod state;
mod types;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{ApiState, router};
use crate::config::{Config, CHANNEL_CAPACITY};
use crate::error::Result;
use crate::refresh::QuoteRefresher;
use crate::state::QuoteStore;
use crate::types::RefreshCmd;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let store = QuoteStore::new();
    let health = Arc::new(HealthState::new());

    // --- Bootstrap fetch: populate the cache before serving ---
    // A failed bootstrap is not fatal. The API serves a degraded comparison
    // until the background refresher gets a good run in.
    match fetcher::fetch_all(&cfg, &store).await {
        Ok(stats) => {
            health.record_refresh(now_ns());
            info!(
                "Bootstrap complete: {}/{} funds fetched, spot_ok={}",
                stats.fetched, stats.attempted, stats.spot_ok,
            );
            if stats.fetched == 0 {
                warn!("No quotes cached yet; comparison reports no data until the next refresh");
            }
        }
        Err(e) => {
            health.inc_refresh_failures();
            warn!("Bootstrap fetch failed: {e}; starting with an empty cache");
        }
    }

    // --- Channels ---
    let (refresh_tx, refresh_rx) = mpsc::channel::<RefreshCmd>(CHANNEL_CAPACITY);

    // --- Background quote refresher ---
    let refresher = QuoteRefresher::new(
        cfg.clone(),
        Arc::clone(&store),
        Arc::clone(&health),
        refresh_rx,
    );
    tokio::spawn(async move { refresher.run().await });

    // --- HTTP API server ---
    let api_state = ApiState {
        cfg: cfg.clone(),
        store: Arc::clone(&store),
        health: Arc::clone(&health),
        refresh_tx,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
