use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{error, info};

use crate::api::health::HealthState;
use crate::config::Config;
use crate::fetcher::fetch_all;
use crate::state::QuoteStore;
use crate::types::RefreshCmd;

/// Background task that re-fetches every quote on a fixed interval, or
/// immediately when a force command arrives from the API.
pub struct QuoteRefresher {
    cfg: Config,
    store: Arc<QuoteStore>,
    health: Arc<HealthState>,
    cmd_rx: mpsc::Receiver<RefreshCmd>,
}

impl QuoteRefresher {
    pub fn new(
        cfg: Config,
        store: Arc<QuoteStore>,
        health: Arc<HealthState>,
        cmd_rx: mpsc::Receiver<RefreshCmd>,
    ) -> Self {
        Self { cfg, store, health, cmd_rx }
    }

    pub async fn run(mut self) {
        let mut ticker = interval(Duration::from_secs(self.cfg.refresh_interval_secs));
        ticker.tick().await; // skip immediate first tick — bootstrap already ran

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh("interval").await;
                }
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(RefreshCmd::Force) => {
                            self.refresh("forced").await;
                            // Forced runs push the next periodic one a full
                            // interval out.
                            ticker.reset();
                        }
                        None => {
                            info!("Refresh command channel closed, stopping refresher");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn refresh(&self, trigger: &str) {
        match fetch_all(&self.cfg, &self.store).await {
            Ok(stats) => {
                self.health.record_refresh(now_ns());
                if stats.failed > 0 || !stats.spot_ok {
                    self.health.inc_refresh_failures();
                }
                info!(
                    fetched = stats.fetched,
                    failed = stats.failed,
                    spot_ok = stats.spot_ok,
                    "Quote refresh ({trigger}) complete: {}/{} funds, spot_ok={}",
                    stats.fetched,
                    stats.attempted,
                    stats.spot_ok,
                );
            }
            Err(e) => {
                self.health.inc_refresh_failures();
                error!("Quote refresh ({trigger}) failed: {e}");
            }
        }
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
