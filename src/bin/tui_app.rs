use std::collections::BTreeMap;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct FundRow {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    pub nav_price: Option<f64>,
    pub expense_ratio: Option<f64>,
    pub stopaj_rate: Option<f64>,
    pub last_updated: Option<String>,
    pub gold_backing_grams: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[allow(dead_code)]
pub struct DeltaRow {
    pub per_gram_price: f64,
    pub absolute_diff: f64,
    pub percent_diff: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct CompareResponse {
    pub cheapest: Option<FundRow>,
    #[serde(default)]
    pub all_etfs: Vec<FundRow>,
    #[serde(default)]
    pub price_difference: BTreeMap<String, DeltaRow>,
    #[serde(default)]
    pub recommendation: String,
    pub spot_gram_gold_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct HealthResponse {
    pub status: Option<String>,
    pub cached_quotes: Option<u64>,
    pub tracked_funds: Option<u64>,
    pub active_funds: Option<u64>,
    pub quotes_fresh: Option<bool>,
    pub spot_gram_gold_price: Option<f64>,
    pub last_refresh_at_ns: Option<u64>,
    pub refresh_failures: Option<u64>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub comparison: CompareResponse,
    pub health: HealthResponse,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            comparison: CompareResponse::default(),
            health: HealthResponse::default(),
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let compare_url = format!("{}/api/compare", self.base_url);
        let health_url = format!("{}/health", self.base_url);

        let (compare_res, health_res) = tokio::join!(
            client.get(&compare_url).send(),
            client.get(&health_url).send(),
        );

        let compare_resp = match compare_res {
            Ok(r) => r,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        match compare_resp.json::<CompareResponse>().await {
            Ok(comparison) => {
                self.comparison = comparison;
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        if let Ok(resp) = health_res {
            if let Ok(health) = resp.json::<HealthResponse>().await {
                self.health = health;
            }
        }
    }

    /// Ask the server to re-fetch quotes from upstream. Fire and forget; the
    /// result shows up on a later poll once the fetch run completes.
    pub async fn force_server_refresh(&self, client: &reqwest::Client) {
        let url = format!("{}/api/refresh", self.base_url);
        let _ = client.post(&url).send().await;
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_price(v: f64) -> String {
    format!("{v:.4}")
}

pub fn format_opt_price(v: Option<f64>) -> String {
    v.map_or("—".to_string(), |x| format!("{x:.4}"))
}

pub fn format_backing(v: Option<f64>) -> String {
    v.map_or("—".to_string(), |x| format!("{x:.6}"))
}

pub fn format_percent(v: Option<f64>) -> String {
    v.map_or("—".to_string(), |x| format!("{x:+.2}%"))
}

/// Convert nanosecond epoch timestamp to HH:MM:SS string.
pub fn format_time_ns(ns: u64) -> String {
    let secs = ns / 1_000_000_000;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Char-safe truncation. Fund names carry Turkish characters, so byte
/// slicing would split a code point.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn main() {
    // Entry point lives in src/bin/tui.rs
}
