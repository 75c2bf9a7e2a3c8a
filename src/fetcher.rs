use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{
    self, Config, FundSpec, GOLD_FUTURES_SYMBOL, GRAMS_PER_TROY_OUNCE, NAV_SANITY_MAX_TRY,
    NAV_SANITY_MIN_TRY, SPOT_SANITY_MAX_TRY, SPOT_SANITY_MIN_TRY, USD_TRY_SYMBOL,
};
use crate::error::{AppError, Result};
use crate::state::QuoteStore;
use crate::types::{FundQuote, SpotGold};

// ---------------------------------------------------------------------------
// Raw chart API shapes
// ---------------------------------------------------------------------------

/// Minimal slice of the Yahoo v8 chart payload. Everything below the meta
/// block is optional; Yahoo answers errors with `"result": null`, so absent
/// pieces degrade to an unusable snapshot instead of a parse failure.
#[derive(Debug, Deserialize)]
struct RawChartResponse {
    chart: RawChart,
}

#[derive(Debug, Deserialize)]
struct RawChart {
    result: Option<Vec<RawChartItem>>,
}

#[derive(Debug, Deserialize)]
struct RawChartItem {
    meta: RawChartMeta,
}

#[derive(Debug, Deserialize)]
struct RawChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "chartPreviousClose", alias = "previousClose")]
    previous_close: Option<f64>,
    #[serde(rename = "regularMarketVolume")]
    regular_market_volume: Option<u64>,
}

/// The fields one chart response contributes.
#[derive(Debug, Clone, Copy, Default)]
struct ChartSnapshot {
    price: Option<f64>,
    previous_close: Option<f64>,
    volume: Option<u64>,
}

// ---------------------------------------------------------------------------
// Fetch entry points
// ---------------------------------------------------------------------------

/// Per-run fetch accounting, logged after every refresh.
#[derive(Debug, Default)]
pub struct FetchStats {
    pub attempted: usize,
    pub fetched: usize,
    pub failed: usize,
    pub spot_ok: bool,
}

/// Fetch the spot price and every active fund quote, updating the store.
/// Individual failures are logged and counted; whatever was cached before
/// stays in place for anything that failed this run.
pub async fn fetch_all(cfg: &Config, store: &Arc<QuoteStore>) -> Result<FetchStats> {
    let client = build_client(cfg)?;
    let mut stats = FetchStats::default();

    // Spot first: NAV derivation for the funds needs it.
    match fetch_spot_gold(&client, &cfg.quote_api_url, cfg.fetch_spacing_ms).await {
        Ok(spot) => {
            info!(
                "[FETCH] spot gram gold {:.2} TL/gram (GC=F {:.2} USD/oz, USDTRY {:.4})",
                spot.try_per_gram, spot.gold_usd_per_oz, spot.usd_try
            );
            store.set_spot(spot);
            stats.spot_ok = true;
        }
        Err(e) => {
            warn!("[FETCH] spot gram gold unavailable: {e}");
        }
    }

    let spot = store.spot().map(|s| s.try_per_gram);

    for spec in config::active_funds() {
        stats.attempted += 1;
        tokio::time::sleep(Duration::from_millis(cfg.fetch_spacing_ms)).await;
        match fetch_fund_quote(&client, &cfg.quote_api_url, spec, spot).await {
            Ok(quote) => {
                debug!(
                    "[FETCH] {} price={:.4} nav={:?} volume={:?}",
                    quote.symbol, quote.current_price, quote.nav_price, quote.volume
                );
                store.insert_quote(quote);
                stats.fetched += 1;
            }
            Err(e) => {
                warn!("[FETCH] {} failed: {e}", spec.symbol);
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

fn build_client(cfg: &Config) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
        .user_agent("bist-gold-compare/0.1")
        .build()?)
}

/// Fetch the latest quote for one fund and attach its NAV.
pub async fn fetch_fund_quote(
    client: &reqwest::Client,
    base_url: &str,
    spec: &FundSpec,
    spot_try_per_gram: Option<f64>,
) -> Result<FundQuote> {
    let snapshot = fetch_chart_meta(client, base_url, spec.ticker).await?;

    let price = match snapshot.price {
        Some(p) if p > 0.0 && p.is_finite() => p,
        other => {
            return Err(AppError::Upstream(format!(
                "{}: no usable market price in chart response (got {other:?})",
                spec.ticker
            )))
        }
    };

    let change_percent = snapshot.previous_close.and_then(|prev| {
        if prev > 0.0 {
            Some((price - prev) / prev * 100.0)
        } else {
            None
        }
    });

    Ok(FundQuote {
        symbol: spec.symbol.to_string(),
        name: spec.name.to_string(),
        current_price: price,
        change_percent,
        volume: snapshot.volume,
        nav_price: resolve_nav(spec, spot_try_per_gram),
        expense_ratio: spec.expense_ratio,
        stopaj_rate: spec.stopaj_rate,
        last_updated: Some(now_iso()),
        gold_backing_grams: None,
    })
}

/// Published NAV when the catalog carries one; otherwise reference backing
/// times the spot price, dropped when the product falls outside the sanity
/// window.
fn resolve_nav(spec: &FundSpec, spot_try_per_gram: Option<f64>) -> Option<f64> {
    if let Some(nav) = spec.fixed_nav {
        return Some(nav);
    }
    let backing = spec.reference_backing_grams?;
    let spot = spot_try_per_gram.filter(|s| *s > 0.0)?;
    let derived = backing * spot;
    if (NAV_SANITY_MIN_TRY..=NAV_SANITY_MAX_TRY).contains(&derived) {
        Some(derived)
    } else {
        warn!("[FETCH] {} derived NAV {derived:.2} TL outside sanity window", spec.symbol);
        None
    }
}

/// Derive the TL price of one gram of gold from the gold futures quote
/// (USD per troy ounce) and the USD/TRY rate. Either leg failing, or a
/// product outside the sanity window, makes the whole sample unusable.
pub async fn fetch_spot_gold(
    client: &reqwest::Client,
    base_url: &str,
    spacing_ms: u64,
) -> Result<SpotGold> {
    let gold = fetch_chart_meta(client, base_url, GOLD_FUTURES_SYMBOL).await?;
    let gold_usd = match gold.price {
        Some(p) if p > 0.0 && p.is_finite() => p,
        other => {
            return Err(AppError::Upstream(format!(
                "invalid gold futures price: {other:?}"
            )))
        }
    };

    tokio::time::sleep(Duration::from_millis(spacing_ms)).await;

    let fx = fetch_chart_meta(client, base_url, USD_TRY_SYMBOL).await?;
    let usd_try = match fx.price {
        Some(p) if p > 0.0 && p.is_finite() => p,
        other => {
            return Err(AppError::Upstream(format!(
                "invalid USD/TRY rate: {other:?}"
            )))
        }
    };

    let try_per_gram = gold_usd * usd_try / GRAMS_PER_TROY_OUNCE;
    if !(SPOT_SANITY_MIN_TRY..=SPOT_SANITY_MAX_TRY).contains(&try_per_gram) {
        return Err(AppError::Upstream(format!(
            "derived spot {try_per_gram:.2} TL/gram outside sanity window"
        )));
    }

    Ok(SpotGold {
        try_per_gram,
        gold_usd_per_oz: gold_usd,
        usd_try,
    })
}

async fn fetch_chart_meta(
    client: &reqwest::Client,
    base_url: &str,
    ticker: &str,
) -> Result<ChartSnapshot> {
    let url = format!("{base_url}/v8/finance/chart/{ticker}?interval=1d&range=5d");
    let resp = client.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(AppError::Upstream(format!(
            "{ticker}: chart request returned {}",
            resp.status()
        )));
    }

    let raw: RawChartResponse = resp.json().await?;
    let item = raw
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Upstream(format!("{ticker}: empty chart result")))?;

    Ok(ChartSnapshot {
        price: item.meta.regular_market_price,
        previous_close: item.meta.previous_close,
        volume: item.meta.regular_market_volume,
    })
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

fn now_iso() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_unix_secs_iso(secs)
}

/// Unix seconds → `YYYY-MM-DDTHH:MM:SSZ`. Days-to-civil-date conversion,
/// enough for display timestamps without pulling in a calendar crate.
pub fn format_unix_secs_iso(secs: u64) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (hour, minute, second) = (rem / 3600, (rem / 60) % 60, rem % 60);

    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if month <= 2 { y + 1 } else { y };

    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
