use crate::error::{AppError, Result};

pub const YAHOO_API_URL: &str = "https://query1.finance.yahoo.com";

/// Gold futures symbol, quoted in USD per troy ounce.
pub const GOLD_FUTURES_SYMBOL: &str = "GC=F";

/// USD/TRY exchange rate symbol.
pub const USD_TRY_SYMBOL: &str = "USDTRY=X";

/// Troy ounce to gram conversion used for the spot price derivation.
pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1034768;

/// Sanity window for the derived gram-gold spot price (TL/gram). A value
/// outside it means one of the upstream legs returned garbage, so the run's
/// spot sample is discarded rather than cached.
pub const SPOT_SANITY_MIN_TRY: f64 = 1000.0;
pub const SPOT_SANITY_MAX_TRY: f64 = 20000.0;

/// Sanity window for a NAV derived from reference backing and the spot price
/// (TL per share). Derived NAVs outside it are dropped.
pub const NAV_SANITY_MIN_TRY: f64 = 0.1;
pub const NAV_SANITY_MAX_TRY: f64 = 10000.0;

/// Quote refresh interval (seconds) — how often the background task re-fetches
/// every active fund plus the spot price.
pub const REFRESH_INTERVAL_SECS: u64 = 300;

/// Minimum spacing between consecutive upstream requests (milliseconds).
/// Yahoo rate-limits bursts; sequential spaced fetches stay under the limit.
pub const FETCH_SPACING_MS: u64 = 3000;

/// Quotes older than this are reported stale by /health.
pub const QUOTE_TTL_SECS: u64 = 300;

/// Channel capacity for refresh commands.
pub const CHANNEL_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Fund catalog
// ---------------------------------------------------------------------------

/// One tracked BIST gold fund.
#[derive(Debug, Clone, Copy)]
pub struct FundSpec {
    pub symbol: &'static str,
    pub name: &'static str,
    /// Yahoo ticker. BIST listings carry the .IS suffix.
    pub ticker: &'static str,
    /// Grams of gold one share is understood to represent. Basis for a
    /// derived NAV when no published NAV exists.
    pub reference_backing_grams: Option<f64>,
    /// Published NAV per share in TL, when the issuer provides one.
    pub fixed_nav: Option<f64>,
    /// Withholding tax rate, percent. Display only.
    pub stopaj_rate: Option<f64>,
    /// Management fee, percent. Display only.
    pub expense_ratio: Option<f64>,
    /// Inactive funds stay in the catalog for symbol lookups but are never
    /// fetched or ranked.
    pub active: bool,
}

/// The fixed set of tracked funds. GLD and GLDTR2 appear delisted upstream
/// (404 on every ticker format) and are kept inactive.
pub const FUND_CATALOG: &[FundSpec] = &[
    FundSpec {
        symbol: "ZGOLD",
        name: "Ziraat Portföy Altın Katılım BYF",
        ticker: "ZGOLD.IS",
        reference_backing_grams: Some(0.0981),
        fixed_nav: Some(626.702),
        stopaj_rate: Some(0.0),
        expense_ratio: Some(0.0),
        active: true,
    },
    FundSpec {
        symbol: "GLDTR",
        name: "QNB Portföy Altın Katılım BYF",
        ticker: "GLDTR.IS",
        reference_backing_grams: Some(0.085),
        fixed_nav: Some(538.2205),
        stopaj_rate: Some(0.0),
        expense_ratio: Some(0.0),
        active: true,
    },
    FundSpec {
        symbol: "ISGLK",
        name: "İş Portföy Altın Katılım BYF",
        ticker: "ISGLK.IS",
        reference_backing_grams: Some(0.102),
        fixed_nav: Some(626.702),
        stopaj_rate: Some(0.0),
        expense_ratio: Some(0.0),
        active: true,
    },
    FundSpec {
        symbol: "GLD",
        name: "GLD Gold ETF",
        ticker: "GLD.IS",
        reference_backing_grams: None,
        fixed_nav: None,
        stopaj_rate: None,
        expense_ratio: None,
        active: false,
    },
    FundSpec {
        symbol: "GLDTR2",
        name: "GLDTR2 Gold ETF",
        ticker: "GLDTR2.IS",
        reference_backing_grams: None,
        fixed_nav: None,
        stopaj_rate: None,
        expense_ratio: None,
        active: false,
    },
];

/// Catalog entry for a symbol, case-insensitive.
pub fn fund_spec(symbol: &str) -> Option<&'static FundSpec> {
    FUND_CATALOG
        .iter()
        .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
}

/// Catalog entries that get fetched and ranked.
pub fn active_funds() -> impl Iterator<Item = &'static FundSpec> {
    FUND_CATALOG.iter().filter(|s| s.active)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub quote_api_url: String,
    pub log_level: String,
    pub api_port: u16,
    /// Seconds between background refresh runs (REFRESH_INTERVAL_SECS)
    pub refresh_interval_secs: u64,
    /// Milliseconds between consecutive upstream requests (FETCH_SPACING_MS)
    pub fetch_spacing_ms: u64,
    /// Upstream request timeout in seconds (FETCH_TIMEOUT_SECS)
    pub fetch_timeout_secs: u64,
    /// Seconds before cached data is reported stale (QUOTE_TTL_SECS)
    pub quote_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            quote_api_url: std::env::var("QUOTE_API_URL")
                .unwrap_or_else(|_| YAHOO_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            refresh_interval_secs: std::env::var("REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| REFRESH_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(REFRESH_INTERVAL_SECS),
            fetch_spacing_ms: std::env::var("FETCH_SPACING_MS")
                .unwrap_or_else(|_| FETCH_SPACING_MS.to_string())
                .parse::<u64>()
                .unwrap_or(FETCH_SPACING_MS),
            fetch_timeout_secs: std::env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse::<u64>()
                .unwrap_or(15),
            quote_ttl_secs: std::env::var("QUOTE_TTL_SECS")
                .unwrap_or_else(|_| QUOTE_TTL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(QUOTE_TTL_SECS),
        })
    }
}
