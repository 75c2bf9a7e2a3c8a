use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Fund quote
// ---------------------------------------------------------------------------

/// Latest observed state of one tracked fund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundQuote {
    pub symbol: String,
    pub name: String,
    /// Latest traded price, TL per share.
    pub current_price: f64,
    /// Percent change against the previous close. Display only.
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    /// Net asset value per share in TL. Preferred backing basis when positive.
    pub nav_price: Option<f64>,
    /// Management fee, percent. Display only.
    pub expense_ratio: Option<f64>,
    /// Withholding tax rate, percent. Display only.
    pub stopaj_rate: Option<f64>,
    /// ISO 8601 UTC timestamp of the fetch that produced this quote.
    pub last_updated: Option<String>,
    /// Grams of gold one share represents. Set by the comparison engine;
    /// None when the fund could not be ranked.
    pub gold_backing_grams: Option<f64>,
}

// ---------------------------------------------------------------------------
// Spot gold
// ---------------------------------------------------------------------------

/// Spot gram-gold price together with the two legs it was derived from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpotGold {
    /// TL per gram of physical gold.
    pub try_per_gram: f64,
    /// Gold futures price, USD per troy ounce (GC=F).
    pub gold_usd_per_oz: f64,
    /// USD/TRY exchange rate (USDTRY=X).
    pub usd_try: f64,
}

// ---------------------------------------------------------------------------
// Comparison output
// ---------------------------------------------------------------------------

/// Per-fund numbers relative to the cheapest ranked fund. Values are kept at
/// full precision; rounding happens at render time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceDelta {
    /// TL per gram of gold backing.
    pub per_gram_price: f64,
    /// TL above the cheapest fund's per-gram price. Zero for the cheapest.
    pub absolute_diff: f64,
    /// `absolute_diff` as a percentage of the cheapest per-gram price.
    pub percent_diff: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// None when no fund qualified for ranking.
    pub cheapest: Option<FundQuote>,
    /// Ranked funds first, ascending per-gram price, then unranked funds in
    /// their original order with `gold_backing_grams` cleared.
    pub all_etfs: Vec<FundQuote>,
    /// symbol -> deltas against the cheapest, one entry per ranked fund.
    /// The cheapest fund is present with both diffs at zero.
    pub price_difference: BTreeMap<String, PriceDelta>,
    pub recommendation: String,
    pub spot_gram_gold_price: Option<f64>,
}

// ---------------------------------------------------------------------------
// Pairwise comparison
// ---------------------------------------------------------------------------

/// Head-to-head comparison of two funds' latest quotes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairComparison {
    pub first: FundQuote,
    pub second: FundQuote,
    /// Symbol of the fund with the lower unit price. The first fund wins ties.
    pub cheaper_symbol: String,
    pub unit_price_diff: f64,
    /// None when the cheaper fund's unit price is zero.
    pub unit_price_diff_percent: Option<f64>,
    /// Present only when both funds resolve a gold backing.
    pub per_gram: Option<PairPerGram>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairPerGram {
    pub first_per_gram: f64,
    pub second_per_gram: f64,
    /// Symbol of the fund with the lower per-gram price. First wins ties.
    pub cheaper_symbol: String,
    pub absolute_diff: f64,
    pub percent_diff: f64,
}

// ---------------------------------------------------------------------------
// Channel message types
// ---------------------------------------------------------------------------

/// Control messages for the background quote refresher.
#[derive(Debug)]
pub enum RefreshCmd {
    /// Re-fetch everything now instead of waiting for the next tick.
    Force,
}
