use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::api::health::HealthState;
use crate::config::{self, Config};
use crate::engine;
use crate::error::AppError;
use crate::render;
use crate::state::QuoteStore;
use crate::types::{ComparisonResult, FundQuote, PairComparison, RefreshCmd};

#[derive(Clone)]
pub struct ApiState {
    pub cfg: Config,
    pub store: Arc<QuoteStore>,
    pub health: Arc<HealthState>,
    pub refresh_tx: mpsc::Sender<RefreshCmd>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(get_index))
        .route("/api/compare", get(get_compare))
        .route("/api/compare/:first/:second", get(get_compare_pair))
        .route("/api/funds", get(get_funds))
        .route("/api/funds/:symbol", get(get_fund))
        .route("/api/refresh", post(post_refresh))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct RefreshAck {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cached_quotes: usize,
    pub tracked_funds: usize,
    pub active_funds: usize,
    pub quotes_fresh: bool,
    pub spot_gram_gold_price: Option<f64>,
    pub last_refresh_at_ns: u64,
    pub refresh_failures: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_index(State(state): State<ApiState>) -> Result<Html<String>, AppError> {
    let result = run_comparison(&state)?;
    Ok(Html(render::comparison_page(&result)))
}

async fn get_compare(State(state): State<ApiState>) -> Result<Json<ComparisonResult>, AppError> {
    Ok(Json(run_comparison(&state)?))
}

/// Snapshot the store and run the engine. A degraded result (nothing cached
/// yet, spot missing) still comes back 200; only contract violations error.
fn run_comparison(state: &ApiState) -> Result<ComparisonResult, AppError> {
    let funds = state.store.snapshot();
    let spot = state.store.spot().map(|s| s.try_per_gram);
    engine::compare(funds, spot)
}

async fn get_compare_pair(
    State(state): State<ApiState>,
    Path((first, second)): Path<(String, String)>,
) -> Result<Json<PairComparison>, AppError> {
    let spot = state.store.spot().map(|s| s.try_per_gram);
    let first_quote = lookup_quote(&state, &first)?;
    let second_quote = lookup_quote(&state, &second)?;
    Ok(Json(engine::compare_pair(&first_quote, &second_quote, spot)?))
}

async fn get_funds(State(state): State<ApiState>) -> Json<Vec<FundQuote>> {
    let spot = state.store.spot().map(|s| s.try_per_gram);
    let mut funds = state.store.snapshot();
    for quote in &mut funds {
        quote.gold_backing_grams = engine::resolve_backing(quote, spot);
    }
    Json(funds)
}

async fn get_fund(
    State(state): State<ApiState>,
    Path(symbol): Path<String>,
) -> Result<Json<FundQuote>, AppError> {
    let spot = state.store.spot().map(|s| s.try_per_gram);
    let mut quote = lookup_quote(&state, &symbol)?;
    quote.gold_backing_grams = engine::resolve_backing(&quote, spot);
    Ok(Json(quote))
}

/// 404 for symbols outside the catalog and for known symbols with no cached
/// quote yet.
fn lookup_quote(state: &ApiState, symbol: &str) -> Result<FundQuote, AppError> {
    let spec = config::fund_spec(symbol)
        .ok_or_else(|| AppError::UnknownSymbol(symbol.to_string()))?;
    state
        .store
        .get_quote(spec.symbol)
        .ok_or_else(|| AppError::UnknownSymbol(symbol.to_string()))
}

async fn post_refresh(State(state): State<ApiState>) -> Result<Json<RefreshAck>, AppError> {
    match state.refresh_tx.try_send(RefreshCmd::Force) {
        Ok(()) => Ok(Json(RefreshAck { status: "refresh queued" })),
        Err(mpsc::error::TrySendError::Full(_)) => {
            Ok(Json(RefreshAck { status: "refresh already pending" }))
        }
        Err(mpsc::error::TrySendError::Closed(_)) => Err(AppError::ChannelSend(
            "refresh channel closed".to_string(),
        )),
    }
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let ttl = Duration::from_secs(state.cfg.quote_ttl_secs);
    Json(HealthResponse {
        status: "healthy",
        cached_quotes: state.store.quote_count(),
        tracked_funds: config::FUND_CATALOG.len(),
        active_funds: config::active_funds().count(),
        quotes_fresh: state.store.is_fresh(ttl),
        spot_gram_gold_price: state.store.spot().map(|s| s.try_per_gram),
        last_refresh_at_ns: state.health.last_refresh_at_ns(),
        refresh_failures: state.health.refresh_failures(),
    })
}
