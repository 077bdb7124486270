use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::etherscan::{EtherscanClient, UpstreamFetchError};
use crate::fetch_stats::{FetchSnapshot, FetchStats};
use crate::models::{GasFeesResponse, GasQuote};
use crate::window::SampleWindow;

#[derive(Clone)]
pub struct AppState {
    pub upstream: EtherscanClient,
    pub window: Arc<Mutex<SampleWindow>>,
    pub stats: Arc<FetchStats>,
}

impl AppState {
    pub fn new(upstream: EtherscanClient) -> Self {
        Self {
            upstream,
            window: Arc::new(Mutex::new(SampleWindow::new())),
            stats: Arc::new(FetchStats::new()),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub struct ApiError(UpstreamFetchError);

impl From<UpstreamFetchError> for ApiError {
    fn from(err: UpstreamFetchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("failed fetching gas fees: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Error fetching gas fees").into_response()
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn get_gas_fees(State(state): State<AppState>) -> Result<Json<GasFeesResponse>, ApiError> {
    Ok(Json(fetch_gas_fees(&state).await?))
}

async fn fetch_stats(State(state): State<AppState>) -> Json<FetchSnapshot> {
    let window_len = state.window.lock().await.len();
    Json(state.stats.snapshot(window_len))
}

/// Fetches one quote upstream and folds it into the shared window.
/// The window is left untouched when the upstream call fails.
pub async fn fetch_gas_fees(state: &AppState) -> Result<GasFeesResponse, UpstreamFetchError> {
    state.stats.inc_fetches();
    let quote = match state.upstream.fetch_quote().await {
        Ok(quote) => quote,
        Err(err) => {
            state.stats.inc_upstream_failures();
            return Err(err);
        }
    };
    tracing::info!(
        low = quote.low,
        average = quote.average,
        high = quote.high,
        "fetched gas quote"
    );

    // stamped under the lock so concurrent fetches append in time order
    let mut window = state.window.lock().await;
    let (response, evicted) = record_quote(&mut window, quote, Utc::now());
    state.stats.inc_samples_evicted(evicted as u64);
    Ok(response)
}

/// Appends `quote` stamped at `now`, evicts, and builds the response from
/// the post-eviction window. Callers hold the window lock across the call.
pub fn record_quote(
    window: &mut SampleWindow,
    quote: GasQuote,
    now: DateTime<Utc>,
) -> (GasFeesResponse, usize) {
    let evicted = window.record(quote.at(now), now);
    let response = GasFeesResponse {
        low: quote.low,
        average: quote.average,
        high: quote.high,
        historical_data: window.snapshot(),
    };
    (response, evicted)
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/get-gas-fees", get(get_gas_fees))
        .route("/stats/fetch", get(fetch_stats))
        .with_state(state)
}

pub async fn run_http_server(addr: &str, state: AppState) -> Result<()> {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn quote(low: f64) -> GasQuote {
        GasQuote {
            low,
            average: low + 1.0,
            high: low + 2.0,
        }
    }

    #[test]
    fn record_quote_returns_post_eviction_window() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut window = SampleWindow::new();

        let (first, _) = record_quote(&mut window, quote(10.0), start);
        assert_eq!(first.historical_data.len(), 1);

        // server side has no debounce
        let (second, _) = record_quote(&mut window, quote(10.0), start + Duration::hours(1));
        assert_eq!(second.historical_data.len(), 2);

        let later = start + Duration::hours(3) + Duration::minutes(30);
        let (third, evicted) = record_quote(&mut window, quote(12.0), later);
        assert_eq!(evicted, 1);
        assert_eq!(third.low, 12.0);
        assert_eq!(third.high, 14.0);
        let stamps: Vec<_> = third.historical_data.iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![start + Duration::hours(1), later]);
    }

    #[test]
    fn response_uses_camel_case_history_key() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut window = SampleWindow::new();
        let (response, _) = record_quote(&mut window, quote(5.0), now);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["low"].as_f64(), Some(5.0));
        assert_eq!(value["historicalData"][0]["average"].as_f64(), Some(6.0));
        assert!(value["historicalData"][0]["timestamp"].is_string());
    }
}
