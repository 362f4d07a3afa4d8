//! Aggregation endpoints. Every response is the `{success, data, error}`
//! envelope the fetchers consume; an aggregation failure is a 500 with
//! `success: false`, never a bare error body.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::livedata::{gold, news, politics, stock};
use crate::state::AppState;

fn envelope<T: Serialize>(result: Result<T, ApiError>) -> axum::response::Response {
    match result {
        Ok(data) => Json(json!({ "success": true, "data": data })).into_response(),
        Err(err) => {
            tracing::error!("aggregation failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

fn upstream_timeout(state: &AppState) -> Duration {
    Duration::from_secs(state.config.live_data.upstream_timeout_secs)
}

pub async fn stock_market(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timeout = upstream_timeout(&state);
    envelope(stock::aggregate(&state.http, timeout).await)
}

pub async fn gold_prices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timeout = upstream_timeout(&state);
    envelope(gold::aggregate(&state.http, timeout, &state.config.gold).await)
}

pub async fn latest_news(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timeout = upstream_timeout(&state);
    envelope(news::aggregate(&state.http, timeout).await)
}

pub async fn politics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timeout = upstream_timeout(&state);
    envelope(politics::aggregate(&state.http, timeout).await)
}
