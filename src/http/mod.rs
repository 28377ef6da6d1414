//! HTTP API
//!
//! Three endpoints: ad-hoc reports, materialized reports, and notification
//! dispatch. Validation failures answer 400 with the exact error wording
//! clients already depend on; aggregation failures answer 500.

use crate::dispatch::Dispatcher;
use crate::services::ReportService;
use crate::types::{Granularity, MerchantId, MetricType};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Shared handler state; all handles injected, nothing global.
#[derive(Clone)]
pub struct AppState {
    pub reports: ReportService,
    pub dispatcher: Arc<Dispatcher>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/transaction-report/", get(transaction_report))
        .route(
            "/api/transaction-summary-report/",
            get(transaction_summary_report),
        )
        .route("/send-notification/", get(send_notification))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(bind: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// Validate the shared report query parameters.
///
/// An empty `merchantId` is treated as absent, matching how the original
/// API read falsy query values.
fn parse_report_params(
    params: &HashMap<String, String>,
) -> Result<(MetricType, Granularity, Option<MerchantId>), Response> {
    let metric = params
        .get("type")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| bad_request("Invalid type"))?
        .parse::<MetricType>()
        .map_err(|err| bad_request(&err.to_string()))?;

    let granularity = params
        .get("mode")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| bad_request("Invalid mode"))?
        .parse::<Granularity>()
        .map_err(|err| bad_request(&err.to_string()))?;

    let merchant = match params.get("merchantId").filter(|v| !v.is_empty()) {
        Some(raw) => Some(
            raw.parse::<MerchantId>()
                .map_err(|err| bad_request(&err.to_string()))?,
        ),
        None => None,
    };

    Ok((metric, granularity, merchant))
}

async fn transaction_report(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (metric, granularity, merchant) = match parse_report_params(&params) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    match state.reports.live(granularity, metric, merchant.as_ref()) {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!(%err, "live report failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn transaction_summary_report(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (metric, granularity, merchant) = match parse_report_params(&params) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    match state
        .reports
        .materialized(granularity, metric, merchant.as_ref())
    {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!(%err, "summary report failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn send_notification(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let required = |name: &str| params.get(name).filter(|v| !v.is_empty()).cloned();
    let (Some(medium), Some(recipient), Some(message)) = (
        required("medium"),
        required("recipient"),
        required("message"),
    ) else {
        return bad_request("Missing parameters");
    };

    let outcome = state.dispatcher.dispatch(&medium, &recipient, &message).await;
    if outcome.success {
        (StatusCode::OK, Json(json!({ "status": "success" }))).into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "failed", "errors": outcome.errors })),
        )
            .into_response()
    }
}
