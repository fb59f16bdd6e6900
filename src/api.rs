// 🌐 REST API - read-only JSON endpoints over a loaded data snapshot
//
// Every handler recomputes from the shared snapshot; nothing is cached and
// nothing is mutated, so the state is a plain Arc.

use crate::data_quality::{DataQualityEngine, QualityReport};
use crate::error::ArrError;
use crate::kpi::{compute_kpis, growth_rate};
use crate::loader::DataSnapshot;
use crate::period::Period;
use crate::revenue::compute_recognized_revenue;
use crate::rollforward::{compute_monthly_snapshots, MonthlyArrSnapshot};
use crate::segments::compute_segment_breakdown;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub data: Arc<DataSnapshot>,
}

impl AppState {
    pub fn new(data: DataSnapshot) -> Self {
        Self {
            data: Arc::new(data),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// `ArrError` rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub ArrError);

impl From<ArrError> for ApiError {
    fn from(err: ArrError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            ArrError::MissingReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (status, Json(ApiResponse::<()>::err(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub fingerprint: String,
    pub customers: usize,
    pub subscriptions: usize,
    pub transactions: usize,
    pub warnings: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResponse {
    #[serde(rename = "currentARR", with = "rust_decimal::serde::float")]
    pub current_arr: Decimal,
    pub active_customers: usize,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub arr_per_customer: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub monthly_growth_rate: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub arr_change: Decimal,
    pub customer_change: i64,
}

#[derive(Debug, Serialize)]
pub struct WaterfallEntry {
    pub period: Period,
    #[serde(with = "rust_decimal::serde::float")]
    pub starting: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub new: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expansion: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub contraction: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub churned: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub ending: Decimal,
}

impl From<&MonthlyArrSnapshot> for WaterfallEntry {
    fn from(s: &MonthlyArrSnapshot) -> Self {
        Self {
            period: s.period,
            starting: s.starting,
            new: s.new,
            expansion: s.expansion,
            contraction: s.contraction,
            churned: s.churned,
            ending: s.ending,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendEntry {
    pub period: Period,
    #[serde(rename = "endingARR", with = "rust_decimal::serde::float")]
    pub ending_arr: Decimal,
    pub active_customers: usize,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub growth_rate: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEntry {
    #[serde(with = "rust_decimal::serde::float")]
    pub arr: Decimal,
    pub customer_count: usize,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub share: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct RevenueEntry {
    pub period: Period,
    #[serde(with = "rust_decimal::serde::float")]
    pub recognized: Decimal,
    pub payments: usize,
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Keep only the trailing N months
    pub last: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SegmentsQuery {
    pub period: Option<String>,
}

fn snapshots_for(
    data: &DataSnapshot,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<MonthlyArrSnapshot>, ArrError> {
    match data.resolve_range(from, to)? {
        Some(range) => compute_monthly_snapshots(&data.customers, &data.subscriptions, &range),
        None => Ok(Vec::new()),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let data = &state.data;
    Json(ApiResponse::ok(HealthResponse {
        status: "ok",
        fingerprint: data.fingerprint.clone(),
        customers: data.customers.len(),
        subscriptions: data.subscriptions.len(),
        transactions: data.transactions.len(),
        warnings: data.warnings.len(),
    }))
}

/// GET /api/kpis - Headline KPIs for the last month of the range
async fn get_kpis(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<KpiResponse> {
    let snapshots = snapshots_for(&state.data, q.from.as_deref(), q.to.as_deref())?;
    let kpis = compute_kpis(&snapshots);

    Ok(Json(ApiResponse::ok(KpiResponse {
        current_arr: kpis.current_arr,
        active_customers: kpis.active_customers,
        arr_per_customer: kpis.arr_per_customer,
        monthly_growth_rate: kpis.monthly_growth_rate,
        arr_change: kpis.arr_change,
        customer_change: kpis.customer_change,
    })))
}

/// GET /api/waterfall - Monthly rollforward buckets
async fn get_waterfall(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Vec<WaterfallEntry>> {
    let snapshots = snapshots_for(&state.data, q.from.as_deref(), q.to.as_deref())?;
    Ok(Json(ApiResponse::ok(
        snapshots.iter().map(WaterfallEntry::from).collect(),
    )))
}

/// GET /api/trend - Ending ARR and growth per month
async fn get_trend(
    State(state): State<AppState>,
    Query(q): Query<TrendQuery>,
) -> ApiResult<Vec<TrendEntry>> {
    let snapshots = snapshots_for(&state.data, q.from.as_deref(), q.to.as_deref())?;
    let skip = q
        .last
        .map_or(0, |n| snapshots.len().saturating_sub(n));

    let trend = snapshots
        .iter()
        .skip(skip)
        .map(|s| TrendEntry {
            period: s.period,
            ending_arr: s.ending,
            active_customers: s.active_customers,
            growth_rate: growth_rate(s.starting, s.ending),
        })
        .collect();

    Ok(Json(ApiResponse::ok(trend)))
}

/// GET /api/segments - Ending ARR by segment for one month
async fn get_segments(
    State(state): State<AppState>,
    Query(q): Query<SegmentsQuery>,
) -> ApiResult<BTreeMap<String, SegmentEntry>> {
    let data = &state.data;
    let period = match q.period.as_deref() {
        Some(raw) => Some(raw.parse::<Period>()?),
        None => data.default_range().map(|r| r.end()),
    };
    let Some(period) = period else {
        return Ok(Json(ApiResponse::ok(BTreeMap::new())));
    };

    let breakdown = compute_segment_breakdown(&data.customers, &data.subscriptions, period)?;
    let segments = breakdown
        .segments
        .into_iter()
        .map(|(segment, totals)| {
            (
                segment.label().to_string(),
                SegmentEntry {
                    arr: totals.arr,
                    customer_count: totals.customer_count,
                    share: totals.share,
                },
            )
        })
        .collect();

    Ok(Json(ApiResponse::ok(segments)))
}

/// GET /api/revenue - Recognized revenue per month
async fn get_revenue(
    State(state): State<AppState>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Vec<RevenueEntry>> {
    let data = &state.data;
    let revenue = match data.resolve_range(q.from.as_deref(), q.to.as_deref())? {
        Some(range) => compute_recognized_revenue(&data.customers, &data.transactions, &range)?,
        None => Vec::new(),
    };

    Ok(Json(ApiResponse::ok(
        revenue
            .into_iter()
            .map(|r| RevenueEntry {
                period: r.period,
                recognized: r.recognized,
                payments: r.payments,
            })
            .collect(),
    )))
}

/// GET /api/quality - Dataset and metric checks
async fn get_quality(State(state): State<AppState>) -> Json<ApiResponse<QualityReport>> {
    Json(ApiResponse::ok(DataQualityEngine::new().validate_all(&state.data)))
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState, web_dir: impl AsRef<Path>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/kpis", get(get_kpis))
        .route("/waterfall", get(get_waterfall))
        .route("/trend", get(get_trend))
        .route("/segments", get(get_segments))
        .route("/revenue", get(get_revenue))
        .route("/quality", get(get_quality))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(web_dir.as_ref()))
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Tests
// ============================================================================
