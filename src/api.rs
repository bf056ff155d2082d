use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use crate::{
    candles::Candle,
    errors::{EngineError, ValidationError},
    instrument::TradingPair,
    orderbook::OrderBookSnapshot,
    orders::{Order, Side},
    state::AppState,
    trade::Trade,
};

/// Set by the authentication layer in front of this service.
pub const ACCOUNT_HEADER: &str = "x-account-id";

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Engine(EngineError),
}

impl<E: Into<EngineError>> From<E> for ApiError {
    fn from(e: E) -> Self {
        ApiError::Engine(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                format!("missing `{ACCOUNT_HEADER}` header"),
            ),
            ApiError::Engine(EngineError::Validation(e)) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Engine(e @ EngineError::NotFound(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            ApiError::Engine(e @ EngineError::Conflict(_)) => (StatusCode::CONFLICT, e.to_string()),
            ApiError::Engine(EngineError::Persistence(e)) => {
                error!(error = %e, "request failed on storage");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

#[derive(serde::Deserialize)]
pub struct NewOrderRequest {
    pub symbol: String,
    pub side: String,
    pub price: Decimal,
    /// Signed so that negative input is reported as a validation error.
    pub quantity: i64,
}

impl NewOrderRequest {
    fn quantity(&self) -> Result<u64, ValidationError> {
        u64::try_from(self.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or(ValidationError::ZeroQuantity)
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct OrderAck {
    pub order_id: Uuid,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct TradesResponse {
    pub symbol: String,
    pub trades: Vec<Trade>,
}

#[derive(serde::Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct KlineQuery {
    pub symbol: Option<String>,
    pub interval: Option<String>,
    pub limit: Option<usize>,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ValidationError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingParameter(name))
}

#[debug_handler]
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewOrderRequest>,
) -> Result<(StatusCode, Json<OrderAck>), ApiError> {
    let account_id = headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let side: Side = payload.side.parse()?;
    let quantity = payload.quantity()?;
    let order_id = state.engine.place_order(
        account_id,
        &payload.symbol,
        side,
        payload.price,
        quantity,
    )?;
    Ok((StatusCode::ACCEPTED, Json(OrderAck { order_id })))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.engine.get_order(id)?))
}

pub async fn get_order_book(
    State(state): State<AppState>,
    Query(q): Query<SymbolQuery>,
) -> Result<Json<OrderBookSnapshot>, ApiError> {
    let symbol = required(q.symbol, "symbol")?;
    Ok(Json(state.engine.get_order_book(&symbol)?))
}

pub async fn get_recent_trades(
    State(state): State<AppState>,
    Query(q): Query<SymbolQuery>,
) -> Result<Json<TradesResponse>, ApiError> {
    let symbol = required(q.symbol, "symbol")?;
    let trades = state.engine.get_recent_trades(&symbol)?;
    Ok(Json(TradesResponse { symbol, trades }))
}

pub async fn get_klines(
    State(state): State<AppState>,
    Query(q): Query<KlineQuery>,
) -> Result<Json<Vec<Candle>>, ApiError> {
    let symbol = required(q.symbol, "symbol")?;
    let interval = required(q.interval, "interval")?;
    Ok(Json(state.engine.get_candles(&symbol, &interval, q.limit)?))
}

pub async fn get_pairs(State(state): State<AppState>) -> Json<Vec<TradingPair>> {
    Json(state.engine.list_pairs())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/pairs", get(get_pairs))
        .route("/orderbook", get(get_order_book))
        .route("/trades", get(get_recent_trades))
        .route("/kline", get(get_klines))
        .route("/orders", post(create_order))
        .route("/orders/{id}", get(get_order))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
