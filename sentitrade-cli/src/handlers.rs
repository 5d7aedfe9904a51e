use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use sentitrade_core::domain::{OptionChain, OptionOrderReceipt, OptionOrderRequest, Quote, TradeDecision};
use sentitrade_runner::{
    BacktestRequest, BacktestResponse, BotController, BotError, BotStatus, ManualTrade,
    ManualTradeResult, PortfolioView, SentimentReport, TradeRecord, DEFAULT_HISTORY_LIMIT,
};

pub type AppState = Arc<BotController>;

/// JSON error body with the status the failure maps to.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl From<BotError> for ApiError {
    fn from(e: BotError) -> Self {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "request failed");
        }
        (
            self.status,
            Json(ErrorBody {
                error: &self.message,
            }),
        )
            .into_response()
    }
}

/// Run a controller call on the blocking pool. Gateways block on HTTP.
async fn blocking<T, F>(bot: AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&BotController) -> Result<T, BotError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&bot))
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("worker failed: {e}"),
        })?
        .map_err(ApiError::from)
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub position_size: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub async fn status(State(bot): State<AppState>) -> Json<BotStatus> {
    Json(bot.status())
}

pub async fn start(
    State(bot): State<AppState>,
    req: Option<Json<StartRequest>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    let message = blocking(bot, move |b| b.start(req.symbol.as_deref(), req.position_size)).await?;
    Ok(Json(MessageResponse { message }))
}

pub async fn stop(State(bot): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    bot.stop()?;
    Ok(Json(MessageResponse {
        message: "Trading bot stopped successfully".into(),
    }))
}

pub async fn sentiment(State(bot): State<AppState>) -> Result<Json<SentimentReport>, ApiError> {
    blocking(bot, |b| b.sentiment()).await.map(Json)
}

pub async fn portfolio(State(bot): State<AppState>) -> Result<Json<PortfolioView>, ApiError> {
    blocking(bot, |b| b.portfolio()).await.map(Json)
}

pub async fn cycle(State(bot): State<AppState>) -> Result<Json<TradeDecision>, ApiError> {
    blocking(bot, |b| b.run_cycle()).await.map(Json)
}

pub async fn backtest(
    State(bot): State<AppState>,
    Json(req): Json<BacktestRequest>,
) -> Result<Json<BacktestResponse>, ApiError> {
    blocking(bot, move |b| b.backtest(&req)).await.map(Json)
}

pub async fn price(
    State(bot): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>, ApiError> {
    blocking(bot, move |b| b.quote(&symbol)).await.map(Json)
}

pub async fn trade(
    State(bot): State<AppState>,
    Json(req): Json<ManualTrade>,
) -> Result<Json<ManualTradeResult>, ApiError> {
    blocking(bot, move |b| b.manual_trade(&req)).await.map(Json)
}

pub async fn options(
    State(bot): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<OptionChain>, ApiError> {
    blocking(bot, move |b| b.option_chain(&symbol)).await.map(Json)
}

pub async fn option_order(
    State(bot): State<AppState>,
    Json(req): Json<OptionOrderRequest>,
) -> Result<Json<OptionOrderReceipt>, ApiError> {
    blocking(bot, move |b| b.option_order(&req)).await.map(Json)
}

pub async fn trades(
    State(bot): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<TradeRecord>>, ApiError> {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    blocking(bot, move |b| b.trade_history(limit)).await.map(Json)
}
