//! Bot controller: the one trading session an outer surface drives.
//!
//! The controller owns the session, the journal and the running flag. Every
//! method blocks on gateway calls; async callers should move them onto a
//! blocking pool.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use sentitrade_core::broker::options::generated_chain;
use sentitrade_core::broker::BrokerError;
use sentitrade_core::data::{demo_price, DataError};
use sentitrade_core::domain::{
    normalize_symbol, AccountState, OptionChain, OptionOrderReceipt, OptionOrderRequest,
    OrderReceipt, OrderRequest, OrderSide, Position, Quote, SentimentLabel, SentimentSource,
    TradeDecision,
};
use sentitrade_core::engine::{CycleState, DecisionEngine, TradingSession};

use crate::backtest::{run_with, BacktestOutcome, BacktestSimulator};
use crate::config::SentitradeConfig;
use crate::estimate::{EstimateGenerator, EstimatedReport, ESTIMATE_NOTE, ESTIMATE_SOURCE};
use crate::gateways::Gateways;
use crate::journal::{BacktestRecord, PortfolioSnapshot, StoreError, TradeRecord, TradeStore};

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Bot is already running")]
    AlreadyRunning,
    #[error("Bot is not running")]
    NotRunning,
    #[error("{0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BotError {
    /// Caller mistakes, as opposed to gateway failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BotError::AlreadyRunning
                | BotError::NotRunning
                | BotError::InvalidRequest(_)
                | BotError::Broker(BrokerError::InvalidOrder(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotStatus {
    pub status: RunState,
    pub symbol: String,
    pub position_size: f64,
    pub cycle_state: CycleState,
    /// positive / negative / neutral
    pub last_sentiment: Option<&'static str>,
    pub last_probability: Option<f64>,
    pub last_trade: Option<TradeDecision>,
    pub cash: f64,
    pub positions: Vec<Position>,
    pub trades_today: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentReport {
    pub symbol: String,
    pub sentiment: &'static str,
    pub label: SentimentLabel,
    pub probability: f64,
    pub source: SentimentSource,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    pub cash: f64,
    pub buying_power: f64,
    pub portfolio_value: f64,
    pub day_trade_count: u32,
    pub positions: Vec<Position>,
}

/// Manual order as it arrives from outside: nothing validated yet.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualTrade {
    pub symbol: String,
    pub side: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualTradeResult {
    pub message: String,
    pub order: OrderReceipt,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BacktestRequest {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub initial_capital: Option<f64>,
    #[serde(default)]
    pub position_size: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResponse {
    pub symbol: String,
    /// `backtest` when the simulator ran, `estimate` when it fell back.
    pub source: &'static str,
    pub outcome: BacktestOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<EstimatedReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug)]
struct Running {
    symbol: String,
    risk_fraction: f64,
}

#[derive(Debug, Default)]
struct Dashboard {
    running: Option<Running>,
    last_sentiment: Option<(SentimentLabel, f64)>,
    cash: f64,
    positions: Vec<Position>,
    trades_today: u32,
    trade_day: Option<NaiveDate>,
}

pub struct BotController {
    config: SentitradeConfig,
    session: TradingSession,
    store: Arc<dyn TradeStore>,
    simulator: BacktestSimulator,
    estimator: EstimateGenerator,
    dashboard: Mutex<Dashboard>,
}

impl BotController {
    pub fn new(config: SentitradeConfig, gateways: Gateways, store: Arc<dyn TradeStore>) -> Self {
        let engine = DecisionEngine::new(
            config.decision_policy(),
            config.news_config(),
            config.technical_config(),
        );
        let session = TradingSession::new(engine, gateways.market, gateways.broker);
        Self {
            simulator: BacktestSimulator::new(config.backtest_params()),
            config,
            session,
            store,
            estimator: EstimateGenerator::new(),
            dashboard: Mutex::new(Dashboard::default()),
        }
    }

    pub fn config(&self) -> &SentitradeConfig {
        &self.config
    }

    pub fn session(&self) -> &TradingSession {
        &self.session
    }

    fn dashboard(&self) -> MutexGuard<'_, Dashboard> {
        self.dashboard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn running(&self) -> Result<(String, f64), BotError> {
        self.dashboard()
            .running
            .as_ref()
            .map(|r| (r.symbol.clone(), r.risk_fraction))
            .ok_or(BotError::NotRunning)
    }

    pub fn is_running(&self) -> bool {
        self.dashboard().running.is_some()
    }

    /// Start trading `symbol` (config default when `None`).
    pub fn start(&self, symbol: Option<&str>, position_size: Option<f64>) -> Result<String, BotError> {
        let symbol = normalize_symbol(symbol.unwrap_or(&self.config.bot.symbol));
        if symbol.is_empty() {
            return Err(BotError::InvalidRequest("symbol is required".into()));
        }
        let risk_fraction = position_size.unwrap_or(self.config.bot.risk_fraction);
        if !(0.0..=1.0).contains(&risk_fraction) {
            return Err(BotError::InvalidRequest(format!(
                "position_size {risk_fraction} is outside [0, 1]"
            )));
        }

        {
            let mut d = self.dashboard();
            if d.running.is_some() {
                return Err(BotError::AlreadyRunning);
            }
            d.running = Some(Running {
                symbol: symbol.clone(),
                risk_fraction,
            });
        }

        let mut message = format!("Trading bot started for {symbol}");
        match self.session.broker().account() {
            Ok(a) => {
                self.dashboard().cash = a.cash;
                message.push_str(&format!(" with ${:.2} available", a.cash));
            }
            Err(e) => {
                warn!(error = %e, "account check failed at start");
                message.push_str(" (account unavailable)");
            }
        }
        info!(%symbol, risk_fraction, broker = self.session.broker().name(), "bot started");
        Ok(message)
    }

    pub fn stop(&self) -> Result<(), BotError> {
        let mut d = self.dashboard();
        match d.running.take() {
            Some(r) => {
                info!(symbol = %r.symbol, "bot stopped");
                Ok(())
            }
            None => Err(BotError::NotRunning),
        }
    }

    pub fn status(&self) -> BotStatus {
        let snap = self.session.snapshot();
        let d = self.dashboard();
        let (status, symbol, position_size) = match &d.running {
            Some(r) => (RunState::Running, r.symbol.clone(), r.risk_fraction),
            None => (
                RunState::Stopped,
                self.config.bot.symbol.clone(),
                self.config.bot.risk_fraction,
            ),
        };
        BotStatus {
            status,
            symbol,
            position_size,
            cycle_state: snap.state,
            last_sentiment: d.last_sentiment.map(|(l, _)| l.as_external()),
            last_probability: d.last_sentiment.map(|(_, p)| p),
            last_trade: snap.last_decision,
            cash: d.cash,
            positions: d.positions.clone(),
            trades_today: d.trades_today,
        }
    }

    /// Sentiment for the running symbol.
    pub fn sentiment(&self) -> Result<SentimentReport, BotError> {
        let (symbol, _) = self.running()?;
        let (result, source) = self.session.sentiment(&symbol);
        self.dashboard().last_sentiment = Some((result.label, result.probability));
        Ok(SentimentReport {
            symbol,
            sentiment: result.label.as_external(),
            label: result.label,
            probability: result.probability,
            source,
            timestamp: Utc::now(),
        })
    }

    /// Account and positions from the broker. The snapshot is journaled;
    /// a journal failure is logged only.
    pub fn portfolio(&self) -> Result<PortfolioView, BotError> {
        let broker = self.session.broker();
        let account: AccountState = broker.account()?;
        let positions = broker.positions()?;

        let snapshot = PortfolioSnapshot::new(&account, positions.clone());
        if let Err(e) = self.store.record_portfolio(&snapshot) {
            warn!(error = %e, "portfolio snapshot not saved");
        }
        {
            let mut d = self.dashboard();
            d.cash = account.cash;
            d.positions = positions.clone();
        }
        Ok(PortfolioView {
            cash: account.cash,
            buying_power: account.buying_power,
            portfolio_value: account.portfolio_value,
            day_trade_count: account.day_trade_count,
            positions,
        })
    }

    /// One decision cycle on the running symbol.
    pub fn run_cycle(&self) -> Result<TradeDecision, BotError> {
        let (symbol, risk_fraction) = self.running()?;
        let decision = self.session.run_cycle(&symbol, risk_fraction);

        {
            let mut d = self.dashboard();
            d.last_sentiment = Some((decision.sentiment, decision.probability));
            if decision.placed_order() {
                let today = decision.timestamp.date_naive();
                if d.trade_day != Some(today) {
                    d.trade_day = Some(today);
                    d.trades_today = 0;
                }
                d.trades_today += 1;
            }
        }
        if let Some(trade) = TradeRecord::from_decision(&decision) {
            if let Err(e) = self.store.record_trade(&trade) {
                warn!(error = %e, "trade not journaled");
            }
        }
        Ok(decision)
    }

    pub fn quote(&self, symbol: &str) -> Result<Quote, BotError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(BotError::InvalidRequest("symbol is required".into()));
        }
        Ok(self.session.market().quote(&symbol)?)
    }

    /// Validate and submit a manual stock order.
    pub fn manual_trade(&self, trade: &ManualTrade) -> Result<ManualTradeResult, BotError> {
        let symbol = normalize_symbol(&trade.symbol);
        let side: Option<OrderSide> = trade.side.trim().to_ascii_lowercase().parse().ok();
        let (side, quantity) = match (side, u64::try_from(trade.quantity)) {
            (Some(side), Ok(q)) if q > 0 && !symbol.is_empty() => (side, q),
            _ => return Err(BotError::InvalidRequest("Invalid trade parameters".into())),
        };

        let price = self
            .session
            .market()
            .quote(&symbol)
            .ok()
            .filter(|q| q.is_valid())
            .map(|q| q.price);
        let receipt = self
            .session
            .submit_manual(&OrderRequest::market(symbol.clone(), side, quantity))?;

        let record = TradeRecord::manual(&receipt, price.unwrap_or(0.0));
        if let Err(e) = self.store.record_trade(&record) {
            warn!(error = %e, "manual trade not journaled");
        }
        Ok(ManualTradeResult {
            message: format!("Placed {side} order for {quantity} shares of {symbol}"),
            order: receipt,
            price,
        })
    }

    /// Option chain around the current price; demo price when no quote,
    /// generated strikes when the broker has no listing.
    pub fn option_chain(&self, symbol: &str) -> Result<OptionChain, BotError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(BotError::InvalidRequest("symbol is required".into()));
        }
        let spot = match self.session.market().quote(&symbol) {
            Ok(q) if q.is_valid() => q.price,
            Ok(_) | Err(_) => demo_price(&symbol),
        };
        match self.session.broker().option_chain(&symbol, spot) {
            Ok(chain) if !chain.strikes.is_empty() => Ok(chain),
            Ok(_) => Ok(generated_chain(&symbol, spot)),
            Err(e) => {
                warn!(%symbol, error = %e, "listed chain unavailable, generating strikes");
                Ok(generated_chain(&symbol, spot))
            }
        }
    }

    pub fn option_order(&self, order: &OptionOrderRequest) -> Result<OptionOrderReceipt, BotError> {
        order.validate().map_err(BotError::InvalidRequest)?;
        let receipt = self.session.broker().submit_option_order(order)?;
        info!(
            id = %receipt.id,
            option = %receipt.option_symbol,
            quantity = receipt.quantity,
            "option order placed"
        );
        Ok(receipt)
    }

    /// Deterministic backtest; on failure an estimate is attached and the
    /// response is tagged `estimate`.
    pub fn backtest(&self, req: &BacktestRequest) -> Result<BacktestResponse, BotError> {
        let symbol = normalize_symbol(&req.symbol);
        if symbol.is_empty() {
            return Err(BotError::InvalidRequest("symbol is required".into()));
        }
        let capital = req
            .initial_capital
            .unwrap_or(self.config.backtest.initial_capital);
        let position_size = req.position_size.unwrap_or(self.config.bot.risk_fraction);

        let outcome = run_with(
            &self.simulator,
            self.session.market().as_ref(),
            &symbol,
            req.start_date,
            req.end_date,
            capital,
        );
        let response = match &outcome {
            BacktestOutcome::Completed(_) => BacktestResponse {
                symbol: symbol.clone(),
                source: "backtest",
                outcome,
                estimate: None,
                note: None,
            },
            BacktestOutcome::Failed { .. } => {
                let estimate = self.estimator.generate(
                    &symbol,
                    req.start_date.year(),
                    req.end_date.year(),
                    position_size,
                );
                BacktestResponse {
                    symbol: symbol.clone(),
                    source: ESTIMATE_SOURCE,
                    outcome,
                    estimate: Some(estimate),
                    note: Some(ESTIMATE_NOTE.to_string()),
                }
            }
        };

        match serde_json::to_value(&response) {
            Ok(results) => {
                let record = BacktestRecord {
                    timestamp: Utc::now(),
                    symbol,
                    source: response.source.to_string(),
                    results,
                };
                if let Err(e) = self.store.record_backtest(&record) {
                    warn!(error = %e, "backtest not journaled");
                }
            }
            Err(e) => warn!(error = %e, "backtest result not serializable"),
        }
        Ok(response)
    }

    pub fn trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>, BotError> {
        Ok(self.store.trade_history(limit)?)
    }
}
