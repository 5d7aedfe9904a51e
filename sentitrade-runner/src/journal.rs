//! Trade journal: append-only JSONL files for trades, portfolio snapshots
//! and backtest results.
//!
//! One JSON object per line; a torn or malformed line is skipped on read.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use sentitrade_core::domain::{
    AccountState, OrderReceipt, OrderSide, Position, SentimentLabel, TradeDecision,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

const TRADES_FILE: &str = "trades.jsonl";
const PORTFOLIOS_FILE: &str = "portfolios.jsonl";
const BACKTESTS_FILE: &str = "backtests.jsonl";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("journal io: {0}")]
    Io(#[from] io::Error),
    #[error("journal encode: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub price: f64,
    pub total_value: f64,
    /// `bot` for decision cycles, `manual` for user orders.
    pub strategy: String,
    pub sentiment: Option<SentimentLabel>,
    pub probability: Option<f64>,
    pub order_id: Option<String>,
}

impl TradeRecord {
    /// The trade a decision placed, if it placed one.
    pub fn from_decision(decision: &TradeDecision) -> Option<Self> {
        let order = decision.order.as_ref()?;
        let price = order.filled_price.or(decision.price)?;
        Some(Self {
            timestamp: decision.timestamp,
            symbol: decision.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price,
            total_value: price * order.quantity as f64,
            strategy: "bot".into(),
            sentiment: Some(decision.sentiment),
            probability: Some(decision.probability),
            order_id: Some(order.id.to_string()),
        })
    }

    pub fn manual(receipt: &OrderReceipt, price: f64) -> Self {
        let price = receipt.filled_price.unwrap_or(price);
        Self {
            timestamp: receipt.submitted_at,
            symbol: receipt.symbol.clone(),
            side: receipt.side,
            quantity: receipt.quantity,
            price,
            total_value: price * receipt.quantity as f64,
            strategy: "manual".into(),
            sentiment: None,
            probability: None,
            order_id: Some(receipt.id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub buying_power: f64,
    pub portfolio_value: f64,
    pub positions: Vec<Position>,
}

impl PortfolioSnapshot {
    pub fn new(account: &AccountState, positions: Vec<Position>) -> Self {
        Self {
            timestamp: Utc::now(),
            cash: account.cash,
            buying_power: account.buying_power,
            portfolio_value: account.portfolio_value,
            positions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    /// `backtest` or `estimate`.
    pub source: String,
    pub results: serde_json::Value,
}

pub trait TradeStore: Send + Sync {
    fn record_trade(&self, trade: &TradeRecord) -> Result<(), StoreError>;

    fn record_portfolio(&self, snapshot: &PortfolioSnapshot) -> Result<(), StoreError>;

    fn record_backtest(&self, record: &BacktestRecord) -> Result<(), StoreError>;

    /// Most recent trades first, at most `limit`.
    fn trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>, StoreError>;
}

/// Store that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl TradeStore for NullStore {
    fn record_trade(&self, _trade: &TradeRecord) -> Result<(), StoreError> {
        Ok(())
    }

    fn record_portfolio(&self, _snapshot: &PortfolioSnapshot) -> Result<(), StoreError> {
        Ok(())
    }

    fn record_backtest(&self, _record: &BacktestRecord) -> Result<(), StoreError> {
        Ok(())
    }

    fn trade_history(&self, _limit: usize) -> Result<Vec<TradeRecord>, StoreError> {
        Ok(Vec::new())
    }
}

/// JSONL files under one directory.
pub struct JsonlStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file);
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{json}")?;
        f.flush()?;
        debug!(path = %path.display(), "journal append");
        Ok(())
    }

    fn read_all<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(file);
        let f = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for (n, line) in io::BufReader::new(f).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(path = %path.display(), line = n + 1, error = %e, "skipping malformed journal line"),
            }
        }
        Ok(entries)
    }

    pub fn portfolios(&self) -> Result<Vec<PortfolioSnapshot>, StoreError> {
        self.read_all(PORTFOLIOS_FILE)
    }

    pub fn backtests(&self) -> Result<Vec<BacktestRecord>, StoreError> {
        self.read_all(BACKTESTS_FILE)
    }
}

impl TradeStore for JsonlStore {
    fn record_trade(&self, trade: &TradeRecord) -> Result<(), StoreError> {
        self.append(TRADES_FILE, trade)
    }

    fn record_portfolio(&self, snapshot: &PortfolioSnapshot) -> Result<(), StoreError> {
        self.append(PORTFOLIOS_FILE, snapshot)
    }

    fn record_backtest(&self, record: &BacktestRecord) -> Result<(), StoreError> {
        self.append(BACKTESTS_FILE, record)
    }

    fn trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>, StoreError> {
        let mut trades: Vec<TradeRecord> = self.read_all(TRADES_FILE)?;
        trades.reverse();
        trades.truncate(limit);
        Ok(trades)
    }
}
