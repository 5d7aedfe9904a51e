//! Order requests, broker receipts, and bracket pricing.

use super::ids::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Signed share delta for a fill of `quantity` on this side.
    pub fn signed(self, quantity: u64) -> i64 {
        let q = i64::try_from(quantity).unwrap_or(i64::MAX);
        match self {
            Self::Buy => q,
            Self::Sell => -q,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(format!("unknown order side '{other}' (expected buy or sell)")),
        }
    }
}

/// Take-profit / stop-loss exits attached to an entry.
///
/// Only the pricing math lives here; the broker owns the exit orders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketLevels {
    pub take_profit: f64,
    pub stop_loss: f64,
}

impl BracketLevels {
    pub const DEFAULT_TAKE_PROFIT_PCT: f64 = 0.20;
    pub const DEFAULT_STOP_LOSS_PCT: f64 = 0.05;

    /// Exits for a long entry at `entry_price`: take profit above, stop below.
    pub fn for_long(entry_price: f64, take_profit_pct: f64, stop_loss_pct: f64) -> Self {
        Self {
            take_profit: round_cents(entry_price * (1.0 + take_profit_pct)),
            stop_loss: round_cents(entry_price * (1.0 - stop_loss_pct)),
        }
    }

    /// Default exits: +20% / -5%.
    pub fn default_long(entry_price: f64) -> Self {
        Self::for_long(
            entry_price,
            Self::DEFAULT_TAKE_PROFIT_PCT,
            Self::DEFAULT_STOP_LOSS_PCT,
        )
    }
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// An equity market order to submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub quantity: u64,
    pub side: OrderSide,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bracket: Option<BracketLevels>,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: OrderSide, quantity: u64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            side,
            bracket: None,
        }
    }

    pub fn with_bracket(mut self, bracket: BracketLevels) -> Self {
        self.bracket = Some(bracket);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Accepted,
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Other(String),
}

impl OrderStatus {
    /// Map a broker status string to a status.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "accepted" | "pending_new" => Self::Accepted,
            "new" => Self::New,
            "partially_filled" => Self::PartiallyFilled,
            "filled" => Self::Filled,
            "canceled" | "cancelled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }
}

/// What the broker handed back for a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub status: OrderStatus,
    /// Fill price when the broker filled synchronously (simulation).
    pub filled_price: Option<f64>,
    pub broker: String,
    pub submitted_at: DateTime<Utc>,
}
