//! Sentiment results and the per-cycle trade decision record.

use super::order::{OrderReceipt, OrderSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl SentimentLabel {
    /// Name used on the external JSON surface (positive/negative/neutral).
    pub fn as_external(self) -> &'static str {
        match self {
            Self::Bullish => "positive",
            Self::Bearish => "negative",
            Self::Neutral => "neutral",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence in [0, 1] plus a discrete label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub probability: f64,
    pub label: SentimentLabel,
}

impl SentimentResult {
    pub fn new(probability: f64, label: SentimentLabel) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            label,
        }
    }

    pub fn neutral(probability: f64) -> Self {
        Self::new(probability, SentimentLabel::Neutral)
    }
}

/// Which estimator produced the sentiment used by a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentSource {
    News,
    Technical,
    /// Neither estimator had usable input.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
    Error,
}

impl TradeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Hold => "hold",
            Self::Error => "error",
        }
    }
}

impl From<OrderSide> for TradeAction {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self::Buy,
            OrderSide::Sell => Self::Sell,
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record of one decision cycle. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDecision {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    /// Quote used for sizing; `None` when the quote could not be fetched.
    pub price: Option<f64>,
    pub sentiment: SentimentLabel,
    pub probability: f64,
    pub sentiment_source: SentimentSource,
    pub quantity: u64,
    pub cost: f64,
    pub action: TradeAction,
    pub reason: String,
    /// Last order side the session had submitted before this cycle.
    pub previous_action: Option<OrderSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderReceipt>,
}

impl TradeDecision {
    /// True when the cycle submitted an order.
    pub fn placed_order(&self) -> bool {
        self.order.is_some()
    }

    /// Same decision content, ignoring when it was made and when any order
    /// was submitted.
    pub fn same_content(&self, other: &Self) -> bool {
        let order_eq = match (&self.order, &other.order) {
            (None, None) => true,
            (Some(a), Some(b)) => OrderReceipt {
                submitted_at: b.submitted_at,
                ..a.clone()
            } == *b,
            _ => false,
        };
        order_eq
            && self.symbol == other.symbol
            && self.price == other.price
            && self.sentiment == other.sentiment
            && self.probability == other.probability
            && self.sentiment_source == other.sentiment_source
            && self.quantity == other.quantity
            && self.cost == other.cost
            && self.action == other.action
            && self.reason == other.reason
            && self.previous_action == other.previous_action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_label_mapping() {
        assert_eq!(SentimentLabel::Bullish.as_external(), "positive");
        assert_eq!(SentimentLabel::Bearish.as_external(), "negative");
        assert_eq!(SentimentLabel::Neutral.as_external(), "neutral");
    }

    #[test]
    fn result_probability_clamped() {
        assert_eq!(SentimentResult::neutral(1.7).probability, 1.0);
        assert_eq!(SentimentResult::neutral(-0.2).probability, 0.0);
    }

    #[test]
    fn action_serializes_lowercase() {
        let json = serde_json::to_string(&TradeAction::Hold).unwrap();
        assert_eq!(json, "\"hold\"");
    }
}
