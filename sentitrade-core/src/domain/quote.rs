//! Quote: a transient last-price observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    Alpaca,
    YahooFinance,
    Static,
}

/// Current price for a symbol. No persistent identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub source: QuoteSource,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, price: f64, source: QuoteSource) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp: Utc::now(),
            source,
        }
    }

    /// A quote is usable only with a finite, strictly positive price.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}
