//! Option chain rows and option order records.

use super::ids::OrderId;
use super::order::OrderSide;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Single-letter code used in option symbols.
    pub fn code(self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }

    /// Intrinsic value of one share's worth of this option.
    pub fn intrinsic(self, underlying: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (underlying - strike).max(0.0),
            Self::Put => (strike - underlying).max(0.0),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => f.write_str("call"),
            Self::Put => f.write_str("put"),
        }
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(Self::Call),
            "put" | "p" => Ok(Self::Put),
            other => Err(format!("unknown option type '{other}' (expected call or put)")),
        }
    }
}

/// Bid/ask/last for one side of a strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
}

impl OptionQuote {
    /// Spread the quote symmetrically around `last` (bid -5%, ask +5%).
    pub fn around(last: f64) -> Self {
        Self {
            bid: last * 0.95,
            ask: last * 1.05,
            last,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeRow {
    pub strike: f64,
    pub call: OptionQuote,
    pub put: OptionQuote,
}

/// Strikes for one underlying, sorted ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    pub symbol: String,
    pub current_price: f64,
    pub strikes: Vec<StrikeRow>,
    /// Where the contract list came from (`alpaca_contracts`, `generated`).
    pub data_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionOrderRequest {
    pub symbol: String,
    pub option_type: OptionType,
    pub strike: f64,
    pub expiration: NaiveDate,
    pub side: OrderSide,
    pub quantity: u64,
}

impl OptionOrderRequest {
    /// OCC-style contract symbol, e.g. `SPY240621C00430000`.
    pub fn occ_symbol(&self) -> String {
        let strike_milli = (self.strike * 1000.0).round() as u64;
        format!(
            "{}{}{}{:08}",
            self.symbol,
            self.expiration.format("%y%m%d"),
            self.option_type.code(),
            strike_milli
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.trim().is_empty() {
            return Err("symbol is required".into());
        }
        if self.quantity == 0 {
            return Err("quantity must be positive".into());
        }
        if !self.strike.is_finite() || self.strike <= 0.0 {
            return Err(format!("invalid strike {}", self.strike));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionOrderReceipt {
    pub id: OrderId,
    pub status: String,
    pub symbol: String,
    pub option_symbol: String,
    pub option_type: OptionType,
    pub strike: f64,
    pub expiration: NaiveDate,
    pub side: OrderSide,
    pub quantity: u64,
    /// Per-contract premium, when known.
    pub price: Option<f64>,
    /// Premium × quantity × 100, when known.
    pub total_cost: Option<f64>,
    pub broker: String,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occ_symbol_format() {
        let req = OptionOrderRequest {
            symbol: "SPY".into(),
            option_type: OptionType::Call,
            strike: 430.0,
            expiration: NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(),
            side: OrderSide::Buy,
            quantity: 1,
        };
        assert_eq!(req.occ_symbol(), "SPY240621C00430000");
    }

    #[test]
    fn intrinsic_values() {
        assert_eq!(OptionType::Call.intrinsic(110.0, 100.0), 10.0);
        assert_eq!(OptionType::Call.intrinsic(90.0, 100.0), 0.0);
        assert_eq!(OptionType::Put.intrinsic(90.0, 100.0), 10.0);
    }

    #[test]
    fn validate_rejects_zero_quantity() {
        let req = OptionOrderRequest {
            symbol: "SPY".into(),
            option_type: OptionType::Put,
            strike: 400.0,
            expiration: NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(),
            side: OrderSide::Buy,
            quantity: 0,
        };
        assert!(req.validate().is_err());
    }
}
