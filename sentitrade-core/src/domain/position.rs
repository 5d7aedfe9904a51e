//! Position: signed holding in one symbol.
//!
//! Created by a fill, updated by later fills and price moves, removed when the
//! quantity returns to zero (the owner drops flat positions).

use serde::{Deserialize, Serialize};

use super::order::OrderSide;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed share count: positive = long, negative = short.
    pub quantity: i64,
    pub avg_entry_price: f64,
    pub market_value: f64,
    pub unrealized_pl: f64,
    /// Unrealized P&L in percent of cost basis.
    pub unrealized_pl_pct: f64,
}

impl Position {
    /// Open a position from a first fill.
    pub fn from_fill(symbol: impl Into<String>, side: OrderSide, quantity: u64, price: f64) -> Self {
        let signed = side.signed(quantity);
        let mut pos = Self {
            symbol: symbol.into(),
            quantity: signed,
            avg_entry_price: price,
            market_value: 0.0,
            unrealized_pl: 0.0,
            unrealized_pl_pct: 0.0,
        };
        pos.mark(price);
        pos
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    /// Apply a subsequent fill. Adding to the position re-averages the entry
    /// price; reducing it keeps the entry price; crossing zero re-opens at the fill.
    pub fn apply_fill(&mut self, side: OrderSide, quantity: u64, price: f64) {
        let delta = side.signed(quantity);
        let new_qty = self.quantity + delta;

        let same_direction = self.quantity == 0 || (self.quantity > 0) == (delta > 0);
        if same_direction {
            let old_cost = self.avg_entry_price * self.quantity.abs() as f64;
            let add_cost = price * delta.abs() as f64;
            if new_qty != 0 {
                self.avg_entry_price = (old_cost + add_cost) / new_qty.abs() as f64;
            }
        } else if new_qty != 0 && (new_qty > 0) != (self.quantity > 0) {
            self.avg_entry_price = price;
        }

        self.quantity = new_qty;
        self.mark(price);
    }

    /// Revalue the position at a new market price.
    pub fn mark(&mut self, price: f64) {
        let qty = self.quantity as f64;
        self.market_value = qty * price;
        self.unrealized_pl = qty * (price - self.avg_entry_price);
        let basis = (self.avg_entry_price * qty).abs();
        self.unrealized_pl_pct = if basis > 0.0 {
            self.unrealized_pl / basis * 100.0
        } else {
            0.0
        };
    }

    /// Per-share price implied by market value.
    pub fn current_price(&self) -> f64 {
        if self.quantity == 0 {
            0.0
        } else {
            self.market_value / self.quantity.unsigned_abs() as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_long_from_fill() {
        let pos = Position::from_fill("SPY", OrderSide::Buy, 10, 100.0);
        assert!(pos.is_long());
        assert_eq!(pos.market_value, 1000.0);
        assert_eq!(pos.unrealized_pl, 0.0);
    }

    #[test]
    fn adding_reaverages_entry() {
        let mut pos = Position::from_fill("SPY", OrderSide::Buy, 10, 100.0);
        pos.apply_fill(OrderSide::Buy, 10, 110.0);
        assert_eq!(pos.quantity, 20);
        assert!((pos.avg_entry_price - 105.0).abs() < 1e-10);
    }

    #[test]
    fn reducing_keeps_entry_and_closing_goes_flat() {
        let mut pos = Position::from_fill("SPY", OrderSide::Buy, 10, 100.0);
        pos.apply_fill(OrderSide::Sell, 4, 120.0);
        assert_eq!(pos.quantity, 6);
        assert_eq!(pos.avg_entry_price, 100.0);
        assert!((pos.unrealized_pl - 120.0).abs() < 1e-10);
        pos.apply_fill(OrderSide::Sell, 6, 120.0);
        assert!(pos.is_flat());
    }

    #[test]
    fn mark_updates_percent() {
        let mut pos = Position::from_fill("SPY", OrderSide::Buy, 10, 100.0);
        pos.mark(90.0);
        assert!((pos.unrealized_pl_pct - (-10.0)).abs() < 1e-10);
        assert!((pos.current_price() - 90.0).abs() < 1e-10);
    }
}
