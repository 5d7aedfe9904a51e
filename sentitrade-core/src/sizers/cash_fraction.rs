//! Cash-fraction sizer.
//!
//! available = min(cash, buying_power) × safety_margin
//! quantity  = floor(available × risk_fraction / price)
//! cost      = quantity × price

use super::{Sizer, Sizing};

pub const DEFAULT_SAFETY_MARGIN: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFractionSizer {
    safety_margin: f64,
}

impl Default for CashFractionSizer {
    fn default() -> Self {
        Self::new(DEFAULT_SAFETY_MARGIN)
    }
}

impl CashFractionSizer {
    /// `safety_margin` is clamped into [0, 1].
    pub fn new(safety_margin: f64) -> Self {
        let safety_margin = if safety_margin.is_finite() {
            safety_margin.clamp(0.0, 1.0)
        } else {
            DEFAULT_SAFETY_MARGIN
        };
        Self { safety_margin }
    }

    pub fn safety_margin(&self) -> f64 {
        self.safety_margin
    }

    /// Capital this sizer will commit at most.
    pub fn available(&self, cash: f64, buying_power: f64) -> f64 {
        let base = cash.min(buying_power);
        if base.is_finite() && base > 0.0 {
            base * self.safety_margin
        } else {
            0.0
        }
    }
}

impl Sizer for CashFractionSizer {
    fn size(&self, cash: f64, buying_power: f64, price: f64, risk_fraction: f64) -> Sizing {
        if !price.is_finite() || price <= 0.0 {
            return Sizing::ZERO;
        }
        let fraction = if risk_fraction.is_finite() {
            risk_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let budget = self.available(cash, buying_power) * fraction;
        if budget <= 0.0 {
            return Sizing::ZERO;
        }

        let mut quantity = (budget / price).floor() as u64;
        // Float rounding can push the product a hair above budget.
        while quantity > 0 && quantity as f64 * price > budget {
            quantity -= 1;
        }
        Sizing {
            cost: quantity as f64 * price,
            quantity,
        }
    }

    fn name(&self) -> &str {
        "cash_fraction"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousand_dollars_at_fifty() {
        let s = CashFractionSizer::default().size(1000.0, 1000.0, 50.0, 0.5);
        assert_eq!(s.quantity, 9);
        assert!((s.cost - 450.0).abs() < 1e-9);
    }

    #[test]
    fn uses_smaller_of_cash_and_buying_power() {
        let s = CashFractionSizer::default().size(10_000.0, 1000.0, 50.0, 1.0);
        assert_eq!(s.quantity, 19);
    }

    #[test]
    fn non_positive_price_is_zero() {
        let sizer = CashFractionSizer::default();
        assert_eq!(sizer.size(1000.0, 1000.0, 0.0, 0.5), Sizing::ZERO);
        assert_eq!(sizer.size(1000.0, 1000.0, -5.0, 0.5), Sizing::ZERO);
        assert_eq!(sizer.size(1000.0, 1000.0, f64::NAN, 0.5), Sizing::ZERO);
    }

    #[test]
    fn price_above_budget_is_zero() {
        let s = CashFractionSizer::default().size(100.0, 100.0, 500.0, 1.0);
        assert_eq!(s.quantity, 0);
        assert_eq!(s.cost, 0.0);
        assert!(s.is_empty());
    }

    #[test]
    fn risk_fraction_is_clamped() {
        let sizer = CashFractionSizer::default();
        assert_eq!(
            sizer.size(1000.0, 1000.0, 10.0, 3.0),
            sizer.size(1000.0, 1000.0, 10.0, 1.0)
        );
        assert_eq!(sizer.size(1000.0, 1000.0, 10.0, -1.0), Sizing::ZERO);
    }

    #[test]
    fn no_margin_sizer_spends_full_fraction() {
        let s = CashFractionSizer::new(1.0).size(10_000.0, 10_000.0, 100.0, 0.5);
        assert_eq!(s.quantity, 50);
    }
}
