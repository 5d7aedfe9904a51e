//! Position sizers: turn available capital and a price into a share count.
//!
//! Sizers are pure. They never see the signal, only the money and the price.

pub mod cash_fraction;

pub use cash_fraction::CashFractionSizer;

use serde::{Deserialize, Serialize};

/// Result of sizing: whole shares and what they cost.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sizing {
    pub cost: f64,
    pub quantity: u64,
}

impl Sizing {
    pub const ZERO: Sizing = Sizing {
        cost: 0.0,
        quantity: 0,
    };

    /// Nothing to trade: no capital or no valid price.
    pub fn is_empty(&self) -> bool {
        self.quantity == 0 || self.cost <= 0.0
    }
}

pub trait Sizer: Send + Sync {
    /// Size an order. Never negative; `Sizing::ZERO` for a non-positive price.
    fn size(&self, cash: f64, buying_power: f64, price: f64, risk_fraction: f64) -> Sizing;

    /// Sizer name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneShare;

    impl Sizer for OneShare {
        fn size(&self, _cash: f64, _bp: f64, price: f64, _rf: f64) -> Sizing {
            Sizing {
                cost: price,
                quantity: 1,
            }
        }

        fn name(&self) -> &str {
            "one_share"
        }
    }

    #[test]
    fn sizer_is_object_safe() {
        let sizer: Box<dyn Sizer> = Box::new(OneShare);
        assert_eq!(sizer.size(0.0, 0.0, 10.0, 1.0).quantity, 1);
        assert_eq!(sizer.name(), "one_share");
    }

    #[test]
    fn zero_is_empty() {
        assert!(Sizing::ZERO.is_empty());
    }
}
