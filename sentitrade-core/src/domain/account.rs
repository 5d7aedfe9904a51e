use serde::{Deserialize, Serialize};

/// Broker account snapshot. Owned by the broker; the decision engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub cash: f64,
    pub buying_power: f64,
    pub portfolio_value: f64,
    #[serde(default)]
    pub day_trade_count: u32,
}

impl AccountState {
    pub fn new(cash: f64, buying_power: f64, portfolio_value: f64) -> Self {
        Self {
            cash: cash.max(0.0),
            buying_power: buying_power.max(0.0),
            portfolio_value,
            day_trade_count: 0,
        }
    }

    /// Capital that can be committed: the smaller of cash and buying power.
    pub fn deployable(&self) -> f64 {
        self.cash.min(self.buying_power).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_inputs_are_floored() {
        let acct = AccountState::new(-5.0, -1.0, 0.0);
        assert_eq!(acct.cash, 0.0);
        assert_eq!(acct.buying_power, 0.0);
    }

    #[test]
    fn deployable_is_min_of_cash_and_buying_power() {
        assert_eq!(AccountState::new(1000.0, 4000.0, 1000.0).deployable(), 1000.0);
        assert_eq!(AccountState::new(1000.0, 400.0, 1000.0).deployable(), 400.0);
    }
}
