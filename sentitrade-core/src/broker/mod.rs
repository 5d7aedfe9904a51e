//! Broker gateway: account snapshot, positions, order submission.
//!
//! A session is built with exactly one [`Broker`]: [`LiveBroker`] against
//! Alpaca's trading API or [`SimulatedBroker`] in memory.

pub mod credentials;
pub mod live;
pub mod options;
pub mod simulated;

pub use credentials::{CredentialProvider, Credentials, EnvCredentials, StaticCredentials};
pub use live::LiveBroker;
pub use simulated::SimulatedBroker;

use crate::domain::{
    AccountState, OptionChain, OptionOrderReceipt, OptionOrderRequest, OrderId, OrderReceipt,
    OrderRequest, Position,
};
use credentials::CredentialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("broker unavailable: {0}")]
    Unavailable(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("{broker} does not support {operation}")]
    Unsupported {
        broker: String,
        operation: &'static str,
    },

    #[error("broker credentials: {0}")]
    Credentials(String),
}

impl From<CredentialError> for BrokerError {
    fn from(e: CredentialError) -> Self {
        BrokerError::Credentials(e.to_string())
    }
}

pub trait Broker: Send + Sync {
    fn name(&self) -> &str;

    fn account(&self) -> Result<AccountState, BrokerError>;

    fn positions(&self) -> Result<Vec<Position>, BrokerError>;

    /// Submit a market order. Fails with `OrderRejected` when refused.
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderReceipt, BrokerError>;

    fn cancel_order(&self, id: &OrderId) -> Result<(), BrokerError>;

    fn submit_option_order(
        &self,
        order: &OptionOrderRequest,
    ) -> Result<OptionOrderReceipt, BrokerError>;

    /// Listed option strikes around `spot`.
    fn option_chain(&self, _symbol: &str, _spot: f64) -> Result<OptionChain, BrokerError> {
        Err(BrokerError::Unsupported {
            broker: self.name().to_string(),
            operation: "option chains",
        })
    }

    /// Long or short position in `symbol`, if any.
    fn position(&self, symbol: &str) -> Result<Option<Position>, BrokerError> {
        Ok(self
            .positions()?
            .into_iter()
            .find(|p| p.symbol == symbol && !p.is_flat()))
    }
}

/// Reject orders no broker would accept.
pub fn validate_order(order: &OrderRequest) -> Result<(), BrokerError> {
    if order.symbol.trim().is_empty() {
        return Err(BrokerError::InvalidOrder("symbol is required".into()));
    }
    if order.quantity == 0 {
        return Err(BrokerError::InvalidOrder("quantity must be positive".into()));
    }
    if let Some(b) = &order.bracket {
        if !(b.take_profit.is_finite() && b.stop_loss.is_finite())
            || b.stop_loss <= 0.0
            || b.take_profit <= b.stop_loss
        {
            return Err(BrokerError::InvalidOrder(format!(
                "bracket take_profit {} must be above stop_loss {}",
                b.take_profit, b.stop_loss
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BracketLevels, OrderSide};

    #[test]
    fn validate_rejects_empty_symbol_and_zero_qty() {
        assert!(validate_order(&OrderRequest::market(" ", OrderSide::Buy, 1)).is_err());
        assert!(validate_order(&OrderRequest::market("SPY", OrderSide::Buy, 0)).is_err());
        assert!(validate_order(&OrderRequest::market("SPY", OrderSide::Sell, 3)).is_ok());
    }

    #[test]
    fn validate_checks_bracket_ordering() {
        let good = OrderRequest::market("SPY", OrderSide::Buy, 1)
            .with_bracket(BracketLevels::default_long(100.0));
        assert!(validate_order(&good).is_ok());
        let bad = OrderRequest::market("SPY", OrderSide::Buy, 1).with_bracket(BracketLevels {
            take_profit: 90.0,
            stop_loss: 95.0,
        });
        assert!(validate_order(&bad).is_err());
    }
}
