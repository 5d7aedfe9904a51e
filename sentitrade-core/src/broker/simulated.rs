//! In-memory broker that fills market orders at the current quote.
//!
//! No margin and no short selling: buys need cash, sells need shares.

use super::options::{contract_cost, generated_chain, simulated_premium};
use super::{validate_order, Broker, BrokerError};
use crate::data::MarketData;
use crate::domain::{
    AccountState, OptionChain, OptionOrderReceipt, OptionOrderRequest, OrderId, OrderReceipt,
    OrderRequest, OrderSide, OrderStatus, Position,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Debug)]
struct Ledger {
    cash: f64,
    positions: BTreeMap<String, Position>,
    orders: Vec<OrderReceipt>,
    next_seq: u64,
}

pub struct SimulatedBroker {
    market: Arc<dyn MarketData>,
    ledger: Mutex<Ledger>,
}

impl SimulatedBroker {
    pub fn new(market: Arc<dyn MarketData>, starting_cash: f64) -> Self {
        Self {
            market,
            ledger: Mutex::new(Ledger {
                cash: starting_cash.max(0.0),
                positions: BTreeMap::new(),
                orders: Vec::new(),
                next_seq: 1,
            }),
        }
    }

    /// Seed an existing long position without touching cash.
    pub fn with_position(self, symbol: &str, quantity: u64, avg_price: f64) -> Self {
        {
            let mut ledger = self.lock();
            ledger.positions.insert(
                symbol.to_string(),
                Position::from_fill(symbol, OrderSide::Buy, quantity, avg_price),
            );
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Orders filled so far, oldest first.
    pub fn filled_orders(&self) -> Vec<OrderReceipt> {
        self.lock().orders.clone()
    }

    fn fill_price(&self, symbol: &str) -> Result<f64, BrokerError> {
        let quote = self
            .market
            .quote(symbol)
            .map_err(|e| BrokerError::Unavailable(format!("no fill price for {symbol}: {e}")))?;
        if !quote.is_valid() {
            return Err(BrokerError::Unavailable(format!(
                "invalid fill price {} for {symbol}",
                quote.price
            )));
        }
        Ok(quote.price)
    }
}

impl Broker for SimulatedBroker {
    fn name(&self) -> &str {
        "simulation"
    }

    fn account(&self) -> Result<AccountState, BrokerError> {
        let ledger = self.lock();
        let holdings: f64 = ledger.positions.values().map(|p| p.market_value).sum();
        Ok(AccountState::new(ledger.cash, ledger.cash, ledger.cash + holdings))
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        let symbols: Vec<String> = self.lock().positions.keys().cloned().collect();
        // Quote outside the lock; a stale mark is kept when the feed is down.
        let marks: Vec<(String, Option<f64>)> = symbols
            .into_iter()
            .map(|s| {
                let price = self.market.quote(&s).ok().filter(|q| q.is_valid()).map(|q| q.price);
                (s, price)
            })
            .collect();

        let mut ledger = self.lock();
        for (symbol, price) in marks {
            if let (Some(pos), Some(price)) = (ledger.positions.get_mut(&symbol), price) {
                pos.mark(price);
            }
        }
        Ok(ledger.positions.values().cloned().collect())
    }

    fn submit_order(&self, order: &OrderRequest) -> Result<OrderReceipt, BrokerError> {
        validate_order(order)?;
        let price = self.fill_price(&order.symbol)?;
        let notional = price * order.quantity as f64;

        let mut ledger = self.lock();
        match order.side {
            OrderSide::Buy => {
                if notional > ledger.cash {
                    warn!(symbol = %order.symbol, notional, cash = ledger.cash, "simulated buy rejected");
                    return Err(BrokerError::OrderRejected(format!(
                        "insufficient cash: need {notional:.2}, have {:.2}",
                        ledger.cash
                    )));
                }
                ledger.cash -= notional;
            }
            OrderSide::Sell => {
                let held = ledger
                    .positions
                    .get(&order.symbol)
                    .map(|p| p.quantity)
                    .unwrap_or(0);
                if held < i64::try_from(order.quantity).unwrap_or(i64::MAX) {
                    return Err(BrokerError::OrderRejected(format!(
                        "cannot sell {} {}: holding {held}",
                        order.quantity, order.symbol
                    )));
                }
                ledger.cash += notional;
            }
        }

        match ledger.positions.get_mut(&order.symbol) {
            Some(pos) => pos.apply_fill(order.side, order.quantity, price),
            None => {
                ledger.positions.insert(
                    order.symbol.clone(),
                    Position::from_fill(&order.symbol, order.side, order.quantity, price),
                );
            }
        }
        ledger.positions.retain(|_, p| !p.is_flat());

        let seq = ledger.next_seq;
        ledger.next_seq += 1;
        let receipt = OrderReceipt {
            id: OrderId::new(format!("SIM_{seq:06}_{}", order.symbol)),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            status: OrderStatus::Filled,
            filled_price: Some(price),
            broker: self.name().to_string(),
            submitted_at: Utc::now(),
        };
        ledger.orders.push(receipt.clone());
        info!(
            id = %receipt.id,
            side = %order.side,
            quantity = order.quantity,
            symbol = %order.symbol,
            price,
            "simulated order filled"
        );
        Ok(receipt)
    }

    fn cancel_order(&self, id: &OrderId) -> Result<(), BrokerError> {
        let known = self.lock().orders.iter().any(|o| &o.id == id);
        if known {
            Err(BrokerError::OrderRejected(format!("order {id} already filled")))
        } else {
            Err(BrokerError::InvalidOrder(format!("unknown order {id}")))
        }
    }

    fn submit_option_order(
        &self,
        order: &OptionOrderRequest,
    ) -> Result<OptionOrderReceipt, BrokerError> {
        order.validate().map_err(BrokerError::InvalidOrder)?;

        let spot = match self.fill_price(&order.symbol) {
            Ok(p) => p,
            Err(e) => {
                warn!(symbol = %order.symbol, error = %e, "no spot for option pricing, using strike");
                order.strike
            }
        };
        let now = Utc::now();
        let premium = simulated_premium(
            order.option_type,
            spot,
            order.strike,
            now.date_naive(),
            order.expiration,
        );
        let seq = {
            let mut ledger = self.lock();
            let seq = ledger.next_seq;
            ledger.next_seq += 1;
            seq
        };
        let id = format!(
            "SIM_{}_{}_{}{}_{seq}",
            now.format("%Y%m%d_%H%M%S"),
            order.symbol,
            order.strike,
            order.option_type.code()
        );
        info!(%id, premium, quantity = order.quantity, "simulated option order");

        Ok(OptionOrderReceipt {
            id: OrderId::new(id),
            status: "filled".into(),
            symbol: order.symbol.clone(),
            option_symbol: order.occ_symbol(),
            option_type: order.option_type,
            strike: order.strike,
            expiration: order.expiration,
            side: order.side,
            quantity: order.quantity,
            price: Some(premium),
            total_cost: Some(contract_cost(premium, order.quantity)),
            broker: self.name().to_string(),
            submitted_at: now,
        })
    }

    fn option_chain(&self, symbol: &str, spot: f64) -> Result<OptionChain, BrokerError> {
        Ok(generated_chain(symbol, spot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StaticMarketData;
    use crate::domain::OptionType;
    use chrono::{Duration, NaiveDate};

    fn broker(cash: f64) -> SimulatedBroker {
        let market = StaticMarketData::new().with_price("SPY", 100.0);
        SimulatedBroker::new(Arc::new(market), cash)
    }

    #[test]
    fn buy_debits_cash_and_opens_position() {
        let b = broker(1000.0);
        let receipt = b.submit_order(&OrderRequest::market("SPY", OrderSide::Buy, 5)).unwrap();
        assert_eq!(receipt.status, OrderStatus::Filled);
        assert_eq!(receipt.filled_price, Some(100.0));
        let acct = b.account().unwrap();
        assert_eq!(acct.cash, 500.0);
        assert_eq!(acct.portfolio_value, 1000.0);
        assert_eq!(b.position("SPY").unwrap().unwrap().quantity, 5);
    }

    #[test]
    fn buy_beyond_cash_is_rejected() {
        let b = broker(100.0);
        let err = b.submit_order(&OrderRequest::market("SPY", OrderSide::Buy, 2)).unwrap_err();
        assert!(matches!(err, BrokerError::OrderRejected(_)));
        assert_eq!(b.account().unwrap().cash, 100.0);
    }

    #[test]
    fn selling_closes_and_removes_position() {
        let b = broker(0.0).with_position("SPY", 3, 90.0);
        b.submit_order(&OrderRequest::market("SPY", OrderSide::Sell, 3)).unwrap();
        assert!(b.positions().unwrap().is_empty());
        assert_eq!(b.account().unwrap().cash, 300.0);
    }

    #[test]
    fn no_short_selling() {
        let b = broker(1000.0);
        let err = b.submit_order(&OrderRequest::market("SPY", OrderSide::Sell, 1)).unwrap_err();
        assert!(matches!(err, BrokerError::OrderRejected(_)));
    }

    #[test]
    fn positions_are_marked_to_market() {
        let b = broker(0.0).with_position("SPY", 10, 90.0);
        let pos = b.positions().unwrap().remove(0);
        assert_eq!(pos.market_value, 1000.0);
        assert!((pos.unrealized_pl - 100.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_symbol_is_unavailable() {
        let b = broker(1000.0);
        let err = b.submit_order(&OrderRequest::market("QQQ", OrderSide::Buy, 1)).unwrap_err();
        assert!(matches!(err, BrokerError::Unavailable(_)));
    }

    #[test]
    fn option_order_is_priced_and_prefixed() {
        let b = broker(1000.0);
        let order = OptionOrderRequest {
            symbol: "SPY".into(),
            option_type: OptionType::Call,
            strike: 95.0,
            expiration: Utc::now().date_naive() + Duration::days(30),
            side: OrderSide::Buy,
            quantity: 2,
        };
        let r = b.submit_option_order(&order).unwrap();
        assert!(r.id.as_str().starts_with("SIM_"));
        // intrinsic 5 + 2% of 95 for one month
        assert_eq!(r.price, Some(6.9));
        assert_eq!(r.total_cost, Some(1380.0));
    }

    #[test]
    fn invalid_option_order_rejected() {
        let b = broker(1000.0);
        let order = OptionOrderRequest {
            symbol: "SPY".into(),
            option_type: OptionType::Put,
            strike: 95.0,
            expiration: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            side: OrderSide::Buy,
            quantity: 0,
        };
        assert!(matches!(
            b.submit_option_order(&order),
            Err(BrokerError::InvalidOrder(_))
        ));
    }
}
