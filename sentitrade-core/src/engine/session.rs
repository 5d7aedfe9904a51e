//! Trading session: one market data source, one broker, one cycle at a time.
//!
//! A cycle moves `Idle -> Evaluating -> {Buying, Selling, Holding} -> Idle`.
//! The cycle lock is held for the whole cycle so overlapping callers queue up
//! instead of submitting twice. The only state carried between cycles is the
//! side of the last order placed.

use super::decision::{DecisionEngine, Plan};
use crate::broker::{validate_order, Broker, BrokerError};
use crate::data::MarketData;
use crate::domain::{
    BracketLevels, OrderReceipt, OrderRequest, OrderSide, SentimentResult, SentimentSource,
    TradeAction, TradeDecision,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Evaluating,
    Buying,
    Selling,
    Holding,
}

#[derive(Debug, Default)]
struct Marker {
    last_action: Option<OrderSide>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: CycleState,
    pub last_action: Option<OrderSide>,
    pub cycles_run: u64,
    pub last_decision: Option<TradeDecision>,
}

pub struct TradingSession {
    engine: DecisionEngine,
    market: Arc<dyn MarketData>,
    broker: Arc<dyn Broker>,
    cycle: Mutex<Marker>,
    snapshot: Mutex<SessionSnapshot>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TradingSession {
    pub fn new(
        engine: DecisionEngine,
        market: Arc<dyn MarketData>,
        broker: Arc<dyn Broker>,
    ) -> Self {
        Self {
            engine,
            market,
            broker,
            cycle: Mutex::new(Marker::default()),
            snapshot: Mutex::new(SessionSnapshot {
                state: CycleState::Idle,
                last_action: None,
                cycles_run: 0,
                last_decision: None,
            }),
        }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn market(&self) -> &Arc<dyn MarketData> {
        &self.market
    }

    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    /// Current state without waiting for a running cycle.
    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.snapshot).clone()
    }

    fn set_state(&self, state: CycleState) {
        lock(&self.snapshot).state = state;
    }

    /// Run one decision cycle now.
    pub fn run_cycle(&self, symbol: &str, risk_fraction: f64) -> TradeDecision {
        self.run_cycle_at(symbol, risk_fraction, Utc::now())
    }

    /// Run one decision cycle as of `now`. Always returns a decision; failures
    /// end up in `action` and `reason`.
    pub fn run_cycle_at(&self, symbol: &str, risk_fraction: f64, now: DateTime<Utc>) -> TradeDecision {
        let mut marker = lock(&self.cycle);
        self.set_state(CycleState::Evaluating);

        let decision = self.evaluate(&mut marker, symbol, risk_fraction, now);

        let mut snap = lock(&self.snapshot);
        snap.state = CycleState::Idle;
        snap.last_action = marker.last_action;
        snap.cycles_run += 1;
        snap.last_decision = Some(decision.clone());
        decision
    }

    fn evaluate(
        &self,
        marker: &mut Marker,
        symbol: &str,
        risk_fraction: f64,
        now: DateTime<Utc>,
    ) -> TradeDecision {
        let previous = marker.last_action;
        let (sentiment, source) = self.engine.sentiment(self.market.as_ref(), symbol, now);

        let mut decision = TradeDecision {
            timestamp: now,
            symbol: symbol.to_string(),
            price: None,
            sentiment: sentiment.label,
            probability: sentiment.probability,
            sentiment_source: source,
            quantity: 0,
            cost: 0.0,
            action: TradeAction::Hold,
            reason: String::new(),
            previous_action: previous,
            order: None,
        };

        let price = match self.market.quote(symbol) {
            Ok(q) if q.is_valid() => q.price,
            Ok(q) => return failed(decision, format!("invalid price {} for {symbol}", q.price)),
            Err(e) => return failed(decision, format!("price unavailable: {e}")),
        };
        decision.price = Some(price);

        let account = match self.broker.account() {
            Ok(a) => a,
            Err(e) => return failed(decision, format!("account unavailable: {e}")),
        };
        let sizing = self
            .engine
            .size(account.cash, account.buying_power, price, risk_fraction);
        decision.quantity = sizing.quantity;
        decision.cost = sizing.cost;

        let position = if self.engine.needs_position(&sentiment, &sizing) {
            match self.broker.position(symbol) {
                Ok(p) => p,
                Err(e) => {
                    warn!(%symbol, error = %e, "positions unavailable");
                    self.set_state(CycleState::Holding);
                    decision.reason = format!("positions unavailable: {e}");
                    return decision;
                }
            }
        } else {
            None
        };

        let (side, quantity) = match self.engine.plan(&sentiment, &sizing, position.as_ref()) {
            Plan::Hold { reason } => {
                self.set_state(CycleState::Holding);
                decision.reason = reason;
                info!(%symbol, sentiment = %sentiment.label, probability = sentiment.probability, "hold");
                return decision;
            }
            Plan::Buy { quantity } => (OrderSide::Buy, quantity),
            Plan::Sell { quantity } => (OrderSide::Sell, quantity),
        };

        self.set_state(match side {
            OrderSide::Buy => CycleState::Buying,
            OrderSide::Sell => CycleState::Selling,
        });
        let mut request = OrderRequest::market(symbol, side, quantity);
        if let (OrderSide::Buy, Some(b)) = (side, self.engine.policy().bracket) {
            request = request.with_bracket(BracketLevels::for_long(
                price,
                b.take_profit_pct,
                b.stop_loss_pct,
            ));
        }

        match self.broker.submit_order(&request) {
            Ok(receipt) => {
                marker.last_action = Some(side);
                decision.action = TradeAction::from(side);
                decision.quantity = receipt.quantity;
                decision.cost = receipt.filled_price.unwrap_or(price) * receipt.quantity as f64;
                decision.reason = DecisionEngine::order_reason(side, &sentiment, previous);
                info!(
                    %symbol,
                    action = %decision.action,
                    quantity = receipt.quantity,
                    order_id = %receipt.id,
                    "order submitted"
                );
                decision.order = Some(receipt);
            }
            Err(e) => {
                warn!(%symbol, %side, error = %e, "order not placed");
                decision.reason = format!("{side} order rejected: {e}");
            }
        }
        decision
    }

    /// Submit a manual order through the session broker, serialized with
    /// decision cycles.
    pub fn submit_manual(&self, order: &OrderRequest) -> Result<OrderReceipt, BrokerError> {
        validate_order(order)?;
        let mut marker = lock(&self.cycle);
        let receipt = self.broker.submit_order(order)?;
        marker.last_action = Some(order.side);
        lock(&self.snapshot).last_action = marker.last_action;
        info!(id = %receipt.id, side = %order.side, quantity = order.quantity, symbol = %order.symbol, "manual order");
        Ok(receipt)
    }

    /// Sentiment only, as the cycle would see it.
    pub fn sentiment(&self, symbol: &str) -> (SentimentResult, SentimentSource) {
        self.engine.sentiment(self.market.as_ref(), symbol, Utc::now())
    }
}

fn failed(mut decision: TradeDecision, reason: String) -> TradeDecision {
    warn!(symbol = %decision.symbol, %reason, "cycle failed");
    decision.action = TradeAction::Error;
    decision.reason = reason;
    decision
}
