//! SentiTrade Core: domain types, sentiment estimators, position sizing, the
//! decision engine, and the market data and broker gateways it reads from.
//!
//! - Domain types (bars, quotes, headlines, account, positions, orders, decisions)
//! - Indicators (SMA, percent change)
//! - News and technical sentiment estimators
//! - Cash-fraction position sizer
//! - Decision engine and trading session
//! - Market data gateway (Yahoo, Alpaca, cross-checked, static)
//! - Broker gateway (Alpaca live, in-memory simulation)

pub mod broker;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod sentiment;
pub mod sizers;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types shared across request handlers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::TradeDecision>();
        require_sync::<domain::TradeDecision>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::OptionChain>();
        require_sync::<domain::OptionChain>();

        require_send::<engine::TradingSession>();
        require_sync::<engine::TradingSession>();
        require_send::<engine::DecisionEngine>();
        require_sync::<engine::DecisionEngine>();

        require_send::<data::StaticMarketData>();
        require_sync::<data::StaticMarketData>();
        require_send::<data::CrossCheckedMarketData>();
        require_sync::<data::CrossCheckedMarketData>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();

        require_send::<broker::SimulatedBroker>();
        require_sync::<broker::SimulatedBroker>();
    }

    /// The sentiment estimators never see the broker: they take only headlines
    /// or bars.
    #[test]
    fn estimators_take_no_account_state() {
        fn _news(
            est: &sentiment::NewsSentiment,
            heads: &[domain::NewsHeadline],
        ) -> Result<domain::SentimentResult, sentiment::SentimentError> {
            est.estimate(heads, chrono::Utc::now())
        }
        fn _technical(est: &sentiment::TechnicalSentiment, bars: &[domain::Bar]) -> domain::SentimentResult {
            est.estimate(bars)
        }
    }
}
