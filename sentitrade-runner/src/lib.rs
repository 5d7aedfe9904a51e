//! Sentitrade Runner: backtests, configuration, journal and bot control.
//!
//! This crate builds on `sentitrade-core` to provide:
//! - The deterministic monthly-momentum backtest and its statistics
//! - A randomized estimate generator, kept apart from the backtest
//! - TOML configuration with validated defaults
//! - Gateway selection (offline, Yahoo/Alpaca data, simulated/live broker)
//! - A JSONL trade journal
//! - The bot controller an outer surface drives
//! - Parallel batch backtests and CSV export

pub mod backtest;
pub mod batch;
pub mod bot;
pub mod config;
pub mod estimate;
pub mod export;
pub mod gateways;
pub mod journal;
pub mod metrics;

pub use backtest::{
    run_backtest, BacktestError, BacktestOutcome, BacktestParams, BacktestReport,
    BacktestSimulator, BacktestTrade, MonthEnd,
};
pub use batch::{BacktestJob, BatchRunner};
pub use bot::{
    BacktestRequest, BacktestResponse, BotController, BotError, BotStatus, ManualTrade,
    ManualTradeResult, PortfolioView, RunState, SentimentReport,
};
pub use config::{BrokerKind, ConfigError, SentitradeConfig};
pub use estimate::{EstimateGenerator, EstimatedReport, Scenario};
pub use gateways::{GatewayError, Gateways};
pub use journal::{
    BacktestRecord, JsonlStore, NullStore, PortfolioSnapshot, StoreError, TradeRecord, TradeStore,
    DEFAULT_HISTORY_LIMIT,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_types_are_send_sync() {
        assert_send::<BacktestSimulator>();
        assert_sync::<BacktestSimulator>();
        assert_send::<BacktestOutcome>();
        assert_sync::<BacktestOutcome>();
    }

    #[test]
    fn bot_controller_is_send_sync() {
        assert_send::<BotController>();
        assert_sync::<BotController>();
    }

    #[test]
    fn stores_are_send_sync() {
        assert_send::<JsonlStore>();
        assert_sync::<JsonlStore>();
        assert_send::<NullStore>();
        assert_sync::<NullStore>();
    }

    #[test]
    fn config_is_send_sync() {
        assert_send::<SentitradeConfig>();
        assert_sync::<SentitradeConfig>();
    }
}
