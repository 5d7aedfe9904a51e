//! Bot controller lifecycle against in-memory gateways.
//!
//! GIVEN a controller over static market data and a simulated broker
//! WHEN an outer surface drives it
//! THEN lifecycle errors, cycles, manual trades and backtests behave as the
//!      HTTP API expects

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use sentitrade_core::broker::SimulatedBroker;
use sentitrade_core::data::{MarketData, StaticMarketData};
use sentitrade_core::domain::{NewsHeadline, OptionOrderRequest, OptionType, OrderSide, TradeAction};
use sentitrade_runner::{
    BacktestRequest, BotController, BotError, Gateways, JsonlStore, ManualTrade, NullStore,
    RunState, SentitradeConfig, TradeStore,
};

// ── Helpers ──

fn bullish_market() -> Arc<dyn MarketData> {
    Arc::new(
        StaticMarketData::demo()
            .with_price("SPY", 50.0)
            .with_news(
                "SPY",
                vec![NewsHeadline {
                    symbol: "SPY".into(),
                    text: "SPY shares surge to record high".into(),
                    published_at: Utc::now() - Duration::hours(1),
                    source: "test".into(),
                }],
            ),
    )
}

fn controller_with(store: Arc<dyn TradeStore>) -> BotController {
    let market = bullish_market();
    let broker = Arc::new(SimulatedBroker::new(market.clone(), 1_000.0));
    BotController::new(SentitradeConfig::default(), Gateways { market, broker }, store)
}

fn controller() -> BotController {
    controller_with(Arc::new(NullStore))
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ── Lifecycle ──

#[test]
fn start_and_stop_are_exclusive() {
    let bot = controller();
    assert_eq!(bot.status().status, RunState::Stopped);

    let msg = bot.start(Some("spy"), Some(0.5)).unwrap();
    assert!(msg.contains("SPY"));
    assert!(matches!(bot.start(None, None), Err(BotError::AlreadyRunning)));
    assert_eq!(bot.status().status, RunState::Running);
    assert_eq!(bot.status().symbol, "SPY");

    bot.stop().unwrap();
    let err = bot.stop().unwrap_err();
    assert!(matches!(err, BotError::NotRunning));
    assert!(err.is_client_error());
}

#[test]
fn start_rejects_bad_position_size() {
    let bot = controller();
    let err = bot.start(Some("SPY"), Some(1.5)).unwrap_err();
    assert!(matches!(err, BotError::InvalidRequest(_)));
    assert!(!bot.is_running());
}

#[test]
fn sentiment_requires_running_bot() {
    let bot = controller();
    assert!(matches!(bot.sentiment(), Err(BotError::NotRunning)));
    assert!(matches!(bot.run_cycle(), Err(BotError::NotRunning)));

    bot.start(Some("SPY"), None).unwrap();
    let s = bot.sentiment().unwrap();
    assert_eq!(s.sentiment, "positive");
    assert_eq!(bot.status().last_sentiment, Some("positive"));
}

// ── Cycles and journal ──

#[test]
fn cycle_buys_and_is_journaled() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlStore::new(dir.path()));
    let bot = controller_with(store.clone());
    bot.start(Some("SPY"), Some(0.5)).unwrap();

    let decision = bot.run_cycle().unwrap();
    assert_eq!(decision.action, TradeAction::Buy);
    assert_eq!(decision.quantity, 9);

    let status = bot.status();
    assert_eq!(status.trades_today, 1);
    assert_eq!(status.last_trade.unwrap().action, TradeAction::Buy);

    let history = bot.trade_history(100).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].strategy, "bot");
    assert_eq!(history[0].side, OrderSide::Buy);
    assert_eq!(history[0].quantity, 9);
}

#[test]
fn portfolio_reflects_fills() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlStore::new(dir.path()));
    let bot = controller_with(store.clone());
    bot.start(Some("SPY"), Some(0.5)).unwrap();
    bot.run_cycle().unwrap();

    let p = bot.portfolio().unwrap();
    assert!((p.cash - 550.0).abs() < 1e-9);
    assert_eq!(p.positions.len(), 1);
    assert_eq!(p.positions[0].quantity, 9);
    assert_eq!(store.portfolios().unwrap().len(), 1);
    assert!((bot.status().cash - 550.0).abs() < 1e-9);
}

// ── Manual trades ──

#[test]
fn manual_trade_is_validated() {
    let bot = controller();
    for bad in [
        ManualTrade { symbol: "".into(), side: "buy".into(), quantity: 1 },
        ManualTrade { symbol: "SPY".into(), side: "short".into(), quantity: 1 },
        ManualTrade { symbol: "SPY".into(), side: "buy".into(), quantity: 0 },
        ManualTrade { symbol: "SPY".into(), side: "sell".into(), quantity: -3 },
    ] {
        let err = bot.manual_trade(&bad).unwrap_err();
        assert!(err.is_client_error(), "{bad:?} gave {err}");
    }
}

#[test]
fn manual_trade_fills_and_journals() {
    let dir = tempfile::tempdir().unwrap();
    let bot = controller_with(Arc::new(JsonlStore::new(dir.path())));
    let result = bot
        .manual_trade(&ManualTrade {
            symbol: "spy".into(),
            side: "BUY".into(),
            quantity: 2,
        })
        .unwrap();
    assert_eq!(result.order.symbol, "SPY");
    assert_eq!(result.price, Some(50.0));

    let history = bot.trade_history(10).unwrap();
    assert_eq!(history[0].strategy, "manual");
    assert!((history[0].total_value - 100.0).abs() < 1e-9);
}

// ── Options ──

#[test]
fn option_chain_and_order_through_simulation() {
    let bot = controller();
    let chain = bot.option_chain("SPY").unwrap();
    assert_eq!(chain.current_price, 50.0);
    assert!(!chain.strikes.is_empty());

    let receipt = bot
        .option_order(&OptionOrderRequest {
            symbol: "SPY".into(),
            option_type: OptionType::Call,
            strike: 50.0,
            expiration: Utc::now().date_naive() + Duration::days(30),
            side: OrderSide::Buy,
            quantity: 1,
        })
        .unwrap();
    assert!(receipt.id.as_str().starts_with("SIM_"));
    assert!(receipt.total_cost.unwrap() > 0.0);
}

#[test]
fn option_order_rejects_zero_quantity() {
    let bot = controller();
    let err = bot
        .option_order(&OptionOrderRequest {
            symbol: "SPY".into(),
            option_type: OptionType::Put,
            strike: 50.0,
            expiration: d(2030, 1, 18),
            side: OrderSide::Buy,
            quantity: 0,
        })
        .unwrap_err();
    assert!(matches!(err, BotError::InvalidRequest(_)));
}

// ── Backtests ──

#[test]
fn backtest_runs_on_available_history() {
    let bot = controller();
    let r = bot
        .backtest(&BacktestRequest {
            symbol: "AAPL".into(),
            start_date: d(2023, 1, 1),
            end_date: d(2023, 12, 31),
            initial_capital: None,
            position_size: None,
        })
        .unwrap();
    assert_eq!(r.source, "backtest");
    assert!(r.estimate.is_none());
    assert_eq!(r.outcome.report().unwrap().initial_capital, 10_000.0);
}

#[test]
fn failed_backtest_falls_back_to_tagged_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlStore::new(dir.path()));
    let market: Arc<dyn MarketData> = Arc::new(StaticMarketData::new());
    let broker = Arc::new(SimulatedBroker::new(market.clone(), 1_000.0));
    let bot = BotController::new(
        SentitradeConfig::default(),
        Gateways { market, broker },
        store.clone(),
    );

    let r = bot
        .backtest(&BacktestRequest {
            symbol: "SPY".into(),
            start_date: d(2022, 1, 1),
            end_date: d(2022, 12, 31),
            initial_capital: Some(5_000.0),
            position_size: Some(0.25),
        })
        .unwrap();
    assert_eq!(r.source, "estimate");
    assert!(r.outcome.report().is_none());
    let e = r.estimate.unwrap();
    assert_eq!(e.source, "estimate");
    assert_eq!(e.market_return_pct, -18.1);
    assert!(r.note.is_some());

    let saved = store.backtests().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].source, "estimate");
}
