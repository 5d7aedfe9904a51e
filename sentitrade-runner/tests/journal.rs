//! JSONL journal on disk.

use std::sync::Arc;
use std::thread;

use chrono::{Duration, TimeZone, Utc};
use sentitrade_core::domain::{AccountState, OrderSide, Position, SentimentLabel};
use sentitrade_runner::{
    BacktestRecord, JsonlStore, PortfolioSnapshot, TradeRecord, TradeStore, DEFAULT_HISTORY_LIMIT,
};

fn trade(n: i64) -> TradeRecord {
    TradeRecord {
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap() + Duration::minutes(n),
        symbol: "SPY".into(),
        side: if n % 2 == 0 { OrderSide::Buy } else { OrderSide::Sell },
        quantity: n as u64 + 1,
        price: 100.0,
        total_value: 100.0 * (n as f64 + 1.0),
        strategy: "bot".into(),
        sentiment: Some(SentimentLabel::Bullish),
        probability: Some(0.9),
        order_id: Some(format!("SIM_{n:06}_SPY")),
    }
}

#[test]
fn history_is_newest_first_and_limited() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path());
    for n in 0..5 {
        store.record_trade(&trade(n)).unwrap();
    }

    let all = store.trade_history(DEFAULT_HISTORY_LIMIT).unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0], trade(4));
    assert_eq!(all[4], trade(0));

    let recent = store.trade_history(2).unwrap();
    assert_eq!(recent, vec![trade(4), trade(3)]);
}

#[test]
fn store_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("journal").join("nested");
    let store = JsonlStore::new(&nested);
    store.record_trade(&trade(0)).unwrap();
    assert!(nested.join("trades.jsonl").exists());
}

#[test]
fn reopened_store_sees_earlier_records() {
    let dir = tempfile::tempdir().unwrap();
    JsonlStore::new(dir.path()).record_trade(&trade(7)).unwrap();
    let again = JsonlStore::new(dir.path());
    assert_eq!(again.trade_history(10).unwrap(), vec![trade(7)]);
}

#[test]
fn portfolio_and_backtest_records_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path());

    let account = AccountState {
        cash: 550.0,
        buying_power: 550.0,
        portfolio_value: 1_000.0,
        day_trade_count: 0,
    };
    let positions = vec![Position {
        symbol: "SPY".into(),
        quantity: 9,
        avg_entry_price: 50.0,
        market_value: 450.0,
        unrealized_pl: 0.0,
        unrealized_pl_pct: 0.0,
    }];
    let snapshot = PortfolioSnapshot::new(&account, positions);
    store.record_portfolio(&snapshot).unwrap();
    assert_eq!(store.portfolios().unwrap(), vec![snapshot]);

    let record = BacktestRecord {
        timestamp: Utc::now(),
        symbol: "AAPL".into(),
        source: "backtest".into(),
        results: serde_json::json!({ "final_value": 10_450.0, "total_trades": 3 }),
    };
    store.record_backtest(&record).unwrap();
    assert_eq!(store.backtests().unwrap(), vec![record]);
}

#[test]
fn concurrent_writers_keep_every_line_whole() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonlStore::new(dir.path()));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    store.record_trade(&trade(t * 10 + i)).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(store.trade_history(1_000).unwrap().len(), 80);
}
