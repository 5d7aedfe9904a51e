//! CSV export of backtest trades, batch summaries and trade journals.

use anyhow::{Context, Result};

use crate::backtest::{BacktestOutcome, BacktestTrade};
use crate::journal::TradeRecord;

/// Columns: date, side, shares, price, value
pub fn backtest_trades_csv(trades: &[BacktestTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "side", "shares", "price", "value"])?;
    for t in trades {
        wtr.write_record([
            t.date.to_string(),
            t.side.to_string(),
            t.shares.to_string(),
            format!("{:.2}", t.price),
            format!("{:.2}", t.price * t.shares as f64),
        ])?;
    }
    finish(wtr)
}

/// One row per outcome; failed runs carry their error and empty figures.
pub fn batch_summary_csv(outcomes: &[BacktestOutcome]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "start_date",
        "end_date",
        "status",
        "final_value",
        "strategy_return_pct",
        "market_return_pct",
        "outperformance_pct",
        "volatility_pct",
        "max_drawdown_pct",
        "total_trades",
        "error",
    ])?;
    for o in outcomes {
        match o {
            BacktestOutcome::Completed(r) => wtr.write_record([
                r.symbol.clone(),
                r.start_date.to_string(),
                r.end_date.to_string(),
                "completed".into(),
                format!("{:.2}", r.final_value),
                format!("{:.2}", r.strategy_return_pct),
                format!("{:.2}", r.market_return_pct),
                format!("{:.2}", r.outperformance_pct),
                format!("{:.2}", r.volatility_pct),
                format!("{:.2}", r.max_drawdown_pct),
                r.total_trades.to_string(),
                String::new(),
            ])?,
            BacktestOutcome::Failed {
                symbol,
                start_date,
                end_date,
                error,
            } => wtr.write_record([
                symbol.clone(),
                start_date.to_string(),
                end_date.to_string(),
                "failed".into(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                error.clone(),
            ])?,
        }
    }
    finish(wtr)
}

/// Columns: timestamp, symbol, side, quantity, price, total_value, strategy, sentiment, probability, order_id
pub fn trade_records_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "symbol",
        "side",
        "quantity",
        "price",
        "total_value",
        "strategy",
        "sentiment",
        "probability",
        "order_id",
    ])?;
    for t in trades {
        wtr.write_record([
            t.timestamp.to_rfc3339(),
            t.symbol.clone(),
            t.side.to_string(),
            t.quantity.to_string(),
            format!("{:.2}", t.price),
            format!("{:.2}", t.total_value),
            t.strategy.clone(),
            t.sentiment.map(|s| s.to_string()).unwrap_or_default(),
            t.probability.map(|p| format!("{p:.4}")).unwrap_or_default(),
            t.order_id.clone().unwrap_or_default(),
        ])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sentitrade_core::domain::OrderSide;

    #[test]
    fn trades_csv_has_header_and_rows() {
        let trades = vec![BacktestTrade {
            date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            side: OrderSide::Buy,
            shares: 45,
            price: 110.0,
        }];
        let csv = backtest_trades_csv(&trades).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,side,shares,price,value");
        assert_eq!(lines[1], "2024-02-29,buy,45,110.00,4950.00");
    }

    #[test]
    fn failed_outcome_row_carries_error() {
        let outcomes = vec![BacktestOutcome::Failed {
            symbol: "ZZZ".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            error: "no price data".into(),
        }];
        let csv = batch_summary_csv(&outcomes).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("ZZZ,2024-01-01,2024-12-31,failed"));
        assert!(row.ends_with("no price data"));
    }
}
