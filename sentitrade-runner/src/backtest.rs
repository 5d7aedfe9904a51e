//! Monthly momentum backtest.
//!
//! Daily closes are resampled to the last close of each calendar month. From
//! the second month on, a month-over-month gain above `buy_momentum` buys with
//! `allocation` of the free capital, and a loss below `sell_momentum` sells
//! the whole holding. There is no randomness: the same bars always give the
//! same report.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use sentitrade_core::data::{DataError, MarketData};
use sentitrade_core::domain::{Bar, OrderSide};
use sentitrade_core::sizers::{CashFractionSizer, Sizer};

use crate::metrics::{annualized_volatility_pct, max_drawdown_pct, return_pct};

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("no price data for {symbol} between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("initial capital must be positive, got {0}")]
    InvalidCapital(f64),
    #[error("price history: {0}")]
    Data(#[from] DataError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestParams {
    /// Month-over-month gain that triggers a buy.
    pub buy_momentum: f64,
    /// Month-over-month change below which the holding is sold.
    pub sell_momentum: f64,
    /// Fraction of free capital committed per buy.
    pub allocation: f64,
    /// Most recent trades kept in the report.
    pub trade_sample: usize,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            buy_momentum: 0.05,
            sell_momentum: -0.08,
            allocation: 0.5,
            trade_sample: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub date: NaiveDate,
    pub side: OrderSide,
    pub shares: u64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub final_value: f64,
    pub strategy_return_pct: f64,
    pub market_return_pct: f64,
    pub outperformance_pct: f64,
    pub volatility_pct: f64,
    pub max_drawdown_pct: f64,
    pub total_trades: usize,
    /// The last few trades, oldest first.
    pub trades: Vec<BacktestTrade>,
    /// Capital and holding after each month-end, first month included.
    pub equity_curve: Vec<MonthEnd>,
    pub bar_count: usize,
    pub dataset_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthEnd {
    pub date: NaiveDate,
    pub price: f64,
    pub capital: f64,
    pub shares: u64,
}

impl MonthEnd {
    pub fn value(&self) -> f64 {
        self.capital + self.shares as f64 * self.price
    }
}

/// A backtest either completes or reports why it could not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BacktestOutcome {
    Completed(BacktestReport),
    Failed {
        symbol: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        error: String,
    },
}

impl BacktestOutcome {
    pub fn report(&self) -> Option<&BacktestReport> {
        match self {
            BacktestOutcome::Completed(r) => Some(r),
            BacktestOutcome::Failed { .. } => None,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            BacktestOutcome::Completed(r) => &r.symbol,
            BacktestOutcome::Failed { symbol, .. } => symbol,
        }
    }
}

/// Month-end closes: the last bar of each (year, month), in date order.
pub fn monthly_closes(bars: &[Bar]) -> Vec<(NaiveDate, f64)> {
    let mut out: Vec<(NaiveDate, f64)> = Vec::new();
    for bar in bars {
        match out.last_mut() {
            Some((date, close))
                if date.year() == bar.date.year() && date.month() == bar.date.month() =>
            {
                *date = bar.date;
                *close = bar.close;
            }
            _ => out.push((bar.date, bar.close)),
        }
    }
    out
}

fn dataset_hash(symbol: &str, bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[derive(Debug, Clone, Copy)]
pub struct BacktestSimulator {
    params: BacktestParams,
    sizer: CashFractionSizer,
}

impl Default for BacktestSimulator {
    fn default() -> Self {
        Self::new(BacktestParams::default())
    }
}

impl BacktestSimulator {
    pub fn new(params: BacktestParams) -> Self {
        Self {
            params,
            // the allocation is the whole haircut here
            sizer: CashFractionSizer::new(1.0),
        }
    }

    pub fn params(&self) -> &BacktestParams {
        &self.params
    }

    /// Fetch daily history and simulate.
    pub fn run(
        &self,
        market: &dyn MarketData,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        initial_capital: f64,
    ) -> Result<BacktestReport, BacktestError> {
        if start > end {
            return Err(BacktestError::InvalidRange { start, end });
        }
        let bars = match market.price_history(symbol, start, end) {
            Ok(bars) => bars,
            Err(DataError::SymbolNotFound { .. }) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        self.simulate(symbol, start, end, &bars, initial_capital)
    }

    /// Simulate over the bars of `[start, end]`. Bars outside the range and
    /// bars without a usable close are ignored.
    pub fn simulate(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        bars: &[Bar],
        initial_capital: f64,
    ) -> Result<BacktestReport, BacktestError> {
        if start > end {
            return Err(BacktestError::InvalidRange { start, end });
        }
        if !(initial_capital.is_finite() && initial_capital > 0.0) {
            return Err(BacktestError::InvalidCapital(initial_capital));
        }

        let mut series: Vec<Bar> = bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end && b.close.is_finite() && b.close > 0.0)
            .cloned()
            .collect();
        series.sort_by_key(|b| b.date);
        let (first, last) = match (series.first(), series.last()) {
            (Some(f), Some(l)) => (f.close, l.close),
            _ => {
                return Err(BacktestError::NoData {
                    symbol: symbol.to_string(),
                    start,
                    end,
                })
            }
        };

        let mut capital = initial_capital;
        let mut shares: u64 = 0;
        let mut trades = Vec::new();

        let months = monthly_closes(&series);
        let mut equity_curve = Vec::with_capacity(months.len());
        if let Some(&(date, price)) = months.first() {
            equity_curve.push(MonthEnd {
                date,
                price,
                capital,
                shares,
            });
        }
        for pair in months.windows(2) {
            let (_, prev) = pair[0];
            let (date, price) = pair[1];
            let momentum = (price - prev) / prev;

            if momentum > self.params.buy_momentum && capital > price {
                let sizing = self
                    .sizer
                    .size(capital, capital, price, self.params.allocation);
                if !sizing.is_empty() {
                    capital -= sizing.cost;
                    shares += sizing.quantity;
                    trades.push(BacktestTrade {
                        date,
                        side: OrderSide::Buy,
                        shares: sizing.quantity,
                        price,
                    });
                    debug!(%symbol, %date, momentum, shares = sizing.quantity, "backtest buy");
                }
            } else if momentum < self.params.sell_momentum && shares > 0 {
                capital += shares as f64 * price;
                trades.push(BacktestTrade {
                    date,
                    side: OrderSide::Sell,
                    shares,
                    price,
                });
                debug!(%symbol, %date, momentum, shares, "backtest sell");
                shares = 0;
            }
            equity_curve.push(MonthEnd {
                date,
                price,
                capital,
                shares,
            });
        }

        let final_value = capital + shares as f64 * last;
        let strategy_return_pct = return_pct(initial_capital, final_value);
        let market_return_pct = return_pct(first, last);
        let closes: Vec<f64> = series.iter().map(|b| b.close).collect();

        let total_trades = trades.len();
        let keep = total_trades.saturating_sub(self.params.trade_sample);
        let report = BacktestReport {
            symbol: symbol.to_string(),
            start_date: start,
            end_date: end,
            initial_capital,
            final_value,
            strategy_return_pct,
            market_return_pct,
            outperformance_pct: strategy_return_pct - market_return_pct,
            volatility_pct: annualized_volatility_pct(&closes),
            max_drawdown_pct: max_drawdown_pct(&closes),
            total_trades,
            trades: trades.split_off(keep),
            equity_curve,
            bar_count: series.len(),
            dataset_hash: dataset_hash(symbol, &series),
        };
        info!(
            %symbol,
            strategy = %format!("{:+.1}%", report.strategy_return_pct),
            market = %format!("{:+.1}%", report.market_return_pct),
            trades = report.total_trades,
            "backtest complete"
        );
        Ok(report)
    }
}

/// Run with default parameters, folding any failure into the outcome.
pub fn run_backtest(
    market: &dyn MarketData,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    initial_capital: f64,
) -> BacktestOutcome {
    run_with(&BacktestSimulator::default(), market, symbol, start, end, initial_capital)
}

pub fn run_with(
    simulator: &BacktestSimulator,
    market: &dyn MarketData,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    initial_capital: f64,
) -> BacktestOutcome {
    match simulator.run(market, symbol, start, end, initial_capital) {
        Ok(report) => BacktestOutcome::Completed(report),
        Err(e) => {
            warn!(%symbol, %start, %end, error = %e, "backtest failed");
            BacktestOutcome::Failed {
                symbol: symbol.to_string(),
                start_date: start,
                end_date: end,
                error: e.to_string(),
            }
        }
    }
}
