//! In-memory market data for offline runs and tests.
//!
//! Prices, history and headlines are whatever the builder put in. With
//! `synthetic` enabled, symbols without explicit data get a fixed demo price
//! and a deterministic random-walk history seeded from the symbol name.

use super::provider::{DataError, MarketData};
use crate::domain::{Bar, NewsHeadline, Quote, QuoteSource};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Demo prices for common tickers; anything else is 100.
pub fn demo_price(symbol: &str) -> f64 {
    match symbol {
        "SPY" => 430.0,
        "NVDA" => 120.0,
        "AAPL" => 185.0,
        "MSFT" => 340.0,
        "GOOGL" => 140.0,
        "TSLA" => 250.0,
        "META" => 320.0,
        "AMZN" => 150.0,
        "AMD" => 140.0,
        "QQQ" => 360.0,
        "IWM" => 200.0,
        "GLD" => 180.0,
        _ => 100.0,
    }
}

/// Weekday-only random walk over `[start, end]`, deterministic per symbol.
pub fn synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate, start_price: f64) -> Vec<Bar> {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = start_price;
    let mut day = start;
    while day <= end {
        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            day += Duration::days(1);
            continue;
        }
        let daily_return: f64 = rng.gen_range(-0.02..0.021);
        let open = price;
        let close = price * (1.0 + daily_return);
        bars.push(Bar {
            symbol: symbol.to_string(),
            date: day,
            open,
            high: open.max(close) * (1.0 + rng.gen_range(0.0..0.01)),
            low: open.min(close) * (1.0 - rng.gen_range(0.0..0.01)),
            close,
            volume: rng.gen_range(500_000..5_000_000u64),
        });
        price = close;
        day += Duration::days(1);
    }
    bars
}

#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    prices: HashMap<String, f64>,
    history: HashMap<String, Vec<Bar>>,
    news: HashMap<String, Vec<NewsHeadline>>,
    synthetic: bool,
    fail_quotes: bool,
    fail_history: bool,
    fail_news: bool,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offline demo source: demo prices and synthetic history for any symbol.
    pub fn demo() -> Self {
        Self {
            synthetic: true,
            ..Self::default()
        }
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn with_history(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.history.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_news(mut self, symbol: &str, headlines: Vec<NewsHeadline>) -> Self {
        self.news.insert(symbol.to_string(), headlines);
        self
    }

    pub fn failing_quotes(mut self) -> Self {
        self.fail_quotes = true;
        self
    }

    pub fn failing_history(mut self) -> Self {
        self.fail_history = true;
        self
    }

    pub fn failing_news(mut self) -> Self {
        self.fail_news = true;
        self
    }
}

impl MarketData for StaticMarketData {
    fn name(&self) -> &str {
        "static"
    }

    fn quote(&self, symbol: &str) -> Result<Quote, DataError> {
        if self.fail_quotes {
            return Err(DataError::Unavailable(format!("quote feed down for {symbol}")));
        }
        let price = match self.prices.get(symbol) {
            Some(p) => *p,
            None if self.synthetic => demo_price(symbol),
            None => {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            }
        };
        Ok(Quote::new(symbol, price, QuoteSource::Static))
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        if self.fail_history {
            return Err(DataError::Unavailable(format!("history feed down for {symbol}")));
        }
        match self.history.get(symbol) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|b| b.date >= start && b.date <= end)
                .cloned()
                .collect()),
            None if self.synthetic => Ok(synthetic_bars(symbol, start, end, demo_price(symbol))),
            None => Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
        }
    }

    fn news(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NewsHeadline>, DataError> {
        if self.fail_news {
            return Err(DataError::Unavailable(format!("news feed down for {symbol}")));
        }
        let mut headlines: Vec<NewsHeadline> = self
            .news
            .get(symbol)
            .map(|all| {
                all.iter()
                    .filter(|h| h.published_at >= start && h.published_at <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        headlines.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        headlines.truncate(limit);
        Ok(headlines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn synthetic_is_deterministic_and_skips_weekends() {
        let a = synthetic_bars("SPY", d(2024, 1, 1), d(2024, 1, 31), 430.0);
        let b = synthetic_bars("SPY", d(2024, 1, 1), d(2024, 1, 31), 430.0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 23);
        assert!(a.iter().all(|bar| bar.close > 0.0 && bar.is_sane()));
    }

    #[test]
    fn different_symbols_differ() {
        let spy = synthetic_bars("SPY", d(2024, 1, 1), d(2024, 1, 31), 100.0);
        let qqq = synthetic_bars("QQQ", d(2024, 1, 1), d(2024, 1, 31), 100.0);
        assert_ne!(spy, qqq);
    }

    #[test]
    fn demo_quotes_use_price_table() {
        let data = StaticMarketData::demo();
        assert_eq!(data.quote("NVDA").unwrap().price, 120.0);
        assert_eq!(data.quote("ZZZZ").unwrap().price, 100.0);
    }

    #[test]
    fn plain_static_rejects_unknown_symbol() {
        assert!(matches!(
            StaticMarketData::new().quote("SPY"),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn history_filtered_to_range() {
        let bars = vec![
            Bar::from_close("SPY", d(2024, 1, 2), 1.0),
            Bar::from_close("SPY", d(2024, 2, 2), 2.0),
        ];
        let data = StaticMarketData::new().with_history("SPY", bars);
        let got = data.price_history("SPY", d(2024, 2, 1), d(2024, 2, 28)).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].close, 2.0);
    }

    #[test]
    fn news_newest_first_and_limited() {
        let now = Utc::now();
        let h = |hours: i64, text: &str| NewsHeadline {
            symbol: "SPY".into(),
            text: text.into(),
            published_at: now - Duration::hours(hours),
            source: "test".into(),
        };
        let data = StaticMarketData::new().with_news("SPY", vec![h(5, "old"), h(1, "new"), h(3, "mid")]);
        let got = data.news("SPY", now - Duration::days(1), now, 2).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].text, "new");
        assert_eq!(got[1].text, "mid");
    }
}
