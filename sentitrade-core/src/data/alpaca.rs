//! Alpaca market data: latest quotes, daily bars and the news feed.

use super::http::JsonFetcher;
use super::provider::{DataError, MarketData};
use crate::broker::credentials::{CredentialProvider, Credentials};
use crate::domain::{Bar, NewsHeadline, Quote, QuoteSource};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::debug;

pub const ALPACA_DATA_URL: &str = "https://data.alpaca.markets";

/// Alpaca caps a news page at 50 articles.
const NEWS_PAGE_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct LatestQuoteResponse {
    quote: LatestQuote,
}

#[derive(Debug, Deserialize)]
struct LatestQuote {
    #[serde(rename = "ap", default)]
    ask_price: f64,
    #[serde(rename = "bp", default)]
    bid_price: f64,
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Option<Vec<AlpacaBar>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: u64,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    news: Vec<NewsArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsArticle {
    headline: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    source: String,
}

pub struct AlpacaMarketData {
    fetcher: JsonFetcher,
    credentials: Credentials,
    base_url: String,
}

impl AlpacaMarketData {
    pub fn new(
        fetcher: JsonFetcher,
        credentials: &dyn CredentialProvider,
    ) -> Result<Self, DataError> {
        Ok(Self {
            fetcher,
            credentials: credentials.credentials()?,
            base_url: ALPACA_DATA_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn get<T: serde::de::DeserializeOwned>(&self, url: &str, symbol: &str) -> Result<T, DataError> {
        let headers = self.credentials.alpaca_headers();
        self.fetcher.get_json(url, &headers, symbol)
    }
}

fn quote_price(q: &LatestQuote) -> Option<f64> {
    [q.ask_price, q.bid_price]
        .into_iter()
        .find(|p| p.is_finite() && *p > 0.0)
}

fn to_bar(symbol: &str, b: AlpacaBar) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        date: b.t.date_naive(),
        open: b.o,
        high: b.h,
        low: b.l,
        close: b.c,
        volume: b.v,
    }
}

impl MarketData for AlpacaMarketData {
    fn name(&self) -> &str {
        "alpaca"
    }

    fn quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let url = format!("{}/v2/stocks/{symbol}/quotes/latest", self.base_url);
        let resp: LatestQuoteResponse = self.get(&url, symbol)?;
        let price = quote_price(&resp.quote)
            .ok_or_else(|| DataError::Unavailable(format!("no bid or ask for {symbol}")))?;
        Ok(Quote::new(symbol, price, QuoteSource::Alpaca))
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = format!(
                "{}/v2/stocks/{symbol}/bars?timeframe=1Day&start={start}&end={end}&limit=10000&adjustment=raw",
                self.base_url
            );
            if let Some(token) = &page_token {
                url.push_str("&page_token=");
                url.push_str(token);
            }
            let resp: BarsResponse = self.get(&url, symbol)?;
            bars.extend(
                resp.bars
                    .unwrap_or_default()
                    .into_iter()
                    .map(|b| to_bar(symbol, b)),
            );
            match resp.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        debug!(%symbol, bars = bars.len(), "alpaca history");
        Ok(bars)
    }

    fn news(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NewsHeadline>, DataError> {
        let limit = limit.clamp(1, NEWS_PAGE_LIMIT);
        let url = format!(
            "{}/v1beta1/news?symbols={symbol}&start={}&end={}&limit={limit}",
            self.base_url,
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        let resp: NewsResponse = self.get(&url, symbol)?;
        Ok(resp
            .news
            .into_iter()
            .map(|a| NewsHeadline {
                symbol: symbol.to_string(),
                text: a.headline,
                published_at: a.created_at,
                source: a.source,
            })
            .collect())
    }

    fn is_available(&self) -> bool {
        self.fetcher.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_prefers_ask_then_bid() {
        let q: LatestQuoteResponse =
            serde_json::from_str(r#"{"symbol":"SPY","quote":{"ap":431.5,"bp":431.4}}"#).unwrap();
        assert_eq!(quote_price(&q.quote), Some(431.5));
        let q: LatestQuoteResponse =
            serde_json::from_str(r#"{"symbol":"SPY","quote":{"ap":0,"bp":431.4}}"#).unwrap();
        assert_eq!(quote_price(&q.quote), Some(431.4));
        let q: LatestQuoteResponse =
            serde_json::from_str(r#"{"symbol":"SPY","quote":{"ap":0,"bp":0}}"#).unwrap();
        assert_eq!(quote_price(&q.quote), None);
    }

    #[test]
    fn bars_response_with_null_bars() {
        let r: BarsResponse =
            serde_json::from_str(r#"{"bars":null,"symbol":"SPY","next_page_token":null}"#).unwrap();
        assert!(r.bars.is_none());
    }

    #[test]
    fn bar_date_from_timestamp() {
        let r: BarsResponse = serde_json::from_str(
            r#"{"bars":[{"t":"2024-01-02T05:00:00Z","o":1.0,"h":2.0,"l":0.5,"c":1.5,"v":10}]}"#,
        )
        .unwrap();
        let bar = to_bar("SPY", r.bars.unwrap().remove(0));
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bar.close, 1.5);
    }

    #[test]
    fn news_articles_parse() {
        let r: NewsResponse = serde_json::from_str(
            r#"{"news":[{"id":1,"headline":"SPY rallies","created_at":"2024-03-01T14:00:00Z",
            "source":"benzinga","symbols":["SPY"]}],"next_page_token":null}"#,
        )
        .unwrap();
        assert_eq!(r.news.len(), 1);
        assert_eq!(r.news[0].headline, "SPY rallies");
    }
}
