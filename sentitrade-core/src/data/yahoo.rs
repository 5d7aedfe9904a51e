//! Yahoo Finance chart API: daily history and last-close quotes.
//!
//! Yahoo has no official API and changes shape without notice; parse errors
//! surface as `ResponseFormatChanged`. It has no news feed here.

use super::http::JsonFetcher;
use super::provider::{DataError, MarketData};
use crate::domain::{Bar, NewsHeadline, Quote, QuoteSource};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

pub struct YahooMarketData {
    fetcher: JsonFetcher,
}

impl YahooMarketData {
    pub fn new(fetcher: JsonFetcher) -> Self {
        Self { fetcher }
    }

    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = (end + Duration::days(1))
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp()
            - 1;
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    fn parse_chart(symbol: &str, resp: ChartResponse) -> Result<Vec<Bar>, DataError> {
        let result = match (resp.chart.result, resp.chart.error) {
            (Some(result), _) => result,
            (None, Some(err)) if err.code == "Not Found" => {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                })
            }
            (None, Some(err)) => {
                return Err(DataError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                )))
            }
            (None, None) => {
                return Err(DataError::ResponseFormatChanged(
                    "empty result with no error".into(),
                ))
            }
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;
        // A valid symbol with no trading days in range has no timestamps.
        let timestamps = data.timestamp.unwrap_or_default();
        let series = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;
            // Holidays and halted sessions come back with a null close.
            let Some(close) = series.close.get(i).copied().flatten() else {
                continue;
            };
            let pick = |v: &Vec<Option<f64>>| v.get(i).copied().flatten().unwrap_or(close);
            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open: pick(&series.open),
                high: pick(&series.high),
                low: pick(&series.low),
                close,
                volume: series.volume.get(i).copied().flatten().unwrap_or(0),
            });
        }
        Ok(bars)
    }
}

impl MarketData for YahooMarketData {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let today = Utc::now().date_naive();
        let bars = self.price_history(symbol, today - Duration::days(7), today)?;
        let last = bars.last().ok_or_else(|| {
            DataError::Unavailable(format!("no recent close for {symbol}"))
        })?;
        Ok(Quote::new(symbol, last.close, QuoteSource::YahooFinance))
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let url = Self::chart_url(symbol, start, end);
        let resp: ChartResponse = self.fetcher.get_json(&url, &[], symbol)?;
        Self::parse_chart(symbol, resp)
    }

    fn news(
        &self,
        _symbol: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<NewsHeadline>, DataError> {
        Err(DataError::Unsupported {
            provider: self.name().to_string(),
            operation: "news",
        })
    }

    fn is_available(&self) -> bool {
        self.fetcher.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<Bar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooMarketData::parse_chart("SPY", resp)
    }

    #[test]
    fn parses_bars_and_skips_null_closes() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"open":[470.0,null,468.0],"high":[472.0,null,470.0],
            "low":[468.0,null,466.0],"close":[471.0,null,469.0],"volume":[100,null,200]}]}}],
            "error":null}}"#;
        let bars = parse(json).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 471.0);
        assert_eq!(bars[1].volume, 200);
        assert!(bars[0].date < bars[1].date);
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        assert!(matches!(parse(json), Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn missing_timestamps_is_empty_history() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{"open":[],"high":[],
            "low":[],"close":[],"volume":[]}]}}],"error":null}}"#;
        assert!(parse(json).unwrap().is_empty());
    }

    #[test]
    fn chart_url_covers_whole_end_day() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let url = YahooMarketData::chart_url("SPY", start, end);
        assert!(url.contains("period1=1704067200"));
        assert!(url.contains("period2=1706745599"));
    }
}
