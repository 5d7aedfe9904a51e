//! Two providers cross-checked against each other.
//!
//! Quotes: when both answer and agree within `tolerance_pct`, the primary
//! (more real-time) price wins; when they disagree, the secondary wins. When
//! only one answers, that one is used. History prefers the secondary, news
//! prefers the primary, each falling back to the other.

use super::provider::{DataError, MarketData};
use crate::domain::{Bar, NewsHeadline, Quote};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_TOLERANCE_PCT: f64 = 5.0;

pub struct CrossCheckedMarketData {
    primary: Arc<dyn MarketData>,
    secondary: Arc<dyn MarketData>,
    tolerance_pct: f64,
}

impl CrossCheckedMarketData {
    pub fn new(
        primary: Arc<dyn MarketData>,
        secondary: Arc<dyn MarketData>,
        tolerance_pct: f64,
    ) -> Self {
        Self {
            primary,
            secondary,
            tolerance_pct,
        }
    }

    /// Pick between two quotes by relative disagreement.
    pub fn reconcile(&self, primary: Quote, secondary: Quote) -> Quote {
        let diff_pct = (primary.price - secondary.price).abs() / secondary.price * 100.0;
        if diff_pct < self.tolerance_pct {
            debug!(symbol = %primary.symbol, diff_pct, "quotes agree, using primary");
            primary
        } else {
            warn!(
                symbol = %primary.symbol,
                primary = primary.price,
                secondary = secondary.price,
                diff_pct,
                "quote discrepancy, using secondary"
            );
            secondary
        }
    }
}

fn valid(result: Result<Quote, DataError>, provider: &str) -> Result<Quote, DataError> {
    let quote = result?;
    if quote.is_valid() {
        Ok(quote)
    } else {
        Err(DataError::Unavailable(format!(
            "{provider} returned invalid price {}",
            quote.price
        )))
    }
}

impl MarketData for CrossCheckedMarketData {
    fn name(&self) -> &str {
        "cross_checked"
    }

    fn quote(&self, symbol: &str) -> Result<Quote, DataError> {
        let p = valid(self.primary.quote(symbol), self.primary.name());
        let s = valid(self.secondary.quote(symbol), self.secondary.name());
        match (p, s) {
            (Ok(p), Ok(s)) => Ok(self.reconcile(p, s)),
            (Ok(p), Err(e)) => {
                debug!(%symbol, error = %e, "secondary quote failed");
                Ok(p)
            }
            (Err(e), Ok(s)) => {
                debug!(%symbol, error = %e, "primary quote failed");
                Ok(s)
            }
            (Err(pe), Err(se)) => Err(DataError::Unavailable(format!(
                "no quote for {symbol}: {}: {pe}; {}: {se}",
                self.primary.name(),
                self.secondary.name()
            ))),
        }
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        match self.secondary.price_history(symbol, start, end) {
            Ok(bars) if !bars.is_empty() => Ok(bars),
            Ok(_) => self.primary.price_history(symbol, start, end),
            Err(e) => {
                debug!(%symbol, error = %e, "secondary history failed, trying primary");
                self.primary.price_history(symbol, start, end)
            }
        }
    }

    fn news(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NewsHeadline>, DataError> {
        self.primary
            .news(symbol, start, end, limit)
            .or_else(|e| {
                debug!(%symbol, error = %e, "primary news failed, trying secondary");
                self.secondary.news(symbol, start, end, limit)
            })
    }

    fn is_available(&self) -> bool {
        self.primary.is_available() || self.secondary.is_available()
    }
}
