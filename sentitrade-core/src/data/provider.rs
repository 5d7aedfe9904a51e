//! Market data gateway trait and its error type.
//!
//! Quotes, daily history and headlines come through [`MarketData`] so the
//! decision engine can run against live providers, a cross-checked pair, or
//! static data in tests.

use crate::broker::credentials::CredentialError;
use crate::domain::{Bar, NewsHeadline, Quote};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("data unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: &'static str,
    },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),
}

impl From<CredentialError> for DataError {
    fn from(e: CredentialError) -> Self {
        DataError::AuthenticationRequired(e.to_string())
    }
}

impl DataError {
    /// Classify a transport failure from the HTTP client.
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DataError::Timeout(e.to_string())
        } else {
            DataError::Unavailable(e.to_string())
        }
    }

    /// Worth retrying on the same provider. A timeout already spent the
    /// whole request budget, so it is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::Unavailable(_) | DataError::RateLimited { .. }
        )
    }
}

/// Source of quotes, daily bars and news for a symbol.
pub trait MarketData: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Latest price for `symbol`.
    fn quote(&self, symbol: &str) -> Result<Quote, DataError>;

    /// Daily bars in `[start, end]`, oldest first.
    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError>;

    /// Headlines published in `[start, end]`, at most `limit`.
    fn news(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NewsHeadline>, DataError>;

    /// False while the provider is known to refuse requests.
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: MarketData + ?Sized> MarketData for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn quote(&self, symbol: &str) -> Result<Quote, DataError> {
        (**self).quote(symbol)
    }

    fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        (**self).price_history(symbol, start, end)
    }

    fn news(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NewsHeadline>, DataError> {
        (**self).news(symbol, start, end, limit)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
