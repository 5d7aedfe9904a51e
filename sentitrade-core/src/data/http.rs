//! Blocking JSON GET with retries and a circuit breaker.
//!
//! Shared by the HTTP market data providers. Order submission does not go
//! through here: a retried POST could place an order twice.
//!
//! The client timeout bounds the whole call, retries and backoff included.

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Build a blocking client with a bounded timeout.
pub fn blocking_client(timeout: Duration) -> Result<reqwest::blocking::Client, DataError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
        .map_err(|e| DataError::Unavailable(format!("failed to build HTTP client: {e}")))
}

pub struct JsonFetcher {
    client: reqwest::blocking::Client,
    breaker: Arc<CircuitBreaker>,
    timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
}

impl JsonFetcher {
    pub fn new(timeout: Duration, breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            client: blocking_client(timeout)?,
            breaker,
            timeout,
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn is_available(&self) -> bool {
        self.breaker.is_allowed()
    }

    /// GET `url` and decode the body. `symbol` only labels errors.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, String)],
        symbol: &str,
    ) -> Result<T, DataError> {
        let started = Instant::now();
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                if started.elapsed() + delay >= self.timeout {
                    debug!(%symbol, attempt, "request budget spent, not retrying");
                    break;
                }
                std::thread::sleep(delay);
            }
            if !self.breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let remaining = self.timeout.saturating_sub(started.elapsed());
            let mut request = self.client.get(url).timeout(remaining);
            for (name, value) in headers {
                request = request.header(*name, value);
            }

            let resp = match request.send() {
                Ok(resp) => resp,
                Err(e) => {
                    let err = DataError::from_transport(e);
                    debug!(%symbol, attempt, error = %err, "request failed");
                    if err.is_transient() {
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            };

            let status = resp.status();
            match status {
                StatusCode::FORBIDDEN => {
                    warn!(%symbol, "provider returned 403, tripping circuit breaker");
                    self.breaker.trip();
                    return Err(DataError::CircuitBreakerTripped);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    self.breaker.record_failure();
                    let retry_after = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(60);
                    last_error = Some(DataError::RateLimited {
                        retry_after_secs: retry_after,
                    });
                    continue;
                }
                StatusCode::UNAUTHORIZED => {
                    return Err(DataError::AuthenticationRequired(format!(
                        "provider rejected credentials for {symbol}"
                    )));
                }
                StatusCode::NOT_FOUND => {
                    return Err(DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    });
                }
                s if !s.is_success() => {
                    self.breaker.record_failure();
                    last_error = Some(DataError::Unavailable(format!("HTTP {s} for {symbol}")));
                    continue;
                }
                _ => {}
            }

            let body: T = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            })?;
            self.breaker.record_success();
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| DataError::Unavailable("max retries exceeded".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn fetcher(timeout: Duration) -> JsonFetcher {
        JsonFetcher::new(timeout, Arc::new(CircuitBreaker::default_provider())).unwrap()
    }

    /// Accepts connections and never writes a byte back.
    fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming().flatten() {
                held.push(stream);
            }
        });
        format!("http://{addr}/quote")
    }

    /// Answers every request with 503 and counts them.
    fn unavailable_server(hits: Arc<AtomicUsize>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for mut stream in listener.incoming().flatten() {
                hits.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(
                    b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                );
            }
        });
        format!("http://{addr}/quote")
    }

    #[test]
    fn stalled_provider_fails_once_within_timeout() {
        let url = silent_server();
        let timeout = Duration::from_millis(400);
        let started = Instant::now();
        let result = fetcher(timeout).get_json::<serde_json::Value>(&url, &[], "SPY");
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(DataError::Timeout(_))), "{result:?}");
        assert!(elapsed < timeout * 2, "took {elapsed:?}");
    }

    #[test]
    fn retries_stop_when_budget_is_spent() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = unavailable_server(hits.clone());
        let timeout = Duration::from_millis(800);
        let started = Instant::now();
        let result = fetcher(timeout).get_json::<serde_json::Value>(&url, &[], "SPY");
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(DataError::Unavailable(_))), "{result:?}");
        assert!(elapsed < timeout + Duration::from_millis(300), "took {elapsed:?}");
        // First retry waits 500ms; the second would wait 1s and is skipped.
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn zero_retries_makes_a_single_attempt() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = unavailable_server(hits.clone());
        let result = fetcher(Duration::from_secs(5))
            .with_retries(0, Duration::from_millis(10))
            .get_json::<serde_json::Value>(&url, &[], "SPY");

        assert!(matches!(result, Err(DataError::Unavailable(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
