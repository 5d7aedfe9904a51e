//! Market data gateway: quotes, daily history and headlines.

pub mod alpaca;
pub mod circuit_breaker;
pub mod cross_check;
pub mod http;
pub mod provider;
pub mod static_data;
pub mod yahoo;

pub use alpaca::AlpacaMarketData;
pub use circuit_breaker::CircuitBreaker;
pub use cross_check::CrossCheckedMarketData;
pub use http::JsonFetcher;
pub use provider::{DataError, MarketData};
pub use static_data::{demo_price, synthetic_bars, StaticMarketData};
pub use yahoo::YahooMarketData;
