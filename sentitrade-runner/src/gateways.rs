//! Market data and broker selection, done once per process.

use std::sync::Arc;

use tracing::{info, warn};

use sentitrade_core::broker::{Broker, BrokerError, CredentialProvider, LiveBroker, SimulatedBroker};
use sentitrade_core::data::{
    AlpacaMarketData, CircuitBreaker, CrossCheckedMarketData, DataError, JsonFetcher, MarketData,
    StaticMarketData, YahooMarketData,
};
use thiserror::Error;

use crate::config::{BrokerKind, SentitradeConfig};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("market data: {0}")]
    Data(#[from] DataError),
    #[error("broker: {0}")]
    Broker(#[from] BrokerError),
}

/// The collaborators a session is built on.
#[derive(Clone)]
pub struct Gateways {
    pub market: Arc<dyn MarketData>,
    pub broker: Arc<dyn Broker>,
}

impl Gateways {
    /// Demo prices, synthetic history and an in-memory broker.
    pub fn offline(starting_cash: f64) -> Self {
        let market: Arc<dyn MarketData> = Arc::new(StaticMarketData::demo());
        let broker = Arc::new(SimulatedBroker::new(market.clone(), starting_cash));
        Self { market, broker }
    }

    /// Build from config. Alpaca market data is used next to Yahoo when the
    /// credentials resolve; otherwise Yahoo alone.
    pub fn from_config(
        config: &SentitradeConfig,
        credentials: &dyn CredentialProvider,
    ) -> Result<Self, GatewayError> {
        if config.data.offline {
            info!("offline mode: static market data, simulated broker");
            return Ok(Self::offline(config.broker.simulated_cash));
        }

        let timeout = config.timeout();
        let fetcher = || {
            JsonFetcher::new(timeout, Arc::new(CircuitBreaker::default_provider())).map(|f| {
                f.with_retries(config.data.max_retries, config.retry_base_delay())
            })
        };
        let yahoo: Arc<dyn MarketData> = Arc::new(YahooMarketData::new(fetcher()?));

        let alpaca = fetcher().and_then(|fetcher| AlpacaMarketData::new(fetcher, credentials));
        let market: Arc<dyn MarketData> = match alpaca {
            Ok(alpaca) => Arc::new(CrossCheckedMarketData::new(
                Arc::new(alpaca),
                yahoo,
                config.data.cross_check_tolerance_pct,
            )),
            Err(e) => {
                warn!(error = %e, "alpaca market data unavailable, using yahoo only");
                yahoo
            }
        };

        let broker: Arc<dyn Broker> = match config.broker.kind {
            BrokerKind::Simulated => Arc::new(SimulatedBroker::new(
                market.clone(),
                config.broker.simulated_cash,
            )),
            BrokerKind::Alpaca => Arc::new(LiveBroker::new(credentials, config.broker.paper, timeout)?),
        };
        info!(market = market.name(), broker = broker.name(), "gateways ready");
        Ok(Self { market, broker })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentitrade_core::broker::{Credentials, StaticCredentials};

    #[test]
    fn offline_config_needs_no_credentials() {
        let mut config = SentitradeConfig::default();
        config.data.offline = true;
        config.broker.simulated_cash = 2_500.0;
        let g = Gateways::from_config(&config, &StaticCredentials(Credentials::new("", ""))).unwrap();
        assert_eq!(g.broker.name(), "simulation");
        assert_eq!(g.broker.account().unwrap().cash, 2_500.0);
        assert!(g.market.quote("SPY").unwrap().is_valid());
    }

    #[test]
    fn live_broker_requires_credentials() {
        let mut config = SentitradeConfig::default();
        config.broker.kind = BrokerKind::Alpaca;
        let err = Gateways::from_config(&config, &StaticCredentials(Credentials::new("", "")))
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::Broker(BrokerError::Credentials(_))));
    }
}
