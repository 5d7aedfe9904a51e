//! TOML configuration.
//!
//! Every section is optional; a missing key takes its default. Credentials
//! never live in this file, they come from a `CredentialProvider`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sentitrade_core::engine::{BracketPolicy, DecisionPolicy};
use sentitrade_core::sentiment::{LabelBands, NewsSentimentConfig, TechnicalConfig};

use crate::backtest::BacktestParams;

/// Accepted `data.timeout_secs`. Slow providers fall back instead of stalling a cycle.
pub const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 5..=10;
pub const MAX_RETRIES: u32 = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SentitradeConfig {
    pub bot: BotSection,
    pub policy: PolicySection,
    pub sentiment: SentimentSection,
    pub technical: TechnicalSection,
    pub backtest: BacktestSection,
    pub broker: BrokerSection,
    pub data: DataSection,
    pub storage: StorageSection,
    pub server: ServerSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotSection {
    pub symbol: String,
    pub risk_fraction: f64,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            symbol: "SPY".into(),
            risk_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySection {
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub safety_margin: f64,
    pub news_lookback_days: i64,
    pub news_limit: usize,
    /// Attach take-profit/stop-loss exits to buys.
    pub bracket: bool,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            buy_threshold: 0.70,
            sell_threshold: 0.85,
            safety_margin: 0.95,
            news_lookback_days: 3,
            news_limit: 50,
            bracket: false,
            take_profit_pct: 0.20,
            stop_loss_pct: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SentimentSection {
    pub label_threshold: f64,
    pub base_offset: f64,
    pub max_confidence: f64,
    pub decay_horizon_hours: f64,
    pub weight_floor: f64,
}

impl Default for SentimentSection {
    fn default() -> Self {
        Self {
            label_threshold: 0.1,
            base_offset: 0.5,
            max_confidence: 0.95,
            decay_horizon_hours: 72.0,
            weight_floor: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TechnicalSection {
    pub fast_period: usize,
    pub slow_period: usize,
    pub momentum_window: usize,
    pub momentum_dead_zone: f64,
    pub label_threshold: f64,
    pub base_offset: f64,
    pub max_confidence: f64,
    pub history_days: i64,
}

impl Default for TechnicalSection {
    fn default() -> Self {
        Self {
            fast_period: 5,
            slow_period: 20,
            momentum_window: 5,
            momentum_dead_zone: 0.01,
            label_threshold: 0.3,
            base_offset: 0.4,
            max_confidence: 0.85,
            history_days: 45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestSection {
    pub initial_capital: f64,
    pub buy_momentum: f64,
    pub sell_momentum: f64,
    pub allocation: f64,
    pub trade_sample: usize,
}

impl Default for BacktestSection {
    fn default() -> Self {
        let p = BacktestParams::default();
        Self {
            initial_capital: 10_000.0,
            buy_momentum: p.buy_momentum,
            sell_momentum: p.sell_momentum,
            allocation: p.allocation,
            trade_sample: p.trade_sample,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    Simulated,
    Alpaca,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerSection {
    pub kind: BrokerKind,
    pub paper: bool,
    pub simulated_cash: f64,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            kind: BrokerKind::Simulated,
            paper: true,
            simulated_cash: 10_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSection {
    /// Per-request budget. Retries never extend a call past it.
    pub timeout_secs: u64,
    /// Extra attempts after a transient provider failure.
    pub max_retries: u32,
    pub cross_check_tolerance_pct: f64,
    /// Use the static demo source instead of any network provider.
    pub offline: bool,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 2,
            cross_check_tolerance_pct: 5.0,
            offline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    pub dir: String,
    pub enabled: bool,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            dir: "data/journal".into(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub addr: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:5001".into(),
        }
    }
}

impl SentitradeConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                key,
                reason: reason.into(),
            }
        }
        fn unit(key: &'static str, v: f64) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(invalid(key, format!("{v} is outside [0, 1]")))
            }
        }

        if self.bot.symbol.trim().is_empty() {
            return Err(invalid("bot.symbol", "must not be empty"));
        }
        unit("bot.risk_fraction", self.bot.risk_fraction)?;
        unit("policy.buy_threshold", self.policy.buy_threshold)?;
        unit("policy.sell_threshold", self.policy.sell_threshold)?;
        unit("policy.safety_margin", self.policy.safety_margin)?;
        if self.policy.news_lookback_days < 1 {
            return Err(invalid("policy.news_lookback_days", "must be at least 1"));
        }
        if self.policy.bracket && self.policy.stop_loss_pct >= 1.0 {
            return Err(invalid("policy.stop_loss_pct", "must be below 1"));
        }
        unit("sentiment.max_confidence", self.sentiment.max_confidence)?;
        unit("sentiment.weight_floor", self.sentiment.weight_floor)?;
        unit("technical.max_confidence", self.technical.max_confidence)?;
        if self.technical.fast_period == 0 || self.technical.fast_period >= self.technical.slow_period {
            return Err(invalid(
                "technical.fast_period",
                format!(
                    "must be positive and below slow_period ({})",
                    self.technical.slow_period
                ),
            ));
        }
        let min_days = self.technical_config().min_history_days();
        if self.technical.history_days < min_days {
            return Err(invalid(
                "technical.history_days",
                format!(
                    "{} calendar days cannot hold the bars the indicators need (minimum {min_days})",
                    self.technical.history_days
                ),
            ));
        }
        if !(self.backtest.initial_capital > 0.0) {
            return Err(invalid("backtest.initial_capital", "must be positive"));
        }
        unit("backtest.allocation", self.backtest.allocation)?;
        if self.backtest.sell_momentum >= self.backtest.buy_momentum {
            return Err(invalid(
                "backtest.sell_momentum",
                "must be below buy_momentum",
            ));
        }
        if self.broker.simulated_cash < 0.0 {
            return Err(invalid("broker.simulated_cash", "must not be negative"));
        }
        if !TIMEOUT_RANGE.contains(&self.data.timeout_secs) {
            return Err(invalid(
                "data.timeout_secs",
                format!(
                    "{} is outside {}..={}",
                    self.data.timeout_secs,
                    TIMEOUT_RANGE.start(),
                    TIMEOUT_RANGE.end()
                ),
            ));
        }
        if self.data.max_retries > MAX_RETRIES {
            return Err(invalid(
                "data.max_retries",
                format!("must be at most {MAX_RETRIES}"),
            ));
        }
        if self.data.cross_check_tolerance_pct <= 0.0 {
            return Err(invalid("data.cross_check_tolerance_pct", "must be positive"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.data.timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        RETRY_BASE_DELAY
    }

    pub fn decision_policy(&self) -> DecisionPolicy {
        let p = &self.policy;
        DecisionPolicy {
            buy_threshold: p.buy_threshold,
            sell_threshold: p.sell_threshold,
            safety_margin: p.safety_margin,
            news_lookback_days: p.news_lookback_days,
            news_limit: p.news_limit,
            history_days: self.technical.history_days,
            bracket: p.bracket.then_some(BracketPolicy {
                take_profit_pct: p.take_profit_pct,
                stop_loss_pct: p.stop_loss_pct,
            }),
        }
    }

    pub fn news_config(&self) -> NewsSentimentConfig {
        let s = &self.sentiment;
        NewsSentimentConfig {
            bands: LabelBands {
                threshold: s.label_threshold,
                base_offset: s.base_offset,
                max_confidence: s.max_confidence,
            },
            decay_horizon_hours: s.decay_horizon_hours,
            weight_floor: s.weight_floor,
        }
    }

    pub fn technical_config(&self) -> TechnicalConfig {
        let t = &self.technical;
        TechnicalConfig {
            fast_period: t.fast_period,
            slow_period: t.slow_period,
            momentum_window: t.momentum_window,
            momentum_dead_zone: t.momentum_dead_zone,
            bands: LabelBands {
                threshold: t.label_threshold,
                base_offset: t.base_offset,
                max_confidence: t.max_confidence,
            },
        }
    }

    pub fn backtest_params(&self) -> BacktestParams {
        BacktestParams {
            buy_momentum: self.backtest.buy_momentum,
            sell_momentum: self.backtest.sell_momentum,
            allocation: self.backtest.allocation,
            trade_sample: self.backtest.trade_sample,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let c = SentitradeConfig::from_toml("").unwrap();
        assert_eq!(c, SentitradeConfig::default());
        assert_eq!(c.bot.symbol, "SPY");
        assert_eq!(c.broker.kind, BrokerKind::Simulated);
        assert_eq!(c.server.addr, "0.0.0.0:5001");
        assert_eq!(c.decision_policy(), DecisionPolicy::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let c = SentitradeConfig::from_toml(
            r#"
            [bot]
            symbol = "NVDA"

            [broker]
            kind = "alpaca"
            paper = true

            [data]
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(c.bot.symbol, "NVDA");
        assert_eq!(c.bot.risk_fraction, 0.5);
        assert_eq!(c.broker.kind, BrokerKind::Alpaca);
        assert_eq!(c.timeout(), Duration::from_secs(5));
        assert_eq!(c.policy.buy_threshold, 0.70);
    }

    #[test]
    fn timeout_is_bounded() {
        let err = SentitradeConfig::from_toml("[data]\ntimeout_secs = 120\n").unwrap_err();
        assert!(err.to_string().contains("data.timeout_secs"));
        assert!(SentitradeConfig::from_toml("[data]\ntimeout_secs = 0\n").is_err());
        assert!(SentitradeConfig::from_toml("[data]\ntimeout_secs = 3\n").is_err());
        assert!(SentitradeConfig::from_toml("[data]\ntimeout_secs = 30\n").is_err());
        assert!(SentitradeConfig::from_toml("[data]\ntimeout_secs = 5\n").is_ok());
    }

    #[test]
    fn retries_are_configurable_and_bounded() {
        assert_eq!(SentitradeConfig::default().data.max_retries, 2);
        let c = SentitradeConfig::from_toml("[data]\nmax_retries = 0\n").unwrap();
        assert_eq!(c.data.max_retries, 0);
        let err = SentitradeConfig::from_toml("[data]\nmax_retries = 10\n").unwrap_err();
        assert!(err.to_string().contains("data.max_retries"));
    }

    #[test]
    fn history_window_must_hold_slow_average() {
        let err = SentitradeConfig::from_toml("[technical]\nhistory_days = 20\n").unwrap_err();
        assert!(err.to_string().contains("technical.history_days"));

        let floor = SentitradeConfig::default().technical_config().min_history_days();
        let at_floor = format!("[technical]\nhistory_days = {floor}\n");
        assert!(SentitradeConfig::from_toml(&at_floor).is_ok());
        let below = format!("[technical]\nhistory_days = {}\n", floor - 1);
        assert!(SentitradeConfig::from_toml(&below).is_err());

        // A longer slow average raises the floor past the default window.
        let err = SentitradeConfig::from_toml("[technical]\nslow_period = 40\n").unwrap_err();
        assert!(err.to_string().contains("technical.history_days"));
    }

    #[test]
    fn out_of_range_fraction_names_the_key() {
        let err = SentitradeConfig::from_toml("[bot]\nrisk_fraction = 1.5\n").unwrap_err();
        match err {
            ConfigError::Invalid { key, .. } => assert_eq!(key, "bot.risk_fraction"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SentitradeConfig::from_toml("[bot]\napi_key = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn bracket_flag_builds_policy() {
        let c = SentitradeConfig::from_toml("[policy]\nbracket = true\n").unwrap();
        let b = c.decision_policy().bracket.unwrap();
        assert_eq!(b.take_profit_pct, 0.20);
        assert_eq!(b.stop_loss_pct, 0.05);
    }

    #[test]
    fn technical_periods_are_checked() {
        let err = SentitradeConfig::from_toml("[technical]\nfast_period = 30\n").unwrap_err();
        assert!(err.to_string().contains("technical.fast_period"));
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = SentitradeConfig::from_file(Path::new("/nonexistent/sentitrade.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
