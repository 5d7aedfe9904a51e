//! Decision engine: sentiment, sizing and the buy/sell/hold rule.
//!
//! Everything here is side-effect free. [`DecisionEngine::plan`] turns a
//! sentiment reading and a sizing into a [`Plan`]; the session carries it out.

use crate::data::MarketData;
use crate::domain::{
    Bar, OrderSide, Position, SentimentLabel, SentimentResult, SentimentSource,
};
use crate::sentiment::{NewsSentiment, NewsSentimentConfig, TechnicalConfig, TechnicalSentiment};
use crate::sizers::{CashFractionSizer, Sizer, Sizing};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const NO_CAPITAL_REASON: &str = "no capital/invalid price";
pub const NO_SIGNAL_REASON: &str = "No clear signal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    /// Bullish confidence must exceed this to buy.
    pub buy_threshold: f64,
    /// Bearish confidence must exceed this to close a long.
    pub sell_threshold: f64,
    pub safety_margin: f64,
    pub news_lookback_days: i64,
    pub news_limit: usize,
    /// Calendar days of history fed to the technical estimator.
    pub history_days: i64,
    /// Attach take-profit/stop-loss exits to buys.
    pub bracket: Option<BracketPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketPolicy {
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            buy_threshold: 0.70,
            sell_threshold: 0.85,
            safety_margin: crate::sizers::cash_fraction::DEFAULT_SAFETY_MARGIN,
            news_lookback_days: 3,
            news_limit: 50,
            history_days: 45,
            bracket: None,
        }
    }
}

/// What a cycle intends to do, before touching the broker.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Buy { quantity: u64 },
    Sell { quantity: u64 },
    Hold { reason: String },
}

impl Plan {
    fn hold(reason: impl Into<String>) -> Self {
        Plan::Hold {
            reason: reason.into(),
        }
    }
}

pub struct DecisionEngine {
    policy: DecisionPolicy,
    news: NewsSentiment,
    technical: TechnicalSentiment,
    sizer: CashFractionSizer,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(
            DecisionPolicy::default(),
            NewsSentimentConfig::default(),
            TechnicalConfig::default(),
        )
    }
}

impl DecisionEngine {
    pub fn new(
        policy: DecisionPolicy,
        news: NewsSentimentConfig,
        technical: TechnicalConfig,
    ) -> Self {
        let sizer = CashFractionSizer::new(policy.safety_margin);
        Self {
            policy,
            news: NewsSentiment::new(news),
            technical: TechnicalSentiment::new(technical),
            sizer,
        }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn size(&self, cash: f64, buying_power: f64, price: f64, risk_fraction: f64) -> Sizing {
        self.sizer.size(cash, buying_power, price, risk_fraction)
    }

    /// News sentiment, falling back to price action when news is missing,
    /// empty, or cannot be scored.
    pub fn sentiment(
        &self,
        market: &dyn MarketData,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> (SentimentResult, SentimentSource) {
        let start = now - Duration::days(self.policy.news_lookback_days);
        match market.news(symbol, start, now, self.policy.news_limit) {
            Ok(headlines) if headlines.is_empty() => {
                debug!(%symbol, "no headlines, using technical sentiment");
            }
            Ok(headlines) => match self.news.estimate(&headlines, now) {
                Ok(result) => return (result, SentimentSource::News),
                Err(e) => warn!(%symbol, error = %e, "news scoring failed, using technical sentiment"),
            },
            Err(e) => debug!(%symbol, error = %e, "news unavailable, using technical sentiment"),
        }
        self.technical_sentiment(market, symbol, now)
    }

    pub fn technical_sentiment(
        &self,
        market: &dyn MarketData,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> (SentimentResult, SentimentSource) {
        let end = now.date_naive();
        let start = end - Duration::days(self.policy.history_days);
        match market.price_history(symbol, start, end) {
            Ok(bars) => self.from_bars(&bars),
            Err(e) => {
                warn!(%symbol, error = %e, "price history unavailable, sentiment defaults to neutral");
                (SentimentResult::neutral(0.5), SentimentSource::Default)
            }
        }
    }

    fn from_bars(&self, bars: &[Bar]) -> (SentimentResult, SentimentSource) {
        let source = match self.technical.signals(bars) {
            Some(_) => SentimentSource::Technical,
            None => SentimentSource::Default,
        };
        (self.technical.estimate(bars), source)
    }

    /// The trading rule. `position` is the current holding in the symbol.
    pub fn plan(
        &self,
        sentiment: &SentimentResult,
        sizing: &Sizing,
        position: Option<&Position>,
    ) -> Plan {
        if sizing.is_empty() {
            return Plan::hold(NO_CAPITAL_REASON);
        }
        match sentiment.label {
            SentimentLabel::Bullish if sentiment.probability > self.policy.buy_threshold => {
                Plan::Buy {
                    quantity: sizing.quantity,
                }
            }
            SentimentLabel::Bearish if sentiment.probability > self.policy.sell_threshold => {
                match position.filter(|p| p.is_long()) {
                    Some(p) => Plan::Sell {
                        quantity: p.quantity.unsigned_abs(),
                    },
                    None => Plan::hold(format!(
                        "Bearish signal ({:.2} confidence) but no long position to close",
                        sentiment.probability
                    )),
                }
            }
            _ => Plan::hold(NO_SIGNAL_REASON),
        }
    }

    /// Whether the bearish branch will need the current position.
    pub fn needs_position(&self, sentiment: &SentimentResult, sizing: &Sizing) -> bool {
        !sizing.is_empty()
            && sentiment.label == SentimentLabel::Bearish
            && sentiment.probability > self.policy.sell_threshold
    }

    pub fn order_reason(
        side: OrderSide,
        sentiment: &SentimentResult,
        previous: Option<OrderSide>,
    ) -> String {
        match side {
            OrderSide::Buy => format!(
                "Strong bullish signal ({:.2} confidence)",
                sentiment.probability
            ),
            OrderSide::Sell if previous == Some(OrderSide::Buy) => format!(
                "Strong bearish signal ({:.2} confidence) - liquidating after buy",
                sentiment.probability
            ),
            OrderSide::Sell => format!(
                "Strong bearish signal ({:.2} confidence) - closing positions",
                sentiment.probability
            ),
        }
    }
}
