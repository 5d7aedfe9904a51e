//! Price-action sentiment.
//!
//! Three signed signals, averaged:
//! - trend: sign(close - SMA(slow))
//! - short term: sign(SMA(fast) - SMA(slow))
//! - momentum: sign of the mean of the last few daily returns, zero inside
//!   the dead zone

use super::LabelBands;
use crate::domain::{Bar, SentimentResult};
use crate::indicators::{Indicator, PctChange, Sma};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub momentum_window: usize,
    pub momentum_dead_zone: f64,
    pub bands: LabelBands,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            fast_period: 5,
            slow_period: 20,
            momentum_window: 5,
            momentum_dead_zone: 0.01,
            bands: LabelBands {
                threshold: 0.3,
                base_offset: 0.4,
                max_confidence: 0.85,
            },
        }
    }
}

/// Calendar days of slack for market holidays inside a history window.
pub const HOLIDAY_SLACK_DAYS: i64 = 4;

impl TechnicalConfig {
    /// Daily bars needed before every signal is defined.
    pub fn min_bars(&self) -> usize {
        self.slow_period.max(self.momentum_window + 1)
    }

    /// Calendar days of history that hold at least `min_bars` trading days.
    pub fn min_history_days(&self) -> i64 {
        let bars = self.min_bars() as i64;
        (bars * 7 + 4) / 5 + HOLIDAY_SLACK_DAYS
    }
}

/// Component signals behind a technical estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSignals {
    pub trend: i8,
    pub short_term: i8,
    pub momentum: i8,
}

impl TechnicalSignals {
    pub fn combined(&self) -> f64 {
        (self.trend as f64 + self.short_term as f64 + self.momentum as f64) / 3.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct TechnicalSentiment {
    config: TechnicalConfig,
}

impl TechnicalSentiment {
    pub fn new(config: TechnicalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TechnicalConfig {
        &self.config
    }

    /// Signals for the last bar, or `None` without a full slow window.
    pub fn signals(&self, bars: &[Bar]) -> Option<TechnicalSignals> {
        let last = bars.last()?.close;
        let slow = Sma::new(self.config.slow_period).latest(bars)?;
        let fast = Sma::new(self.config.fast_period).latest(bars)?;
        let momentum = PctChange::new()
            .trailing_mean(bars, self.config.momentum_window)
            .unwrap_or(0.0);

        let dz = self.config.momentum_dead_zone;
        Some(TechnicalSignals {
            trend: if last > slow { 1 } else { -1 },
            short_term: if fast > slow { 1 } else { -1 },
            momentum: if momentum > dz {
                1
            } else if momentum < -dz {
                -1
            } else {
                0
            },
        })
    }

    /// Estimate from a daily series. Too little history gives `(0.5, neutral)`.
    pub fn estimate(&self, bars: &[Bar]) -> SentimentResult {
        match self.signals(bars) {
            Some(signals) => {
                let combined = signals.combined();
                let result = self.config.bands.classify(combined);
                debug!(?signals, combined, label = %result.label, "technical sentiment");
                result
            }
            None => SentimentResult::neutral(0.5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SentimentLabel;
    use crate::indicators::make_bars;

    #[test]
    fn empty_series_is_half_neutral() {
        let r = TechnicalSentiment::default().estimate(&[]);
        assert_eq!(r, SentimentResult::neutral(0.5));
    }

    #[test]
    fn short_series_is_half_neutral() {
        let r = TechnicalSentiment::default().estimate(&make_bars(&[100.0; 10]));
        assert_eq!(r, SentimentResult::neutral(0.5));
    }

    #[test]
    fn steady_uptrend_is_bullish() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 * 1.02f64.powi(i)).collect();
        let est = TechnicalSentiment::default();
        let s = est.signals(&make_bars(&closes)).unwrap();
        assert_eq!((s.trend, s.short_term, s.momentum), (1, 1, 1));
        let r = est.estimate(&make_bars(&closes));
        assert_eq!(r.label, SentimentLabel::Bullish);
        assert_eq!(r.probability, 0.85);
    }

    #[test]
    fn steady_downtrend_is_bearish() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 * 0.98f64.powi(i)).collect();
        let r = TechnicalSentiment::default().estimate(&make_bars(&closes));
        assert_eq!(r.label, SentimentLabel::Bearish);
    }

    #[test]
    fn history_window_counts_weekends() {
        let c = TechnicalConfig::default();
        assert_eq!(c.min_bars(), 20);
        assert_eq!(c.min_history_days(), 32);

        let long_momentum = TechnicalConfig {
            momentum_window: 30,
            ..TechnicalConfig::default()
        };
        assert_eq!(long_momentum.min_bars(), 31);
        assert_eq!(long_momentum.min_history_days(), 48);
    }

    #[test]
    fn flat_series_has_zero_momentum() {
        let est = TechnicalSentiment::default();
        let s = est.signals(&make_bars(&[100.0; 25])).unwrap();
        assert_eq!(s.momentum, 0);
        // close == sma and fast == slow both count as -1
        let r = est.estimate(&make_bars(&[100.0; 25]));
        assert_eq!(r.label, SentimentLabel::Bearish);
        assert!((r.probability - (2.0_f64 / 3.0 + 0.4).min(0.85)).abs() < 1e-12);
    }
}
