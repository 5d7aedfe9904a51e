//! Price-series indicators used by the technical estimator.
//!
//! Indicators are pure functions: bar history in, a series of the same length
//! out. Warmup positions hold `f64::NAN`.

pub mod pct_change;
pub mod sma;

pub use pct_change::PctChange;
pub use sma::Sma;

use crate::domain::Bar;

/// A series-in, series-out indicator.
///
/// No value at index t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20").
    fn name(&self) -> &str;

    /// Number of leading NaN values before the first valid output.
    fn lookback(&self) -> usize;

    /// Compute over the full series. Output has the same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;

    /// Most recent valid value, if the series is long enough.
    fn latest(&self, bars: &[Bar]) -> Option<f64> {
        self.compute(bars).last().copied().filter(|v| !v.is_nan())
    }
}

/// Synthetic bars from close prices, one per calendar day from 2024-01-02.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
