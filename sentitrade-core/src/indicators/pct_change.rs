//! Period-over-period percent change of closes.
//!
//! pct[t] = close[t] / close[t-1] - 1. Index 0 is NaN.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct PctChange;

impl PctChange {
    pub fn new() -> Self {
        Self
    }

    /// Mean of the last `window` valid changes, or `None` if there are none.
    pub fn trailing_mean(&self, bars: &[Bar], window: usize) -> Option<f64> {
        let changes = self.compute(bars);
        let tail: Vec<f64> = changes
            .iter()
            .rev()
            .filter(|v| v.is_finite())
            .take(window.max(1))
            .copied()
            .collect();
        if tail.is_empty() {
            None
        } else {
            Some(tail.iter().sum::<f64>() / tail.len() as f64)
        }
    }
}

impl Indicator for PctChange {
    fn name(&self) -> &str {
        "pct_change"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        for i in 1..bars.len() {
            let prev = bars[i - 1].close;
            let curr = bars[i].close;
            if prev.is_nan() || curr.is_nan() || prev == 0.0 {
                continue;
            }
            out[i] = curr / prev - 1.0;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn pct_change_basic() {
        let out = PctChange.compute(&make_bars(&[100.0, 110.0, 99.0]));
        assert!(out[0].is_nan());
        assert_approx(out[1], 0.10, DEFAULT_EPSILON);
        assert_approx(out[2], -0.10, DEFAULT_EPSILON);
    }

    #[test]
    fn trailing_mean_uses_last_window() {
        let bars = make_bars(&[100.0, 200.0, 200.0, 220.0]);
        // last two changes: 0.0 and 0.1
        assert_approx(PctChange.trailing_mean(&bars, 2).unwrap(), 0.05, DEFAULT_EPSILON);
    }

    #[test]
    fn trailing_mean_empty() {
        assert_eq!(PctChange.trailing_mean(&make_bars(&[100.0]), 5), None);
    }

    #[test]
    fn zero_previous_close_skipped() {
        let out = PctChange.compute(&make_bars(&[0.0, 10.0]));
        assert!(out[1].is_nan());
    }
}
