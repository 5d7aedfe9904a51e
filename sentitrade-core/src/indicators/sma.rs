//! Simple moving average of closes.
//!
//! First valid value at index `period - 1`. Any NaN inside the window makes
//! that output NaN.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        if bars.len() < self.period {
            return out;
        }

        let mut sum = 0.0;
        let mut nan_count = 0usize;
        for (i, bar) in bars.iter().enumerate() {
            if bar.close.is_nan() {
                nan_count += 1;
            } else {
                sum += bar.close;
            }
            if i >= self.period {
                let leaving = bars[i - self.period].close;
                if leaving.is_nan() {
                    nan_count -= 1;
                } else {
                    sum -= leaving;
                }
            }
            if i + 1 >= self.period && nan_count == 0 {
                out[i] = sum / self.period as f64;
            }
        }
        out
    }
}
