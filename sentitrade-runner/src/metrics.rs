//! Backtest statistics as pure functions over a close series.
//!
//! Percent figures are in percent units (12.5 means 12.5%).

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Close-to-close returns, skipping a zero or non-finite previous close.
pub fn pct_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0].is_finite() && w[1].is_finite() && w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation. 0.0 with fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Annualized volatility of daily returns, in percent.
pub fn annualized_volatility_pct(closes: &[f64]) -> f64 {
    std_dev(&pct_returns(closes)) * TRADING_DAYS.sqrt() * 100.0
}

/// Deepest fall below the running peak, in percent (≤ 0).
pub fn max_drawdown_pct(closes: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &c in closes {
        if c > peak {
            peak = c;
        }
        if peak > 0.0 {
            worst = worst.min(c / peak - 1.0);
        }
    }
    worst * 100.0
}

/// `(end / start - 1) × 100`, or 0.0 for a non-positive start.
pub fn return_pct(start: f64, end: f64) -> f64 {
    if start > 0.0 && start.is_finite() && end.is_finite() {
        (end / start - 1.0) * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_skip_zero_base() {
        let r = pct_returns(&[100.0, 110.0, 0.0, 50.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.1).abs() < 1e-12);
        assert!((r[1] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn flat_series_has_no_volatility_or_drawdown() {
        let flat = vec![100.0; 300];
        assert_eq!(annualized_volatility_pct(&flat), 0.0);
        assert_eq!(max_drawdown_pct(&flat), 0.0);
    }

    #[test]
    fn volatility_known_value() {
        // returns +1%, -1%: sample std = sqrt(2) × 0.01 / sqrt(1) ≈ 0.014142
        let closes = [100.0, 101.0, 99.99];
        let r = pct_returns(&closes);
        let expected = std_dev(&r) * 252f64.sqrt() * 100.0;
        assert!((annualized_volatility_pct(&closes) - expected).abs() < 1e-12);
        assert!(expected > 22.0 && expected < 23.0);
    }

    #[test]
    fn drawdown_known_value() {
        let dd = max_drawdown_pct(&[100.0, 110.0, 90.0, 95.0]);
        assert!((dd - (90.0 / 110.0 - 1.0) * 100.0).abs() < 1e-10);
    }

    #[test]
    fn drawdown_empty() {
        assert_eq!(max_drawdown_pct(&[]), 0.0);
    }

    #[test]
    fn single_value_std_is_zero() {
        assert_eq!(std_dev(&[3.0]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn return_pct_guards_zero_start() {
        assert_eq!(return_pct(0.0, 10.0), 0.0);
        assert!((return_pct(100.0, 110.0) - 10.0).abs() < 1e-12);
    }
}
