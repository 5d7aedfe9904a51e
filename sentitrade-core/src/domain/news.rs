use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single news headline for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsHeadline {
    pub symbol: String,
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
}

impl NewsHeadline {
    /// Age of the headline in hours relative to `now`. Future timestamps count as age zero.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let secs = (now - self.published_at).num_seconds().max(0);
        secs as f64 / 3600.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn age_in_hours() {
        let now = Utc::now();
        let h = NewsHeadline {
            symbol: "SPY".into(),
            text: "x".into(),
            published_at: now - Duration::hours(6),
            source: "test".into(),
        };
        assert!((h.age_hours(now) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn future_headline_has_zero_age() {
        let now = Utc::now();
        let h = NewsHeadline {
            symbol: "SPY".into(),
            text: "x".into(),
            published_at: now + Duration::hours(1),
            source: "test".into(),
        };
        assert_eq!(h.age_hours(now), 0.0);
    }
}
