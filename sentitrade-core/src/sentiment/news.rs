//! Recency-weighted headline sentiment.
//!
//! Each headline's polarity is multiplied by a weight that decays linearly
//! from 1.0 at publication to `weight_floor` at `decay_horizon_hours`, and the
//! weighted polarities are averaged.

use super::{LabelBands, Lexicon, SentimentError, TextPolarity};
use crate::domain::{NewsHeadline, SentimentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewsSentimentConfig {
    pub bands: LabelBands,
    pub decay_horizon_hours: f64,
    pub weight_floor: f64,
}

impl Default for NewsSentimentConfig {
    fn default() -> Self {
        Self {
            bands: LabelBands {
                threshold: 0.1,
                base_offset: 0.5,
                max_confidence: 0.95,
            },
            decay_horizon_hours: 72.0,
            weight_floor: 0.1,
        }
    }
}

impl NewsSentimentConfig {
    /// Recency weight for a headline `age_hours` old.
    pub fn weight(&self, age_hours: f64) -> f64 {
        if self.decay_horizon_hours <= 0.0 {
            return 1.0;
        }
        (1.0 - age_hours.max(0.0) / self.decay_horizon_hours).max(self.weight_floor)
    }
}

pub struct NewsSentiment<P: TextPolarity = Lexicon> {
    scorer: P,
    config: NewsSentimentConfig,
}

impl NewsSentiment<Lexicon> {
    pub fn new(config: NewsSentimentConfig) -> Self {
        Self::with_scorer(Lexicon::new(), config)
    }
}

impl Default for NewsSentiment<Lexicon> {
    fn default() -> Self {
        Self::new(NewsSentimentConfig::default())
    }
}

impl<P: TextPolarity> NewsSentiment<P> {
    pub fn with_scorer(scorer: P, config: NewsSentimentConfig) -> Self {
        Self { scorer, config }
    }

    pub fn config(&self) -> &NewsSentimentConfig {
        &self.config
    }

    /// Score dated headlines as of `now`. Empty input is `(0.0, neutral)`.
    pub fn estimate(
        &self,
        headlines: &[NewsHeadline],
        now: DateTime<Utc>,
    ) -> Result<SentimentResult, SentimentError> {
        let weighted = headlines
            .iter()
            .map(|h| {
                let polarity = self.scorer.polarity(&h.text)?;
                Ok(polarity * self.config.weight(h.age_hours(now)))
            })
            .collect::<Result<Vec<f64>, SentimentError>>()?;
        Ok(self.reduce(&weighted))
    }

    /// Score undated text, every item at full weight.
    pub fn estimate_texts<S: AsRef<str>>(
        &self,
        texts: &[S],
    ) -> Result<SentimentResult, SentimentError> {
        let scores = texts
            .iter()
            .map(|t| self.scorer.polarity(t.as_ref()))
            .collect::<Result<Vec<f64>, SentimentError>>()?;
        Ok(self.reduce(&scores))
    }

    fn reduce(&self, weighted: &[f64]) -> SentimentResult {
        if weighted.is_empty() {
            return SentimentResult::neutral(0.0);
        }
        let mean = weighted.iter().sum::<f64>() / weighted.len() as f64;
        let result = self.config.bands.classify(mean);
        debug!(
            headlines = weighted.len(),
            polarity = mean,
            label = %result.label,
            "news sentiment"
        );
        result
    }
}
