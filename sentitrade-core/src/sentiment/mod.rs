//! Sentiment estimation: news headlines first, price action as fallback.
//!
//! Both estimators reduce their input to a continuous score and map it to a
//! [`SentimentResult`] through [`LabelBands`].

pub mod lexicon;
pub mod news;
pub mod technical;

pub use lexicon::Lexicon;
pub use news::{NewsSentiment, NewsSentimentConfig};
pub use technical::{TechnicalConfig, TechnicalSentiment};

use crate::domain::{SentimentLabel, SentimentResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("text analysis failed: {0}")]
    Analysis(String),

    #[error("polarity {value} for '{text}' is outside [-1, 1]")]
    OutOfRange { text: String, value: f64 },
}

/// Scores a piece of text in [-1, 1]. Zero means no opinion.
pub trait TextPolarity: Send + Sync {
    fn polarity(&self, text: &str) -> Result<f64, SentimentError>;
}

/// Maps a signed score to a label and a capped confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelBands {
    /// score > threshold is bullish, score < -threshold is bearish.
    pub threshold: f64,
    /// Confidence floor added to |score|.
    pub base_offset: f64,
    pub max_confidence: f64,
}

impl LabelBands {
    pub fn classify(&self, score: f64) -> SentimentResult {
        let label = if score > self.threshold {
            SentimentLabel::Bullish
        } else if score < -self.threshold {
            SentimentLabel::Bearish
        } else {
            SentimentLabel::Neutral
        };
        let confidence = (score.abs() + self.base_offset).min(self.max_confidence);
        SentimentResult::new(confidence, label)
    }
}
