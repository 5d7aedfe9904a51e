//! Keyword polarity lexicon for market headlines.
//!
//! Each matched word contributes its score; a preceding negation flips it and
//! a preceding intensifier scales it. The headline polarity is the mean of
//! the matched contributions, clamped to [-1, 1].

use super::{SentimentError, TextPolarity};
use std::collections::HashMap;

const POSITIVE: &[(&str, f64)] = &[
    ("beat", 0.6),
    ("beats", 0.6),
    ("boost", 0.5),
    ("breakout", 0.6),
    ("bullish", 0.8),
    ("climb", 0.5),
    ("climbs", 0.5),
    ("exceed", 0.6),
    ("exceeds", 0.6),
    ("gain", 0.5),
    ("gains", 0.5),
    ("growth", 0.6),
    ("high", 0.3),
    ("jump", 0.6),
    ("jumps", 0.6),
    ("optimistic", 0.6),
    ("outperform", 0.7),
    ("profit", 0.6),
    ("rally", 0.7),
    ("rallies", 0.7),
    ("rebound", 0.5),
    ("record", 0.5),
    ("recovery", 0.5),
    ("rise", 0.5),
    ("rises", 0.5),
    ("soar", 0.8),
    ("soars", 0.8),
    ("strong", 0.5),
    ("surge", 0.7),
    ("surges", 0.7),
    ("upgrade", 0.6),
    ("upgraded", 0.6),
];

const NEGATIVE: &[(&str, f64)] = &[
    ("bearish", -0.8),
    ("concern", -0.5),
    ("concerns", -0.5),
    ("crash", -0.9),
    ("crisis", -0.8),
    ("cut", -0.4),
    ("cuts", -0.4),
    ("decline", -0.6),
    ("declines", -0.6),
    ("disappoint", -0.7),
    ("disappoints", -0.7),
    ("downgrade", -0.6),
    ("downgraded", -0.6),
    ("drop", -0.6),
    ("drops", -0.6),
    ("fall", -0.5),
    ("falls", -0.5),
    ("fear", -0.6),
    ("fears", -0.6),
    ("fraud", -0.9),
    ("lawsuit", -0.6),
    ("loss", -0.6),
    ("losses", -0.6),
    ("miss", -0.6),
    ("misses", -0.6),
    ("plunge", -0.8),
    ("plunges", -0.8),
    ("recession", -0.7),
    ("slump", -0.7),
    ("tumble", -0.7),
    ("tumbles", -0.7),
    ("warning", -0.5),
    ("weak", -0.5),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "without", "cannot", "can't", "isn't", "aren't", "wasn't", "won't",
    "didn't", "doesn't", "don't", "hardly", "barely",
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.5),
    ("extremely", 2.0),
    ("sharply", 1.5),
    ("significantly", 1.5),
    ("dramatically", 1.8),
    ("slightly", 0.5),
    ("modestly", 0.7),
    ("somewhat", 0.7),
];

#[derive(Debug, Clone)]
pub struct Lexicon {
    words: HashMap<String, f64>,
    intensifiers: HashMap<String, f64>,
    negations: Vec<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexicon {
    pub fn new() -> Self {
        let words = POSITIVE
            .iter()
            .chain(NEGATIVE)
            .map(|(w, s)| (w.to_string(), *s))
            .collect();
        let intensifiers = INTENSIFIERS
            .iter()
            .map(|(w, m)| (w.to_string(), *m))
            .collect();
        Self {
            words,
            intensifiers,
            negations: NEGATIONS.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Add or override a word score.
    pub fn with_word(mut self, word: &str, score: f64) -> Self {
        self.words.insert(word.to_lowercase(), score);
        self
    }

    /// Scores of matched words after negation and intensifier handling.
    pub fn matches(&self, text: &str) -> Vec<f64> {
        let mut scores = Vec::new();
        let mut negate = false;
        let mut scale = 1.0;

        for raw in text.split_whitespace() {
            let token: String = raw
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            if self.negations.iter().any(|n| *n == token) {
                negate = true;
                continue;
            }
            if let Some(m) = self.intensifiers.get(&token) {
                scale = *m;
                continue;
            }
            if let Some(&score) = self.words.get(&token) {
                let signed = if negate { -score } else { score };
                scores.push(signed * scale);
                negate = false;
                scale = 1.0;
            }
        }
        scores
    }
}

impl TextPolarity for Lexicon {
    fn polarity(&self, text: &str) -> Result<f64, SentimentError> {
        let scores = self.matches(text);
        if scores.is_empty() {
            return Ok(0.0);
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        if !mean.is_finite() {
            return Err(SentimentError::Analysis(format!(
                "non-finite polarity for '{text}'"
            )));
        }
        Ok(mean.clamp(-1.0, 1.0))
    }
}
