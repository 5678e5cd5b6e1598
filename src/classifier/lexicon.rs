//! Lexicon-backed local sentiment model.
//!
//! Stands in for a pretrained 3-class model behind the `SentimentModel`
//! seam: deterministic, cheap, and always returns a full distribution.

use crate::classifier::SentimentModel;
use crate::core::types::{ClassProbabilities, LocalPrediction};
use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use async_trait::async_trait;

const POSITIVE_TERMS: &[&str] = &[
    "beats",
    "beat estimates",
    "tops estimates",
    "surge",
    "surged",
    "soar",
    "soared",
    "rally",
    "rallied",
    "record profit",
    "record revenue",
    "upgrade",
    "upgraded",
    "outperform",
    "strong growth",
    "raised guidance",
    "bullish",
    "strong demand",
    "all-time high",
    "dividend increase",
    "buyback",
    "exceeds expectations",
    "jumped",
    "gains",
    "profit rose",
    "better than expected",
];

const NEGATIVE_TERMS: &[&str] = &[
    "misses",
    "missed estimates",
    "plunge",
    "plunged",
    "tumble",
    "tumbled",
    "slump",
    "slumped",
    "downgrade",
    "downgraded",
    "underperform",
    "lawsuit",
    "recall",
    "layoffs",
    "bankruptcy",
    "fraud",
    "investigation",
    "warns",
    "cut guidance",
    "bearish",
    "selloff",
    "sell-off",
    "losses widen",
    "declines",
    "falls",
    "weak demand",
    "all-time low",
    "worse than expected",
];

pub struct LexiconModel {
    ac_positive: AhoCorasick,
    ac_negative: AhoCorasick,
    max_input_len: usize,
}

impl LexiconModel {
    pub fn new(max_input_len: usize) -> Result<Self> {
        let ac_positive = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(POSITIVE_TERMS)
            .context("building positive lexicon matcher")?;
        let ac_negative = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(NEGATIVE_TERMS)
            .context("building negative lexicon matcher")?;

        Ok(Self {
            ac_positive,
            ac_negative,
            max_input_len,
        })
    }

    /// Truncate on a char boundary; long input is clipped, never an error.
    fn clip<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.max_input_len) {
            Some((i, _)) => &text[..i],
            None => text,
        }
    }

    /// Smoothed 3-class distribution from hit counts. Neutral mass shrinks
    /// as evidence accumulates; the rest splits between the polar classes
    /// with Laplace smoothing so a single hit never saturates confidence.
    fn distribution(pos_hits: usize, neg_hits: usize) -> ClassProbabilities {
        let p = pos_hits as f64;
        let n = neg_hits as f64;
        let t = p + n;

        if t == 0.0 {
            return ClassProbabilities {
                positive: 0.25,
                negative: 0.25,
                neutral: 0.50,
            };
        }

        let neutral = (1.0 / (1.0 + t)).min(0.34);
        let rest = 1.0 - neutral;
        ClassProbabilities {
            positive: rest * (p + 0.25) / (t + 0.5),
            negative: rest * (n + 0.25) / (t + 0.5),
            neutral,
        }
    }
}

#[async_trait]
impl SentimentModel for LexiconModel {
    async fn predict(&self, text: &str) -> LocalPrediction {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            // Degenerate input: neutral at minimum confidence.
            return LocalPrediction::from_scores(ClassProbabilities {
                positive: 0.33,
                negative: 0.33,
                neutral: 0.34,
            });
        }

        let clipped = self.clip(trimmed);
        let pos_hits = self.ac_positive.find_iter(clipped).count();
        let neg_hits = self.ac_negative.find_iter(clipped).count();

        LocalPrediction::from_scores(Self::distribution(pos_hits, neg_hits))
    }
}
