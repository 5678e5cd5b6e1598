//! Topical pre-screen that rejects off-domain text before any model
//! inference is spent on it. Pure, no I/O.

use crate::core::types::TextItem;
use crate::filter::vocab;
use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use std::collections::HashSet;

/// Minimum meaningful input length (chars, after trimming).
const MIN_TEXT_LEN: usize = 10;

#[derive(Clone, Debug)]
pub struct RelevanceVerdict {
    pub is_relevant: bool,
    pub confidence: f64,
    pub reason: String,
    pub matched_terms: HashSet<String>,
    pub matched_exclusions: HashSet<String>,
}

impl RelevanceVerdict {
    fn relevant(confidence: f64, reason: &str) -> Self {
        Self {
            is_relevant: true,
            confidence,
            reason: reason.to_string(),
            matched_terms: HashSet::new(),
            matched_exclusions: HashSet::new(),
        }
    }

    fn irrelevant(confidence: f64, reason: &str) -> Self {
        Self {
            is_relevant: false,
            confidence,
            reason: reason.to_string(),
            matched_terms: HashSet::new(),
            matched_exclusions: HashSet::new(),
        }
    }
}

pub struct RelevanceFilter {
    ac_financial: AhoCorasick,
    ac_strong: AhoCorasick,
    ac_exclusions: AhoCorasick,
}

impl RelevanceFilter {
    pub fn new() -> Result<Self> {
        let ac_financial = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(vocab::FINANCIAL_TERMS)
            .context("building financial term matcher")?;
        let ac_strong = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(vocab::STRONG_FINANCIAL_TERMS)
            .context("building strong indicator matcher")?;
        let ac_exclusions = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(vocab::EXCLUSION_TERMS)
            .context("building exclusion term matcher")?;

        Ok(Self {
            ac_financial,
            ac_strong,
            ac_exclusions,
        })
    }

    /// Distinct vocabulary entries matched in `text`.
    fn distinct_matches(ac: &AhoCorasick, terms: &[&str], text: &str) -> HashSet<String> {
        let mut hits = HashSet::new();
        for m in ac.find_overlapping_iter(text) {
            hits.insert(terms[m.pattern().as_usize()].to_string());
        }
        hits
    }

    fn structural_junk(text: &str) -> bool {
        vocab::RE_RESOLUTION.is_match(text)
            || vocab::RE_RELEASE_TAG.is_match(text)
            || vocab::RE_TRAILING_SCORE.is_match(text)
            || vocab::RE_PLOT_MARKER.is_match(text)
    }

    /// First matching rule wins; ambiguous cases end at the low-confidence
    /// fallback so they never block analysis downstream.
    pub fn check(&self, item: &TextItem) -> RelevanceVerdict {
        let trimmed = item.text.trim();
        if trimmed.chars().count() < MIN_TEXT_LEN {
            return RelevanceVerdict::irrelevant(1.0, "text too short");
        }

        let strong = Self::distinct_matches(&self.ac_strong, vocab::STRONG_FINANCIAL_TERMS, trimmed);
        let general = Self::distinct_matches(&self.ac_financial, vocab::FINANCIAL_TERMS, trimmed);
        let exclusions =
            Self::distinct_matches(&self.ac_exclusions, vocab::EXCLUSION_TERMS, trimmed);

        // Strong indicators weigh double in the aggregate.
        let weight = strong.len() * 2 + general.len();
        let financial_count = strong.len() + general.len();

        let lower = trimmed.to_lowercase();
        let alias_hit = item
            .stock_symbol
            .as_deref()
            .map(|sym| {
                vocab::aliases_for(sym)
                    .iter()
                    .find(|a| lower.contains(*a))
                    .copied()
            })
            .unwrap_or(None);

        let mut verdict = if strong.len() >= 2 {
            RelevanceVerdict::relevant(0.95, "multiple strong financial indicators")
        } else if exclusions.len() >= 2 && weight < 3 {
            RelevanceVerdict::irrelevant(0.85, "multiple non-financial topic matches")
        } else if !exclusions.is_empty() && financial_count == 0 {
            RelevanceVerdict::irrelevant(0.80, "non-financial topic, no financial terms")
        } else if alias_hit.is_some() {
            RelevanceVerdict::relevant(0.90, "company name for symbol present")
        } else if weight >= 3 {
            RelevanceVerdict::relevant(0.85, "weighted financial vocabulary")
        } else if financial_count > 0 && exclusions.is_empty() {
            RelevanceVerdict::relevant(0.70, "some financial terms, no exclusions")
        } else if Self::structural_junk(trimmed) {
            RelevanceVerdict::irrelevant(0.75, "structural non-financial pattern")
        } else if financial_count == 0 && exclusions.is_empty() {
            RelevanceVerdict::irrelevant(0.65, "no topical signal either way")
        } else {
            let relevant = exclusions.is_empty();
            RelevanceVerdict {
                is_relevant: relevant,
                confidence: 0.50,
                reason: "mixed signals".to_string(),
                matched_terms: HashSet::new(),
                matched_exclusions: HashSet::new(),
            }
        };

        verdict.matched_terms = strong.union(&general).cloned().collect();
        if let Some(alias) = alias_hit {
            verdict.matched_terms.insert(alias.to_string());
        }
        verdict.matched_exclusions = exclusions;
        verdict
    }
}
