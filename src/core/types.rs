use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ----------- Domain messages -----------------

/// One text fragment tied (optionally) to a stock symbol. Produced by the
/// collection pipeline, consumed read-only by the cascade.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextItem {
    pub text: String,
    #[serde(default)]
    pub stock_symbol: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    /// Lenient parse for wire responses. Anything outside the three
    /// recognized labels normalizes to Neutral rather than being rejected.
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "positive" => SentimentLabel::Positive,
            "negative" => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        }
    }
}

/// Full 3-class probability distribution. Values sum to 1.0 (within epsilon)
/// and are all non-negative.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl ClassProbabilities {
    /// Neutral wins full ties, positive wins a positive/negative tie.
    pub fn argmax(&self) -> SentimentLabel {
        if self.neutral >= self.positive && self.neutral >= self.negative {
            SentimentLabel::Neutral
        } else if self.positive >= self.negative {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Negative
        }
    }

    pub fn max(&self) -> f64 {
        self.positive.max(self.negative).max(self.neutral)
    }

    pub fn is_normalized(&self) -> bool {
        let sum = self.positive + self.negative + self.neutral;
        (sum - 1.0).abs() < 1e-6
            && self.positive >= 0.0
            && self.negative >= 0.0
            && self.neutral >= 0.0
    }
}

/// Output of the local classifier. Built only through `from_scores` so the
/// label/confidence invariants always hold.
#[derive(Clone, Debug)]
pub struct LocalPrediction {
    pub label: SentimentLabel,
    pub confidence: f64,
    pub scores: ClassProbabilities,
}

impl LocalPrediction {
    pub fn from_scores(scores: ClassProbabilities) -> Self {
        Self {
            label: scores.argmax(),
            confidence: scores.max(),
            scores,
        }
    }
}

/// Escalation policy. Read once per batch from live configuration; unknown
/// strings are rejected at deserialization time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    None,
    #[default]
    LowConfidence,
    LowConfidenceAndNeutral,
    All,
}

/// Second opinion from the external verification service.
#[derive(Clone, Debug)]
pub struct ExternalVerdict {
    pub label: SentimentLabel,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

/// Final per-item output, positionally aligned with the input feed.
#[derive(Clone, Debug, Serialize)]
pub struct SentimentResult {
    pub text: String,
    pub label: SentimentLabel,
    pub score: f64,
    pub confidence: f64,
    pub local_label: SentimentLabel,
    pub local_confidence: f64,
    pub escalated: bool,
    pub external_label: Option<SentimentLabel>,
    pub external_reasoning: Option<String>,
    pub method: String,
}

/// Process-wide operational counters. The only mutable shared state in the
/// cascade; mutated exclusively by the orchestrator through `StatsTracker`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CascadeStats {
    pub total_analyzed: u64,
    pub escalated_count: u64,
    pub external_errors: u64,
    pub avg_local_confidence: f64,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
}
