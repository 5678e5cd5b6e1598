use crate::core::types::{ClassProbabilities, SentimentLabel};

/// Map a final label plus the local class distribution to a signed score in
/// [-1, 1]. The local probabilities are used even when the external verdict
/// overrode the label; the verifier never regenerates a distribution.
pub fn map_score(label: SentimentLabel, scores: &ClassProbabilities) -> f64 {
    match label {
        SentimentLabel::Positive => scores.positive - scores.negative,
        // The cap guarantees a strictly negative score even when the
        // probabilities are nearly tied (or favor positive after an override).
        SentimentLabel::Negative => (-(scores.negative - scores.positive)).min(-0.1),
        SentimentLabel::Neutral => 0.0,
    }
}
