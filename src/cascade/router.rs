use crate::core::types::{SentimentLabel, VerificationMode};

/// Pure escalation decision. Availability of the verifier is not this
/// function's concern; the orchestrator forces the mode to `None` for the
/// whole run when no verifier is configured.
pub fn should_escalate(
    mode: VerificationMode,
    local_confidence: f64,
    local_label: SentimentLabel,
    threshold: f64,
) -> bool {
    match mode {
        VerificationMode::None => false,
        VerificationMode::LowConfidence => local_confidence < threshold,
        VerificationMode::LowConfidenceAndNeutral => {
            local_confidence < threshold || local_label == SentimentLabel::Neutral
        }
        VerificationMode::All => true,
    }
}
