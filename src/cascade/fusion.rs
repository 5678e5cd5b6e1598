use crate::cascade::{METHOD_LOCAL, METHOD_VERIFIED_AGREE, METHOD_VERIFIED_OVERRIDE};
use crate::core::types::{ExternalVerdict, LocalPrediction, SentimentLabel};

/// Fused opinion: one label, one confidence, one diagnostic tag.
#[derive(Clone, Debug)]
pub struct Fused {
    pub label: SentimentLabel,
    pub confidence: f64,
    pub method: &'static str,
}

/// Merge the local prediction with an optional external second opinion.
///
/// Agreement between two independent signals is itself evidence, so the
/// higher of the two confidences is kept rather than an inflated blend. On
/// disagreement the slower, more deliberate verifier wins with its own
/// confidence unmodified.
pub fn fuse(local: &LocalPrediction, external: Option<&ExternalVerdict>) -> Fused {
    match external {
        None => Fused {
            label: local.label,
            confidence: local.confidence,
            method: METHOD_LOCAL,
        },
        Some(ext) if ext.label == local.label => Fused {
            label: local.label,
            confidence: local.confidence.max(ext.confidence),
            method: METHOD_VERIFIED_AGREE,
        },
        Some(ext) => Fused {
            label: ext.label,
            confidence: ext.confidence,
            method: METHOD_VERIFIED_OVERRIDE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ClassProbabilities;

    fn local(positive: f64, negative: f64, neutral: f64) -> LocalPrediction {
        LocalPrediction::from_scores(ClassProbabilities {
            positive,
            negative,
            neutral,
        })
    }

    fn verdict(label: SentimentLabel, confidence: f64) -> ExternalVerdict {
        ExternalVerdict {
            label,
            confidence,
            reasoning: None,
        }
    }

    #[test]
    fn test_no_verdict_passes_local_through() {
        let l = local(0.6, 0.2, 0.2);
        let f = fuse(&l, None);
        assert_eq!(f.label, SentimentLabel::Positive);
        assert!((f.confidence - 0.6).abs() < 1e-9);
        assert_eq!(f.method, METHOD_LOCAL);
    }

    #[test]
    fn test_agreement_keeps_max_confidence_exactly() {
        let l = local(0.6, 0.2, 0.2);

        let f = fuse(&l, Some(&verdict(SentimentLabel::Positive, 0.9)));
        assert_eq!(f.method, METHOD_VERIFIED_AGREE);
        assert!((f.confidence - 0.9).abs() < 1e-9);

        // Local can be the higher side too.
        let f = fuse(&l, Some(&verdict(SentimentLabel::Positive, 0.4)));
        assert!((f.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_disagreement_lets_verifier_override() {
        let l = local(0.6, 0.2, 0.2);
        let f = fuse(&l, Some(&verdict(SentimentLabel::Negative, 0.8)));
        assert_eq!(f.label, SentimentLabel::Negative);
        assert!((f.confidence - 0.8).abs() < 1e-9);
        assert_eq!(f.method, METHOD_VERIFIED_OVERRIDE);
    }
}
