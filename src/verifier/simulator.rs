use crate::core::types::SentimentLabel;
use crate::verifier::{VerifierClient, VerifierError, VerifyRequest, VerifyRow};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

/// Scriptable stand-in for the external verification service: answers every
/// id with a fixed verdict, optionally failing the first N calls with a
/// rate-limit error. Useful for tests and offline runs.
pub struct SimVerifierClient {
    label: SentimentLabel,
    confidence: f64,
    rate_limit_failures: u32,
    calls: AtomicU32,
}

impl SimVerifierClient {
    pub fn agreeing(label: SentimentLabel, confidence: f64) -> Self {
        Self {
            label,
            confidence,
            rate_limit_failures: 0,
            calls: AtomicU32::new(0),
        }
    }

    pub fn rate_limited_then_ok(failures: u32, label: SentimentLabel, confidence: f64) -> Self {
        Self {
            label,
            confidence,
            rate_limit_failures: failures,
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_rate_limited() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            confidence: 0.0,
            rate_limit_failures: u32::MAX,
            calls: AtomicU32::new(0),
        }
    }

    /// Round trips attempted so far (including failed ones).
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerifierClient for SimVerifierClient {
    async fn verify_batch(&self, batch: &[VerifyRequest]) -> Result<Vec<VerifyRow>, VerifierError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.rate_limit_failures {
            return Err(VerifierError::RateLimited("simulated 429".to_string()));
        }

        Ok(batch
            .iter()
            .map(|r| VerifyRow {
                id: r.id,
                sentiment: self.label.as_str().to_string(),
                confidence: self.confidence,
                reasoning: None,
            })
            .collect())
    }
}
