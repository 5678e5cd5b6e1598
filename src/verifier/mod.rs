pub mod batch;
pub mod llm;
pub mod simulator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy for the external verification service. Only
/// rate-limit-class errors are retried; everything else fails the batch
/// immediately and the affected items fall back to their local predictions.
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("verifier rate limited: {0}")]
    RateLimited(String),
    #[error("verifier request failed: {0}")]
    Request(String),
    #[error("verifier auth rejected: {0}")]
    Auth(String),
    #[error("malformed verifier response: {0}")]
    Malformed(String),
}

impl VerifierError {
    pub fn is_transient(&self) -> bool {
        matches!(self, VerifierError::RateLimited(_))
    }
}

/// One entry of the wire request: an indexed text snippet.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyRequest {
    pub id: usize,
    pub text: String,
}

/// One entry of the wire response. `sentiment` is parsed leniently
/// downstream; `reasoning` is optional and passed through when present.
#[derive(Clone, Debug, Deserialize)]
pub struct VerifyRow {
    pub id: usize,
    pub sentiment: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Transport seam for one verification round trip. Implementations send a
/// single request for the whole slice; retry and chunking policy live in
/// `batch::ExternalVerifier`, not here.
#[async_trait]
pub trait VerifierClient: Send + Sync + 'static {
    async fn verify_batch(&self, batch: &[VerifyRequest]) -> Result<Vec<VerifyRow>, VerifierError>;
}
