//! Batching, retry, and backoff policy around a `VerifierClient`.
//!
//! A chunk that exhausts its retries yields "no verdict" for every item in
//! it; the run continues. Ordering of the output slots always matches the
//! input texts.

use crate::config::config::VerifierCfg;
use crate::core::types::{ExternalVerdict, SentimentLabel};
use crate::verifier::{VerifierClient, VerifierError, VerifyRequest};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Result of one verification pass. `verdicts[i]` corresponds to the i-th
/// input text; `errors` holds one entry per failed chunk.
#[derive(Debug)]
pub struct VerificationOutcome {
    pub verdicts: Vec<Option<ExternalVerdict>>,
    pub errors: Vec<String>,
}

pub struct ExternalVerifier {
    client: Arc<dyn VerifierClient>,
    cfg: VerifierCfg,
}

impl ExternalVerifier {
    pub fn new(client: Arc<dyn VerifierClient>, cfg: VerifierCfg) -> Self {
        Self { client, cfg }
    }

    /// Single-item entry point; delegates to the batch path.
    pub async fn verify_one(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> (Option<ExternalVerdict>, Vec<String>) {
        let mut outcome = self.verify(&[text], cancel).await;
        (outcome.verdicts.pop().flatten(), outcome.errors)
    }

    /// Batch verification. Chunks at the configured batch size, waits the
    /// inter-batch delay between chunks (not before the first), retries
    /// rate-limit-class failures with linear backoff, and never fails the
    /// whole pass: missing verdicts stay `None`.
    pub async fn verify(&self, texts: &[&str], cancel: &CancellationToken) -> VerificationOutcome {
        let mut verdicts: Vec<Option<ExternalVerdict>> = vec![None; texts.len()];
        let mut errors = Vec::new();

        for (chunk_idx, chunk) in texts.chunks(self.cfg.batch_size).enumerate() {
            if cancel.is_cancelled() {
                break;
            }

            // Stay under the request-rate ceiling between successive chunks.
            if chunk_idx > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.cfg.batch_delay) => {}
                    _ = cancel.cancelled() => break,
                }
            }

            let offset = chunk_idx * self.cfg.batch_size;
            let batch: Vec<VerifyRequest> = chunk
                .iter()
                .enumerate()
                .map(|(i, text)| VerifyRequest {
                    id: offset + i,
                    text: clip_chars(text, self.cfg.max_text_len).to_string(),
                })
                .collect();

            match self.verify_chunk(&batch, cancel).await {
                Ok(rows) => {
                    for row in rows {
                        let Some(slot) = verdicts.get_mut(row.id) else {
                            warn!(id = row.id, "verifier returned unknown id; ignoring");
                            continue;
                        };
                        if row.id < offset || row.id >= offset + chunk.len() || slot.is_some() {
                            warn!(id = row.id, "verifier returned out-of-chunk or duplicate id");
                            continue;
                        }
                        *slot = Some(ExternalVerdict {
                            label: SentimentLabel::from_wire(&row.sentiment),
                            confidence: row.confidence.clamp(0.0, 1.0),
                            reasoning: row.reasoning,
                        });
                    }
                }
                Err(e) => {
                    warn!(chunk = chunk_idx, "verification chunk failed: {}", e);
                    errors.push(e.to_string());
                }
            }
        }

        VerificationOutcome { verdicts, errors }
    }

    /// One chunk with the retry policy: rate-limit-class errors are retried
    /// up to `max_retries` times with linearly increasing backoff (attempt x
    /// retry_delay); anything else fails immediately.
    async fn verify_chunk(
        &self,
        batch: &[VerifyRequest],
        cancel: &CancellationToken,
    ) -> Result<Vec<crate::verifier::VerifyRow>, VerifierError> {
        let mut attempt: u32 = 0;
        loop {
            match self.client.verify_batch(batch).await {
                Ok(rows) => return Ok(rows),
                Err(e) if e.is_transient() && attempt < self.cfg.max_retries => {
                    attempt += 1;
                    let delay = self.cfg.retry_delay * attempt;
                    info!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "verifier rate limited; backing off"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => return Err(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Truncate on a char boundary to respect the wire payload limit.
fn clip_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
