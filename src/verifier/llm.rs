use crate::config::config::VerifierCfg;
use crate::verifier::{VerifierClient, VerifierError, VerifyRequest, VerifyRow};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::info;

/// Chat-completion-backed verifier. One HTTP request per batch; the prompt
/// embeds the JSON request array and demands a JSON array back.
pub struct LlmVerifier {
    client: Client,
    cfg: VerifierCfg,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl LlmVerifier {
    pub fn new(client: Client, cfg: VerifierCfg) -> Self {
        let rpm = NonZeroU32::new(cfg.rate_limit_rpm).unwrap_or(NonZeroU32::new(1).unwrap());
        let quota = Quota::per_minute(rpm);
        let limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            client,
            cfg,
            limiter,
        }
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    fn build_prompt(batch: &[VerifyRequest]) -> Result<String, VerifierError> {
        let payload = serde_json::to_string(batch)
            .map_err(|e| VerifierError::Request(format!("encoding request batch: {}", e)))?;

        Ok(format!(
            "You are a financial sentiment judge. For each item in the JSON array below, \
            decide whether the text is positive, negative, or neutral for the referenced stock.

            Items: {}

            Output strictly a valid JSON array with one object per input id, each with fields:
            - 'id' (the input id, unchanged),
            - 'sentiment' (exactly one of \"positive\", \"negative\", \"neutral\"),
            - 'confidence' (0.0 to 1.0).

            No prose outside the JSON array.",
            payload
        ))
    }
}

#[async_trait]
impl VerifierClient for LlmVerifier {
    async fn verify_batch(&self, batch: &[VerifyRequest]) -> Result<Vec<VerifyRow>, VerifierError> {
        // Enforce rate limit before touching the network.
        self.limiter.until_ready().await;

        let prompt = Self::build_prompt(batch)?;

        let req_body = json!({
            "model": self.cfg.model,
            "messages": [
                {"role": "system", "content": "You are a helpful assistant that outputs JSON."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.0
        });

        let url = format!("{}/chat/completions", self.cfg.base_url);
        info!(
            "Calling verifier at {} with model {} ({} items)",
            url,
            self.cfg.model,
            batch.len()
        );

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.cfg.api_key))
            .json(&req_body)
            .send()
            .await
            .map_err(|e| VerifierError::Request(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                    VerifierError::RateLimited(format!("{}: {}", status, err_text))
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    VerifierError::Auth(format!("{}: {}", status, err_text))
                }
                _ => VerifierError::Request(format!("{}: {}", status, err_text)),
            });
        }

        let resp_json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| VerifierError::Malformed(e.to_string()))?;

        let content_str = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| VerifierError::Malformed("no content in response".to_string()))?;

        // Strip potential markdown code fences before parsing.
        let clean_content = content_str
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```");

        let rows: Vec<VerifyRow> = serde_json::from_str(clean_content).map_err(|e| {
            VerifierError::Malformed(format!("parsing verdict array: {} in {}", e, clean_content))
        })?;

        Ok(rows)
    }
}
