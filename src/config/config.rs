use crate::core::types::VerificationMode;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppCfg {
    #[serde(default)]
    pub http: HttpCfg,
    #[serde(default)]
    pub verifier: VerifierCfg,
    #[serde(default)]
    pub cascade: CascadeCfg,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpCfg {
    #[serde(rename = "userAgent", default = "default_ua")]
    pub user_agent: String,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(rename = "poolIdleTimeout", with = "humantime_serde", default = "default_pool_idle")]
    pub pool_idle_timeout: Duration,
    #[serde(rename = "tcpKeepAlive", with = "humantime_serde", default = "default_keep_alive")]
    pub tcp_keep_alive: Duration,
    #[serde(rename = "poolMaxIdlePerHost", default = "default_pool")]
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            user_agent: default_ua(),
            timeout: default_timeout(),
            pool_idle_timeout: default_pool_idle(),
            tcp_keep_alive: default_keep_alive(),
            pool_max_idle_per_host: default_pool(),
        }
    }
}
fn default_ua() -> String {
    "sentimind/0.1".into()
}
fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_pool_idle() -> Duration {
    Duration::from_secs(90)
}
fn default_keep_alive() -> Duration {
    Duration::from_secs(60)
}
fn default_pool() -> usize {
    16
}

/// External verification service settings, including the batching and
/// retry/backoff knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct VerifierCfg {
    #[serde(rename = "baseUrl", default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(rename = "rateLimitRpm", default = "default_rpm")]
    pub rate_limit_rpm: u32,
    #[serde(rename = "batchSize", default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(rename = "maxRetries", default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(rename = "retryDelay", with = "humantime_serde", default = "default_retry_delay")]
    pub retry_delay: Duration,
    #[serde(rename = "batchDelay", with = "humantime_serde", default = "default_batch_delay")]
    pub batch_delay: Duration,
    #[serde(rename = "maxTextLen", default = "default_max_text_len")]
    pub max_text_len: usize,
}

impl Default for VerifierCfg {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: "".to_string(),
            rate_limit_rpm: default_rpm(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            batch_delay: default_batch_delay(),
            max_text_len: default_max_text_len(),
        }
    }
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_rpm() -> u32 {
    20
}
fn default_batch_size() -> usize {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> Duration {
    Duration::from_secs(10)
}
fn default_batch_delay() -> Duration {
    Duration::from_secs(5)
}
fn default_max_text_len() -> usize {
    500
}

/// Routing policy and local-classifier limits. Re-read at each batch start,
/// so edits are picked up between batches without a restart.
#[derive(Debug, Deserialize, Clone)]
pub struct CascadeCfg {
    #[serde(default)]
    pub mode: VerificationMode,
    #[serde(rename = "confidenceThreshold", default = "default_threshold")]
    pub confidence_threshold: f64,
    #[serde(rename = "aiEnabled", default = "default_ai_enabled")]
    pub ai_enabled: bool,
    #[serde(rename = "maxInputLen", default = "default_max_input_len")]
    pub max_input_len: usize,
}

impl Default for CascadeCfg {
    fn default() -> Self {
        Self {
            mode: VerificationMode::default(),
            confidence_threshold: default_threshold(),
            ai_enabled: default_ai_enabled(),
            max_input_len: default_max_input_len(),
        }
    }
}
fn default_threshold() -> f64 {
    0.75
}
fn default_ai_enabled() -> bool {
    true
}
fn default_max_input_len() -> usize {
    512
}

impl AppCfg {
    pub fn load(path: &str) -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name(path))
            .add_source(config::Environment::default().separator("__"))
            .build()
            .context("building config")?;

        let app: AppCfg = cfg.try_deserialize().context("deserializing config")?;
        app.validate()?;
        Ok(app)
    }

    /// Bad values are rejected here, at load time. Nothing downstream
    /// re-validates thresholds or modes.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.cascade.confidence_threshold),
            "cascade.confidenceThreshold must be in [0, 1], got {}",
            self.cascade.confidence_threshold
        );
        anyhow::ensure!(self.cascade.max_input_len > 0, "cascade.maxInputLen must be > 0");
        anyhow::ensure!(self.verifier.batch_size > 0, "verifier.batchSize must be > 0");
        anyhow::ensure!(
            self.verifier.rate_limit_rpm > 0,
            "verifier.rateLimitRpm must be > 0"
        );
        anyhow::ensure!(self.verifier.max_text_len > 0, "verifier.maxTextLen must be > 0");
        anyhow::ensure!(!self.verifier.base_url.is_empty(), "verifier.baseUrl missing");
        Ok(())
    }
}
