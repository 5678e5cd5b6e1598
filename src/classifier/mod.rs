pub mod lexicon;

use crate::core::types::LocalPrediction;
use async_trait::async_trait;

/// Seam for the local 3-class sentiment model. Implementations must be
/// deterministic for a given input, truncate over-long text instead of
/// erroring, and degrade to a minimum-confidence neutral prediction for
/// empty or degenerate input. Load failures belong in the constructor.
#[async_trait]
pub trait SentimentModel: Send + Sync + 'static {
    async fn predict(&self, text: &str) -> LocalPrediction;
}
