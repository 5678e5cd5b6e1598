//! Composes filter, classifier, router, verifier, fusion, and score mapper
//! into the single-item and batch entry points.
//!
//! Pipeline per batch:
//!   A) filter + local classification, in input order
//!   B) one batched external verification pass over escalated items
//!   C) fusion + score mapping + stats, in input order
//!
//! No per-item failure aborts a batch; total verifier failure degrades every
//! escalated item to its local prediction.

use crate::cascade::router::should_escalate;
use crate::cascade::score::map_score;
use crate::cascade::stats::StatsTracker;
use crate::cascade::{METHOD_FILTERED, fusion};
use crate::classifier::SentimentModel;
use crate::config::config::CascadeCfg;
use crate::core::types::{
    CascadeStats, LocalPrediction, SentimentLabel, SentimentResult, TextItem, VerificationMode,
};
use crate::filter::relevance::RelevanceFilter;
use crate::verifier::batch::ExternalVerifier;
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Confidence at or above which a negative relevance verdict short-circuits
/// the pipeline; weaker verdicts must not block analysis.
const FILTER_SHORT_CIRCUIT_CONFIDENCE: f64 = 0.75;

/// Fixed confidence reported for filtered-out items.
const FILTERED_CONFIDENCE: f64 = 0.40;

/// Per-batch snapshot of the live routing configuration. Taken once at
/// batch start; a config change mid-batch never affects admitted items.
#[derive(Clone, Copy, Debug)]
pub struct CascadeSettings {
    pub mode: VerificationMode,
    pub confidence_threshold: f64,
    pub ai_enabled: bool,
}

impl From<&CascadeCfg> for CascadeSettings {
    fn from(cfg: &CascadeCfg) -> Self {
        Self {
            mode: cfg.mode,
            confidence_threshold: cfg.confidence_threshold,
            ai_enabled: cfg.ai_enabled,
        }
    }
}

enum Stage {
    Filtered,
    Classified(LocalPrediction),
}

pub struct SentimentCascade {
    filter: RelevanceFilter,
    model: Arc<dyn SentimentModel>,
    verifier: Option<ExternalVerifier>,
    stats: Arc<StatsTracker>,
    degraded_warned: AtomicBool,
}

impl SentimentCascade {
    pub fn new(
        filter: RelevanceFilter,
        model: Arc<dyn SentimentModel>,
        verifier: Option<ExternalVerifier>,
        stats: Arc<StatsTracker>,
    ) -> Self {
        Self {
            filter,
            model,
            verifier,
            stats,
            degraded_warned: AtomicBool::new(false),
        }
    }

    pub fn stats(&self) -> CascadeStats {
        self.stats.snapshot()
    }

    /// Escalation requires a verifier; without one the whole run downgrades
    /// to local-only, logged once rather than per item.
    fn effective_mode(&self, settings: &CascadeSettings) -> VerificationMode {
        if settings.mode == VerificationMode::None {
            return VerificationMode::None;
        }
        if settings.ai_enabled && self.verifier.is_some() {
            return settings.mode;
        }
        if !self.degraded_warned.swap(true, Ordering::SeqCst) {
            warn!(
                requested = ?settings.mode,
                "external verifier unavailable; forcing verification mode to none for this run"
            );
        }
        VerificationMode::None
    }

    pub async fn analyze_one(
        &self,
        item: &TextItem,
        settings: &CascadeSettings,
        cancel: &CancellationToken,
    ) -> Result<SentimentResult> {
        let mut results = self
            .analyze_batch(std::slice::from_ref(item), settings, cancel)
            .await?;
        Ok(results.pop().expect("one result per input item"))
    }

    /// Analyze a batch. The output is positionally aligned with the input:
    /// `output[i]` always corresponds to `items[i]`, whatever mix of
    /// filtered, local-only, and verified items the batch contains.
    pub async fn analyze_batch(
        &self,
        items: &[TextItem],
        settings: &CascadeSettings,
        cancel: &CancellationToken,
    ) -> Result<Vec<SentimentResult>> {
        let mode = self.effective_mode(settings);

        // Phase A: relevance screen + local classification, in order.
        let mut stages = Vec::with_capacity(items.len());
        for item in items {
            anyhow::ensure!(!cancel.is_cancelled(), "batch cancelled");

            let verdict = self.filter.check(item);
            if !verdict.is_relevant && verdict.confidence >= FILTER_SHORT_CIRCUIT_CONFIDENCE {
                info!(reason = %verdict.reason, "item filtered before classification");
                stages.push(Stage::Filtered);
            } else {
                stages.push(Stage::Classified(self.model.predict(&item.text).await));
            }
        }

        // Phase B: one batched verification pass over escalated items.
        let escalate_idx: Vec<usize> = stages
            .iter()
            .enumerate()
            .filter_map(|(i, stage)| match stage {
                Stage::Classified(pred)
                    if should_escalate(
                        mode,
                        pred.confidence,
                        pred.label,
                        settings.confidence_threshold,
                    ) =>
                {
                    Some(i)
                }
                _ => None,
            })
            .collect();

        let mut external: Vec<Option<crate::core::types::ExternalVerdict>> =
            vec![None; items.len()];
        if !escalate_idx.is_empty() {
            if let Some(verifier) = &self.verifier {
                let texts: Vec<&str> = escalate_idx.iter().map(|&i| items[i].text.as_str()).collect();
                let outcome = verifier.verify(&texts, cancel).await;
                for (slot, verdict) in escalate_idx.iter().zip(outcome.verdicts) {
                    external[*slot] = verdict;
                }
                for err in &outcome.errors {
                    self.stats.record_error(err);
                }
            }
        }

        anyhow::ensure!(!cancel.is_cancelled(), "batch cancelled");

        // Phase C: fuse, score, and count. Stats only move here, so a
        // cancelled batch never records half-processed items.
        let mut results = Vec::with_capacity(items.len());
        for (i, (item, stage)) in items.iter().zip(&stages).enumerate() {
            match stage {
                Stage::Filtered => results.push(SentimentResult {
                    text: item.text.clone(),
                    label: SentimentLabel::Neutral,
                    score: 0.0,
                    confidence: FILTERED_CONFIDENCE,
                    local_label: SentimentLabel::Neutral,
                    local_confidence: 0.0,
                    escalated: false,
                    external_label: None,
                    external_reasoning: None,
                    method: METHOD_FILTERED.to_string(),
                }),
                Stage::Classified(pred) => {
                    let verdict = external[i].take();
                    let escalated = verdict.is_some();
                    let fused = fusion::fuse(pred, verdict.as_ref());
                    let score = map_score(fused.label, &pred.scores);

                    self.stats.record_item(pred.confidence, escalated);

                    results.push(SentimentResult {
                        text: item.text.clone(),
                        label: fused.label,
                        score,
                        confidence: fused.confidence,
                        local_label: pred.label,
                        local_confidence: pred.confidence,
                        escalated,
                        external_label: verdict.as_ref().map(|v| v.label),
                        external_reasoning: verdict.and_then(|v| v.reasoning),
                        method: fused.method.to_string(),
                    });
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{METHOD_LOCAL, METHOD_VERIFIED_AGREE, METHOD_VERIFIED_OVERRIDE};
    use crate::classifier::SentimentModel;
    use crate::config::config::VerifierCfg;
    use crate::core::types::ClassProbabilities;
    use crate::verifier::simulator::SimVerifierClient;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Fixture model: first matching substring wins, otherwise a weak
    /// neutral prediction.
    struct ScriptedModel {
        rules: Vec<(&'static str, ClassProbabilities)>,
    }

    #[async_trait]
    impl SentimentModel for ScriptedModel {
        async fn predict(&self, text: &str) -> LocalPrediction {
            for (needle, scores) in &self.rules {
                if text.contains(needle) {
                    return LocalPrediction::from_scores(*scores);
                }
            }
            LocalPrediction::from_scores(ClassProbabilities {
                positive: 0.25,
                negative: 0.25,
                neutral: 0.50,
            })
        }
    }

    fn positive_060() -> ClassProbabilities {
        ClassProbabilities {
            positive: 0.60,
            negative: 0.15,
            neutral: 0.25,
        }
    }

    fn negative_055() -> ClassProbabilities {
        ClassProbabilities {
            positive: 0.20,
            negative: 0.55,
            neutral: 0.25,
        }
    }

    fn confident_positive() -> ClassProbabilities {
        ClassProbabilities {
            positive: 0.85,
            negative: 0.05,
            neutral: 0.10,
        }
    }

    fn fast_verifier_cfg() -> VerifierCfg {
        VerifierCfg {
            batch_size: 30,
            max_retries: 3,
            retry_delay: Duration::from_millis(1),
            batch_delay: Duration::from_millis(1),
            ..VerifierCfg::default()
        }
    }

    fn scripted_model() -> Arc<ScriptedModel> {
        Arc::new(ScriptedModel {
            rules: vec![
                ("AAPL beats", positive_060()),
                ("guidance cut", negative_055()),
                ("record quarter", confident_positive()),
            ],
        })
    }

    fn cascade_with(
        verifier_client: Option<Arc<SimVerifierClient>>,
    ) -> (SentimentCascade, Arc<StatsTracker>) {
        let stats = Arc::new(StatsTracker::new());
        let verifier = verifier_client
            .map(|c| ExternalVerifier::new(c as Arc<dyn crate::verifier::VerifierClient>, fast_verifier_cfg()));
        let cascade = SentimentCascade::new(
            RelevanceFilter::new().unwrap(),
            scripted_model(),
            verifier,
            stats.clone(),
        );
        (cascade, stats)
    }

    fn settings(mode: VerificationMode) -> CascadeSettings {
        CascadeSettings {
            mode,
            confidence_threshold: 0.75,
            ai_enabled: true,
        }
    }

    fn items(texts: &[&str]) -> Vec<TextItem> {
        texts
            .iter()
            .map(|t| TextItem {
                text: t.to_string(),
                stock_symbol: Some("AAPL".to_string()),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_output_is_ordered_and_one_to_one() {
        let sim = Arc::new(SimVerifierClient::agreeing(SentimentLabel::Positive, 0.9));
        let (cascade, _) = cascade_with(Some(sim));

        let input = items(&[
            "AAPL beats earnings estimates by 15%",
            "Volleyball team wins championship",
            "Company stock had a record quarter with strong revenue",
        ]);
        let out = cascade
            .analyze_batch(&input, &settings(VerificationMode::LowConfidence), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.len(), input.len());
        for (res, item) in out.iter().zip(&input) {
            assert_eq!(res.text, item.text);
        }
        assert_eq!(out[1].method, METHOD_FILTERED);
    }

    #[tokio::test]
    async fn test_mode_none_returns_local_unmodified() {
        let sim = Arc::new(SimVerifierClient::agreeing(SentimentLabel::Positive, 0.99));
        let (cascade, stats) = cascade_with(Some(sim.clone()));

        let input = items(&["Market guidance cut sent shares of the company lower today"]);
        let out = cascade
            .analyze_batch(&input, &settings(VerificationMode::None), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out[0].method, METHOD_LOCAL);
        assert_eq!(out[0].label, SentimentLabel::Negative);
        assert!((out[0].confidence - 0.55).abs() < 1e-9);
        assert!(!out[0].escalated);
        assert_eq!(sim.calls(), 0);
        assert_eq!(stats.snapshot().escalated_count, 0);
        assert_eq!(stats.snapshot().total_analyzed, 1);
    }

    #[tokio::test]
    async fn test_low_confidence_escalation_agreement() {
        let sim = Arc::new(SimVerifierClient::agreeing(SentimentLabel::Positive, 0.90));
        let (cascade, stats) = cascade_with(Some(sim));

        let input = items(&["AAPL beats earnings estimates by 15%"]);
        let out = cascade
            .analyze_batch(&input, &settings(VerificationMode::LowConfidence), &CancellationToken::new())
            .await
            .unwrap();

        let res = &out[0];
        assert_eq!(res.method, METHOD_VERIFIED_AGREE);
        assert_eq!(res.label, SentimentLabel::Positive);
        assert!((res.confidence - 0.90).abs() < 1e-9);
        assert!(res.score > 0.0);
        assert!(res.escalated);
        assert_eq!(res.external_label, Some(SentimentLabel::Positive));

        let s = stats.snapshot();
        assert_eq!(s.total_analyzed, 1);
        assert_eq!(s.escalated_count, 1);
        assert!((s.avg_local_confidence - 0.60).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_disagreement_overrides_with_external_confidence() {
        let sim = Arc::new(SimVerifierClient::agreeing(SentimentLabel::Negative, 0.80));
        let (cascade, _) = cascade_with(Some(sim));

        let input = items(&["AAPL beats earnings estimates by 15%"]);
        let out = cascade
            .analyze_batch(&input, &settings(VerificationMode::LowConfidence), &CancellationToken::new())
            .await
            .unwrap();

        let res = &out[0];
        assert_eq!(res.method, METHOD_VERIFIED_OVERRIDE);
        assert_eq!(res.label, SentimentLabel::Negative);
        assert!((res.confidence - 0.80).abs() < 1e-9);
        // Local distribution favors positive, so the cap pins the score.
        assert!((res.score + 0.1).abs() < 1e-9);
        assert_eq!(res.local_label, SentimentLabel::Positive);
    }

    #[tokio::test]
    async fn test_confident_local_not_escalated() {
        let sim = Arc::new(SimVerifierClient::agreeing(SentimentLabel::Negative, 0.99));
        let (cascade, stats) = cascade_with(Some(sim.clone()));

        let input = items(&["Company stock had a record quarter with strong revenue"]);
        let out = cascade
            .analyze_batch(&input, &settings(VerificationMode::LowConfidence), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out[0].method, METHOD_LOCAL);
        assert_eq!(out[0].label, SentimentLabel::Positive);
        assert_eq!(sim.calls(), 0);
        assert_eq!(stats.snapshot().escalated_count, 0);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_degrades_whole_batch_to_local() {
        let sim = Arc::new(SimVerifierClient::always_rate_limited());
        let (cascade, stats) = cascade_with(Some(sim));

        let input = items(&[
            "AAPL beats earnings estimates by 15%",
            "Market guidance cut sent shares of the company lower today",
            "Analyst report on the stock market was inconclusive overall",
        ]);
        let out = cascade
            .analyze_batch(&input, &settings(VerificationMode::All), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.len(), 3);
        for res in &out {
            assert_eq!(res.method, METHOD_LOCAL);
            assert!(!res.escalated);
        }

        let s = stats.snapshot();
        // One failed batch, not one error per item.
        assert_eq!(s.external_errors, 1);
        assert_eq!(s.escalated_count, 0);
        assert_eq!(s.total_analyzed, 3);
        assert!(s.last_error.is_some());
    }

    #[tokio::test]
    async fn test_filtered_items_skip_stats_and_verifier() {
        let sim = Arc::new(SimVerifierClient::agreeing(SentimentLabel::Positive, 0.9));
        let (cascade, stats) = cascade_with(Some(sim.clone()));

        let input = items(&["Volleyball team wins championship"]);
        let out = cascade
            .analyze_batch(&input, &settings(VerificationMode::All), &CancellationToken::new())
            .await
            .unwrap();

        let res = &out[0];
        assert_eq!(res.method, METHOD_FILTERED);
        assert_eq!(res.label, SentimentLabel::Neutral);
        assert!((res.confidence - 0.40).abs() < 1e-9);
        assert_eq!(res.score, 0.0);
        assert!(!res.escalated);

        assert_eq!(sim.calls(), 0);
        assert_eq!(stats.snapshot().total_analyzed, 0);
    }

    #[tokio::test]
    async fn test_short_text_never_escalates() {
        let sim = Arc::new(SimVerifierClient::agreeing(SentimentLabel::Positive, 0.9));
        let (cascade, _) = cascade_with(Some(sim.clone()));

        let input = items(&["hi"]);
        let out = cascade
            .analyze_batch(&input, &settings(VerificationMode::All), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out[0].method, METHOD_FILTERED);
        assert!(out[0].confidence <= 0.40);
        assert_eq!(sim.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_verifier_forces_local_only_without_failure() {
        let (cascade, stats) = cascade_with(None);

        let input = items(&["AAPL beats earnings estimates by 15%"]);
        let out = cascade
            .analyze_batch(&input, &settings(VerificationMode::All), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out[0].method, METHOD_LOCAL);
        assert_eq!(stats.snapshot().escalated_count, 0);
        assert_eq!(stats.snapshot().external_errors, 0);
    }

    #[tokio::test]
    async fn test_ai_disabled_forces_local_only() {
        let sim = Arc::new(SimVerifierClient::agreeing(SentimentLabel::Positive, 0.9));
        let (cascade, _) = cascade_with(Some(sim.clone()));

        let s = CascadeSettings {
            mode: VerificationMode::All,
            confidence_threshold: 0.75,
            ai_enabled: false,
        };
        let out = cascade
            .analyze_batch(
                &items(&["AAPL beats earnings estimates by 15%"]),
                &s,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(out[0].method, METHOD_LOCAL);
        assert_eq!(sim.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_batch_leaves_stats_untouched() {
        let sim = Arc::new(SimVerifierClient::agreeing(SentimentLabel::Positive, 0.9));
        let (cascade, stats) = cascade_with(Some(sim));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let res = cascade
            .analyze_batch(
                &items(&["AAPL beats earnings estimates by 15%"]),
                &settings(VerificationMode::LowConfidence),
                &cancel,
            )
            .await;

        assert!(res.is_err());
        assert_eq!(stats.snapshot().total_analyzed, 0);
    }

    #[tokio::test]
    async fn test_analyze_one_matches_batch_path() {
        let sim = Arc::new(SimVerifierClient::agreeing(SentimentLabel::Positive, 0.9));
        let (cascade, _) = cascade_with(Some(sim));

        let item = TextItem {
            text: "AAPL beats earnings estimates by 15%".to_string(),
            stock_symbol: Some("AAPL".to_string()),
        };
        let res = cascade
            .analyze_one(&item, &settings(VerificationMode::LowConfidence), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(res.method, METHOD_VERIFIED_AGREE);
        assert_eq!(res.text, item.text);
    }
}
