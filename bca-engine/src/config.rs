//! Settings → engine values
//!
//! Converts the shared TOML settings into the policy objects the pipeline
//! takes, and assembles a ready orchestrator.

use crate::generative::{GenerativeBackend, HttpGenerativeClient};
use crate::pipeline::overall::SegmentWeights;
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::session_orchestrator::{AnalysisOrchestrator, OrchestratorConfig};
use crate::pipeline::tier1::heuristic::HeuristicScorer;
use crate::pipeline::tier1::layer_scorer::{LayerScorer, ScoringLimits};
use crate::pipeline::types::PipelineError;
use crate::taxonomy::TaxonomyRegistry;
use bca_common::config::{
    GenerativeSettings, RetrySettings, ScoringSettings, SegmentWeightSettings, TomlConfig,
};
use bca_common::events::EventBus;
use std::sync::Arc;
use std::time::Duration;

impl From<&RetrySettings> for RetryPolicy {
    fn from(s: &RetrySettings) -> Self {
        RetryPolicy {
            max_attempts: s.max_attempts.max(1),
            initial_backoff: Duration::from_millis(s.initial_backoff_ms),
            max_backoff: Duration::from_millis(s.max_backoff_ms.max(s.initial_backoff_ms)),
            multiplier: if s.multiplier.is_finite() { s.multiplier.max(1.0) } else { 1.0 },
            call_timeout: Duration::from_secs(s.call_timeout_secs.max(1)),
        }
    }
}

impl From<&ScoringSettings> for ScoringLimits {
    fn from(s: &ScoringSettings) -> Self {
        ScoringLimits {
            max_evidence_items: s.max_evidence_items,
            evidence_char_budget: s.evidence_char_budget,
            assessment_max_chars: s.assessment_max_chars,
        }
    }
}

impl From<&ScoringSettings> for HeuristicScorer {
    fn from(s: &ScoringSettings) -> Self {
        HeuristicScorer::new(s.heuristic_jitter, s.heuristic_word_threshold)
    }
}

impl From<&SegmentWeightSettings> for SegmentWeights {
    fn from(s: &SegmentWeightSettings) -> Self {
        SegmentWeights {
            consumer: s.consumer,
            market: s.market,
            product: s.product,
            brand: s.brand,
            experience: s.experience,
        }
    }
}

/// HTTP backend when enabled; `None` means heuristic-only scoring
pub fn build_backend(
    generative: &GenerativeSettings,
    retry: &RetrySettings,
) -> Option<Arc<dyn GenerativeBackend>> {
    if !generative.enabled {
        tracing::info!("Generative backend disabled, layers use content heuristic");
        return None;
    }

    match HttpGenerativeClient::new(
        generative.base_url.clone(),
        generative.model.clone(),
        generative.api_key.clone(),
        generative.requests_per_second,
        Duration::from_secs(retry.call_timeout_secs.max(1)),
    ) {
        Ok(client) => {
            tracing::info!(
                base_url = %generative.base_url,
                model = %generative.model,
                requests_per_second = generative.requests_per_second,
                "Generative backend configured"
            );
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Generative backend unavailable, layers use content heuristic");
            None
        }
    }
}

/// Assemble an orchestrator from configuration
pub fn build_orchestrator(
    config: &TomlConfig,
    taxonomy: Arc<TaxonomyRegistry>,
) -> Result<AnalysisOrchestrator, PipelineError> {
    let mut scorer = LayerScorer::new(Arc::clone(&taxonomy))
        .with_retry_policy(RetryPolicy::from(&config.retry))
        .with_limits(ScoringLimits::from(&config.scoring))
        .with_heuristic(HeuristicScorer::from(&config.scoring));
    if let Some(backend) = build_backend(&config.generative, &config.retry) {
        scorer = scorer.with_backend(backend);
    }

    let orchestrator_config = OrchestratorConfig {
        batch_size: config.pipeline.batch_size,
        max_concurrent_layers: config.pipeline.max_concurrent_layers,
        segment_weights: SegmentWeights::from(&config.pipeline.segment_weights),
    };

    Ok(
        AnalysisOrchestrator::new(taxonomy, Arc::new(scorer), orchestrator_config)?
            .with_event_bus(EventBus::new(config.pipeline.event_capacity.max(1))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_settings_match_default_policy() {
        assert_eq!(RetryPolicy::from(&RetrySettings::default()), RetryPolicy::default());
    }

    #[test]
    fn test_default_weights_match() {
        assert_eq!(
            SegmentWeights::from(&SegmentWeightSettings::default()),
            SegmentWeights::default()
        );
    }

    #[test]
    fn test_disabled_backend_is_none() {
        assert!(build_backend(&GenerativeSettings::default(), &RetrySettings::default()).is_none());
    }

    #[test]
    fn test_enabled_backend_is_built() {
        let settings = GenerativeSettings {
            enabled: true,
            ..Default::default()
        };
        assert!(build_backend(&settings, &RetrySettings::default()).is_some());
    }

    #[test]
    fn test_build_orchestrator_from_defaults() {
        let mut config = TomlConfig::default();
        config.pipeline.batch_size = 42;
        let orchestrator =
            build_orchestrator(&config, Arc::new(TaxonomyRegistry::builtin())).unwrap();
        assert_eq!(orchestrator.config().batch_size, 42);
    }
}
