//! Shared fixtures for bca-engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bca_engine::generative::{GenerativeBackend, GenerativeError};
use bca_engine::pipeline::retry::RetryPolicy;
use bca_engine::pipeline::tier1::heuristic::HeuristicScorer;
use bca_engine::pipeline::tier1::layer_scorer::LayerScorer;
use bca_engine::{
    AnalysisOrchestrator, EvidenceItem, LayerScore, OrchestratorConfig, SubjectKnowledge,
    TaxonomyRegistry,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Always answers with the same score and confidence
pub struct FixedBackend {
    pub score: f64,
    pub confidence: f64,
    pub calls: AtomicUsize,
}

impl FixedBackend {
    pub fn new(score: f64, confidence: f64) -> Self {
        Self {
            score,
            confidence,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeBackend for FixedBackend {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerativeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "Assessment: Solid position overall.\n\
             Insights:\n- Demand signals are consistent\n- Pricing headroom exists\n\
             Score: {}\nConfidence: {}\n",
            self.score, self.confidence
        ))
    }
}

/// Answers per segment, keyed on the `Segment:` line of the prompt
pub struct SegmentScriptedBackend {
    pub scores: Vec<(&'static str, f64)>,
}

#[async_trait]
impl GenerativeBackend for SegmentScriptedBackend {
    fn name(&self) -> &str {
        "segment-scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerativeError> {
        let score = self
            .scores
            .iter()
            .find(|(segment, _)| prompt.contains(&format!("Segment: {}", segment)))
            .map(|(_, score)| *score)
            .unwrap_or(0.5);
        Ok(format!("Score: {}\nConfidence: 0.8\n- scripted", score))
    }
}

/// Fails every call
pub struct FailingBackend {
    pub calls: AtomicUsize,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerativeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GenerativeError::Unavailable("connection refused".to_string()))
    }
}

/// Panics for prompts of one layer, answers normally for the rest
pub struct PanicBackend {
    /// Layer name as it appears on the prompt's `Layer:` line
    pub layer_name: String,
}

#[async_trait]
impl GenerativeBackend for PanicBackend {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerativeError> {
        if prompt.contains(&format!("Layer: {}\n", self.layer_name)) {
            panic!("backend crashed while scoring {}", self.layer_name);
        }
        Ok("Score: 0.7\nConfidence: 0.8\n".to_string())
    }
}

pub fn taxonomy() -> Arc<TaxonomyRegistry> {
    Arc::new(TaxonomyRegistry::builtin())
}

pub fn knowledge() -> SubjectKnowledge {
    SubjectKnowledge {
        topic: "Subscription meal kits for remote workers".to_string(),
        description: "Weekly delivered meal kits targeting home-office professionals".to_string(),
        items: vec![
            EvidenceItem {
                title: "Market size survey".to_string(),
                body: "The addressable market for meal kits grew strongly with demand \
                       from remote workers and steady growth trajectory in urban regions."
                    .to_string(),
                source_url: Some("https://example.org/survey".to_string()),
            },
            EvidenceItem {
                title: "Brand awareness study".to_string(),
                body: "Brand awareness among target consumers remains low while loyalty \
                       and retention for incumbents is high."
                    .to_string(),
                source_url: None,
            },
            EvidenceItem {
                title: "Competitive rivalry notes".to_string(),
                body: "Several competitors compete on price; entry barriers are moderate \
                       and regulatory climate is stable."
                    .to_string(),
                source_url: None,
            },
        ],
    }
}

/// Scorer with a deterministic heuristic and a zero-backoff retry policy
pub fn scorer(backend: Option<Arc<dyn GenerativeBackend>>) -> LayerScorer {
    let scorer = LayerScorer::new(taxonomy())
        .with_heuristic(HeuristicScorer::without_jitter(400))
        .with_retry_policy(RetryPolicy::immediate(2));
    match backend {
        Some(backend) => scorer.with_backend(backend),
        None => scorer,
    }
}

pub fn orchestrator(
    backend: Option<Arc<dyn GenerativeBackend>>,
    config: OrchestratorConfig,
) -> AnalysisOrchestrator {
    let taxonomy = taxonomy();
    AnalysisOrchestrator::new(Arc::clone(&taxonomy), Arc::new(scorer(backend)), config)
        .expect("builtin taxonomy is valid")
}

pub fn layer(layer_id: &str, score: f64, confidence: f64) -> LayerScore {
    LayerScore {
        score,
        confidence,
        default_filled: false,
        ..LayerScore::default_filled(Uuid::nil(), layer_id, "test")
    }
}
