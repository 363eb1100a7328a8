// Tier 1: Layer Scorer
//
// Concept: Score one of the 210 leaf layers from persona + evidence
// Synchronization: (session_id, layer_id, SubjectKnowledge) → LayerScore
//
// Algorithm:
// 1. Resolve layer → factor → segment names and the segment persona
// 2. Select a bounded, relevance-ranked evidence context
// 3. No evidence → heuristic (neutral 0.5, low confidence)
// 4. Backend configured → prompt under the retry policy, tolerant parse
// 5. Backend absent or all retries failed → content heuristic
//
// Scoring a layer never fails: every path ends in a LayerScore.

use crate::generative::GenerativeBackend;
use crate::persona::{Persona, GENERALIST};
use crate::pipeline::retry::{generate_with_retry, RetryPolicy};
use crate::pipeline::tier1::evidence::{relevance_terms, select_evidence, EvidenceContext};
use crate::pipeline::tier1::heuristic::HeuristicScorer;
use crate::pipeline::tier1::response_parser::parse_score_response;
use crate::pipeline::types::{clamp_unit, LayerScore, SubjectKnowledge};
use crate::taxonomy::TaxonomyRegistry;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Bounds on evidence and generated text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringLimits {
    pub max_evidence_items: usize,
    pub evidence_char_budget: usize,
    pub assessment_max_chars: usize,
}

impl Default for ScoringLimits {
    fn default() -> Self {
        Self {
            max_evidence_items: 10,
            evidence_char_budget: 1200,
            assessment_max_chars: 600,
        }
    }
}

/// Names resolved for one layer
struct LayerNames<'a> {
    layer: &'a str,
    factor: &'a str,
    segment: &'a str,
    persona: &'static Persona,
}

/// Layer Scorer (Tier 1 concept)
///
/// Holds the shared taxonomy and an optional generative backend. Cheap to share
/// behind an `Arc` across concurrent scoring tasks.
pub struct LayerScorer {
    taxonomy: Arc<TaxonomyRegistry>,
    backend: Option<Arc<dyn GenerativeBackend>>,
    policy: RetryPolicy,
    limits: ScoringLimits,
    heuristic: HeuristicScorer,
}

impl LayerScorer {
    /// Heuristic-only scorer with default limits
    pub fn new(taxonomy: Arc<TaxonomyRegistry>) -> Self {
        Self {
            taxonomy,
            backend: None,
            policy: RetryPolicy::default(),
            limits: ScoringLimits::default(),
            heuristic: HeuristicScorer::default(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn GenerativeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_limits(mut self, limits: ScoringLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_heuristic(mut self, heuristic: HeuristicScorer) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Persona used for a layer (generalist when the layer is unknown)
    pub fn persona_for(&self, layer_id: &str) -> &'static Persona {
        self.taxonomy
            .segment_of_layer(layer_id)
            .map(Persona::for_segment)
            .unwrap_or(&GENERALIST)
    }

    fn names_for<'a>(&'a self, layer_id: &'a str) -> LayerNames<'a> {
        let factor_id = self.taxonomy.factor_of(layer_id).unwrap_or("");
        let segment = self.taxonomy.segment_of_layer(layer_id);
        LayerNames {
            layer: self.taxonomy.name_of(layer_id),
            factor: self.taxonomy.name_of(factor_id),
            segment: segment.map(|s| s.display_name()).unwrap_or("Unknown"),
            persona: self.persona_for(layer_id),
        }
    }

    /// Score one layer
    pub async fn score_layer(
        &self,
        session_id: Uuid,
        layer_id: &str,
        knowledge: &SubjectKnowledge,
    ) -> LayerScore {
        let start = Instant::now();
        let names = self.names_for(layer_id);

        let terms = relevance_terms(&[names.layer, names.factor, names.segment]);
        let context = select_evidence(
            knowledge,
            &terms,
            self.limits.max_evidence_items,
            self.limits.evidence_char_budget,
        );

        let mut score = LayerScore {
            session_id,
            layer_id: layer_id.to_string(),
            score: 0.0,
            confidence: 0.0,
            evidence_count: context.len(),
            insights: Vec::new(),
            evidence_summary: context.summary(),
            assessment: None,
            persona_name: names.persona.name.to_string(),
            processing_time_ms: 0,
            used_generative_service: false,
            default_filled: false,
        };

        let generated = match (&self.backend, context.is_empty()) {
            (Some(backend), false) => {
                let prompt = build_prompt(&names, &knowledge.topic, &context);
                match generate_with_retry(backend.as_ref(), &prompt, &self.policy, layer_id).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        tracing::warn!(
                            session_id = %session_id,
                            layer_id,
                            error = %e,
                            "Generative scoring failed, using content heuristic"
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        match generated {
            Some(text) => {
                let parsed = parse_score_response(&text, self.limits.assessment_max_chars);
                if parsed.defaulted {
                    tracing::debug!(layer_id, "Generated response missing fields, defaults applied");
                }
                score.score = clamp_unit(parsed.score);
                score.confidence = clamp_unit(parsed.confidence);
                score.insights = parsed.insights;
                score.assessment = parsed.assessment;
                score.used_generative_service = true;
            }
            None => {
                let heuristic = self.heuristic.score(&context);
                score.score = heuristic.score;
                score.confidence = heuristic.confidence;
                score.insights = heuristic_insights(&context);
            }
        }

        score.processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            session_id = %session_id,
            layer_id,
            score = score.score,
            confidence = score.confidence,
            evidence_count = score.evidence_count,
            generative = score.used_generative_service,
            elapsed_ms = score.processing_time_ms,
            "Layer scored"
        );

        score
    }

    /// Deterministic prompt for a layer (exposed for inspection and tests)
    pub fn prompt_for(&self, layer_id: &str, knowledge: &SubjectKnowledge) -> String {
        let names = self.names_for(layer_id);
        let terms = relevance_terms(&[names.layer, names.factor, names.segment]);
        let context = select_evidence(
            knowledge,
            &terms,
            self.limits.max_evidence_items,
            self.limits.evidence_char_budget,
        );
        build_prompt(&names, &knowledge.topic, &context)
    }
}

fn build_prompt(names: &LayerNames<'_>, topic: &str, context: &EvidenceContext) -> String {
    let persona = names.persona;
    format!(
        "You are {name}. {background}.\n\
         Expertise: {expertise}.\n\
         Perspective: {perspective}.\n\n\
         Subject: {topic}\n\
         Segment: {segment}\n\
         Factor: {factor}\n\
         Layer: {layer}\n\n\
         Evidence:\n{evidence}\n\n\
         Assess this layer for the subject using only the evidence above.\n\
         Respond in this format:\n\
         Assessment: <one paragraph>\n\
         Strengths:\n- <strength>\n\
         Risks:\n- <risk>\n\
         Insights:\n- <insight>\n\
         Score: <number between 0 and 1>\n\
         Confidence: <number between 0 and 1>\n",
        name = persona.name,
        background = persona.background,
        expertise = persona.expertise_areas.join(", "),
        perspective = persona.analytical_perspective,
        topic = topic,
        segment = names.segment,
        factor = names.factor,
        layer = names.layer,
        evidence = context.render(),
    )
}

fn heuristic_insights(context: &EvidenceContext) -> Vec<String> {
    if context.is_empty() {
        return vec!["No evidence available; neutral score assigned".to_string()];
    }
    let stats = context.word_stats();
    vec![format!(
        "Heuristic estimate from {} evidence items ({} words, diversity {:.2})",
        context.len(),
        stats.total_words,
        stats.diversity()
    )]
}
