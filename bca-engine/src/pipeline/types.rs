// Data contracts between tiers
//
// All records are created fresh per session, never mutated after the stage that
// produced them, and serialize without loss (scores in [0,1], finite lists).

use crate::taxonomy::{SegmentId, TaxonomyError};
use bca_common::events::AnalysisStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

pub type LayerId = String;
pub type FactorId = String;

/// Neutral value used whenever data is missing
pub const NEUTRAL_SCORE: f64 = 0.5;
/// Confidence attached to default-filled entries
pub const DEFAULT_CONFIDENCE: f64 = 0.3;

/// Clamp to [0,1], mapping NaN to the neutral midpoint
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        NEUTRAL_SCORE
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// One piece of textual evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Evidence bundle for one analysis subject (read-only to the pipeline)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectKnowledge {
    pub topic: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<EvidenceItem>,
}

// ============================================================================
// Tier 1 output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerScore {
    pub session_id: Uuid,
    pub layer_id: LayerId,
    pub score: f64,
    pub confidence: f64,
    pub evidence_count: usize,
    pub insights: Vec<String>,
    pub evidence_summary: String,
    #[serde(default)]
    pub assessment: Option<String>,
    pub persona_name: String,
    pub processing_time_ms: u64,
    pub used_generative_service: bool,
    /// Scoring task never returned; neutral values were filled in
    #[serde(default)]
    pub default_filled: bool,
}

impl LayerScore {
    /// Neutral score for a unit whose scoring task failed outright
    pub fn default_filled(session_id: Uuid, layer_id: &str, persona_name: &str) -> Self {
        Self {
            session_id,
            layer_id: layer_id.to_string(),
            score: NEUTRAL_SCORE,
            confidence: DEFAULT_CONFIDENCE,
            evidence_count: 0,
            insights: Vec::new(),
            evidence_summary: "Scoring task failed; neutral default applied".to_string(),
            assessment: None,
            persona_name: persona_name.to_string(),
            processing_time_ms: 0,
            used_generative_service: false,
            default_filled: true,
        }
    }
}

// ============================================================================
// Tier 2 output
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    /// provided / expected, capped at 1.0
    pub input_coverage: f64,
    /// Population variance of layer scores
    pub score_variance: f64,
    /// Population variance of layer confidences
    pub confidence_variance: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub expected_count: usize,
    pub provided_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorCalculation {
    pub session_id: Uuid,
    pub factor_id: FactorId,
    pub value: f64,
    pub confidence: f64,
    pub input_layer_count: usize,
    /// Aggregation strategy name
    pub method: String,
    pub layer_contributions: BTreeMap<LayerId, f64>,
    pub validation_metrics: ValidationMetrics,
    /// No layer input; neutral default emitted
    pub is_default: bool,
}

// ============================================================================
// Tier 3 output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAnalysis {
    pub session_id: Uuid,
    pub segment_id: SegmentId,
    pub attractiveness: f64,
    pub competitive_intensity: f64,
    pub market_size: f64,
    pub growth_potential: f64,
    pub overall_score: f64,
    pub insights: Vec<String>,
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
    pub recommendations: Vec<String>,
    pub factor_contributions: BTreeMap<FactorId, f64>,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub probability: f64,
    pub adjusted_overall_score: f64,
    pub per_segment_adjustment: BTreeMap<SegmentId, f64>,
}

// ============================================================================
// Session result
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Recorded stage transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: AnalysisStage,
    pub to: AnalysisStage,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub batches_completed: usize,
    pub total_batches: usize,
    pub generative_layers: usize,
    pub heuristic_layers: usize,
    /// Layer ids whose scoring task failed and were default-filled
    pub default_layers: Vec<LayerId>,
    pub default_factors: Vec<FactorId>,
    pub default_segments: Vec<SegmentId>,
    pub sink_errors: Vec<String>,
    pub transitions: Vec<StateTransition>,
}

impl SessionMetadata {
    pub fn new(started_at: DateTime<Utc>, total_batches: usize) -> Self {
        Self {
            status: SessionStatus::Running,
            started_at,
            completed_at: None,
            batches_completed: 0,
            total_batches,
            generative_layers: 0,
            heuristic_layers: 0,
            default_layers: Vec::new(),
            default_factors: Vec::new(),
            default_segments: Vec::new(),
            sink_errors: Vec::new(),
            transitions: Vec::new(),
        }
    }
}

/// Terminal artifact of one analysis session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub session_id: Uuid,
    pub overall_score: f64,
    pub overall_confidence: f64,
    pub layer_scores: Vec<LayerScore>,
    pub factor_calculations: Vec<FactorCalculation>,
    pub segment_analyses: Vec<SegmentAnalysis>,
    pub scenarios: Vec<Scenario>,
    pub processing_time_seconds: f64,
    pub metadata: SessionMetadata,
}

impl AnalysisResult {
    pub fn is_cancelled(&self) -> bool {
        self.metadata.status == SessionStatus::Cancelled
    }

    pub fn is_complete(&self) -> bool {
        self.metadata.status == SessionStatus::Completed
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),

    #[error("Analysis cancelled during {stage:?}")]
    Cancelled { stage: AnalysisStage },

    #[error("Result sink error: {0}")]
    Sink(String),

    #[error("Internal pipeline error: {0}")]
    Internal(String),
}

/// Session-fatal failure with whatever was produced before it
#[derive(Error, Debug)]
#[error("{error}")]
pub struct SessionFailure {
    pub error: PipelineError,
    pub partial: Box<AnalysisResult>,
}
