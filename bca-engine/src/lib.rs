//! # BCA Engine
//!
//! Hierarchical business-case scoring pipeline.
//!
//! **3-tier scoring architecture:**
//!
//! ## Tier 1: Layer Scoring (210 independent units)
//! - `evidence` - Bounded, relevance-ranked evidence context per layer
//! - `response_parser` - Tolerant extraction of score/confidence/insights
//! - `heuristic` - Content-heuristic fallback scorer
//! - `layer_scorer` - Persona + evidence + generative backend with retry
//!
//! ## Tier 2: Factor Aggregation (28 factors)
//! - `factor_aggregator` - Layer scores → factor value + confidence + validation metrics
//!
//! ## Tier 3: Segment Analysis (5 segments)
//! - `segment_formulas` - Closed per-segment weighted formulas
//! - `segment_analyzer` - Sub-scores, segment score and rule-based findings
//!
//! ## Session
//! - `session_orchestrator` - Batching, bounded concurrency, cancellation, overall score, scenarios
//! - `session` - Stage state machine
//!
//! The taxonomy registry and generative backend are constructed once and passed
//! explicitly into the orchestrator.

pub mod config;
pub mod evidence_provider;
pub mod generative;
pub mod persona;
pub mod pipeline;
pub mod sink;
pub mod taxonomy;

pub use pipeline::session_orchestrator::{AnalysisOrchestrator, OrchestratorConfig};
pub use pipeline::types::{
    AnalysisResult, EvidenceItem, FactorCalculation, LayerScore, PipelineError, Scenario,
    SegmentAnalysis, SessionFailure, SessionStatus, SubjectKnowledge,
};
pub use taxonomy::{SegmentId, TaxonomyError, TaxonomyRegistry};
