// Session-level analysis orchestration
//
// Concept: Drive one analysis session through every tier
//
// This orchestrator manages the full session lifecycle:
// - Stage transitions and progress events
// - Layer batching with bounded per-batch concurrency
// - Strict barriers between tiers (layers → factors → segments)
// - Overall score, confidence and scenarios
// - Cooperative cancellation at batch and tier boundaries
// - Per-unit defaults recorded in session metadata

use crate::pipeline::overall::{overall_confidence, overall_score, SegmentWeights};
use crate::pipeline::scenarios::generate_scenarios;
use crate::pipeline::session::AnalysisSession;
use crate::pipeline::tier1::layer_scorer::LayerScorer;
use crate::pipeline::tier2::factor_aggregator::FactorAggregator;
use crate::pipeline::tier3::segment_analyzer::SegmentAnalyzer;
use crate::pipeline::types::{
    AnalysisResult, FactorCalculation, LayerScore, PipelineError, Scenario, SegmentAnalysis,
    SessionFailure, SessionMetadata, SessionStatus, SubjectKnowledge,
};
use crate::sink::{NullSink, ResultSink};
use crate::taxonomy::{SegmentId, TaxonomyError, TaxonomyRegistry};
use bca_common::events::{AnalysisEvent, AnalysisStage, EventBus};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Share of progress allotted to layer scoring
const SCORING_PROGRESS_SPAN: f64 = 70.0;

fn stage_percent(stage: AnalysisStage) -> f64 {
    match stage {
        AnalysisStage::Initialized | AnalysisStage::ScoringLayers => 0.0,
        AnalysisStage::CalculatingFactors => 75.0,
        AnalysisStage::AnalyzingSegments => 85.0,
        AnalysisStage::ComputingOverall => 92.0,
        AnalysisStage::GeneratingScenarios => 96.0,
        AnalysisStage::Completed => 100.0,
        AnalysisStage::Cancelled | AnalysisStage::Failed => 0.0,
    }
}

/// Orchestration settings
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Layers per batch
    pub batch_size: usize,
    /// Concurrent scoring tasks within a batch
    pub max_concurrent_layers: usize,
    pub segment_weights: SegmentWeights,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 30,
            max_concurrent_layers: 10,
            segment_weights: SegmentWeights::default(),
        }
    }
}

/// Mutable state of one running session
struct SessionRun {
    session: AnalysisSession,
    metadata: SessionMetadata,
    layer_scores: Vec<LayerScore>,
    factors: Vec<FactorCalculation>,
    segments: Vec<SegmentAnalysis>,
    start: Instant,
}

impl SessionRun {
    /// Move the produced records into an `AnalysisResult`
    fn take_result(
        &mut self,
        status: SessionStatus,
        overall_score: f64,
        overall_confidence: f64,
        scenarios: Vec<Scenario>,
    ) -> AnalysisResult {
        let mut metadata = self.metadata.clone();
        metadata.status = status;
        metadata.completed_at = self.session.ended_at.or_else(|| Some(Utc::now()));
        metadata.transitions = self.session.transitions.clone();
        AnalysisResult {
            session_id: self.session.session_id,
            overall_score,
            overall_confidence,
            layer_scores: std::mem::take(&mut self.layer_scores),
            factor_calculations: std::mem::take(&mut self.factors),
            segment_analyses: std::mem::take(&mut self.segments),
            scenarios,
            processing_time_seconds: self.start.elapsed().as_secs_f64(),
            metadata,
        }
    }
}

/// Hierarchical analysis orchestrator
///
/// Taxonomy and scorer (with its generative backend) are injected once and
/// shared read-only across all scoring tasks.
pub struct AnalysisOrchestrator {
    taxonomy: Arc<TaxonomyRegistry>,
    scorer: Arc<LayerScorer>,
    aggregator: FactorAggregator,
    analyzer: SegmentAnalyzer,
    config: OrchestratorConfig,
    events: Option<EventBus>,
    sink: Arc<dyn ResultSink>,
}

impl AnalysisOrchestrator {
    /// Create an orchestrator
    ///
    /// # Errors
    /// `PipelineError::Taxonomy` when the taxonomy fails validation; no
    /// orchestrator is built for an inconsistent taxonomy.
    pub fn new(
        taxonomy: Arc<TaxonomyRegistry>,
        scorer: Arc<LayerScorer>,
        config: OrchestratorConfig,
    ) -> Result<Self, PipelineError> {
        let report = taxonomy.validate();
        if !report.valid {
            tracing::error!(errors = ?report.errors, "Taxonomy validation failed");
            return Err(TaxonomyError::Invalid(report).into());
        }
        for warning in &report.warnings {
            tracing::warn!(warning = %warning, "Taxonomy warning");
        }

        let config = OrchestratorConfig {
            batch_size: config.batch_size.max(1),
            max_concurrent_layers: config.max_concurrent_layers.max(1),
            ..config
        };

        Ok(Self {
            taxonomy,
            scorer,
            aggregator: FactorAggregator::default(),
            analyzer: SegmentAnalyzer::new(),
            config,
            events: None,
            sink: Arc::new(NullSink),
        })
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_factor_aggregator(mut self, aggregator: FactorAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn taxonomy(&self) -> &Arc<TaxonomyRegistry> {
        &self.taxonomy
    }

    pub fn event_bus(&self) -> Option<&EventBus> {
        self.events.as_ref()
    }

    fn emit(&self, event: AnalysisEvent) {
        if let Some(bus) = &self.events {
            bus.emit_lossy(event);
        }
    }

    /// Run a full analysis without external cancellation
    pub async fn run_analysis(
        &self,
        session_id: Uuid,
        knowledge: impl Into<Arc<SubjectKnowledge>>,
    ) -> Result<AnalysisResult, SessionFailure> {
        self.run_analysis_with_cancel(session_id, knowledge, CancellationToken::new())
            .await
    }

    /// Run a full analysis
    ///
    /// # Returns
    /// The complete `AnalysisResult` (possibly containing default-flagged
    /// entries), or a `SessionFailure` carrying the partial result when the
    /// session is cancelled or hits an unrecoverable error.
    ///
    /// # Phases
    /// 1. Scoring layers - batches of `batch_size`, each scored concurrently
    /// 2. Calculating factors - once every layer resolved
    /// 3. Analyzing segments - once every factor resolved
    /// 4. Computing overall score and confidence
    /// 5. Generating scenarios
    pub async fn run_analysis_with_cancel(
        &self,
        session_id: Uuid,
        knowledge: impl Into<Arc<SubjectKnowledge>>,
        cancel_token: CancellationToken,
    ) -> Result<AnalysisResult, SessionFailure> {
        let knowledge: Arc<SubjectKnowledge> = knowledge.into();
        let layers = self.taxonomy.all_layers();
        let batches: Vec<&[String]> = layers.chunks(self.config.batch_size).collect();

        let session = AnalysisSession::new(session_id);
        let metadata = SessionMetadata::new(session.started_at, batches.len());
        let mut run = SessionRun {
            session,
            metadata,
            layer_scores: Vec::with_capacity(layers.len()),
            factors: Vec::new(),
            segments: Vec::new(),
            start: Instant::now(),
        };

        tracing::info!(
            session_id = %session_id,
            topic = %knowledge.topic,
            evidence_items = knowledge.items.len(),
            layers = layers.len(),
            batches = batches.len(),
            generative = self.scorer.has_backend(),
            "Starting analysis session"
        );

        self.emit(AnalysisEvent::SessionStarted {
            session_id,
            topic: knowledge.topic.clone(),
            timestamp: Utc::now(),
        });

        // Phase 1: Scoring layers
        self.advance(&mut run, AnalysisStage::ScoringLayers)?;

        for (batch_index, batch) in batches.iter().enumerate() {
            if cancel_token.is_cancelled() {
                return Err(self.cancel(&mut run, AnalysisStage::ScoringLayers));
            }

            let scored = self.score_batch(session_id, batch, &knowledge).await;

            for score in &scored {
                if score.default_filled {
                    run.metadata.default_layers.push(score.layer_id.clone());
                } else if score.used_generative_service {
                    run.metadata.generative_layers += 1;
                } else {
                    run.metadata.heuristic_layers += 1;
                }
            }

            if let Err(e) = self
                .sink
                .persist_layer_batch(session_id, batch_index, &scored)
                .await
            {
                tracing::warn!(
                    session_id = %session_id,
                    batch_index,
                    error = %e,
                    "Failed to persist layer batch (non-fatal, continuing)"
                );
                run.metadata
                    .sink_errors
                    .push(format!("layer batch {}: {}", batch_index, e));
            }

            run.layer_scores.extend(scored);
            run.metadata.batches_completed += 1;
            run.session.update_progress(
                SCORING_PROGRESS_SPAN * run.metadata.batches_completed as f64 / batches.len() as f64,
            );

            tracing::info!(
                session_id = %session_id,
                progress = format!("{}/{}", batch_index + 1, batches.len()),
                layers_completed = run.layer_scores.len(),
                "Layer batch completed"
            );

            self.emit(AnalysisEvent::BatchCompleted {
                session_id,
                batch_index,
                total_batches: batches.len(),
                layers_completed: run.layer_scores.len(),
                timestamp: Utc::now(),
            });
        }

        if run.layer_scores.len() != layers.len() {
            let error = PipelineError::Internal(format!(
                "Expected {} layer scores, produced {}",
                layers.len(),
                run.layer_scores.len()
            ));
            return Err(self.fail(&mut run, error));
        }

        // Phase 2: Calculating factors
        if cancel_token.is_cancelled() {
            return Err(self.cancel(&mut run, AnalysisStage::CalculatingFactors));
        }
        self.advance(&mut run, AnalysisStage::CalculatingFactors)?;
        run.factors = self.calculate_factors(session_id, &run.layer_scores);
        run.metadata.default_factors = run
            .factors
            .iter()
            .filter(|f| f.is_default)
            .map(|f| f.factor_id.clone())
            .collect();
        self.persist_factors(&mut run).await;

        // Phase 3: Analyzing segments
        if cancel_token.is_cancelled() {
            return Err(self.cancel(&mut run, AnalysisStage::AnalyzingSegments));
        }
        self.advance(&mut run, AnalysisStage::AnalyzingSegments)?;
        run.segments = self.analyze_segments(session_id, &run.factors);
        run.metadata.default_segments = run
            .segments
            .iter()
            .filter(|s| s.is_default)
            .map(|s| s.segment_id)
            .collect();
        self.persist_segments(&mut run).await;

        // Phase 4: Overall score
        if cancel_token.is_cancelled() {
            return Err(self.cancel(&mut run, AnalysisStage::ComputingOverall));
        }
        self.advance(&mut run, AnalysisStage::ComputingOverall)?;
        let score = overall_score(&run.segments, &self.config.segment_weights);
        let confidence = overall_confidence(&run.layer_scores, &run.factors);

        // Phase 5: Scenarios
        if cancel_token.is_cancelled() {
            return Err(self.cancel(&mut run, AnalysisStage::GeneratingScenarios));
        }
        self.advance(&mut run, AnalysisStage::GeneratingScenarios)?;
        let scenarios = generate_scenarios(score, &run.segments);

        self.advance(&mut run, AnalysisStage::Completed)?;
        let mut result = run.take_result(SessionStatus::Completed, score, confidence, scenarios);

        if let Err(e) = self.sink.persist_result(&result).await {
            tracing::warn!(
                session_id = %session_id,
                error = %e,
                "Failed to persist analysis result (non-fatal)"
            );
            result.metadata.sink_errors.push(format!("result: {}", e));
        }

        tracing::info!(
            session_id = %session_id,
            overall_score = result.overall_score,
            overall_confidence = result.overall_confidence,
            generative_layers = result.metadata.generative_layers,
            heuristic_layers = result.metadata.heuristic_layers,
            default_layers = result.metadata.default_layers.len(),
            elapsed_s = result.processing_time_seconds,
            "Analysis session completed"
        );

        self.emit(AnalysisEvent::SessionCompleted {
            session_id,
            overall_score: result.overall_score,
            overall_confidence: result.overall_confidence,
            timestamp: Utc::now(),
        });

        Ok(result)
    }

    /// Score one batch with at most `max_concurrent_layers` tasks in flight
    ///
    /// Each layer runs in its own task so a panic is isolated to that unit and
    /// replaced by a neutral default. Results come back in taxonomy order.
    async fn score_batch(
        &self,
        session_id: Uuid,
        batch: &[String],
        knowledge: &Arc<SubjectKnowledge>,
    ) -> Vec<LayerScore> {
        // Owned ids and handles keep the session future Send
        let scorer = Arc::clone(&self.scorer);
        let knowledge = Arc::clone(knowledge);
        let mut results: Vec<(usize, LayerScore)> = stream::iter(batch.to_vec().into_iter().enumerate())
            .map(move |(idx, layer_id): (usize, String)| {
                let scorer = Arc::clone(&scorer);
                let knowledge = Arc::clone(&knowledge);
                async move {
                    let persona_name = scorer.persona_for(&layer_id).name;
                    let task = {
                        let layer_id = layer_id.clone();
                        tokio::spawn(async move {
                            scorer.score_layer(session_id, &layer_id, &knowledge).await
                        })
                    };
                    match task.await {
                        Ok(score) => (idx, score),
                        Err(e) => {
                            tracing::warn!(
                                session_id = %session_id,
                                layer_id = %layer_id,
                                error = %e,
                                "Layer scoring task failed, using neutral default"
                            );
                            (idx, LayerScore::default_filled(session_id, &layer_id, persona_name))
                        }
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrent_layers)
            .collect()
            .await;

        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, score)| score).collect()
    }

    /// One FactorCalculation per taxonomy factor, in taxonomy order
    fn calculate_factors(&self, session_id: Uuid, layer_scores: &[LayerScore]) -> Vec<FactorCalculation> {
        let mut by_factor: HashMap<&str, Vec<LayerScore>> = HashMap::new();
        for score in layer_scores {
            match self.taxonomy.factor_of(&score.layer_id) {
                Some(factor) => by_factor.entry(factor).or_default().push(score.clone()),
                None => tracing::warn!(
                    session_id = %session_id,
                    layer_id = %score.layer_id,
                    "Layer score does not map to a factor, ignored"
                ),
            }
        }

        self.taxonomy
            .all_factors()
            .iter()
            .map(|factor| {
                let scores = by_factor.get(factor.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                self.aggregator.aggregate(
                    session_id,
                    factor,
                    scores,
                    self.taxonomy.layers_of(factor).len(),
                )
            })
            .collect()
    }

    /// One SegmentAnalysis per segment, in `SegmentId::ALL` order
    fn analyze_segments(&self, session_id: Uuid, factors: &[FactorCalculation]) -> Vec<SegmentAnalysis> {
        SegmentId::ALL
            .iter()
            .map(|segment| {
                let own: Vec<FactorCalculation> = factors
                    .iter()
                    .filter(|f| self.taxonomy.segment_of_factor(&f.factor_id) == Some(*segment))
                    .cloned()
                    .collect();
                self.analyzer.analyze(session_id, *segment, &own)
            })
            .collect()
    }

    async fn persist_factors(&self, run: &mut SessionRun) {
        let session_id = run.session.session_id;
        if let Err(e) = self.sink.persist_factors(session_id, &run.factors).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to persist factors (non-fatal)");
            run.metadata.sink_errors.push(format!("factors: {}", e));
        }
    }

    async fn persist_segments(&self, run: &mut SessionRun) {
        let session_id = run.session.session_id;
        if let Err(e) = self.sink.persist_segments(session_id, &run.segments).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to persist segments (non-fatal)");
            run.metadata.sink_errors.push(format!("segments: {}", e));
        }
    }

    /// Transition the session and publish the stage change
    fn advance(&self, run: &mut SessionRun, stage: AnalysisStage) -> Result<(), SessionFailure> {
        let session_id = run.session.session_id;
        if let Err(e) = run.session.transition_to(stage) {
            return Err(self.fail(run, PipelineError::Internal(e.to_string())));
        }

        run.session.update_progress(stage_percent(stage));
        tracing::info!(session_id = %session_id, stage = ?stage, "Stage: {:?}", stage);

        self.emit(AnalysisEvent::StageChanged {
            session_id,
            stage,
            percent_complete: run.session.percent_complete,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn cancel(&self, run: &mut SessionRun, stage: AnalysisStage) -> SessionFailure {
        let session_id = run.session.session_id;
        tracing::info!(
            session_id = %session_id,
            stage = ?stage,
            layers_completed = run.layer_scores.len(),
            "Analysis cancelled"
        );
        if run.session.transition_to(AnalysisStage::Cancelled).is_err() {
            tracing::warn!(session_id = %session_id, "Cancelled session was already terminal");
        }
        self.emit(AnalysisEvent::SessionCancelled {
            session_id,
            layers_completed: run.layer_scores.len(),
            timestamp: Utc::now(),
        });

        let partial = run.take_result(SessionStatus::Cancelled, 0.0, 0.0, Vec::new());
        SessionFailure {
            error: PipelineError::Cancelled { stage },
            partial: Box::new(partial),
        }
    }

    fn fail(&self, run: &mut SessionRun, error: PipelineError) -> SessionFailure {
        let session_id = run.session.session_id;
        tracing::error!(session_id = %session_id, error = %error, "Analysis session failed");
        if run.session.transition_to(AnalysisStage::Failed).is_err() {
            tracing::warn!(session_id = %session_id, "Failed session was already terminal");
        }
        self.emit(AnalysisEvent::SessionFailed {
            session_id,
            error: error.to_string(),
            timestamp: Utc::now(),
        });

        let partial = run.take_result(SessionStatus::Failed, 0.0, 0.0, Vec::new());
        SessionFailure {
            error,
            partial: Box::new(partial),
        }
    }
}
