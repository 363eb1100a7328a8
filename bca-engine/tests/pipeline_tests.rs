//! End-to-end analysis sessions against fake generative backends

mod helpers;

use bca_engine::generative::{GenerativeBackend, HttpGenerativeClient};
use bca_engine::pipeline::overall::SegmentWeights;
use bca_engine::pipeline::retry::RetryPolicy;
use bca_engine::pipeline::tier1::heuristic::HeuristicScorer;
use bca_engine::pipeline::tier1::layer_scorer::LayerScorer;
use bca_engine::taxonomy::{EXPECTED_FACTORS, EXPECTED_LAYERS, EXPECTED_SEGMENTS};
use bca_engine::{
    AnalysisOrchestrator, OrchestratorConfig, SegmentId, SessionStatus, SubjectKnowledge,
};
use helpers::{
    knowledge, orchestrator, taxonomy, FailingBackend, FixedBackend, PanicBackend,
    SegmentScriptedBackend,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[test]
fn test_builtin_taxonomy_counts() {
    let registry = taxonomy();
    let report = registry.validate();
    assert!(report.valid, "{}", report);
    assert_eq!(registry.all_layers().len(), EXPECTED_LAYERS);
    assert_eq!(registry.all_factors().len(), EXPECTED_FACTORS);
    assert_eq!(SegmentId::ALL.len(), EXPECTED_SEGMENTS);

    let per_segment: usize = SegmentId::ALL
        .iter()
        .map(|s| registry.factors_of(*s).len())
        .sum();
    assert_eq!(per_segment, EXPECTED_FACTORS);
}

#[tokio::test]
async fn test_zero_evidence_session_is_neutral_and_complete() {
    let backend = Arc::new(FixedBackend::new(0.9, 0.9));
    let orch = orchestrator(
        Some(backend.clone() as Arc<dyn GenerativeBackend>),
        OrchestratorConfig::default(),
    );
    let empty = SubjectKnowledge {
        topic: "Unknown venture".to_string(),
        ..Default::default()
    };

    let result = orch.run_analysis(Uuid::new_v4(), empty).await.unwrap();

    assert_eq!(backend.calls(), 0, "no evidence means no generative calls");
    assert_eq!(result.layer_scores.len(), EXPECTED_LAYERS);
    assert!(result
        .layer_scores
        .iter()
        .all(|l| l.score == 0.5 && l.confidence == 0.3 && !l.used_generative_service));
    assert!(result.metadata.default_layers.is_empty());
    assert!(result.metadata.default_factors.is_empty());
    assert!(result.metadata.default_segments.is_empty());
    assert!(result.overall_confidence <= 0.6);
    assert!((result.overall_score - 0.5).abs() < 1e-9);
    assert_eq!(result.metadata.status, SessionStatus::Completed);
}

#[tokio::test]
async fn test_fixed_backend_session() {
    let backend = Arc::new(FixedBackend::new(0.8, 0.9));
    let orch = orchestrator(
        Some(backend.clone() as Arc<dyn GenerativeBackend>),
        OrchestratorConfig::default(),
    );

    let result = orch.run_analysis(Uuid::new_v4(), knowledge()).await.unwrap();

    assert_eq!(backend.calls(), EXPECTED_LAYERS);
    assert_eq!(result.metadata.generative_layers, EXPECTED_LAYERS);
    assert_eq!(result.metadata.heuristic_layers, 0);
    assert!(result.layer_scores.iter().all(|l| l.used_generative_service));
    assert!(result.layer_scores.iter().all(|l| l.insights.len() == 2));

    assert_eq!(result.factor_calculations.len(), EXPECTED_FACTORS);
    assert!(result
        .factor_calculations
        .iter()
        .all(|f| (f.value - 0.8).abs() < 1e-9));
    assert!((result.overall_confidence - 0.9).abs() < 1e-9);

    assert_eq!(result.segment_analyses.len(), EXPECTED_SEGMENTS);
    let consumer = &result.segment_analyses[0];
    assert_eq!(consumer.segment_id, SegmentId::Consumer);
    // competition: 0.5·0.8 + 0.3·0.2 + 0.2·0.2 = 0.5
    assert!((consumer.competitive_intensity - 0.5).abs() < 1e-9);
    assert!((consumer.overall_score - 0.725).abs() < 1e-9);

    let weights = SegmentWeights::default();
    let expected: f64 = result
        .segment_analyses
        .iter()
        .map(|s| weights.weight(s.segment_id) * s.overall_score)
        .sum();
    assert!((result.overall_score - expected).abs() < 1e-9);

    assert_eq!(result.scenarios.len(), 3);
    assert!((result.scenarios[0].adjusted_overall_score - result.overall_score).abs() < 1e-12);
    assert_eq!(result.scenarios[1].per_segment_adjustment.len(), EXPECTED_SEGMENTS);
}

#[tokio::test]
async fn test_segment_scores_follow_backend_scores() {
    let backend = Arc::new(SegmentScriptedBackend {
        scores: vec![("Market", 0.9), ("Consumer", 0.3)],
    });
    let orch = orchestrator(
        Some(backend as Arc<dyn GenerativeBackend>),
        OrchestratorConfig::default(),
    );

    let result = orch.run_analysis(Uuid::new_v4(), knowledge()).await.unwrap();

    let segment = |id: SegmentId| {
        result
            .segment_analyses
            .iter()
            .find(|s| s.segment_id == id)
            .unwrap()
    };
    assert!((segment(SegmentId::Market).overall_score - 0.78).abs() < 1e-9);
    assert!((segment(SegmentId::Consumer).overall_score - 0.35).abs() < 1e-9);
    assert!(!segment(SegmentId::Market).opportunities.is_empty());
}

#[tokio::test]
async fn test_failing_backend_falls_back_to_heuristic() {
    let backend = Arc::new(FailingBackend::new());
    let orch = orchestrator(
        Some(backend.clone() as Arc<dyn GenerativeBackend>),
        OrchestratorConfig::default(),
    );

    let result = orch.run_analysis(Uuid::new_v4(), knowledge()).await.unwrap();

    assert!(result.is_complete());
    // RetryPolicy::immediate(2) in the helper scorer
    assert_eq!(backend.calls(), EXPECTED_LAYERS * 2);
    assert!(result.layer_scores.iter().all(|l| !l.used_generative_service));
    assert!(result.layer_scores.iter().all(|l| l.confidence == 0.6));
    assert_eq!(result.metadata.heuristic_layers, EXPECTED_LAYERS);
    assert!(result.metadata.default_layers.is_empty());
}

#[tokio::test]
async fn test_panicking_layer_gets_recorded_default() {
    let registry = taxonomy();
    let backend = Arc::new(PanicBackend {
        layer_name: registry.name_of("C1_L01").to_string(),
    });
    let orch = orchestrator(
        Some(backend as Arc<dyn GenerativeBackend>),
        OrchestratorConfig::default(),
    );

    let result = orch.run_analysis(Uuid::new_v4(), knowledge()).await.unwrap();

    assert!(result.is_complete());
    assert_eq!(result.layer_scores.len(), EXPECTED_LAYERS);
    assert_eq!(result.metadata.default_layers, vec!["C1_L01".to_string()]);

    let failed = &result.layer_scores[0];
    assert_eq!(failed.layer_id, "C1_L01");
    assert!(failed.default_filled);
    assert_eq!(failed.score, 0.5);
    assert_eq!(failed.confidence, 0.3);
    assert!(!failed.used_generative_service);

    assert!(result.layer_scores[1..].iter().all(|l| !l.default_filled && l.score == 0.7));
    assert_eq!(result.metadata.generative_layers, EXPECTED_LAYERS - 1);

    // The factor still aggregates every layer, including the default
    let c1 = &result.factor_calculations[0];
    assert_eq!(c1.factor_id, "C1");
    assert_eq!(c1.input_layer_count, 8);
    assert!(!c1.is_default);
}

#[tokio::test]
async fn test_unreachable_http_backend_completes_with_heuristic() {
    let client = HttpGenerativeClient::new(
        "http://127.0.0.1:9".to_string(),
        "unused".to_string(),
        None,
        1000,
        Duration::from_secs(2),
    )
    .unwrap();
    let taxonomy = taxonomy();
    let scorer = LayerScorer::new(Arc::clone(&taxonomy))
        .with_backend(Arc::new(client))
        .with_heuristic(HeuristicScorer::without_jitter(400))
        .with_retry_policy(RetryPolicy::immediate(1).with_call_timeout(Duration::from_secs(2)));
    let orch = AnalysisOrchestrator::new(taxonomy, Arc::new(scorer), OrchestratorConfig::default())
        .unwrap();

    let result = orch.run_analysis(Uuid::new_v4(), knowledge()).await.unwrap();

    assert!(result.is_complete());
    assert_eq!(result.layer_scores.len(), EXPECTED_LAYERS);
    assert!(result.layer_scores.iter().all(|l| !l.used_generative_service));
}

#[tokio::test]
async fn test_concurrency_does_not_change_result() {
    let serial = orchestrator(
        None,
        OrchestratorConfig {
            batch_size: 7,
            max_concurrent_layers: 1,
            ..Default::default()
        },
    );
    let parallel = orchestrator(
        None,
        OrchestratorConfig {
            batch_size: 50,
            max_concurrent_layers: 16,
            ..Default::default()
        },
    );

    let a = serial.run_analysis(Uuid::nil(), knowledge()).await.unwrap();
    let b = parallel.run_analysis(Uuid::nil(), knowledge()).await.unwrap();

    assert_eq!(a.metadata.total_batches, 30);
    assert_eq!(b.metadata.total_batches, 5);
    assert!((a.overall_score - b.overall_score).abs() < 1e-12);
    assert!((a.overall_confidence - b.overall_confidence).abs() < 1e-12);
    let scores_a: Vec<_> = a.layer_scores.iter().map(|l| (&l.layer_id, l.score)).collect();
    let scores_b: Vec<_> = b.layer_scores.iter().map(|l| (&l.layer_id, l.score)).collect();
    assert_eq!(scores_a, scores_b);
}

#[tokio::test]
async fn test_every_score_in_unit_range() {
    let orch = orchestrator(None, OrchestratorConfig::default());
    let result = orch.run_analysis(Uuid::new_v4(), knowledge()).await.unwrap();

    let unit = |v: f64| (0.0..=1.0).contains(&v);
    assert!(unit(result.overall_score));
    assert!(unit(result.overall_confidence));
    assert!(result.layer_scores.iter().all(|l| unit(l.score) && unit(l.confidence)));
    assert!(result
        .factor_calculations
        .iter()
        .all(|f| unit(f.value) && unit(f.confidence)));
    assert!(result.segment_analyses.iter().all(|s| unit(s.overall_score)
        && unit(s.attractiveness)
        && unit(s.competitive_intensity)
        && unit(s.market_size)
        && unit(s.growth_potential)));
    assert!(result
        .scenarios
        .iter()
        .all(|s| unit(s.adjusted_overall_score)));
}
