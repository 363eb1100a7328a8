// Tier 2: Factor Aggregator
//
// Concept: Combine the layer scores of one factor into a single value + confidence
// Synchronization: Accepts &[LayerScore] for one factor, outputs FactorCalculation
//
// Default method is the equal-weighted mean (weight = 1/N) of scores and of
// confidences. Alternative methods sit behind the same call and can be chosen
// per factor. An empty input emits a neutral default instead of failing.

use crate::pipeline::types::{
    clamp_unit, FactorCalculation, FactorId, LayerId, LayerScore, ValidationMetrics,
    DEFAULT_CONFIDENCE, NEUTRAL_SCORE,
};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Scores at or below this are treated as zero by the harmonic/geometric means
const MEAN_FLOOR: f64 = 1e-9;

/// Layer aggregation strategy
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AggregationMethod {
    /// Arithmetic mean, weight 1/N
    #[default]
    EqualWeighted,
    /// Weighted mean; layers missing from the map weigh 1.0
    Weighted(BTreeMap<LayerId, f64>),
    /// Weakest-link semantics
    HarmonicMean,
    /// Multiplicative risk combination
    GeometricMean,
    /// Blend of min, mean and max score
    MinAvgMaxBlend { min: f64, avg: f64, max: f64 },
}

impl AggregationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationMethod::EqualWeighted => "equal_weighted",
            AggregationMethod::Weighted(_) => "weighted",
            AggregationMethod::HarmonicMean => "harmonic_mean",
            AggregationMethod::GeometricMean => "geometric_mean",
            AggregationMethod::MinAvgMaxBlend { .. } => "min_avg_max_blend",
        }
    }
}

fn sanitize_weight(w: f64) -> f64 {
    if w.is_finite() && w > 0.0 {
        w
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return mean(values);
    }
    values.iter().zip(weights).map(|(v, w)| v * w).sum::<f64>() / total
}

fn harmonic_mean(values: &[f64]) -> f64 {
    if values.iter().any(|v| *v <= MEAN_FLOOR) {
        return 0.0;
    }
    values.len() as f64 / values.iter().map(|v| 1.0 / v).sum::<f64>()
}

fn geometric_mean(values: &[f64]) -> f64 {
    if values.iter().any(|v| *v <= MEAN_FLOOR) {
        return 0.0;
    }
    (values.iter().map(|v| v.ln()).sum::<f64>() / values.len() as f64).exp()
}

/// Factor Aggregator (Tier 2 concept)
#[derive(Debug, Clone, Default)]
pub struct FactorAggregator {
    default_method: AggregationMethod,
    overrides: HashMap<FactorId, AggregationMethod>,
}

impl FactorAggregator {
    pub fn new(default_method: AggregationMethod) -> Self {
        Self {
            default_method,
            overrides: HashMap::new(),
        }
    }

    /// Use `method` for one factor only
    pub fn with_method_for(mut self, factor_id: impl Into<FactorId>, method: AggregationMethod) -> Self {
        self.overrides.insert(factor_id.into(), method);
        self
    }

    pub fn method_for(&self, factor_id: &str) -> &AggregationMethod {
        self.overrides.get(factor_id).unwrap_or(&self.default_method)
    }

    /// Aggregate the layer scores of one factor
    ///
    /// # Arguments
    /// * `layer_scores` - Scores whose layer belongs to `factor_id` (may be a strict subset)
    /// * `expected_count` - Layers the taxonomy lists for this factor
    pub fn aggregate(
        &self,
        session_id: Uuid,
        factor_id: &str,
        layer_scores: &[LayerScore],
        expected_count: usize,
    ) -> FactorCalculation {
        let method = self.method_for(factor_id);

        if layer_scores.is_empty() {
            tracing::warn!(
                session_id = %session_id,
                factor_id,
                expected_count,
                "No layer scores for factor, emitting neutral default"
            );
            return FactorCalculation {
                session_id,
                factor_id: factor_id.to_string(),
                value: NEUTRAL_SCORE,
                confidence: DEFAULT_CONFIDENCE,
                input_layer_count: 0,
                method: method.name().to_string(),
                layer_contributions: BTreeMap::new(),
                validation_metrics: ValidationMetrics {
                    expected_count,
                    ..Default::default()
                },
                is_default: true,
            };
        }

        let scores: Vec<f64> = layer_scores.iter().map(|l| clamp_unit(l.score)).collect();
        let confidences: Vec<f64> = layer_scores.iter().map(|l| clamp_unit(l.confidence)).collect();

        let (value, confidence) = match method {
            AggregationMethod::EqualWeighted => (mean(&scores), mean(&confidences)),
            AggregationMethod::Weighted(weight_map) => {
                let weights: Vec<f64> = layer_scores
                    .iter()
                    .map(|l| sanitize_weight(weight_map.get(&l.layer_id).copied().unwrap_or(1.0)))
                    .collect();
                (
                    weighted_mean(&scores, &weights),
                    weighted_mean(&confidences, &weights),
                )
            }
            AggregationMethod::HarmonicMean => (harmonic_mean(&scores), mean(&confidences)),
            AggregationMethod::GeometricMean => (geometric_mean(&scores), mean(&confidences)),
            AggregationMethod::MinAvgMaxBlend { min, avg, max } => {
                let mut blend = [sanitize_weight(*min), sanitize_weight(*avg), sanitize_weight(*max)];
                if blend.iter().sum::<f64>() <= 0.0 {
                    blend = [0.25, 0.5, 0.25];
                }
                let lo = scores.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (
                    weighted_mean(&[lo, mean(&scores), hi], &blend),
                    mean(&confidences),
                )
            }
        };

        let provided_count = layer_scores.len();
        let input_coverage = if expected_count == 0 {
            1.0
        } else {
            (provided_count as f64 / expected_count as f64).min(1.0)
        };

        let validation_metrics = ValidationMetrics {
            input_coverage,
            score_variance: variance(&scores),
            confidence_variance: variance(&confidences),
            min_score: scores.iter().copied().fold(f64::INFINITY, f64::min),
            max_score: scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            expected_count,
            provided_count,
        };

        if provided_count < expected_count {
            tracing::warn!(
                session_id = %session_id,
                factor_id,
                provided_count,
                expected_count,
                "Factor aggregated from partial layer set"
            );
        }

        let layer_contributions = layer_scores
            .iter()
            .zip(&scores)
            .map(|(l, s)| (l.layer_id.clone(), *s))
            .collect();

        FactorCalculation {
            session_id,
            factor_id: factor_id.to_string(),
            value: clamp_unit(value),
            confidence: clamp_unit(confidence),
            input_layer_count: provided_count,
            method: method.name().to_string(),
            layer_contributions,
            validation_metrics,
            is_default: false,
        }
    }
}
