//! Overall score and confidence
//!
//! overall score      = Σ weight(s) · score(s) over `SegmentId::ALL`
//! overall confidence = 0.4 · mean(layer confidence) + 0.6 · mean(factor confidence)

use crate::pipeline::types::{clamp_unit, FactorCalculation, LayerScore, SegmentAnalysis};
use crate::taxonomy::SegmentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LAYER_CONFIDENCE_WEIGHT: f64 = 0.4;
pub const FACTOR_CONFIDENCE_WEIGHT: f64 = 0.6;

/// Per-segment weights (sum to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentWeights {
    pub consumer: f64,
    pub market: f64,
    pub product: f64,
    pub brand: f64,
    pub experience: f64,
}

impl Default for SegmentWeights {
    fn default() -> Self {
        Self {
            consumer: 0.2,
            market: 0.2,
            product: 0.2,
            brand: 0.2,
            experience: 0.2,
        }
    }
}

impl SegmentWeights {
    pub fn weight(&self, segment: SegmentId) -> f64 {
        match segment {
            SegmentId::Consumer => self.consumer,
            SegmentId::Market => self.market,
            SegmentId::Product => self.product,
            SegmentId::Brand => self.brand,
            SegmentId::Experience => self.experience,
        }
    }

    pub fn sum(&self) -> f64 {
        SegmentId::ALL.iter().map(|s| self.weight(*s)).sum()
    }
}

/// Weighted segment combination; independent of the order segments were analyzed in
pub fn overall_score(segments: &[SegmentAnalysis], weights: &SegmentWeights) -> f64 {
    let by_segment: BTreeMap<SegmentId, f64> = segments
        .iter()
        .map(|s| (s.segment_id, s.overall_score))
        .collect();

    let total = SegmentId::ALL
        .iter()
        .filter_map(|seg| by_segment.get(seg).map(|score| weights.weight(*seg) * score))
        .sum();
    clamp_unit(total)
}

pub fn overall_confidence(layers: &[LayerScore], factors: &[FactorCalculation]) -> f64 {
    let mean = |values: Vec<f64>| {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };
    let layer_mean = mean(layers.iter().map(|l| l.confidence).collect());
    let factor_mean = mean(factors.iter().map(|f| f.confidence).collect());
    clamp_unit(LAYER_CONFIDENCE_WEIGHT * layer_mean + FACTOR_CONFIDENCE_WEIGHT * factor_mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn segment(id: SegmentId, score: f64) -> SegmentAnalysis {
        SegmentAnalysis {
            session_id: Uuid::nil(),
            segment_id: id,
            attractiveness: score,
            competitive_intensity: 0.5,
            market_size: score,
            growth_potential: score,
            overall_score: score,
            insights: Vec::new(),
            risks: Vec::new(),
            opportunities: Vec::new(),
            recommendations: Vec::new(),
            factor_contributions: BTreeMap::new(),
            is_default: false,
        }
    }

    #[test]
    fn test_weighted_overall() {
        let weights = SegmentWeights {
            consumer: 0.4,
            market: 0.3,
            product: 0.1,
            brand: 0.1,
            experience: 0.1,
        };
        let segments: Vec<_> = SegmentId::ALL
            .iter()
            .zip([0.9, 0.5, 0.1, 0.3, 0.7])
            .map(|(s, v)| segment(*s, v))
            .collect();
        let expected = 0.4 * 0.9 + 0.3 * 0.5 + 0.1 * 0.1 + 0.1 * 0.3 + 0.1 * 0.7;
        assert!((overall_score(&segments, &weights) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_order_independent() {
        let weights = SegmentWeights::default();
        let mut segments: Vec<_> = SegmentId::ALL
            .iter()
            .zip([0.11, 0.23, 0.37, 0.41, 0.59])
            .map(|(s, v)| segment(*s, v))
            .collect();
        let forward = overall_score(&segments, &weights);
        segments.reverse();
        assert_eq!(overall_score(&segments, &weights), forward);
        segments.swap(0, 2);
        assert_eq!(overall_score(&segments, &weights), forward);
    }

    #[test]
    fn test_confidence_blend_of_empty_inputs() {
        assert_eq!(overall_confidence(&[], &[]), 0.0);
    }
}
