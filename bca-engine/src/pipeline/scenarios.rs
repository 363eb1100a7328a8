//! What-if scenarios
//!
//! Base / Optimistic / Pessimistic with fixed probabilities (0.5 / 0.25 / 0.25)
//! and a fixed ±0.15 shift applied uniformly to the overall and every segment
//! score, clamped to [0,1].

use crate::pipeline::types::{clamp_unit, Scenario, SegmentAnalysis};

pub const SCENARIO_ADJUSTMENT: f64 = 0.15;

/// (name, probability, shift)
const SCENARIOS: [(&str, f64, f64); 3] = [
    ("Base", 0.5, 0.0),
    ("Optimistic", 0.25, SCENARIO_ADJUSTMENT),
    ("Pessimistic", 0.25, -SCENARIO_ADJUSTMENT),
];

pub fn generate_scenarios(overall_score: f64, segments: &[SegmentAnalysis]) -> Vec<Scenario> {
    SCENARIOS
        .iter()
        .map(|(name, probability, shift)| Scenario {
            name: name.to_string(),
            probability: *probability,
            adjusted_overall_score: clamp_unit(overall_score + shift),
            per_segment_adjustment: segments
                .iter()
                .map(|s| (s.segment_id, clamp_unit(s.overall_score + shift)))
                .collect(),
        })
        .collect()
}
