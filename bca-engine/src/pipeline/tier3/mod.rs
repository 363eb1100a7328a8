// Tier 3: Segment analysis
//
// Segment-specific formulas over factor values, then rule-based findings.

pub mod segment_analyzer;
pub mod segment_formulas;
