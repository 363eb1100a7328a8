// Tier 3: Segment formula table
//
// One fixed linear combination of named factor values per sub-score per
// segment. Weights within each sub-score sum to 1.0. An inverted term uses
// (1 − value). Missing factors read as 0.5.

use crate::pipeline::types::NEUTRAL_SCORE;
use crate::taxonomy::SegmentId;
use std::collections::BTreeMap;

/// One weighted factor term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaTerm {
    pub factor: &'static str,
    pub weight: f64,
    pub inverted: bool,
}

const fn term(factor: &'static str, weight: f64) -> FormulaTerm {
    FormulaTerm {
        factor,
        weight,
        inverted: false,
    }
}

const fn inv(factor: &'static str, weight: f64) -> FormulaTerm {
    FormulaTerm {
        factor,
        weight,
        inverted: true,
    }
}

/// Four sub-score formulas for one segment
#[derive(Debug, Clone, Copy)]
pub struct SegmentFormula {
    pub attractiveness: &'static [FormulaTerm],
    pub competitive_intensity: &'static [FormulaTerm],
    pub market_size: &'static [FormulaTerm],
    pub growth: &'static [FormulaTerm],
}

const CONSUMER: SegmentFormula = SegmentFormula {
    attractiveness: &[term("C1", 0.35), term("C4", 0.25), term("C3", 0.20), term("C5", 0.20)],
    competitive_intensity: &[term("C6", 0.5), inv("C3", 0.3), inv("C4", 0.2)],
    market_size: &[term("C1", 0.6), term("C2", 0.4)],
    growth: &[term("C5", 0.5), term("C1", 0.3), term("C2", 0.2)],
};

const MARKET: SegmentFormula = SegmentFormula {
    attractiveness: &[term("M2", 0.30), term("M1", 0.25), term("M6", 0.25), term("M5", 0.20)],
    competitive_intensity: &[term("M3", 0.6), inv("M4", 0.4)],
    market_size: &[term("M1", 0.7), term("M6", 0.3)],
    growth: &[term("M2", 0.6), term("M6", 0.25), term("M5", 0.15)],
};

const PRODUCT: SegmentFormula = SegmentFormula {
    attractiveness: &[term("P1", 0.30), term("P2", 0.25), term("P4", 0.25), term("P5", 0.20)],
    competitive_intensity: &[term("P6", 0.5), inv("P1", 0.3), inv("P3", 0.2)],
    market_size: &[term("P5", 0.6), term("P4", 0.4)],
    growth: &[term("P3", 0.5), term("P5", 0.3), term("P1", 0.2)],
};

const BRAND: SegmentFormula = SegmentFormula {
    attractiveness: &[term("B2", 0.35), term("B3", 0.25), term("B1", 0.20), inv("B4", 0.20)],
    competitive_intensity: &[inv("B2", 0.40), inv("B3", 0.35), term("B4", 0.25)],
    market_size: &[term("B1", 0.5), term("B5", 0.5)],
    growth: &[term("B5", 0.4), term("B1", 0.3), term("B3", 0.3)],
};

const EXPERIENCE: SegmentFormula = SegmentFormula {
    attractiveness: &[term("E2", 0.30), term("E3", 0.25), term("E5", 0.25), inv("E4", 0.20)],
    competitive_intensity: &[term("E4", 0.40), inv("E5", 0.35), inv("E3", 0.25)],
    market_size: &[term("E2", 0.5), term("E5", 0.5)],
    growth: &[term("E5", 0.40), term("E1", 0.35), term("E2", 0.25)],
};

impl SegmentFormula {
    pub fn for_segment(segment: SegmentId) -> &'static SegmentFormula {
        match segment {
            SegmentId::Consumer => &CONSUMER,
            SegmentId::Market => &MARKET,
            SegmentId::Product => &PRODUCT,
            SegmentId::Brand => &BRAND,
            SegmentId::Experience => &EXPERIENCE,
        }
    }

    pub fn sub_scores(&self) -> [&'static [FormulaTerm]; 4] {
        [
            self.attractiveness,
            self.competitive_intensity,
            self.market_size,
            self.growth,
        ]
    }

    /// True when any sub-score formula uses `factor_id`
    pub fn references(&self, factor_id: &str) -> bool {
        self.sub_scores()
            .iter()
            .any(|terms| terms.iter().any(|t| t.factor == factor_id))
    }
}

/// Evaluate one sub-score formula over factor values
pub fn evaluate(terms: &[FormulaTerm], factor_values: &BTreeMap<String, f64>) -> f64 {
    terms
        .iter()
        .map(|t| {
            let value = factor_values.get(t.factor).copied().unwrap_or(NEUTRAL_SCORE);
            let value = if t.inverted { 1.0 - value } else { value };
            t.weight * value
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::TaxonomyRegistry;

    #[test]
    fn test_weights_sum_to_one() {
        for segment in SegmentId::ALL {
            for terms in SegmentFormula::for_segment(segment).sub_scores() {
                let sum: f64 = terms.iter().map(|t| t.weight).sum();
                assert!((sum - 1.0).abs() < 1e-9, "{:?} weights sum to {}", segment, sum);
            }
        }
    }

    #[test]
    fn test_formulas_reference_only_own_factors() {
        let registry = TaxonomyRegistry::builtin();
        for segment in SegmentId::ALL {
            for terms in SegmentFormula::for_segment(segment).sub_scores() {
                for t in terms {
                    assert_eq!(registry.segment_of_factor(t.factor), Some(segment));
                }
            }
        }
    }

    #[test]
    fn test_missing_factors_read_neutral() {
        let formula = SegmentFormula::for_segment(SegmentId::Market);
        let value = evaluate(formula.competitive_intensity, &BTreeMap::new());
        assert!((value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_term() {
        let mut values = BTreeMap::new();
        values.insert("M3".to_string(), 1.0);
        values.insert("M4".to_string(), 1.0);
        let formula = SegmentFormula::for_segment(SegmentId::Market);
        // 0.6·1.0 + 0.4·(1 − 1.0)
        assert!((evaluate(formula.competitive_intensity, &values) - 0.6).abs() < 1e-12);
    }
}
