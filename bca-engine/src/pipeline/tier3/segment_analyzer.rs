// Tier 3: Segment Analyzer
//
// Concept: Factor values → four sub-scores → segment score + findings
// Synchronization: Accepts FactorCalculations of one segment, outputs SegmentAnalysis
//
// overall = 0.35·attractiveness + 0.25·(1 − competitive_intensity)
//         + 0.20·market_size + 0.20·growth
//
// Findings are threshold rules over the four sub-scores only: deterministic and
// testable without any factor data.

use crate::pipeline::tier3::segment_formulas::{evaluate, SegmentFormula};
use crate::pipeline::types::{clamp_unit, FactorCalculation, SegmentAnalysis, NEUTRAL_SCORE};
use crate::taxonomy::SegmentId;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const ATTRACTIVENESS_WEIGHT: f64 = 0.35;
pub const COMPETITION_WEIGHT: f64 = 0.25;
pub const MARKET_SIZE_WEIGHT: f64 = 0.20;
pub const GROWTH_WEIGHT: f64 = 0.20;

/// The four segment sub-scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub attractiveness: f64,
    pub competitive_intensity: f64,
    pub market_size: f64,
    pub growth_potential: f64,
}

impl SubScores {
    pub fn neutral() -> Self {
        Self {
            attractiveness: NEUTRAL_SCORE,
            competitive_intensity: NEUTRAL_SCORE,
            market_size: NEUTRAL_SCORE,
            growth_potential: NEUTRAL_SCORE,
        }
    }

    /// Competitive intensity is inverted: higher intensity is unfavourable
    pub fn overall(&self) -> f64 {
        clamp_unit(
            ATTRACTIVENESS_WEIGHT * self.attractiveness
                + COMPETITION_WEIGHT * (1.0 - self.competitive_intensity)
                + MARKET_SIZE_WEIGHT * self.market_size
                + GROWTH_WEIGHT * self.growth_potential,
        )
    }
}

/// Rule-based findings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub insights: Vec<String>,
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Threshold rules over sub-scores
pub fn derive_findings(segment: SegmentId, s: &SubScores) -> Findings {
    let name = segment.display_name();
    let mut f = Findings::default();
    let overall = s.overall();

    if s.attractiveness > 0.7 {
        f.insights.push(format!("{} segment shows high strategic attractiveness", name));
    } else if s.attractiveness < 0.4 {
        f.risks.push(format!("{} segment attractiveness is weak", name));
    }

    if s.competitive_intensity > 0.7 {
        f.risks.push(format!("Intense competitive pressure in the {} segment", name));
    } else if s.competitive_intensity < 0.4 {
        f.opportunities.push(format!("Low competitive intensity leaves room in the {} segment", name));
    }

    if s.market_size > 0.7 {
        f.opportunities.push(format!("Large addressable opportunity in the {} segment", name));
    } else if s.market_size < 0.3 {
        f.risks.push(format!("Limited addressable size in the {} segment", name));
    }

    if s.growth_potential > 0.7 {
        f.opportunities.push(format!("Strong growth potential in the {} segment", name));
    } else if s.growth_potential < 0.4 {
        f.risks.push(format!("Weak growth outlook in the {} segment", name));
    }

    if s.attractiveness > 0.7 && s.competitive_intensity < 0.5 {
        f.recommendations
            .push("Pursue aggressive entry while competition is limited".to_string());
    } else if s.attractiveness > 0.6 && s.competitive_intensity >= 0.5 {
        f.recommendations
            .push("Enter with a differentiated position to offset competition".to_string());
    }
    if s.growth_potential > 0.6 && s.market_size < 0.5 {
        f.recommendations
            .push("Invest early in a niche position ahead of market growth".to_string());
    }
    if overall < 0.4 {
        f.recommendations
            .push("Defer major investment until segment fundamentals improve".to_string());
    }
    if f.recommendations.is_empty() {
        f.recommendations
            .push("Monitor the segment and revisit as evidence accumulates".to_string());
    }

    f.insights.push(format!("{} segment score {:.2}", name, overall));
    f
}

/// Segment Analyzer (Tier 3 concept)
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentAnalyzer;

impl SegmentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Sub-scores from factor values (missing factors read 0.5)
    pub fn sub_scores(segment: SegmentId, factor_values: &BTreeMap<String, f64>) -> SubScores {
        let formula = SegmentFormula::for_segment(segment);
        SubScores {
            attractiveness: clamp_unit(evaluate(formula.attractiveness, factor_values)),
            competitive_intensity: clamp_unit(evaluate(formula.competitive_intensity, factor_values)),
            market_size: clamp_unit(evaluate(formula.market_size, factor_values)),
            growth_potential: clamp_unit(evaluate(formula.growth, factor_values)),
        }
    }

    /// Analyze one segment
    ///
    /// # Arguments
    /// * `factors` - Calculations for factors of `segment`; factors the segment formula does not use are ignored
    pub fn analyze(
        &self,
        session_id: Uuid,
        segment: SegmentId,
        factors: &[FactorCalculation],
    ) -> SegmentAnalysis {
        let formula = SegmentFormula::for_segment(segment);
        let own: BTreeMap<String, f64> = factors
            .iter()
            .filter(|f| formula.references(&f.factor_id))
            .map(|f| (f.factor_id.clone(), clamp_unit(f.value)))
            .collect();

        if own.is_empty() {
            tracing::warn!(
                session_id = %session_id,
                segment = %segment,
                "No factor data for segment, emitting neutral default"
            );
            let sub = SubScores::neutral();
            return SegmentAnalysis {
                session_id,
                segment_id: segment,
                attractiveness: sub.attractiveness,
                competitive_intensity: sub.competitive_intensity,
                market_size: sub.market_size,
                growth_potential: sub.growth_potential,
                overall_score: sub.overall(),
                insights: vec![format!("No factor data for the {} segment", segment.display_name())],
                risks: Vec::new(),
                opportunities: Vec::new(),
                recommendations: Vec::new(),
                factor_contributions: BTreeMap::new(),
                is_default: true,
            };
        }

        let sub = Self::sub_scores(segment, &own);
        let findings = derive_findings(segment, &sub);

        tracing::debug!(
            session_id = %session_id,
            segment = %segment,
            attractiveness = sub.attractiveness,
            competitive_intensity = sub.competitive_intensity,
            market_size = sub.market_size,
            growth = sub.growth_potential,
            overall = sub.overall(),
            "Segment analyzed"
        );

        SegmentAnalysis {
            session_id,
            segment_id: segment,
            attractiveness: sub.attractiveness,
            competitive_intensity: sub.competitive_intensity,
            market_size: sub.market_size,
            growth_potential: sub.growth_potential,
            overall_score: sub.overall(),
            insights: findings.insights,
            risks: findings.risks,
            opportunities: findings.opportunities,
            recommendations: findings.recommendations,
            factor_contributions: own,
            is_default: false,
        }
    }
}
