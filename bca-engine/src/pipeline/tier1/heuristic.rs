// Tier 1: Content-heuristic scorer
//
// Concept: Non-generative fallback. Scores from evidence volume (diminishing
// returns) and lexical diversity plus a small jitter. Confidence is fixed low.
//
//   score = 0.35 + 0.35·(1 − e^(−words/threshold)) + 0.20·(unique/total) + jitter

use crate::pipeline::tier1::evidence::EvidenceContext;
use crate::pipeline::types::{clamp_unit, DEFAULT_CONFIDENCE, NEUTRAL_SCORE};
use rand::Rng;

/// Confidence attached to heuristic scores with evidence
pub const HEURISTIC_CONFIDENCE: f64 = 0.6;

const BASE: f64 = 0.35;
const VOLUME_WEIGHT: f64 = 0.35;
const DIVERSITY_WEIGHT: f64 = 0.20;

/// Heuristic score and confidence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicScore {
    pub score: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicScorer {
    /// Jitter amplitude (uniform in ±jitter)
    jitter: f64,
    word_threshold: usize,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self {
            jitter: 0.05,
            word_threshold: 400,
        }
    }
}

impl HeuristicScorer {
    pub fn new(jitter: f64, word_threshold: usize) -> Self {
        Self {
            jitter: if jitter.is_finite() { jitter.abs() } else { 0.0 },
            word_threshold: word_threshold.max(1),
        }
    }

    /// Deterministic variant for tests
    pub fn without_jitter(word_threshold: usize) -> Self {
        Self::new(0.0, word_threshold)
    }

    pub fn score(&self, context: &EvidenceContext) -> HeuristicScore {
        self.score_with_rng(context, &mut rand::thread_rng())
    }

    pub fn score_with_rng<R: Rng>(
        &self,
        context: &EvidenceContext,
        rng: &mut R,
    ) -> HeuristicScore {
        let stats = context.word_stats();
        if context.is_empty() || stats.total_words == 0 {
            return HeuristicScore {
                score: NEUTRAL_SCORE,
                confidence: DEFAULT_CONFIDENCE,
            };
        }

        let volume = 1.0 - (-(stats.total_words as f64) / self.word_threshold as f64).exp();
        let jitter = if self.jitter > 0.0 {
            rng.gen_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };

        HeuristicScore {
            score: clamp_unit(
                BASE + VOLUME_WEIGHT * volume + DIVERSITY_WEIGHT * stats.diversity() + jitter,
            ),
            confidence: HEURISTIC_CONFIDENCE,
        }
    }
}
