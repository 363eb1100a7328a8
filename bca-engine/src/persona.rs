// Concept: Domain-expert persona per segment
//
// Closed table keyed by SegmentId. Personas frame the prompt for generative
// scoring and are recorded on every LayerScore.

use crate::taxonomy::SegmentId;

/// Expert profile used to frame evidence-based scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub name: &'static str,
    pub background: &'static str,
    pub expertise_areas: &'static [&'static str],
    pub analytical_perspective: &'static str,
}

const CONSUMER: Persona = Persona {
    name: "Dr. Maya Chen",
    background: "Consumer psychologist with fifteen years of behavioural research across retail and subscription markets",
    expertise_areas: &["purchase behaviour", "loyalty dynamics", "sentiment analysis", "price elasticity"],
    analytical_perspective: "Reads demand through observed behaviour rather than stated intent",
};

const MARKET: Persona = Persona {
    name: "James Okafor",
    background: "Market strategist who has sized and entered markets for growth-stage companies on three continents",
    expertise_areas: &["market sizing", "competitive dynamics", "regulation", "macroeconomics"],
    analytical_perspective: "Weighs structural market forces above short-term signals",
};

const PRODUCT: Persona = Persona {
    name: "Elena Petrova",
    background: "Product leader with a background in engineering management and platform scaling",
    expertise_areas: &["feature differentiation", "quality engineering", "unit economics", "scalability"],
    analytical_perspective: "Judges products by defensible differentiation and cost to deliver",
};

const BRAND: Persona = Persona {
    name: "Rafael Duarte",
    background: "Brand strategist who has repositioned consumer and B2B brands through category shifts",
    expertise_areas: &["brand equity", "positioning", "reputation management", "channel strategy"],
    analytical_perspective: "Looks for coherence between what a brand claims and what the market hears",
};

const EXPERIENCE: Persona = Persona {
    name: "Aisha Rahman",
    background: "Customer experience researcher specialising in journey mapping and service design",
    expertise_areas: &["onboarding", "engagement", "support operations", "advocacy"],
    analytical_perspective: "Scores experience by friction removed and loyalty earned",
};

/// Used for layers whose segment cannot be resolved
pub const GENERALIST: Persona = Persona {
    name: "Strategy Analyst",
    background: "Generalist strategy consultant",
    expertise_areas: &["business strategy"],
    analytical_perspective: "Balanced, evidence-first assessment",
};

impl Persona {
    pub fn for_segment(segment: SegmentId) -> &'static Persona {
        match segment {
            SegmentId::Consumer => &CONSUMER,
            SegmentId::Market => &MARKET,
            SegmentId::Product => &PRODUCT,
            SegmentId::Brand => &BRAND,
            SegmentId::Experience => &EXPERIENCE,
        }
    }
}
