// Tier 1: Layer scoring
//
// Each of the 210 layers is scored independently. Units share only read-only
// state (taxonomy, backend handle), so a batch runs fully in parallel.

pub mod evidence; // Relevance-ranked, length-bounded evidence context
pub mod heuristic; // Content-heuristic fallback scorer
pub mod layer_scorer; // Persona + evidence + generative backend
pub mod response_parser; // Tolerant score/confidence/insight extraction
