//! # Scoring pipeline
//!
//! **3-tier architecture:**
//! - `tier1` - Layer scoring (parallel, per unit fallback)
//! - `tier2` - Factor aggregation (confidence propagation, validation metrics)
//! - `tier3` - Segment analysis (segment formulas, rule-based findings)
//!
//! Session-level modules:
//! - `session_orchestrator` - Batches, bounded concurrency, tier barriers, cancellation
//! - `session` - Stage state machine
//! - `overall` - Weighted overall score and confidence
//! - `scenarios` - Base / Optimistic / Pessimistic variants
//! - `retry` - Generative call retry policy

pub mod overall;
pub mod retry;
pub mod scenarios;
pub mod session;
pub mod session_orchestrator;
pub mod tier1;
pub mod tier2;
pub mod tier3;

// Shared data contracts between tiers
pub mod types;
