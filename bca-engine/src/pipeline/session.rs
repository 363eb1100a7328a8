//! Analysis session state machine
//!
//! Initialized → ScoringLayers → CalculatingFactors → AnalyzingSegments →
//! ComputingOverall → GeneratingScenarios → Completed
//!
//! `Cancelled` and `Failed` are reachable from any non-terminal stage. Terminal
//! stages never transition again.

use crate::pipeline::types::StateTransition;
use bca_common::events::AnalysisStage;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Illegal stage transition {from:?} → {to:?}")]
pub struct IllegalTransition {
    pub from: AnalysisStage,
    pub to: AnalysisStage,
}

/// Stage that follows `stage` on the happy path
fn next_stage(stage: AnalysisStage) -> Option<AnalysisStage> {
    use AnalysisStage::*;
    match stage {
        Initialized => Some(ScoringLayers),
        ScoringLayers => Some(CalculatingFactors),
        CalculatingFactors => Some(AnalyzingSegments),
        AnalyzingSegments => Some(ComputingOverall),
        ComputingOverall => Some(GeneratingScenarios),
        GeneratingScenarios => Some(Completed),
        Completed | Cancelled | Failed => None,
    }
}

/// In-memory session state
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    pub session_id: Uuid,
    pub state: AnalysisStage,
    pub transitions: Vec<StateTransition>,
    /// 0.0 - 100.0
    pub percent_complete: f64,
    pub started_at: DateTime<Utc>,
    /// Set on entering a terminal stage
    pub ended_at: Option<DateTime<Utc>>,
}

impl AnalysisSession {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            state: AnalysisStage::Initialized,
            transitions: Vec::new(),
            percent_complete: 0.0,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn can_transition_to(&self, new_state: AnalysisStage) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        matches!(new_state, AnalysisStage::Cancelled | AnalysisStage::Failed)
            || next_stage(self.state) == Some(new_state)
    }

    /// Move to `new_state`, recording the transition
    pub fn transition_to(
        &mut self,
        new_state: AnalysisStage,
    ) -> Result<StateTransition, IllegalTransition> {
        if !self.can_transition_to(new_state) {
            tracing::warn!(
                session_id = %self.session_id,
                from = ?self.state,
                to = ?new_state,
                "Rejected illegal stage transition"
            );
            return Err(IllegalTransition {
                from: self.state,
                to: new_state,
            });
        }

        let transition = StateTransition {
            from: self.state,
            to: new_state,
            at: Utc::now(),
        };
        self.state = new_state;
        self.transitions.push(transition.clone());

        if new_state.is_terminal() {
            self.ended_at = Some(transition.at);
        }
        if new_state == AnalysisStage::Completed {
            self.percent_complete = 100.0;
        }

        Ok(transition)
    }

    /// Progress never moves backwards
    pub fn update_progress(&mut self, percent: f64) {
        if percent.is_finite() {
            self.percent_complete = self.percent_complete.max(percent.clamp(0.0, 100.0));
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
