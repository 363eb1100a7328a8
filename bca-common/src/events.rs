//! Analysis progress events
//!
//! Progress is published on a tokio broadcast channel. Emission is lossy: an
//! event with no subscribers is dropped silently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline stage names carried by progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Initialized,
    ScoringLayers,
    CalculatingFactors,
    AnalyzingSegments,
    ComputingOverall,
    GeneratingScenarios,
    Completed,
    Cancelled,
    Failed,
}

impl AnalysisStage {
    /// Terminal stages never transition again
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Events emitted while an analysis session runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    SessionStarted {
        session_id: Uuid,
        topic: String,
        timestamp: DateTime<Utc>,
    },

    /// Stage transition with overall progress
    StageChanged {
        session_id: Uuid,
        stage: AnalysisStage,
        percent_complete: f64,
        timestamp: DateTime<Utc>,
    },

    BatchCompleted {
        session_id: Uuid,
        batch_index: usize,
        total_batches: usize,
        layers_completed: usize,
        timestamp: DateTime<Utc>,
    },

    SessionCompleted {
        session_id: Uuid,
        overall_score: f64,
        overall_confidence: f64,
        timestamp: DateTime<Utc>,
    },

    SessionCancelled {
        session_id: Uuid,
        layers_completed: usize,
        timestamp: DateTime<Utc>,
    },

    SessionFailed {
        session_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl AnalysisEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::SessionStarted { session_id, .. }
            | Self::StageChanged { session_id, .. }
            | Self::BatchCompleted { session_id, .. }
            | Self::SessionCompleted { session_id, .. }
            | Self::SessionCancelled { session_id, .. }
            | Self::SessionFailed { session_id, .. } => *session_id,
        }
    }
}

/// Broadcast bus for analysis events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AnalysisEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AnalysisEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No subscribers for analysis event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let session_id = Uuid::new_v4();

        bus.emit_lossy(AnalysisEvent::StageChanged {
            session_id,
            stage: AnalysisStage::ScoringLayers,
            percent_complete: 0.0,
            timestamp: Utc::now(),
        });
        bus.emit_lossy(AnalysisEvent::BatchCompleted {
            session_id,
            batch_index: 0,
            total_batches: 7,
            layers_completed: 30,
            timestamp: Utc::now(),
        });

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first,
            AnalysisEvent::StageChanged { stage: AnalysisStage::ScoringLayers, .. }
        ));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.session_id(), session_id);
        assert!(matches!(second, AnalysisEvent::BatchCompleted { layers_completed: 30, .. }));
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit_lossy(AnalysisEvent::SessionFailed {
            session_id: Uuid::new_v4(),
            error: "boom".to_string(),
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = AnalysisEvent::StageChanged {
            session_id: Uuid::nil(),
            stage: AnalysisStage::AnalyzingSegments,
            percent_complete: 80.0,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stage_changed");
        assert_eq!(json["stage"], "analyzing_segments");
    }

    #[test]
    fn test_terminal_stages() {
        assert!(AnalysisStage::Completed.is_terminal());
        assert!(AnalysisStage::Cancelled.is_terminal());
        assert!(AnalysisStage::Failed.is_terminal());
        assert!(!AnalysisStage::ScoringLayers.is_terminal());
    }
}
