//! Result sinks
//!
//! The pipeline hands plain data records to a `ResultSink` after each batch and
//! each tier. Persistence technology is the sink's concern. Sink failures are
//! logged and recorded on the session metadata; they never fail a session.

use crate::pipeline::types::{AnalysisResult, FactorCalculation, LayerScore, SegmentAnalysis};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Sink IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink rejected record: {0}")]
    Rejected(String),
}

/// Receiver of pipeline records
///
/// Every method defaults to a no-op so sinks implement only what they store.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Called once per completed batch, before the next batch starts
    async fn persist_layer_batch(
        &self,
        _session_id: Uuid,
        _batch_index: usize,
        _scores: &[LayerScore],
    ) -> Result<(), SinkError> {
        Ok(())
    }

    async fn persist_factors(
        &self,
        _session_id: Uuid,
        _factors: &[FactorCalculation],
    ) -> Result<(), SinkError> {
        Ok(())
    }

    async fn persist_segments(
        &self,
        _session_id: Uuid,
        _segments: &[SegmentAnalysis],
    ) -> Result<(), SinkError> {
        Ok(())
    }

    async fn persist_result(&self, _result: &AnalysisResult) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl ResultSink for NullSink {}

/// Keeps records in memory for inspection
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Mutex<Vec<(usize, Vec<LayerScore>)>>,
    factors: Mutex<Vec<FactorCalculation>>,
    segments: Mutex<Vec<SegmentAnalysis>>,
    results: Mutex<Vec<AnalysisResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// (batch_index, scores) in persistence order
    pub async fn batches(&self) -> Vec<(usize, Vec<LayerScore>)> {
        self.batches.lock().await.clone()
    }

    pub async fn layer_scores(&self) -> Vec<LayerScore> {
        self.batches
            .lock()
            .await
            .iter()
            .flat_map(|(_, scores)| scores.iter().cloned())
            .collect()
    }

    pub async fn factors(&self) -> Vec<FactorCalculation> {
        self.factors.lock().await.clone()
    }

    pub async fn segments(&self) -> Vec<SegmentAnalysis> {
        self.segments.lock().await.clone()
    }

    pub async fn results(&self) -> Vec<AnalysisResult> {
        self.results.lock().await.clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn persist_layer_batch(
        &self,
        _session_id: Uuid,
        batch_index: usize,
        scores: &[LayerScore],
    ) -> Result<(), SinkError> {
        self.batches.lock().await.push((batch_index, scores.to_vec()));
        Ok(())
    }

    async fn persist_factors(
        &self,
        _session_id: Uuid,
        factors: &[FactorCalculation],
    ) -> Result<(), SinkError> {
        self.factors.lock().await.extend_from_slice(factors);
        Ok(())
    }

    async fn persist_segments(
        &self,
        _session_id: Uuid,
        segments: &[SegmentAnalysis],
    ) -> Result<(), SinkError> {
        self.segments.lock().await.extend_from_slice(segments);
        Ok(())
    }

    async fn persist_result(&self, result: &AnalysisResult) -> Result<(), SinkError> {
        self.results.lock().await.push(result.clone());
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    kind: &'a str,
    record: &'a T,
}

/// Appends one `{"kind": .., "record": ..}` JSON object per line
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    /// Serializes appends from concurrent callers
    write_lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append<T: Serialize>(&self, kind: &str, records: &[T]) -> Result<(), SinkError> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, &Envelope { kind, record })?;
            buf.push(b'\n');
        }

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ResultSink for JsonLinesSink {
    async fn persist_layer_batch(
        &self,
        _session_id: Uuid,
        _batch_index: usize,
        scores: &[LayerScore],
    ) -> Result<(), SinkError> {
        self.append("layer_score", scores).await
    }

    async fn persist_factors(
        &self,
        _session_id: Uuid,
        factors: &[FactorCalculation],
    ) -> Result<(), SinkError> {
        self.append("factor_calculation", factors).await
    }

    async fn persist_segments(
        &self,
        _session_id: Uuid,
        segments: &[SegmentAnalysis],
    ) -> Result<(), SinkError> {
        self.append("segment_analysis", segments).await
    }

    async fn persist_result(&self, result: &AnalysisResult) -> Result<(), SinkError> {
        self.append("analysis_result", std::slice::from_ref(result)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layer(id: &str) -> LayerScore {
        LayerScore::default_filled(Uuid::nil(), id, "p")
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_batches_in_order() {
        let sink = MemorySink::new();
        sink.persist_layer_batch(Uuid::nil(), 0, &[layer("A"), layer("B")])
            .await
            .unwrap();
        sink.persist_layer_batch(Uuid::nil(), 1, &[layer("C")]).await.unwrap();

        let batches = sink.batches().await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].0, 1);
        let ids: Vec<_> = sink.layer_scores().await.into_iter().map(|l| l.layer_id).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_json_lines_sink_writes_one_envelope_per_record() {
        let dir = TempDir::new().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("out.jsonl"));
        sink.persist_layer_batch(Uuid::nil(), 0, &[layer("A"), layer("B")])
            .await
            .unwrap();
        sink.persist_layer_batch(Uuid::nil(), 1, &[layer("C")]).await.unwrap();

        let content = tokio::fs::read_to_string(sink.path()).await.unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["kind"], "layer_score");
        assert_eq!(lines[2]["record"]["layer_id"], "C");
    }

    #[tokio::test]
    async fn test_json_lines_sink_reports_io_errors() {
        let dir = TempDir::new().unwrap();
        let sink = JsonLinesSink::new(dir.path().join("missing").join("out.jsonl"));
        let result = sink.persist_layer_batch(Uuid::nil(), 0, &[layer("A")]).await;
        assert!(matches!(result, Err(SinkError::Io(_))));
    }
}
