//! Evidence providers
//!
//! Supply the `SubjectKnowledge` bundle for a session. The pipeline only reads
//! it; providers own discovery and storage.

use crate::pipeline::types::SubjectKnowledge;
use async_trait::async_trait;
use bca_common::{Error, Result};
use std::path::PathBuf;

#[async_trait]
pub trait EvidenceProvider: Send + Sync {
    async fn load(&self) -> Result<SubjectKnowledge>;
}

/// Reads `SubjectKnowledge` from a JSON file
///
/// ```json
/// {"topic": "...", "description": "...",
///  "items": [{"title": "...", "body": "...", "source_url": "..."}]}
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileEvidence {
    path: PathBuf,
}

impl JsonFileEvidence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EvidenceProvider for JsonFileEvidence {
    async fn load(&self) -> Result<SubjectKnowledge> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let knowledge: SubjectKnowledge = serde_json::from_str(&content)?;

        if knowledge.topic.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "{}: evidence topic must not be empty",
                self.path.display()
            )));
        }

        tracing::info!(
            path = %self.path.display(),
            topic = %knowledge.topic,
            items = knowledge.items.len(),
            "Loaded evidence"
        );
        Ok(knowledge)
    }
}

/// Fixed in-memory evidence
#[derive(Debug, Clone, Default)]
pub struct StaticEvidence(pub SubjectKnowledge);

#[async_trait]
impl EvidenceProvider for StaticEvidence {
    async fn load(&self) -> Result<SubjectKnowledge> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loads_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("evidence.json");
        std::fs::write(
            &path,
            r#"{"topic": "Home fitness", "items": [
                {"title": "Survey", "body": "Demand is high", "source_url": "https://example.org"},
                {"title": "Note", "body": "No source"}
            ]}"#,
        )
        .unwrap();

        let knowledge = JsonFileEvidence::new(&path).load().await.unwrap();
        assert_eq!(knowledge.topic, "Home fitness");
        assert_eq!(knowledge.description, "");
        assert_eq!(knowledge.items.len(), 2);
        assert_eq!(knowledge.items[1].source_url, None);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = JsonFileEvidence::new(dir.path().join("nope.json")).load().await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_malformed_json_and_empty_topic() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(
            JsonFileEvidence::new(&bad).load().await,
            Err(Error::Serialization(_))
        ));

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, r#"{"topic": "  "}"#).unwrap();
        assert!(matches!(
            JsonFileEvidence::new(&empty).load().await,
            Err(Error::InvalidInput(_))
        ));
    }
}
