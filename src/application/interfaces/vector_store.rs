use async_trait::async_trait;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VectorPayload {
    pub relative_path: String,
    pub content_hash: String,
    pub repo_id: String,
    pub symbol: Option<String>,
    pub kind: Option<String>,
    pub line: u32,
    pub span: (u32, u32),
    pub language: String,
    pub context_before: Option<String>,
    pub context_after: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: VectorPayload,
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub point: VectorPoint,
    pub score: f64,
}

/// Port onto the vector store backing semantic search (spec §4.G). Treated
/// as an external service per §5: calls are retried with backoff by the
/// caller, not by the implementation itself.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), DomainError>;

    async fn remove_by_path(&self, repo_id: &str, relative_path: &str) -> Result<(), DomainError>;

    async fn move_path(
        &self,
        repo_id: &str,
        old_relative_path: &str,
        new_relative_path: &str,
    ) -> Result<(), DomainError>;

    async fn search(
        &self,
        repo_id: &str,
        query_vector: Vec<f32>,
        k: usize,
    ) -> Result<Vec<ScoredPoint>, DomainError>;
}
