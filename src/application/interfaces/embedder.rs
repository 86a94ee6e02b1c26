use async_trait::async_trait;

use crate::domain::error::DomainError;

/// The external embedding service (spec §1: out of scope, opaque). Model
/// internals are never this crate's concern — only the `embed` contract is.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, batch: Vec<String>) -> Result<Vec<Vec<f32>>, DomainError>;

    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;
}
