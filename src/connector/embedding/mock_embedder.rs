use async_trait::async_trait;

use crate::application::interfaces::Embedder;
use crate::domain::error::DomainError;

/// Deterministic, offline embedder for tests and for running without a
/// configured remote provider. Produces a stable pseudo-embedding from a
/// hash of each string so repeated runs are reproducible.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, batch: Vec<String>) -> Result<Vec<Vec<f32>>, DomainError> {
        Ok(batch.iter().map(|text| pseudo_embedding(text, self.dimension)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "mock-embedder-v1"
    }
}

fn pseudo_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut state: u64 = 0xcbf29ce484222325;
    for byte in text.as_bytes() {
        state ^= *byte as u64;
        state = state.wrapping_mul(0x100000001b3);
    }
    (0..dimension)
        .map(|i| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407 + i as u64);
            ((state >> 40) as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_yields_same_vector() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed(vec!["hello world".into()]).await.unwrap();
        let b = embedder.embed(vec!["hello world".into()]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 16);
    }

    #[tokio::test]
    async fn different_text_yields_different_vector() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed(vec!["hello".into()]).await.unwrap();
        let b = embedder.embed(vec!["world".into()]).await.unwrap();
        assert_ne!(a, b);
    }
}
