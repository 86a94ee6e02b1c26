use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::interfaces::Embedder;
use crate::domain::error::DomainError;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Thin HTTP adapter over the external embedding provider (spec §1: the
/// `Embedder` service is an opaque out-of-scope collaborator — this crate
/// never implements model internals, only the `embed` call contract).
pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model_id: String,
    dimension: usize,
}

impl RemoteEmbedder {
    pub fn new(endpoint: impl Into<String>, model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model_id: model_id.into(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, batch: Vec<String>) -> Result<Vec<Vec<f32>>, DomainError> {
        let request = EmbedRequest {
            model: &self.model_id,
            input: &batch,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::EmbedderUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DomainError::EmbedderUnavailable(format!(
                "embedding provider returned {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| DomainError::EmbedderUnavailable(format!("invalid response body: {e}")))?;
        Ok(parsed.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
