use async_trait::async_trait;

use crate::domain::error::DomainError;

/// Optional retriever-query rewrite stage ahead of the hybrid fan-out
/// (spec §4.I step 1). Disabled by default; when unconfigured the dispatcher
/// skips it entirely and never alters fusion semantics.
#[async_trait]
pub trait QueryExpander: Send + Sync {
    async fn expand(&self, query_text: &str) -> Result<String, DomainError>;
}
