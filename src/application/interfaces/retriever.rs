use async_trait::async_trait;
use std::time::Duration;

use crate::domain::error::DomainError;
use crate::domain::models::SearchHit;

/// Decouples the query planner from individual retrievers (spec §9): a new
/// retriever (e.g. a structural/graph one) plugs in without touching the
/// others, as long as it honors its deadline.
#[async_trait]
pub trait Retriever: Send + Sync {
    fn name(&self) -> &'static str;

    async fn retrieve(
        &self,
        repo_id: &str,
        query: &str,
        limit: usize,
        deadline: Duration,
    ) -> Result<Vec<SearchHit>, DomainError>;
}
